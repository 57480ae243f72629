//! Protocol module
//!
//! This module contains all protocol-related implementations for the
//! revision 225 game protocol: the login handshake, the inbound/outbound
//! packet tables, map streaming, and the per-tick player-info encoder.

pub mod login;
pub mod map;
pub mod packets;
pub mod player_info;
pub mod update_flags;
