//! Networking module
//!
//! This module handles all network-related functionality for the Rustscape
//! server: the bit/byte-level packet buffer, per-connection reservoirs and
//! ISAAC ciphers, and connection lifecycle.

pub mod buffer;
pub mod connection;
pub mod crc32;

pub use buffer::{HeaderKind, OpenHeader, PacketBuffer};
pub use connection::{ConnectionState, LoginStage};
