//! Per-connection network state
//!
//! Everything the world's connection table owns for one socket: the
//! non-blocking stream itself, its input/output byte reservoirs, and (once
//! seated) its pair of ISAAC keystreams. A connection is never shared or
//! cloned mid-session; the world owns it exclusively through its slot index.

use std::io;
use std::net::SocketAddr;

use tokio::net::TcpStream;
use tracing::trace;

use crate::crypto::{Isaac, IsaacPair};
use crate::net::buffer::PacketBuffer;

/// Stage a connection occupies before (and after) it becomes a seated player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStage {
    /// Socket accepted, server seed frame not yet written.
    AwaitingConnection,
    /// Seed frame written, waiting for the client's login header.
    AwaitingHeader,
    /// Login accepted; connection owns a player slot.
    Seated,
}

/// Per-connection input/output byte reservoirs, ISAAC ciphers, and lifecycle
/// state. Owned exclusively by the world's connection table.
pub struct ConnectionState {
    socket: TcpStream,
    pub peer_addr: SocketAddr,
    pub stage: LoginStage,
    pub inbound: PacketBuffer,
    pub outbound: PacketBuffer,
    pub in_cipher: Option<Isaac>,
    pub out_cipher: Option<Isaac>,
    pub player_slot: Option<u16>,
}

impl ConnectionState {
    pub fn new(socket: TcpStream, peer_addr: SocketAddr) -> Self {
        Self {
            socket,
            peer_addr,
            stage: LoginStage::AwaitingConnection,
            inbound: PacketBuffer::with_capacity(512),
            outbound: PacketBuffer::with_capacity(512),
            in_cipher: None,
            out_cipher: None,
            player_slot: None,
        }
    }

    /// Attach the post-login ISAAC ciphers and move to the seated stage.
    /// The server's in-cipher decodes what the client's out-cipher produced
    /// (raw client seeds); the server's out-cipher is keyed seeds+50.
    pub fn seat(&mut self, slot: u16, ciphers: IsaacPair) {
        self.in_cipher = Some(ciphers.decode);
        self.out_cipher = Some(ciphers.encode);
        self.player_slot = Some(slot);
        self.stage = LoginStage::Seated;
    }

    /// Non-blocking read: append whatever is currently available to the
    /// inbound reservoir. Returns `Ok(0)` on a would-block, and an error
    /// (including a synthetic `UnexpectedEof`) on peer close or I/O failure.
    pub fn try_recv(&mut self) -> io::Result<usize> {
        let mut tmp = [0u8; 4096];
        match self.socket.try_read(&mut tmp) {
            Ok(0) => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "peer closed")),
            Ok(n) => {
                self.inbound.write_bytes(&tmp[..n]);
                Ok(n)
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// Drain as much of the outbound reservoir as the socket accepts without
    /// blocking. Never blocks; unsent bytes remain for the next call.
    pub fn try_flush(&mut self) -> io::Result<()> {
        while self.outbound.has_remaining() {
            let remaining = &self.outbound.as_bytes()[self.outbound.read_position()..];
            match self.socket.try_write(remaining) {
                Ok(0) => break,
                Ok(n) => self.outbound.skip(n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e),
            }
        }
        if !self.outbound.has_remaining() {
            self.outbound.clear();
        }
        Ok(())
    }

    /// Reclaim space once the inbound parse loop has consumed everything
    /// available. Cheap no-op when there is a partial packet still pending.
    pub fn compact_inbound(&mut self) {
        if !self.inbound.has_remaining() {
            self.inbound.clear();
            trace!(peer = %self.peer_addr, "inbound reservoir compacted");
        }
    }
}
