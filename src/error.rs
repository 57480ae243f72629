//! Error handling module
//!
//! Defines custom error types for the Rustscape server.

use std::io;

use thiserror::Error;

/// Main error type for the Rustscape server
#[derive(Error, Debug)]
pub enum RustscapeError {
    /// Network-related errors
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Protocol-related errors
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Game logic errors
    #[error("Game error: {0}")]
    Game(#[from] GameError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Network-specific errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Connection timeout")]
    Timeout,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Too many connections from {0}")]
    TooManyConnections(String),

    #[error("Write buffer full")]
    WriteBufferFull,

    #[error("Read error: {0}")]
    ReadError(String),

    #[error("Write error: {0}")]
    WriteError(String),
}

/// Protocol-specific errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid opcode: {0}")]
    InvalidOpcode(u8),

    #[error("Invalid packet size: expected {expected}, got {actual}")]
    InvalidPacketSize { expected: usize, actual: usize },

    #[error("Invalid revision: expected {expected}, got {actual}")]
    InvalidRevision { expected: u8, actual: u8 },

    #[error("Malformed packet: {0}")]
    MalformedPacket(String),

    #[error("Invalid handshake")]
    InvalidHandshake,

    #[error("Unexpected packet in state {state}: opcode {opcode}")]
    UnexpectedPacket { state: String, opcode: u8 },

    #[error("Packet too large: {size} bytes (max: {max})")]
    PacketTooLarge { size: usize, max: usize },

    #[error("Invalid string encoding")]
    InvalidStringEncoding,
}

/// Authentication-specific errors
#[derive(Error, Debug, Clone)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Already logged in")]
    AlreadyLoggedIn,

    #[error("World full")]
    WorldFull,

    #[error("Login limit exceeded")]
    LoginLimitExceeded,

    #[error("Invalid username format")]
    InvalidUsername,

    #[error("Invalid password format")]
    InvalidPassword,
}

/// Game logic errors
#[derive(Error, Debug)]
pub enum GameError {
    #[error("Player not found: {0}")]
    PlayerNotFound(String),

    #[error("Invalid player state: {0}")]
    InvalidPlayerState(String),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Invalid location: ({x}, {z})")]
    InvalidLocation { x: u16, z: u16 },

    #[error("Out of range")]
    OutOfRange,

    #[error("World not ready")]
    WorldNotReady,

    #[error("Region not loaded: ({x}, {z})")]
    RegionNotLoaded { x: u16, z: u16 },
}

/// Result type alias for Rustscape operations
pub type Result<T> = std::result::Result<T, RustscapeError>;

impl From<AuthError> for crate::protocol::login::LoginResponse {
    fn from(err: AuthError) -> Self {
        use crate::protocol::login::LoginResponse;
        match err {
            AuthError::InvalidCredentials => LoginResponse::Invalid,
            AuthError::AlreadyLoggedIn => LoginResponse::AlreadyOnline,
            AuthError::WorldFull => LoginResponse::WorldFull,
            AuthError::LoginLimitExceeded => LoginResponse::LoginAttemptsExceeded,
            AuthError::InvalidUsername | AuthError::InvalidPassword => LoginResponse::Invalid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_to_login_response() {
        use crate::protocol::login::LoginResponse;
        let response: LoginResponse = AuthError::InvalidCredentials.into();
        assert_eq!(response, LoginResponse::Invalid);

        let response: LoginResponse = AuthError::WorldFull.into();
        assert_eq!(response, LoginResponse::WorldFull);
    }

    #[test]
    fn test_error_display() {
        let err = NetworkError::ConnectionClosed;
        assert_eq!(err.to_string(), "Connection closed");

        let err = ProtocolError::InvalidOpcode(42);
        assert_eq!(err.to_string(), "Invalid opcode: 42");
    }
}
