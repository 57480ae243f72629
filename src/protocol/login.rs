//! Login handshake
//!
//! Stage 1 (seed exchange) and Stage 2 (the header table) of the 225
//! login handshake. Stage 3 is a placeholder that succeeds without
//! consuming any bytes (see `LoginOutcome::Placeholder`).

use tracing::{debug, warn};

use crate::crypto::IsaacPair;
use crate::game::coord::Position;
use crate::net::buffer::PacketBuffer;

pub const PROTOCOL_REVISION: u8 = 225;

/// Login request type byte; 18 ("reconnect") is handled identically to 16
/// for this revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginType {
    Normal = 16,
    Reconnect = 18,
}

impl LoginType {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            16 => Some(Self::Normal),
            18 => Some(Self::Reconnect),
            _ => None,
        }
    }
}

/// The parsed Stage 2 login header.
#[derive(Debug, Clone)]
pub struct LoginHeader {
    pub login_type: LoginType,
    pub client_seeds: [u32; 4],
    pub username: String,
    pub password: String,
}

/// One-byte login response codes written unmasked, pre-cipher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LoginResponse {
    Ok = 2,
    Invalid = 3,
    AlreadyOnline = 5,
    ClientOutdated = 6,
    WorldFull = 7,
    LoginServerOffline = 11,
    LoginAttemptsExceeded = 16,
    StandingInMembersArea = 17,
    AccountSuspended = 18,
}

/// Result of attempting to parse a Stage 2 header out of the connection's
/// inbound reservoir.
pub enum HeaderParseOutcome {
    /// Buffer didn't contain enough bytes yet; try again once more data
    /// arrives. The connection must not be torn down for this.
    NeedMoreData,
    /// Type or protocol version mismatch; the connection must be closed
    /// with no response.
    Reject,
    Parsed(LoginHeader),
}

/// Parse the Stage 2 header table. Reads are against a snapshot of the
/// reservoir: the caller only commits (advances) the real reservoir's read
/// position if this returns `Parsed`, matching the "don't consume on a
/// partial packet" contract used by the main packet codec.
pub fn parse_login_header(raw: &[u8]) -> HeaderParseOutcome {
    // type(1) + block_len(1) + version(1) + memory(1) + 9*4 crc + rsa_len(1)
    // + rsa_opcode(1) + 4*4 client seeds + uid(4) = 57 bytes minimum, plus
    // username/password which are newline-terminated and thus unbounded.
    const MIN_HEADER: usize = 1 + 1 + 1 + 1 + 36 + 1 + 1 + 16 + 4;
    if raw.len() < MIN_HEADER {
        return HeaderParseOutcome::NeedMoreData;
    }

    let mut buffer = PacketBuffer::from_bytes(raw);
    let login_type = buffer.read_ubyte();
    let block_len = buffer.read_ubyte();
    if raw.len() < 2 + block_len as usize {
        return HeaderParseOutcome::NeedMoreData;
    }
    let version = buffer.read_ubyte();
    let _memory_flag = buffer.read_ubyte();
    for _ in 0..9 {
        buffer.read_uint();
    }
    let _rsa_len = buffer.read_ubyte();
    let _rsa_opcode = buffer.read_ubyte();
    let mut client_seeds = [0u32; 4];
    for seed in &mut client_seeds {
        *seed = buffer.read_uint();
    }
    let _uid = buffer.read_uint();

    let Some(login_type) = LoginType::from_byte(login_type) else {
        warn!(login_type, "login rejected: unrecognized type byte");
        return HeaderParseOutcome::Reject;
    };
    if version != PROTOCOL_REVISION {
        warn!(version, "login rejected: unsupported protocol revision");
        return HeaderParseOutcome::Reject;
    }

    if !raw[buffer.read_position()..].contains(&0x0A) {
        return HeaderParseOutcome::NeedMoreData;
    }
    let username = buffer.read_string_capped(12);
    if !raw[buffer.read_position()..].contains(&0x0A) {
        return HeaderParseOutcome::NeedMoreData;
    }
    let password = buffer.read_string_capped(63);

    debug!(username, "login header parsed");
    HeaderParseOutcome::Parsed(LoginHeader {
        login_type,
        client_seeds,
        username,
        password,
    })
}

/// Derive the server's post-login cipher pair from the client's raw seeds,
/// per the +50 outbound convention.
pub fn ciphers_for(client_seeds: &[u32; 4]) -> IsaacPair {
    IsaacPair::new(client_seeds)
}

/// The sidebar tabs sent during the initial-packets burst right after
/// login, in (interface_id, tab_index) pairs.
pub const SIDEBAR_TABS: &[(u16, u8)] = &[
    (5855, 0),
    (3917, 1),
    (638, 2),
    (3213, 3),
    (1644, 4),
    (5608, 5),
    (1151, 6),
    (5065, 8),
    (5715, 9),
    (2449, 10),
    (904, 11),
    (147, 12),
    (962, 13),
];

/// Default new-character spawn position.
pub fn default_spawn() -> Position {
    Position::new(3222, 3222, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header_bytes(username: &str, password: &str) -> Vec<u8> {
        let mut body = PacketBuffer::new();
        body.write_ubyte(225); // version
        body.write_ubyte(0); // memory flag
        for _ in 0..9 {
            body.write_uint(0); // crc table
        }
        body.write_ubyte(100); // rsa_len
        body.write_ubyte(10); // rsa opcode
        body.write_uint(1);
        body.write_uint(2);
        body.write_uint(3);
        body.write_uint(4);
        body.write_uint(0); // uid
        body.write_string(username);
        body.write_string(password);
        let body = body.into_inner().to_vec();

        let mut buf = PacketBuffer::new();
        buf.write_ubyte(16); // type
        buf.write_ubyte(body.len() as u8); // block_len: bytes following this field
        buf.write_bytes(&body);
        buf.into_inner().to_vec()
    }

    #[test]
    fn s1_login_happy_path_parses_seeds_and_credentials() {
        let bytes = sample_header_bytes("zezima", "hunter2");
        match parse_login_header(&bytes) {
            HeaderParseOutcome::Parsed(header) => {
                assert_eq!(header.client_seeds, [1, 2, 3, 4]);
                assert_eq!(header.username, "zezima");
                assert_eq!(header.password, "hunter2");
            }
            _ => panic!("expected a parsed header"),
        }
    }

    #[test]
    fn cipher_pair_uses_seeds_plus_fifty_outbound() {
        let pair = ciphers_for(&[1, 2, 3, 4]);
        let expected_out = IsaacPair::new(&[1, 2, 3, 4]).encode;
        let mut a = pair.encode;
        let mut b = expected_out;
        assert_eq!(a.next(), b.next());
    }

    #[test]
    fn truncated_header_requests_more_data_not_a_reject() {
        let bytes = sample_header_bytes("zezima", "hunter2");
        let truncated = &bytes[..bytes.len() - 20];
        assert!(matches!(
            parse_login_header(truncated),
            HeaderParseOutcome::NeedMoreData
        ));
    }

    #[test]
    fn block_len_longer_than_available_bytes_requests_more_data() {
        let mut bytes = sample_header_bytes("zezima", "hunter2");
        let declared_len = bytes[1];
        bytes[1] = declared_len + 10; // claim more body bytes than are present
        assert!(matches!(
            parse_login_header(&bytes),
            HeaderParseOutcome::NeedMoreData
        ));
    }

    #[test]
    fn wrong_version_is_a_hard_reject() {
        let mut buf = PacketBuffer::new();
        buf.write_ubyte(16);
        buf.write_ubyte(0);
        buf.write_ubyte(210); // wrong version
        buf.write_ubyte(0);
        for _ in 0..9 {
            buf.write_uint(0);
        }
        buf.write_ubyte(100);
        buf.write_ubyte(10);
        for _ in 0..4 {
            buf.write_uint(0);
        }
        buf.write_uint(0);
        buf.write_string("a");
        buf.write_string("b");

        assert!(matches!(
            parse_login_header(&buf.into_inner().to_vec()),
            HeaderParseOutcome::Reject
        ));
    }
}
