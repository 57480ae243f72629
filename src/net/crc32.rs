//! CRC32 (IEEE 802.3, reflected polynomial 0xEDB88320)
//!
//! Map and loc data files are only ever checksummed and chunk-streamed, so
//! this wraps `crc32fast` rather than maintaining a hand-rolled table.

pub fn checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(checksum(&[]), 0);
    }

    #[test]
    fn known_vector() {
        assert_eq!(checksum(b"123456789"), 0xCBF4_3926);
    }
}
