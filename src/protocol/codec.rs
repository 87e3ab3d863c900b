//! Fixed-offset codec for wire values
//!
//! Every multi-byte value in the protocol is big-endian (network byte
//! order). Readers and writers address a field by its byte offset inside
//! the datagram buffer.
//!
//! Callers guarantee the buffer holds at least `offset + width` bytes.
//! An out-of-range access is a programming error and panics through the
//! slice bounds check; it is never a recoverable condition at this layer.

/// Read a big-endian u16 at `offset`
pub fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([buf[offset], buf[offset + 1]])
}

/// Read a big-endian u32 at `offset`
pub fn read_u32(buf: &[u8], offset: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_be_bytes(raw)
}

/// Read a big-endian IEEE-754 double at `offset`
pub fn read_f64(buf: &[u8], offset: usize) -> f64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[offset..offset + 8]);
    f64::from_be_bytes(raw)
}

/// Write a u16 big-endian at `offset`
pub fn write_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
}

/// Write a u32 big-endian at `offset`
pub fn write_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

/// Write an IEEE-754 double big-endian at `offset`
pub fn write_f64(buf: &mut [u8], offset: usize, value: f64) {
    buf[offset..offset + 8].copy_from_slice(&value.to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u16_byte_order() {
        let mut buf = [0u8; 4];
        write_u16(&mut buf, 1, 0x1234);
        assert_eq!(buf, [0x00, 0x12, 0x34, 0x00]);
        assert_eq!(read_u16(&buf, 1), 0x1234);
    }

    #[test]
    fn test_u32_byte_order() {
        let mut buf = [0u8; 6];
        write_u32(&mut buf, 2, 0xDEAD_BEEF);
        assert_eq!(buf, [0x00, 0x00, 0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(read_u32(&buf, 2), 0xDEAD_BEEF);
    }

    #[test]
    fn test_f64_byte_order() {
        // 1.0 is 0x3FF0000000000000, MSB first on the wire
        let mut buf = [0u8; 8];
        write_f64(&mut buf, 0, 1.0);
        assert_eq!(buf, [0x3F, 0xF0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(read_f64(&buf, 0), 1.0);
    }

    #[test]
    fn test_f64_round_trip_bit_exact() {
        let values = [
            0.0,
            -0.0,
            90.0,
            -180.0,
            47.123456789012345,
            f64::MIN_POSITIVE,
            1e300,
        ];
        let mut buf = [0u8; 16];
        for v in values {
            write_f64(&mut buf, 8, v);
            assert_eq!(read_f64(&buf, 8).to_bits(), v.to_bits());
        }
    }

    #[test]
    #[should_panic]
    fn test_short_buffer_panics() {
        let buf = [0u8; 3];
        read_u32(&buf, 0);
    }
}
