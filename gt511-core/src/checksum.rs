//! GT-511 frame checksum
//!
//! Despite the name used in the datasheet this is not a CRC: it is the
//! plain arithmetic sum of every byte in front of the checksum field,
//! truncated to 16 bits and sent little-endian. Real sensors reject
//! anything else, so it must stay exactly this simple.

use tracing::trace;

/// Calculate the checksum over `bytes`
///
/// # Examples
///
/// ```
/// use gt511_core::checksum;
///
/// // Open command: 55 AA 01 00 00 00 00 00 01 00
/// let sum = checksum::calculate(&[0x55, 0xAA, 0x01, 0x00, 0, 0, 0, 0, 0x01, 0x00]);
/// assert_eq!(sum, 0x0101);
/// ```
pub fn calculate(bytes: &[u8]) -> u16 {
    let checksum = bytes
        .iter()
        .fold(0u16, |sum, &b| sum.wrapping_add(u16::from(b)));

    trace!(
        len = bytes.len(),
        checksum = format!("0x{:04X}", checksum),
        "Calculated checksum"
    );

    checksum
}

/// Verify a complete frame whose last two bytes hold its checksum
///
/// Frames shorter than the checksum field never verify.
pub fn verify_frame(frame: &[u8]) -> bool {
    match frame.len().checked_sub(2) {
        Some(body_len) => {
            let (body, tail) = frame.split_at(body_len);
            calculate(body) == u16::from_le_bytes([tail[0], tail[1]])
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_checksum_empty() {
        assert_eq!(calculate(&[]), 0);
    }

    #[test]
    fn test_checksum_known_frame() {
        // LED on: 55 AA 01 00 01 00 00 00 12 00 -> 0x0113
        let body = [0x55, 0xAA, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x12, 0x00];
        assert_eq!(calculate(&body), 0x0113);
    }

    #[test]
    fn test_checksum_wraps() {
        // 300 * 0xFF = 76500 = 0x12AD4 -> 0x2AD4
        let payload = vec![0xFF; 300];
        assert_eq!(calculate(&payload), 0x2AD4);
    }

    #[test]
    fn test_verify_frame() {
        let mut frame = vec![0x5A, 0xA5, 0x01, 0x00, 0xAB, 0xCD];
        let sum = calculate(&frame);
        frame.extend_from_slice(&sum.to_le_bytes());

        assert!(verify_frame(&frame));

        frame[4] ^= 0x01;
        assert!(!verify_frame(&frame));
    }

    #[test]
    fn test_verify_frame_too_short() {
        assert!(!verify_frame(&[]));
        assert!(!verify_frame(&[0x00]));
        // Two zero bytes: empty body sums to zero
        assert!(verify_frame(&[0x00, 0x00]));
    }

    proptest! {
        #[test]
        fn prop_checksum_is_byte_sum(bytes in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let expected = bytes.iter().map(|&b| u32::from(b)).sum::<u32>() % 65536;
            prop_assert_eq!(u32::from(calculate(&bytes)), expected);
        }
    }
}
