//! Error types for gt511-core



/// Result type alias for gt511-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Frame is too short to be valid
    #[error("Frame too short: expected at least {expected} bytes, got {actual} bytes")]
    PacketTooShort {
        expected: usize,
        actual: usize,
    },

    /// Frame does not have the expected length
    #[error("Frame length mismatch: expected {expected} bytes, got {actual} bytes")]
    LengthMismatch {
        expected: usize,
        actual: usize,
    },

    /// Frame starts with the wrong start code
    #[error("Bad start code: {0:02X?}")]
    BadStartCode([u8; 2]),

    /// Checksum verification failed
    #[error("Checksum mismatch: expected 0x{expected:04X}, received 0x{received:04X}")]
    ChecksumMismatch {
        expected: u16,
        received: u16,
    },

    /// Unknown command opcode
    #[error("Unknown opcode: 0x{0:02X}")]
    UnknownOpcode(u16),
}

impl Error {
    /// Check if the error means the bytes on the wire were damaged
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::ChecksumMismatch { .. }
                | Self::BadStartCode(_)
                | Self::LengthMismatch { .. }
        )
    }
}
