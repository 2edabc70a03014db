//! High-level error types

use gt511_core::{NackReason, Opcode};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] gt511_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] gt511_transport::Error),

    #[error("Type error: {0}")]
    Types(#[from] gt511_types::Error),

    /// The sensor answered with NACK
    #[error("Device rejected {command}: {reason}")]
    Nack {
        command: Opcode,
        reason: NackReason,
    },

    /// Nothing matching arrived in time
    #[error("Timeout waiting for {waiting_for} after {millis}ms")]
    Timeout {
        waiting_for: &'static str,
        millis: u64,
    },

    #[error("Finger is not pressed")]
    FingerNotPressed,

    /// An earlier exchange was abandoned before its reply arrived
    #[error("Exchange for {0} still in flight, recover the channel first")]
    ExchangeInFlight(Opcode),

    #[error("Invalid response from device: {0}")]
    InvalidResponse(String),

    /// A step failed and the compensating action failed too
    #[error("{original} (cleanup failed: {cleanup})")]
    CleanupFailed {
        #[source]
        original: Box<Error>,
        cleanup: Box<Error>,
    },
}

impl Error {
    /// Check if the caller broke a precondition (nothing was sent)
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Types(gt511_types::Error::Validation(_)))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Reason code if the device answered with NACK
    pub fn nack_reason(&self) -> Option<NackReason> {
        match self {
            Self::Nack { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// The error that started it all, looking through cleanup failures
    pub fn primary(&self) -> &Error {
        match self {
            Self::CleanupFailed { original, .. } => original.primary(),
            other => other,
        }
    }
}
