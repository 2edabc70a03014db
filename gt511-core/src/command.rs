//! GT-511 command opcodes and NACK reason codes

use std::fmt;

use crate::error::{Error, Result};

/// Command opcodes
///
/// The subset of the GT-511Cxx command set this driver speaks. Firmware and
/// ISO CD image upgrades are deliberately absent.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Opcode {
    // Session
    Open = 0x01,
    Close = 0x02,
    ChangeBaudrate = 0x04,
    CmosLed = 0x12,

    // Enrollment
    GetEnrollCount = 0x20,
    CheckEnrolled = 0x21,
    EnrollStart = 0x22,
    Enroll1 = 0x23,
    Enroll2 = 0x24,
    Enroll3 = 0x25,
    IsPressFinger = 0x26,

    // Database
    DeleteId = 0x40,
    DeleteAll = 0x41,

    // Matching
    Verify = 0x50,
    Identify = 0x51,
    VerifyTemplate = 0x52,
    IdentifyTemplate = 0x53,

    // Capture
    CaptureFinger = 0x60,
    MakeTemplate = 0x61,
    GetImage = 0x62,
    GetRawImage = 0x63,

    // Template transfer
    GetTemplate = 0x70,
    SetTemplate = 0x71,
}

impl Opcode {
    /// Datasheet name of the command
    pub fn name(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Close => "Close",
            Self::ChangeBaudrate => "ChangeBaudrate",
            Self::CmosLed => "CmosLed",
            Self::GetEnrollCount => "GetEnrollCount",
            Self::CheckEnrolled => "CheckEnrolled",
            Self::EnrollStart => "EnrollStart",
            Self::Enroll1 => "Enroll1",
            Self::Enroll2 => "Enroll2",
            Self::Enroll3 => "Enroll3",
            Self::IsPressFinger => "IsPressFinger",
            Self::DeleteId => "DeleteID",
            Self::DeleteAll => "DeleteAll",
            Self::Verify => "Verify",
            Self::Identify => "Identify",
            Self::VerifyTemplate => "VerifyTemplate",
            Self::IdentifyTemplate => "IdentifyTemplate",
            Self::CaptureFinger => "CaptureFinger",
            Self::MakeTemplate => "MakeTemplate",
            Self::GetImage => "GetImage",
            Self::GetRawImage => "GetRawImage",
            Self::GetTemplate => "GetTemplate",
            Self::SetTemplate => "SetTemplate",
        }
    }

    /// Check if the sensor may take seconds to answer
    ///
    /// Matching scans the whole template database, capturing waits for a
    /// usable image and erasing rewrites flash.
    pub fn is_slow(self) -> bool {
        matches!(
            self,
            Self::Enroll1
                | Self::Enroll2
                | Self::Enroll3
                | Self::DeleteAll
                | Self::Verify
                | Self::Identify
                | Self::VerifyTemplate
                | Self::IdentifyTemplate
                | Self::CaptureFinger
        )
    }
}

impl From<Opcode> for u16 {
    fn from(op: Opcode) -> u16 {
        op as u16
    }
}

impl TryFrom<u16> for Opcode {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            0x01 => Ok(Self::Open),
            0x02 => Ok(Self::Close),
            0x04 => Ok(Self::ChangeBaudrate),
            0x12 => Ok(Self::CmosLed),
            0x20 => Ok(Self::GetEnrollCount),
            0x21 => Ok(Self::CheckEnrolled),
            0x22 => Ok(Self::EnrollStart),
            0x23 => Ok(Self::Enroll1),
            0x24 => Ok(Self::Enroll2),
            0x25 => Ok(Self::Enroll3),
            0x26 => Ok(Self::IsPressFinger),
            0x40 => Ok(Self::DeleteId),
            0x41 => Ok(Self::DeleteAll),
            0x50 => Ok(Self::Verify),
            0x51 => Ok(Self::Identify),
            0x52 => Ok(Self::VerifyTemplate),
            0x53 => Ok(Self::IdentifyTemplate),
            0x60 => Ok(Self::CaptureFinger),
            0x61 => Ok(Self::MakeTemplate),
            0x62 => Ok(Self::GetImage),
            0x63 => Ok(Self::GetRawImage),
            0x70 => Ok(Self::GetTemplate),
            0x71 => Ok(Self::SetTemplate),
            _ => Err(Error::UnknownOpcode(value)),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), *self as u16)
    }
}

/// Reason code carried in the parameter of a NACK response
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NackReason {
    Timeout,
    InvalidBaudrate,
    InvalidPosition,
    IdNotUsed,
    IdAlreadyUsed,
    CommunicationError,
    VerifyFailed,
    IdentifyFailed,
    DatabaseFull,
    DatabaseEmpty,
    TurnError,
    BadFinger,
    EnrollFailed,
    NotSupported,
    DeviceError,
    CaptureCancelled,
    InvalidParameter,
    FingerNotPressed,
    /// Code outside the documented table
    Unknown(u16),
}

impl NackReason {
    /// Numeric code as sent by the device
    pub fn code(self) -> u16 {
        match self {
            Self::Timeout => 0x1001,
            Self::InvalidBaudrate => 0x1002,
            Self::InvalidPosition => 0x1003,
            Self::IdNotUsed => 0x1004,
            Self::IdAlreadyUsed => 0x1005,
            Self::CommunicationError => 0x1006,
            Self::VerifyFailed => 0x1007,
            Self::IdentifyFailed => 0x1008,
            Self::DatabaseFull => 0x1009,
            Self::DatabaseEmpty => 0x100A,
            Self::TurnError => 0x100B,
            Self::BadFinger => 0x100C,
            Self::EnrollFailed => 0x100D,
            Self::NotSupported => 0x100E,
            Self::DeviceError => 0x100F,
            Self::CaptureCancelled => 0x1010,
            Self::InvalidParameter => 0x1011,
            Self::FingerNotPressed => 0x1012,
            Self::Unknown(code) => code,
        }
    }

    /// Human readable description
    pub fn description(self) -> &'static str {
        match self {
            Self::Timeout => "capture timeout",
            Self::InvalidBaudrate => "invalid baud rate",
            Self::InvalidPosition => "invalid position",
            Self::IdNotUsed => "id is not used",
            Self::IdAlreadyUsed => "id is already used",
            Self::CommunicationError => "communication error",
            Self::VerifyFailed => "verification failed",
            Self::IdentifyFailed => "identification failed",
            Self::DatabaseFull => "database is full",
            Self::DatabaseEmpty => "database is empty",
            Self::TurnError => "enrollment out of order",
            Self::BadFinger => "bad finger",
            Self::EnrollFailed => "enrollment failed",
            Self::NotSupported => "command not supported",
            Self::DeviceError => "device error",
            Self::CaptureCancelled => "capture cancelled",
            Self::InvalidParameter => "invalid parameter",
            Self::FingerNotPressed => "finger is not pressed",
            Self::Unknown(_) => "unknown error",
        }
    }
}

impl From<u16> for NackReason {
    fn from(code: u16) -> Self {
        match code {
            0x1001 => Self::Timeout,
            0x1002 => Self::InvalidBaudrate,
            0x1003 => Self::InvalidPosition,
            0x1004 => Self::IdNotUsed,
            0x1005 => Self::IdAlreadyUsed,
            0x1006 => Self::CommunicationError,
            0x1007 => Self::VerifyFailed,
            0x1008 => Self::IdentifyFailed,
            0x1009 => Self::DatabaseFull,
            0x100A => Self::DatabaseEmpty,
            0x100B => Self::TurnError,
            0x100C => Self::BadFinger,
            0x100D => Self::EnrollFailed,
            0x100E => Self::NotSupported,
            0x100F => Self::DeviceError,
            0x1010 => Self::CaptureCancelled,
            0x1011 => Self::InvalidParameter,
            0x1012 => Self::FingerNotPressed,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for NackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:04X})", self.description(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_conversion() {
        assert_eq!(u16::from(Opcode::CmosLed), 0x12);
        assert_eq!(Opcode::try_from(0x70).unwrap(), Opcode::GetTemplate);
    }

    #[test]
    fn test_opcode_round_trips_every_variant() {
        for raw in 0u16..=0xFF {
            if let Ok(op) = Opcode::try_from(raw) {
                assert_eq!(u16::from(op), raw);
            }
        }
    }

    #[test]
    fn test_slow_commands() {
        assert!(Opcode::Identify.is_slow());
        assert!(Opcode::CaptureFinger.is_slow());
        assert!(Opcode::DeleteAll.is_slow());
        assert!(!Opcode::IsPressFinger.is_slow());
        assert!(!Opcode::CmosLed.is_slow());
        assert!(!Opcode::Open.is_slow());
    }

    #[test]
    fn test_unknown_opcode() {
        assert!(matches!(Opcode::try_from(0x80), Err(Error::UnknownOpcode(0x80))));
    }

    #[test]
    fn test_opcode_display() {
        assert_eq!(Opcode::IsPressFinger.to_string(), "IsPressFinger(0x26)");
    }

    #[test]
    fn test_nack_reason_codes() {
        assert_eq!(NackReason::from(0x1008), NackReason::IdentifyFailed);
        assert_eq!(NackReason::from(0x1012), NackReason::FingerNotPressed);
        assert_eq!(NackReason::EnrollFailed.code(), 0x100D);
    }

    #[test]
    fn test_nack_reason_unknown_keeps_code() {
        let reason = NackReason::from(0x2000);
        assert_eq!(reason, NackReason::Unknown(0x2000));
        assert_eq!(reason.code(), 0x2000);
    }
}
