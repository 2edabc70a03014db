//! Protocol constants

/// Start code of command and response frames
pub const RESPONSE_START: [u8; 2] = [0x55, 0xAA];

/// Start code of data frames
pub const DATA_START: [u8; 2] = [0x5A, 0xA5];

/// Device id carried by every frame
pub const DEVICE_ID: u16 = 0x0001;

/// Status word of a successful response
pub const ACK: u16 = 0x0030;

/// Status word of a failed response
pub const NACK: u16 = 0x0031;

/// Length of command and response frames
pub const FRAME_SIZE: usize = 12;

/// Bytes a data frame adds around its payload (start code, device id, checksum)
pub const DATA_OVERHEAD: usize = 6;

/// Length of the data frame answering an `Open` with extra info requested
pub const DEVICE_INFO_FRAME_SIZE: usize = 30;

/// Default timeout for a plain command/response exchange (milliseconds)
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 1000;

/// Default timeout for commands the sensor may spend seconds on (milliseconds)
pub const DEFAULT_SLOW_COMMAND_TIMEOUT_MS: u64 = 5000;

/// Default timeout for receiving a data frame (milliseconds)
pub const DEFAULT_DATA_TIMEOUT_MS: u64 = 5000;

/// Default finger presence polling interval (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Line speed sensors power up with
pub const DEFAULT_BAUD_RATE: u32 = 9600;
