//! Device information returned by `Open` with extra info requested

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};

/// Device information
///
/// Every field is rendered as lowercase hexadecimal, the way the sensor
/// documentation prints them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Firmware version (32-bit value as hex, no padding)
    pub firmware_version: String,

    /// Maximum ISO CD image area size (32-bit value as hex, no padding)
    pub iso_area_max_size: String,

    /// Device serial number (two hex digits per byte)
    pub serial_number: String,
}

impl DeviceInfo {
    /// Fixed part of the payload in front of the serial number
    pub const HEADER_SIZE: usize = 8;

    /// Parse the payload of the device info data frame
    ///
    /// Layout: firmware version (u32 LE), ISO area size (u32 LE), then the
    /// serial number bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use gt511_types::DeviceInfo;
    ///
    /// let payload = [0x18, 0x05, 0x12, 0x20, 0x00, 0x3C, 0x00, 0x00, 0xDE, 0xAD];
    /// let info = DeviceInfo::parse(&payload).unwrap();
    /// assert_eq!(info.firmware_version, "20120518");
    /// assert_eq!(info.iso_area_max_size, "3c00");
    /// assert_eq!(info.serial_number, "dead");
    /// ```
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() < Self::HEADER_SIZE {
            return Err(Error::Parse(format!(
                "device info needs at least {} bytes, got {}",
                Self::HEADER_SIZE,
                payload.len()
            )));
        }

        let firmware = LittleEndian::read_u32(&payload[0..4]);
        let iso_area = LittleEndian::read_u32(&payload[4..8]);

        Ok(Self {
            firmware_version: format!("{:x}", firmware),
            iso_area_max_size: format!("{:x}", iso_area),
            serial_number: hex::encode(&payload[Self::HEADER_SIZE..]),
        })
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Device[SN: {}, FW: {}, ISO area: {}]",
            self.serial_number, self.firmware_version, self.iso_area_max_size
        )
    }
}
