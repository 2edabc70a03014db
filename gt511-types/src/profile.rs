//! Sensor variants and their fixed capabilities

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Supported sensor variants
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DeviceModel {
    GT511C1,
    GT511C1R,
    GT511C3,
    GT511C31,
    GT511C5,
    GT511C51,
}

impl DeviceModel {
    pub const ALL: [DeviceModel; 6] = [
        Self::GT511C1,
        Self::GT511C1R,
        Self::GT511C3,
        Self::GT511C31,
        Self::GT511C5,
        Self::GT511C51,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::GT511C1 => "GT-511C1",
            Self::GT511C1R => "GT-511C1R",
            Self::GT511C3 => "GT-511C3",
            Self::GT511C31 => "GT-511C31",
            Self::GT511C5 => "GT-511C5",
            Self::GT511C51 => "GT-511C51",
        }
    }

    /// Capability table entry for this variant
    pub fn profile(self) -> DeviceProfile {
        match self {
            Self::GT511C1 | Self::GT511C1R => DeviceProfile {
                max_fingerprints: 20,
                image_width: 240,
                image_height: 216,
                raw_image_width: 240,
                raw_image_height: 216,
                template_size: 506,
            },
            Self::GT511C3 | Self::GT511C31 => DeviceProfile {
                max_fingerprints: 200,
                ..DeviceProfile::LARGE_SENSOR
            },
            Self::GT511C5 | Self::GT511C51 => DeviceProfile {
                max_fingerprints: 2000,
                ..DeviceProfile::LARGE_SENSOR
            },
        }
    }
}

impl fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DeviceModel {
    type Err = Error;

    /// Accepts `GT511C3`, `gt-511c3` and similar spellings
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_uppercase)
            .collect();

        Self::ALL
            .into_iter()
            .find(|model| model.name().replace('-', "") == normalized)
            .ok_or_else(|| Error::Parse(format!("unknown device model: {}", s)))
    }
}

/// Fixed capabilities of a sensor variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceProfile {
    /// Number of fingerprint slots (ids `0..max_fingerprints`)
    pub max_fingerprints: u32,
    pub image_width: usize,
    pub image_height: usize,
    pub raw_image_width: usize,
    pub raw_image_height: usize,
    /// Size of one biometric template in bytes
    pub template_size: usize,
}

impl DeviceProfile {
    /// Shared geometry of the C3 and C5 families
    const LARGE_SENSOR: DeviceProfile = DeviceProfile {
        max_fingerprints: 0,
        image_width: 258,
        image_height: 202,
        raw_image_width: 160,
        raw_image_height: 120,
        template_size: 498,
    };

    /// Bytes in a full 8-bit grayscale image
    pub fn image_bytes(&self) -> usize {
        self.image_width * self.image_height
    }

    /// Bytes in a raw (preview) image
    pub fn raw_image_bytes(&self) -> usize {
        self.raw_image_width * self.raw_image_height
    }
}
