//! Type definitions for gt511

pub mod baud;
pub mod device_info;
pub mod error;
pub mod profile;

pub use baud::BaudRate;
pub use device_info::DeviceInfo;
pub use error::{Error, Result};
pub use profile::{DeviceModel, DeviceProfile};
