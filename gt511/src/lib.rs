//! # gt511
//!
//! Async driver for GT-511Cxx serial fingerprint sensors.
//!
//! ## Features
//!
//! - Packet framing with checksum validation
//! - One command or data exchange in flight at a time
//! - Template and image transfers sized by sensor model
//! - Finger presence polling and a three-capture enrollment workflow
//! - Any byte transport: TCP serial bridges out of the box, local serial
//!   ports with the `serial` feature
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use gt511::{Device, DeviceModel, FingerTarget, StreamTransport};
//!
//! #[tokio::main]
//! async fn main() -> gt511::Result<()> {
//!     let transport = StreamTransport::connect_tcp("192.168.1.50", 4001, Duration::from_secs(5)).await?;
//!     let mut device = Device::new(transport, DeviceModel::GT511C1R);
//!
//!     let info = device.open_with_info().await?;
//!     println!("{}", info);
//!
//!     device.switch_led(true).await?;
//!     device.wait_for_finger(Duration::from_secs(10), FingerTarget::Pressed).await?;
//!     device.capture_finger(false).await?;
//!     println!("Matched id {}", device.identify().await?);
//!     device.switch_led(false).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod device;
pub mod enroll;
pub mod error;

#[cfg(test)]
mod mock;

// Re-exports
pub use channel::Channel;
pub use device::{Device, FingerTarget};
pub use enroll::{EnrollOptions, EnrollState, Enrollment, Notice, Stage, Step};
pub use error::{Error, Result};

// Re-export types
pub use gt511_core::{NackReason, Opcode, PacketFramer};
pub use gt511_transport::{StreamTransport, Transport};
pub use gt511_types::{BaudRate, DeviceInfo, DeviceModel, DeviceProfile};

#[cfg(feature = "serial")]
pub use gt511_transport::SerialTransport;
