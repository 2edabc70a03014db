//! Transport layer for GT-511 sensors
//!
//! The driver only needs a byte pipe it can write frames to, read chunks
//! from and retune to a new line speed. [`StreamTransport`] covers any
//! async byte stream (TCP serial bridges, in-memory pipes) and, with the
//! `serial` feature, [`SerialTransport`] drives a local serial port.

pub mod error;
pub mod stream;

#[cfg(feature = "serial")]
pub mod serial;

pub use error::{Error, Result};
pub use stream::StreamTransport;

#[cfg(feature = "serial")]
pub use serial::SerialTransport;

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;

/// Transport trait for different communication methods
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive whatever bytes arrive next
    ///
    /// Returns [`Error::ReadTimeout`] if nothing arrives within `timeout`.
    async fn receive(&mut self, timeout: Duration) -> Result<BytesMut>;

    /// Current line speed
    fn baud_rate(&self) -> u32;

    /// Reconfigure the line speed
    async fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()>;

    /// Check if the underlying line is usable
    fn is_connected(&self) -> bool;

    /// Human readable endpoint, for logs
    fn describe(&self) -> String;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for &mut T {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        (**self).send(data).await
    }

    async fn receive(&mut self, timeout: Duration) -> Result<BytesMut> {
        (**self).receive(timeout).await
    }

    fn baud_rate(&self) -> u32 {
        (**self).baud_rate()
    }

    async fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        (**self).set_baud_rate(baud_rate).await
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        (**self).send(data).await
    }

    async fn receive(&mut self, timeout: Duration) -> Result<BytesMut> {
        (**self).receive(timeout).await
    }

    fn baud_rate(&self) -> u32 {
        (**self).baud_rate()
    }

    async fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        (**self).set_baud_rate(baud_rate).await
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
