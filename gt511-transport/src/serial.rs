//! Serial port transport using the serialport crate
//!
//! `serialport` is blocking, so every port access runs on the blocking
//! thread pool.

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use parking_lot::Mutex;
use serialport::{ClearBuffer, SerialPort};
use tracing::{debug, trace};

use crate::{error::*, Transport};

/// Transport over a local serial port (8N1)
pub struct SerialTransport {
    path: String,
    port: Arc<Mutex<Box<dyn SerialPort>>>,
    baud_rate: u32,
}

impl SerialTransport {
    /// Open `path` at `baud_rate` and drop any stale input
    pub fn open(path: impl Into<String>, baud_rate: u32) -> Result<Self> {
        let path = path.into();

        debug!("Opening {} at {} baud...", path, baud_rate);

        let port = serialport::new(&path, baud_rate)
            .timeout(Duration::from_millis(100))
            .open()?;
        port.clear(ClearBuffer::Input)?;

        Ok(Self {
            path,
            port: Arc::new(Mutex::new(port)),
            baud_rate,
        })
    }

    async fn blocking<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut Box<dyn SerialPort>) -> Result<R> + Send + 'static,
    {
        let port = Arc::clone(&self.port);
        tokio::task::spawn_blocking(move || {
            let mut guard = port.lock();
            f(&mut *guard)
        })
        .await
        .map_err(|e| Error::Io(io::Error::other(e)))?
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        trace!("Sending {} bytes: {}", data.len(), hex::encode(&data[..data.len().min(16)]));

        let data = data.to_vec();
        self.blocking(move |port| {
            port.write_all(&data)?;
            port.flush()?;
            Ok(())
        })
        .await
    }

    async fn receive(&mut self, timeout: Duration) -> Result<BytesMut> {
        let buf = self
            .blocking(move |port| {
                port.set_timeout(timeout)?;

                let mut buf = vec![0u8; 512];
                match port.read(&mut buf) {
                    Ok(0) => Err(Error::ConnectionClosed),
                    Ok(n) => {
                        buf.truncate(n);
                        Ok(buf)
                    }
                    Err(e) if e.kind() == io::ErrorKind::TimedOut => Err(Error::ReadTimeout),
                    Err(e) => Err(Error::Io(e)),
                }
            })
            .await?;

        trace!("Received {} bytes: {}", buf.len(), hex::encode(&buf[..buf.len().min(16)]));

        Ok(BytesMut::from(&buf[..]))
    }

    fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    async fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        debug!("{}: switching to {} baud", self.path, baud_rate);

        self.blocking(move |port| Ok(port.set_baud_rate(baud_rate)?))
            .await?;
        self.baud_rate = baud_rate;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        self.path.clone()
    }
}
