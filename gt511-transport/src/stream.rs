//! Generic async byte stream transport
//!
//! Works over anything that is `AsyncRead + AsyncWrite`: a TCP connection
//! to a serial-to-network bridge (ser2net, ESP-Link and friends) or an
//! in-memory `tokio::io::duplex` pipe. The bridge owns the physical line,
//! so a baud rate change is only recorded here.

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, trace};

use gt511_core::constants::DEFAULT_BAUD_RATE;

use crate::{error::*, Transport};

/// Transport over an async byte stream
pub struct StreamTransport<S> {
    name: String,
    stream: Option<S>,
    baud_rate: u32,
    read_chunk: usize,
}

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + Sync,
{
    /// Wrap an already connected stream
    pub fn new(stream: S, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stream: Some(stream),
            baud_rate: DEFAULT_BAUD_RATE,
            read_chunk: 1024,
        }
    }

    /// Set the line speed the far end is currently running at
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set how many bytes a single receive may return at most
    pub fn with_read_chunk(mut self, read_chunk: usize) -> Self {
        self.read_chunk = read_chunk.max(1);
        self
    }

    /// Shut the stream down
    pub async fn shutdown(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            debug!("Closing {}...", self.name);

            // Graceful shutdown
            let _ = stream.shutdown().await;
        }
        Ok(())
    }

    /// Give the stream back, if still open
    pub fn into_inner(self) -> Option<S> {
        self.stream
    }
}

impl StreamTransport<TcpStream> {
    /// Connect to a TCP serial bridge
    pub async fn connect_tcp(
        addr: impl Into<String>,
        port: u16,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let addr_str = format!("{}:{}", addr.into(), port);

        let remote = tokio::net::lookup_host(&addr_str)
            .await
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", addr_str, e)))?
            .next()
            .ok_or_else(|| Error::InvalidAddress(format!("No addresses found for {}", addr_str)))?;

        debug!("Connecting to {}...", remote);

        let stream = timeout(connect_timeout, TcpStream::connect(remote))
            .await
            .map_err(|_| Error::ConnectionTimeout)?
            .map_err(Error::Io)?;

        // Frames are tiny, do not let Nagle hold them back
        stream.set_nodelay(true)?;

        debug!("Connected to {}", remote);

        Ok(Self::new(stream, remote.to_string()))
    }
}

#[async_trait]
impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + Sync,
{
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        trace!("Sending {} bytes: {}", data.len(), hex::encode(&data[..data.len().min(16)]));

        stream.write_all(data).await?;
        stream.flush().await?;

        Ok(())
    }

    async fn receive(&mut self, timeout_duration: Duration) -> Result<BytesMut> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        let mut buf = BytesMut::with_capacity(self.read_chunk);

        let n = timeout(timeout_duration, stream.read_buf(&mut buf))
            .await
            .map_err(|_| Error::ReadTimeout)?
            .map_err(Error::Io)?;

        if n == 0 {
            return Err(Error::ConnectionClosed);
        }

        trace!("Received {} bytes: {}", n, hex::encode(&buf[..n.min(16)]));

        Ok(buf)
    }

    fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    async fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        if self.stream.is_none() {
            return Err(Error::NotConnected);
        }

        info!(
            "{}: line speed now {} baud, the bridge must follow",
            self.name, baud_rate
        );
        self.baud_rate = baud_rate;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}
