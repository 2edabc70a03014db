//! Request/response correlation over one transport
//!
//! The protocol has no transaction ids: a reply is simply the next frame of
//! the right kind. A [`Channel`] therefore allows exactly one exchange at a
//! time. `&mut self` enforces that for live calls; the pending slot below
//! catches the remaining cases, where the sensor still owes a reply the
//! caller stopped waiting for:
//!
//! - the exchange's future was dropped before its reply arrived, or
//! - the exchange timed out.
//!
//! A reply owed by a timed out exchange is collected and discarded when
//! the next exchange starts, if it has arrived by then. Otherwise, and
//! always for dropped exchanges, the channel refuses new work with
//! [`Error::ExchangeInFlight`] until [`Channel::recover`] is called.

mod command;
mod data;

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use gt511_core::{
    constants::{DEFAULT_COMMAND_TIMEOUT_MS, DEFAULT_DATA_TIMEOUT_MS, DEFAULT_SLOW_COMMAND_TIMEOUT_MS},
    Opcode, Packet, PacketFramer,
};
use gt511_transport::{Error as TransportError, Transport};

use crate::error::{Error, Result};

/// What the outstanding exchange is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Awaiting {
    Response,
    Data(usize),
}

impl Awaiting {
    fn data_len(self) -> Option<usize> {
        match self {
            Self::Response => None,
            Self::Data(len) => Some(len),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::Response => "response",
            Self::Data(_) => "data",
        }
    }

    fn matches(self, packet: &Packet) -> bool {
        matches!(
            (self, packet),
            (Self::Response, Packet::Response(_)) | (Self::Data(_), Packet::Data(_))
        )
    }
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    command: Opcode,
    awaiting: Awaiting,
    /// Timed out with the reply still owed
    overdue: bool,
}

/// Command and data channel to one sensor
pub struct Channel<T> {
    transport: T,
    framer: PacketFramer,
    pending: Option<Pending>,
    command_timeout: Duration,
    slow_command_timeout: Duration,
    data_timeout: Duration,
}

impl<T: Transport> Channel<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            framer: PacketFramer::new(),
            pending: None,
            command_timeout: Duration::from_millis(DEFAULT_COMMAND_TIMEOUT_MS),
            slow_command_timeout: Duration::from_millis(DEFAULT_SLOW_COMMAND_TIMEOUT_MS),
            data_timeout: Duration::from_millis(DEFAULT_DATA_TIMEOUT_MS),
        }
    }

    /// Set how long a plain command waits for its response
    pub fn set_command_timeout(&mut self, timeout: Duration) {
        self.command_timeout = timeout;
    }

    /// Set how long matching, capturing, enrolling and erasing commands
    /// wait for their response
    pub fn set_slow_command_timeout(&mut self, timeout: Duration) {
        self.slow_command_timeout = timeout;
    }

    /// Set how long a data transfer waits for its frame
    pub fn set_data_timeout(&mut self, timeout: Duration) {
        self.data_timeout = timeout;
    }

    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    pub fn slow_command_timeout(&self) -> Duration {
        self.slow_command_timeout
    }

    pub fn data_timeout(&self) -> Duration {
        self.data_timeout
    }

    /// Response timeout applied to `command`
    pub fn response_timeout(&self, command: Opcode) -> Duration {
        if command.is_slow() {
            self.slow_command_timeout
        } else {
            self.command_timeout
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    pub fn framer(&self) -> &PacketFramer {
        &self.framer
    }

    /// Check if an unsettled exchange still owes a reply
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Forget an unsettled exchange and everything buffered for it
    ///
    /// A reply that is still travelling will arrive later and be taken for
    /// the reply to the next command; wait a command timeout before
    /// recovering if that matters.
    pub fn recover(&mut self) {
        if let Some(pending) = self.pending.take() {
            warn!(
                command = %pending.command,
                awaiting = ?pending.awaiting,
                discarded = self.framer.buffered(),
                "Abandoning unsettled exchange"
            );
        }
        self.framer.reset();
    }

    /// Claim the single exchange slot
    ///
    /// An overdue reply that has arrived in the meantime is discarded and
    /// frees the slot.
    async fn begin(&mut self, command: Opcode, awaiting: Awaiting) -> Result<()> {
        if let Some(pending) = self.pending {
            if !pending.overdue || !self.collect_overdue(pending).await? {
                return Err(Error::ExchangeInFlight(pending.command));
            }
        }
        self.pending = Some(Pending {
            command,
            awaiting,
            overdue: false,
        });
        Ok(())
    }

    /// Look for the late reply of `pending` in what has already arrived
    async fn collect_overdue(&mut self, pending: Pending) -> Result<bool> {
        loop {
            match self.transport.receive(Duration::ZERO).await {
                Ok(bytes) => self.framer.push(&bytes),
                Err(TransportError::ReadTimeout) => break,
                Err(e) => return Err(e.into()),
            }
        }

        while let Some(packet) = self.framer.next_packet(pending.awaiting.data_len()) {
            if pending.awaiting.matches(&packet) {
                debug!(command = %pending.command, "Discarding late {} frame", packet.kind());
                self.pending = None;
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Release the slot and pass the outcome through
    ///
    /// An exchange that timed out keeps the slot until its reply shows up.
    fn settle<R>(&mut self, result: Result<R>) -> Result<R> {
        if !self.pending.is_some_and(|pending| pending.overdue) {
            self.pending = None;
        }
        result
    }

    /// Read from the transport until a frame of the wanted kind is framed
    ///
    /// Frames of the other kind arriving meanwhile are dropped. If the wait
    /// times out without having seen a corrupt frame, the reply is still
    /// owed and the exchange is marked overdue. A corrupt data frame ends
    /// the data expectation: nothing after it is recognised as data.
    async fn next_packet(&mut self, awaiting: Awaiting, timeout: Duration) -> Result<Packet> {
        let deadline = Instant::now() + timeout;
        let dropped_before = self.framer.dropped();
        let mut data_len = awaiting.data_len();
        let waiting_for = awaiting.describe();

        loop {
            while let Some(packet) = self.framer.next_packet(data_len) {
                if awaiting.matches(&packet) {
                    return Ok(packet);
                }
                debug!("Ignoring unexpected {} frame while waiting for {}", packet.kind(), waiting_for);
            }

            let corrupted = self.framer.dropped() != dropped_before;
            if corrupted && data_len.is_some() {
                debug!("Data frame lost to a checksum mismatch");
                data_len = None;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.timed_out(waiting_for, timeout, corrupted));
            }

            match self.transport.receive(remaining).await {
                Ok(bytes) => self.framer.push(&bytes),
                Err(TransportError::ReadTimeout) => {
                    let corrupted = self.framer.dropped() != dropped_before;
                    return Err(self.timed_out(waiting_for, timeout, corrupted));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn timed_out(&mut self, waiting_for: &'static str, timeout: Duration, corrupted: bool) -> Error {
        if !corrupted {
            if let Some(pending) = self.pending.as_mut() {
                pending.overdue = true;
            }
        }
        Error::Timeout {
            waiting_for,
            millis: timeout.as_millis() as u64,
        }
    }
}
