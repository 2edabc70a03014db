//! Scripted in-memory sensor for tests

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};

use gt511_core::{
    constants::{DATA_START, DEFAULT_BAUD_RATE},
    CommandPacket, DataPacket, NackReason, Opcode, ResponsePacket,
};
use gt511_transport::{Error, Result, Transport};

/// A frame the host wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Command(CommandPacket),
    Data(Bytes),
}

/// How the sensor answers a frame
pub enum Reply {
    Ack(u16),
    Nack(NackReason),
    /// ACK followed by a data frame with this payload
    AckWithData(u16, Vec<u8>),
    /// Raw bytes, delivered as separate reads
    Chunks(Vec<Vec<u8>>),
    Silent,
}

type Responder = Box<dyn FnMut(&Incoming) -> Reply + Send + Sync>;

pub struct MockSensor {
    responder: Responder,
    inbound: VecDeque<BytesMut>,
    written: Vec<Incoming>,
    baud_rate: u32,
    fail_writes: bool,
    fail_baud_change: bool,
}

impl MockSensor {
    pub fn new(responder: impl FnMut(&Incoming) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            inbound: VecDeque::new(),
            written: Vec::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            fail_writes: false,
            fail_baud_change: false,
        }
    }

    pub fn set_responder(&mut self, responder: impl FnMut(&Incoming) -> Reply + Send + Sync + 'static) {
        self.responder = Box::new(responder);
    }

    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn fail_baud_change(&mut self, fail: bool) {
        self.fail_baud_change = fail;
    }

    /// Make a reply arrive without being asked for
    pub fn deliver(&mut self, reply: Reply) {
        self.queue(reply);
    }

    /// Commands written so far, in order
    pub fn commands(&self) -> Vec<(Opcode, u32)> {
        self.written
            .iter()
            .filter_map(|incoming| match incoming {
                Incoming::Command(cmd) => Some((cmd.opcode, cmd.param)),
                Incoming::Data(_) => None,
            })
            .collect()
    }

    /// Opcodes written so far, in order
    pub fn opcodes(&self) -> Vec<Opcode> {
        self.commands().into_iter().map(|(op, _)| op).collect()
    }

    /// Payloads of data frames written so far
    pub fn data_frames(&self) -> Vec<Bytes> {
        self.written
            .iter()
            .filter_map(|incoming| match incoming {
                Incoming::Data(payload) => Some(payload.clone()),
                Incoming::Command(_) => None,
            })
            .collect()
    }

    fn queue(&mut self, reply: Reply) {
        match reply {
            Reply::Ack(param) => self.inbound.push_back(ResponsePacket::ack(param).encode()),
            Reply::Nack(reason) => self.inbound.push_back(ResponsePacket::nack(reason).encode()),
            Reply::AckWithData(param, payload) => {
                self.inbound.push_back(ResponsePacket::ack(param).encode());
                self.inbound.push_back(DataPacket::new(payload).encode());
            }
            Reply::Chunks(chunks) => self
                .inbound
                .extend(chunks.into_iter().map(|chunk| BytesMut::from(&chunk[..]))),
            Reply::Silent => {}
        }
    }
}

#[async_trait]
impl Transport for MockSensor {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if self.fail_writes {
            return Err(Error::ConnectionClosed);
        }

        let incoming = if data.starts_with(&DATA_START) {
            let packet = DataPacket::decode(data).map_err(|e| Error::Io(std::io::Error::other(e)))?;
            Incoming::Data(packet.payload)
        } else {
            let packet =
                CommandPacket::decode(data).map_err(|e| Error::Io(std::io::Error::other(e)))?;
            Incoming::Command(packet)
        };

        let reply = (self.responder)(&incoming);
        self.written.push(incoming);
        self.queue(reply);
        Ok(())
    }

    async fn receive(&mut self, timeout: Duration) -> Result<BytesMut> {
        match self.inbound.pop_front() {
            Some(chunk) => Ok(chunk),
            None => {
                tokio::time::sleep(timeout).await;
                Err(Error::ReadTimeout)
            }
        }
    }

    fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    async fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        if self.fail_baud_change {
            return Err(Error::Io(std::io::Error::other("line refused new speed")));
        }
        self.baud_rate = baud_rate;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        "mock sensor".into()
    }
}
