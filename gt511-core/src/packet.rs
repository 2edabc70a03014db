//! GT-511 frame structures and encoding/decoding

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

use crate::{
    checksum,
    command::{NackReason, Opcode},
    constants::{ACK, DATA_OVERHEAD, DATA_START, DEVICE_ID, FRAME_SIZE, NACK, RESPONSE_START},
    error::{Error, Result},
};

/// Command frame sent from host to sensor
///
/// # Frame Structure
///
/// ```text
/// ┌───────────┬───────────┬───────────┬───────────┬───────────┐
/// │ 55 AA     │ DeviceID  │ Parameter │ Command   │ Checksum  │
/// │ 2 bytes   │ 2 bytes   │ 4 bytes   │ 2 bytes   │ 2 bytes   │
/// │           │ (LE u16)  │ (LE u32)  │ (LE u16)  │ (LE u16)  │
/// └───────────┴───────────┴───────────┴───────────┴───────────┘
/// ```
///
/// # Examples
///
/// ```
/// use gt511_core::{CommandPacket, Opcode};
///
/// let encoded = CommandPacket::new(Opcode::CmosLed, 1).encode();
/// assert_eq!(
///     &encoded[..],
///     &[0x55, 0xAA, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x12, 0x00, 0x13, 0x01]
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandPacket {
    /// Command opcode
    pub opcode: Opcode,

    /// Command parameter (id, flag or baud rate)
    pub param: u32,
}

impl CommandPacket {
    pub fn new(opcode: Opcode, param: u32) -> Self {
        Self { opcode, param }
    }

    /// Encode to the 12 byte wire frame
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(FRAME_SIZE);

        buf.put_slice(&RESPONSE_START);
        buf.put_u16_le(DEVICE_ID);
        buf.put_u32_le(self.param);
        buf.put_u16_le(self.opcode.into());

        let sum = checksum::calculate(&buf);
        buf.put_u16_le(sum);

        buf
    }

    /// Decode a command frame (what a sensor sees)
    pub fn decode(frame: &[u8]) -> Result<Self> {
        check_frame(frame, RESPONSE_START, FRAME_SIZE)?;

        let mut buf = &frame[4..10];
        let param = buf.get_u32_le();
        let opcode = Opcode::try_from(buf.get_u16_le())?;

        Ok(Self { opcode, param })
    }
}

impl fmt::Display for CommandPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command[{}](param={})", self.opcode, self.param)
    }
}

/// Response frame sent from sensor to host
///
/// ```text
/// 55 AA | DeviceID (2) | Parameter (2) | Reserved (2) | Status (2) | Checksum (2)
/// ```
///
/// On ACK the parameter is the command's output, on NACK it is the
/// error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponsePacket {
    pub param: u16,
    pub reserved: u16,
    pub status: u16,
}

impl ResponsePacket {
    /// Successful response
    pub fn ack(param: u16) -> Self {
        Self {
            param,
            reserved: 0,
            status: ACK,
        }
    }

    /// Failed response carrying a reason code
    pub fn nack(reason: NackReason) -> Self {
        Self {
            param: reason.code(),
            reserved: 0,
            status: NACK,
        }
    }

    /// Check if the device acknowledged the command
    ///
    /// Any status word other than ACK counts as a NACK.
    pub fn is_ack(&self) -> bool {
        self.status == ACK
    }

    /// Reason code of a NACK response
    pub fn nack_reason(&self) -> Option<NackReason> {
        (!self.is_ack()).then(|| NackReason::from(self.param))
    }

    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(FRAME_SIZE);

        buf.put_slice(&RESPONSE_START);
        buf.put_u16_le(DEVICE_ID);
        buf.put_u16_le(self.param);
        buf.put_u16_le(self.reserved);
        buf.put_u16_le(self.status);

        let sum = checksum::calculate(&buf);
        buf.put_u16_le(sum);

        buf
    }

    /// Decode a complete 12 byte response frame
    ///
    /// # Errors
    ///
    /// Returns an error if the length, start code or checksum is wrong.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        check_frame(frame, RESPONSE_START, FRAME_SIZE)?;

        let mut buf = &frame[4..10];
        Ok(Self {
            param: buf.get_u16_le(),
            reserved: buf.get_u16_le(),
            status: buf.get_u16_le(),
        })
    }
}

impl fmt::Display for ResponsePacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.nack_reason() {
            None => write!(f, "Response[ACK](param={})", self.param),
            Some(reason) => write!(f, "Response[NACK]({})", reason),
        }
    }
}

/// Data frame carrying a variable length payload in either direction
///
/// ```text
/// 5A A5 | DeviceID (2) | Payload (N) | Checksum (2)
/// ```
///
/// The frame does not describe its own length. A receiver has to know
/// `N + 6` from the command that announced the transfer.
#[derive(Clone, PartialEq, Eq)]
pub struct DataPacket {
    pub payload: Bytes,
}

impl DataPacket {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// Total frame length for a payload of `payload_len` bytes
    pub fn frame_len(payload_len: usize) -> usize {
        payload_len + DATA_OVERHEAD
    }

    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(Self::frame_len(self.payload.len()));

        buf.put_slice(&DATA_START);
        buf.put_u16_le(DEVICE_ID);
        buf.put_slice(&self.payload);

        let sum = checksum::calculate(&buf);
        buf.put_u16_le(sum);

        buf
    }

    /// Decode a complete data frame
    pub fn decode(frame: &[u8]) -> Result<Self> {
        check_frame(frame, DATA_START, DATA_OVERHEAD)?;

        let payload = Bytes::copy_from_slice(&frame[4..frame.len() - 2]);
        Ok(Self { payload })
    }

    /// Decode a frame the caller already owns without copying the payload
    pub fn decode_owned(frame: Bytes) -> Result<Self> {
        check_frame(&frame, DATA_START, DATA_OVERHEAD)?;

        let end = frame.len() - 2;
        Ok(Self {
            payload: frame.slice(4..end),
        })
    }
}

impl fmt::Debug for DataPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataPacket")
            .field("payload_len", &self.payload.len())
            .field("head", &hex::encode(&self.payload[..self.payload.len().min(8)]))
            .finish()
    }
}

/// A validated frame received from the sensor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Response(ResponsePacket),
    Data(DataPacket),
}

impl Packet {
    /// Frame kind, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Response(_) => "response",
            Self::Data(_) => "data",
        }
    }
}

/// Check length, start code and checksum of a frame
///
/// `min_len` is an exact length for fixed size frames and a lower bound
/// for data frames.
fn check_frame(frame: &[u8], start: [u8; 2], min_len: usize) -> Result<()> {
    if frame.len() < min_len {
        return Err(Error::PacketTooShort {
            expected: min_len,
            actual: frame.len(),
        });
    }

    if start == RESPONSE_START && frame.len() != FRAME_SIZE {
        return Err(Error::LengthMismatch {
            expected: FRAME_SIZE,
            actual: frame.len(),
        });
    }

    let head = [frame[0], frame[1]];
    if head != start {
        return Err(Error::BadStartCode(head));
    }

    let body_len = frame.len() - 2;
    let expected = checksum::calculate(&frame[..body_len]);
    let received = u16::from_le_bytes([frame[body_len], frame[body_len + 1]]);
    if expected != received {
        return Err(Error::ChecksumMismatch { expected, received });
    }

    Ok(())
}
