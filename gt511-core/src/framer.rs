//! Byte stream to frame demultiplexer
//!
//! The sensor interleaves two frame kinds on one line: fixed 12 byte
//! responses starting `55 AA` and data frames starting `5A A5` whose length
//! is only known from the command that caused them. The framer accumulates
//! received bytes and slices validated frames off the front.
//!
//! There is no resynchronisation. Bytes that do not start with a known
//! start code stay in the buffer until they do, or until a checksum
//! failure discards everything.

use bytes::{Bytes, BytesMut};
use tracing::{trace, warn};

use crate::{
    checksum,
    constants::{DATA_START, FRAME_SIZE, RESPONSE_START},
    packet::{DataPacket, Packet, ResponsePacket},
};

/// Stateful frame extractor
///
/// # Examples
///
/// ```
/// use gt511_core::{Packet, PacketFramer, ResponsePacket};
///
/// let frame = ResponsePacket::ack(7).encode();
/// let mut framer = PacketFramer::new();
///
/// framer.push(&frame[..5]);
/// assert!(framer.next_packet(None).is_none());
///
/// framer.push(&frame[5..]);
/// assert_eq!(framer.next_packet(None), Some(Packet::Response(ResponsePacket::ack(7))));
/// ```
#[derive(Debug, Default)]
pub struct PacketFramer {
    buffer: BytesMut,
    dropped: u64,
}

impl PacketFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes
    pub fn push(&mut self, bytes: &[u8]) {
        trace!(len = bytes.len(), buffered = self.buffer.len(), "Framer input");
        self.buffer.extend_from_slice(bytes);
    }

    /// Extract the next complete frame, if any
    ///
    /// `data_len` is the total length of the data frame the caller is
    /// waiting for. Data frames are only recognised while it is `Some`.
    ///
    /// A frame whose checksum does not match is dropped together with the
    /// rest of the buffer. No error is returned for it; the caller simply
    /// sees no frame.
    pub fn next_packet(&mut self, data_len: Option<usize>) -> Option<Packet> {
        if self.buffer.len() < 2 {
            return None;
        }

        let head = [self.buffer[0], self.buffer[1]];
        let frame_len = if head == RESPONSE_START {
            FRAME_SIZE
        } else if head == DATA_START {
            data_len?
        } else {
            return None;
        };

        if self.buffer.len() < frame_len {
            return None;
        }

        let frame = self.buffer.split_to(frame_len).freeze();

        if !checksum::verify_frame(&frame) {
            self.discard(&frame);
            return None;
        }

        if head == RESPONSE_START {
            ResponsePacket::decode(&frame).ok().map(Packet::Response)
        } else {
            DataPacket::decode_owned(frame).ok().map(Packet::Data)
        }
    }

    /// Drop everything buffered
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Number of bytes waiting for classification
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Number of frames dropped for a bad checksum
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn discard(&mut self, frame: &Bytes) {
        self.dropped += 1;
        warn!(
            frame_len = frame.len(),
            discarded = self.buffer.len(),
            frame = %hex::encode(&frame[..frame.len().min(16)]),
            "Checksum mismatch, dropping buffered input"
        );
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::NackReason;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_response_in_one_chunk() {
        let mut framer = PacketFramer::new();
        framer.push(&ResponsePacket::ack(1).encode());

        assert_eq!(framer.next_packet(None), Some(Packet::Response(ResponsePacket::ack(1))));
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn test_response_byte_by_byte() {
        let mut framer = PacketFramer::new();
        let frame = ResponsePacket::nack(NackReason::BadFinger).encode();

        for (i, byte) in frame.iter().enumerate() {
            assert!(framer.next_packet(None).is_none(), "frame complete after {} bytes", i);
            framer.push(&[*byte]);
        }

        assert_eq!(
            framer.next_packet(None),
            Some(Packet::Response(ResponsePacket::nack(NackReason::BadFinger)))
        );
    }

    #[test]
    fn test_data_needs_expected_length() {
        let mut framer = PacketFramer::new();
        let frame = DataPacket::new(vec![1, 2, 3, 4]).encode();
        framer.push(&frame);

        assert!(framer.next_packet(None).is_none());
        assert_eq!(framer.buffered(), frame.len());

        assert_eq!(
            framer.next_packet(Some(frame.len())),
            Some(Packet::Data(DataPacket::new(vec![1, 2, 3, 4])))
        );
    }

    #[test]
    fn test_response_followed_by_data() {
        let mut framer = PacketFramer::new();
        let data = DataPacket::new(vec![0x11; 24]).encode();
        framer.push(&ResponsePacket::ack(0).encode());
        framer.push(&data);

        assert_eq!(framer.next_packet(None), Some(Packet::Response(ResponsePacket::ack(0))));
        assert!(framer.next_packet(None).is_none());
        assert!(matches!(framer.next_packet(Some(data.len())), Some(Packet::Data(_))));
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn test_leading_garbage_is_kept() {
        let mut framer = PacketFramer::new();
        framer.push(&[0x00, 0x13]);
        framer.push(&ResponsePacket::ack(0).encode());

        assert!(framer.next_packet(None).is_none());
        assert_eq!(framer.buffered(), 14);
        assert_eq!(framer.dropped(), 0);
    }

    #[test]
    fn test_bad_checksum_clears_buffer() {
        let mut framer = PacketFramer::new();
        let mut bad = ResponsePacket::ack(5).encode();
        bad[4] ^= 0x01;

        framer.push(&bad);
        framer.push(&ResponsePacket::ack(6).encode());

        assert!(framer.next_packet(None).is_none());
        assert_eq!(framer.buffered(), 0);
        assert_eq!(framer.dropped(), 1);

        // Subsequent traffic is unaffected
        framer.push(&ResponsePacket::ack(7).encode());
        assert_eq!(framer.next_packet(None), Some(Packet::Response(ResponsePacket::ack(7))));
    }

    #[test]
    fn test_reset() {
        let mut framer = PacketFramer::new();
        framer.push(&[0x55, 0xAA, 0x01]);
        framer.reset();
        assert_eq!(framer.buffered(), 0);
    }

    proptest! {
        #[test]
        fn prop_data_round_trip(
            payload in proptest::collection::vec(any::<u8>(), 0..600),
            split in any::<prop::sample::Index>(),
        ) {
            let frame = DataPacket::new(payload.clone()).encode();
            let at = split.index(frame.len() + 1);

            let mut framer = PacketFramer::new();
            framer.push(&frame[..at]);
            framer.push(&frame[at..]);

            match framer.next_packet(Some(frame.len())) {
                Some(Packet::Data(data)) => prop_assert_eq!(data.payload.as_ref(), payload.as_slice()),
                other => prop_assert!(false, "unexpected {:?}", other),
            }
        }

        #[test]
        fn prop_corrupt_data_byte_is_dropped(
            payload in proptest::collection::vec(any::<u8>(), 1..64),
            pos in any::<prop::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let mut frame = DataPacket::new(payload).encode();
            // Keep the start code intact so the frame is still recognised
            let at = 2 + pos.index(frame.len() - 2);
            frame[at] ^= flip;

            let mut framer = PacketFramer::new();
            framer.push(&frame);

            prop_assert!(framer.next_packet(Some(frame.len())).is_none());
            prop_assert_eq!(framer.buffered(), 0);
            prop_assert_eq!(framer.dropped(), 1);
        }

        #[test]
        fn prop_corrupt_response_byte_is_dropped(
            param in any::<u16>(),
            pos in 2usize..12,
            flip in 1u8..=255,
        ) {
            let mut frame = ResponsePacket::ack(param).encode();
            frame[pos] ^= flip;

            let mut framer = PacketFramer::new();
            framer.push(&frame);

            prop_assert!(framer.next_packet(None).is_none());
            prop_assert_eq!(framer.buffered(), 0);
        }
    }
}
