//! # gt511-core
//!
//! Core protocol implementation for GT-511Cxx fingerprint sensors.
//!
//! This crate provides the low-level protocol primitives:
//! - Frame structure and encoding/decoding
//! - Checksum calculation
//! - Command opcodes and NACK reasons
//! - Byte stream framing
//! - Protocol constants

pub mod checksum;
pub mod command;
pub mod constants;
pub mod error;
pub mod framer;
pub mod packet;

pub use command::{NackReason, Opcode};
pub use error::{Error, Result};
pub use framer::PacketFramer;
pub use packet::{CommandPacket, DataPacket, Packet, ResponsePacket};
