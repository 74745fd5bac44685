//! Message header and payload wire format.
//!
//! ```text
//! byte 0: last     (relay that forwarded this hop; excluded from signatures)
//! byte 1: sender
//! byte 2: destination
//! byte 3: version(2) | signed(1) << 2 | length(5) << 3
//! byte 4: command(3) | request_ack(1) << 3 | ack(1) << 4 | payload_type(3) << 5
//! byte 5: type
//! byte 6: sensor
//! ```
//!
//! The payload buffer is always `MAX_PAYLOAD` bytes. A signed message carries
//! its signature in the bytes after the payload and is transmitted at the full
//! `MAX_MESSAGE_LENGTH`.

extern crate alloc;
use alloc::vec::Vec;

use crate::constants::{
    Command, HEADER_SIZE, InternalType, MAX_MESSAGE_LENGTH, MAX_PAYLOAD, NODE_SENSOR_ID,
    PROTOCOL_VERSION, PayloadType,
};
use crate::error::MessageError;
use crate::types::NodeId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub last: NodeId,
    pub sender: NodeId,
    pub destination: NodeId,
    pub command: Command,
    pub request_ack: bool,
    pub ack: bool,
    pub payload_type: PayloadType,
    pub message_type: u8,
    pub sensor: u8,
    signed: bool,
    length: u8,
    data: [u8; MAX_PAYLOAD],
}

impl Message {
    pub fn new(
        sender: NodeId,
        destination: NodeId,
        command: Command,
        message_type: u8,
        sensor: u8,
    ) -> Self {
        Self {
            last: sender,
            sender,
            destination,
            command,
            request_ack: false,
            ack: false,
            payload_type: PayloadType::String,
            message_type,
            sensor,
            signed: false,
            length: 0,
            data: [0u8; MAX_PAYLOAD],
        }
    }

    /// A node-level internal message.
    pub fn internal(sender: NodeId, destination: NodeId, kind: InternalType) -> Self {
        Self::new(
            sender,
            destination,
            Command::Internal,
            kind as u8,
            NODE_SENSOR_ID,
        )
    }

    pub fn with_payload(mut self, payload: &[u8]) -> Result<Self, MessageError> {
        self.set_payload(payload)?;
        Ok(self)
    }

    /// Single-byte payload (ids, distances, hop counts, flags).
    pub fn with_byte(mut self, value: u8) -> Self {
        self.data = [0u8; MAX_PAYLOAD];
        self.data[0] = value;
        self.length = 1;
        self.payload_type = PayloadType::Byte;
        self
    }

    /// Replace the payload. Clears any trailing signature bytes.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::PayloadTooLarge`] if `payload` exceeds
    /// `MAX_PAYLOAD`; the message is unchanged in that case.
    pub fn set_payload(&mut self, payload: &[u8]) -> Result<(), MessageError> {
        if payload.len() > MAX_PAYLOAD {
            return Err(MessageError::PayloadTooLarge {
                max: MAX_PAYLOAD,
                actual: payload.len(),
            });
        }
        self.data = [0u8; MAX_PAYLOAD];
        self.data[..payload.len()].copy_from_slice(payload);
        self.length = payload.len() as u8;
        Ok(())
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len()]
    }

    /// First payload byte, if any.
    pub fn byte(&self) -> Option<u8> {
        self.payload().first().copied()
    }

    pub fn len(&self) -> usize {
        self.length as usize
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    pub fn set_signed(&mut self, signed: bool) {
        self.signed = signed;
    }

    pub fn internal_type(&self) -> Option<InternalType> {
        if self.command == Command::Internal {
            InternalType::from_u8(self.message_type)
        } else {
            None
        }
    }

    pub fn is_internal(&self, kind: InternalType) -> bool {
        self.internal_type() == Some(kind)
    }

    pub fn header(&self) -> [u8; HEADER_SIZE] {
        let version_length =
            PROTOCOL_VERSION | ((self.signed as u8) << 2) | (self.length << 3);
        let command_ack_payload = (self.command as u8)
            | ((self.request_ack as u8) << 3)
            | ((self.ack as u8) << 4)
            | ((self.payload_type as u8) << 5);
        [
            self.last.get(),
            self.sender.get(),
            self.destination.get(),
            version_length,
            command_ack_payload,
            self.message_type,
            self.sensor,
        ]
    }

    /// Bytes covered by a signature: the header without its first byte,
    /// followed by the payload.
    pub fn signed_region(&self) -> Vec<u8> {
        let mut region = Vec::with_capacity(HEADER_SIZE - 1 + self.len());
        region.extend_from_slice(&self.header()[1..]);
        region.extend_from_slice(self.payload());
        region
    }

    /// Bytes after the payload; holds the signature of a signed message.
    pub fn trailer(&self) -> &[u8] {
        &self.data[self.len()..]
    }

    pub fn trailer_mut(&mut self) -> &mut [u8] {
        let len = self.len();
        &mut self.data[len..]
    }

    /// Number of bytes this message occupies on the wire.
    pub fn wire_len(&self) -> usize {
        if self.signed {
            MAX_MESSAGE_LENGTH
        } else {
            HEADER_SIZE + self.len()
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.wire_len());
        out.extend_from_slice(&self.header());
        out.extend_from_slice(&self.data[..self.wire_len() - HEADER_SIZE]);
        out
    }

    /// Parse a message from received bytes.
    ///
    /// Extra bytes past the declared payload (frame padding) are ignored for
    /// unsigned messages and kept as the trailer for signed ones.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, MessageError> {
        if raw.len() < HEADER_SIZE {
            return Err(MessageError::TooShort {
                min: HEADER_SIZE,
                actual: raw.len(),
            });
        }

        let version_length = raw[3];
        let version = version_length & 0x03;
        if version != PROTOCOL_VERSION {
            return Err(MessageError::UnsupportedVersion(version));
        }
        let signed = (version_length >> 2) & 0x01 != 0;
        let length = version_length >> 3;
        if length as usize > MAX_PAYLOAD {
            return Err(MessageError::InvalidLength(length));
        }
        let needed = HEADER_SIZE + length as usize;
        if raw.len() < needed {
            return Err(MessageError::TooShort {
                min: needed,
                actual: raw.len(),
            });
        }

        let command_ack_payload = raw[4];
        let command = Command::from_u8(command_ack_payload & 0x07)?;

        let mut data = [0u8; MAX_PAYLOAD];
        let end = if signed {
            raw.len().min(MAX_MESSAGE_LENGTH)
        } else {
            needed
        };
        data[..end - HEADER_SIZE].copy_from_slice(&raw[HEADER_SIZE..end]);

        Ok(Message {
            last: NodeId(raw[0]),
            sender: NodeId(raw[1]),
            destination: NodeId(raw[2]),
            command,
            request_ack: (command_ack_payload >> 3) & 0x01 != 0,
            ack: (command_ack_payload >> 4) & 0x01 != 0,
            payload_type: PayloadType::from_bits(command_ack_payload >> 5),
            message_type: raw[5],
            sensor: raw[6],
            signed,
            length,
            data,
        })
    }
}
