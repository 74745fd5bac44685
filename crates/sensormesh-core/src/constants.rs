//! Protocol constants and enumerations for sensormesh messages.

use crate::error::MessageError;

// Message layout
pub const HEADER_SIZE: usize = 7;
pub const MAX_MESSAGE_LENGTH: usize = 32;
pub const MAX_PAYLOAD: usize = MAX_MESSAGE_LENGTH - HEADER_SIZE; // 25
pub const PROTOCOL_VERSION: u8 = 2;

// Addressing
pub const GATEWAY_ADDRESS: u8 = 0;
/// Node id 255 is reserved for automatic id assignment.
pub const AUTO: u8 = 0xFF;
pub const BROADCAST_ADDRESS: u8 = 0xFF;
/// Sensor id used for node-level (internal) messages.
pub const NODE_SENSOR_ID: u8 = 0xFF;
pub const MAX_HOPS: u8 = 254;
pub const DISTANCE_INVALID: u8 = 0xFF;

pub const SERIAL_SIZE: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Presentation = 0,
    Set = 1,
    Req = 2,
    Internal = 3,
    Stream = 4,
}

impl Command {
    pub fn from_u8(v: u8) -> Result<Self, MessageError> {
        match v {
            0 => Ok(Command::Presentation),
            1 => Ok(Command::Set),
            2 => Ok(Command::Req),
            3 => Ok(Command::Internal),
            4 => Ok(Command::Stream),
            _ => Err(MessageError::InvalidCommand(v)),
        }
    }
}

/// Payload encoding tag carried in the header. All 3-bit values are defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PayloadType {
    String = 0,
    Byte = 1,
    Int16 = 2,
    UInt16 = 3,
    Long32 = 4,
    ULong32 = 5,
    Custom = 6,
    Float32 = 7,
}

impl PayloadType {
    pub fn from_bits(v: u8) -> Self {
        match v & 0x07 {
            0 => PayloadType::String,
            1 => PayloadType::Byte,
            2 => PayloadType::Int16,
            3 => PayloadType::UInt16,
            4 => PayloadType::Long32,
            5 => PayloadType::ULong32,
            6 => PayloadType::Custom,
            _ => PayloadType::Float32,
        }
    }
}

/// Internal (node-management) message types used by the transport and
/// signing layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum InternalType {
    IdRequest = 3,
    IdResponse = 4,
    Config = 6,
    FindParentRequest = 7,
    FindParentResponse = 8,
    SigningPresentation = 15,
    NonceRequest = 16,
    NonceResponse = 17,
    Presentation = 19,
    Ping = 24,
    Pong = 25,
    RegistrationRequest = 26,
    RegistrationResponse = 27,
}

impl InternalType {
    /// Map a raw type byte; types this stack does not act on yield `None`.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            3 => Some(InternalType::IdRequest),
            4 => Some(InternalType::IdResponse),
            6 => Some(InternalType::Config),
            7 => Some(InternalType::FindParentRequest),
            8 => Some(InternalType::FindParentResponse),
            15 => Some(InternalType::SigningPresentation),
            16 => Some(InternalType::NonceRequest),
            17 => Some(InternalType::NonceResponse),
            19 => Some(InternalType::Presentation),
            24 => Some(InternalType::Ping),
            25 => Some(InternalType::Pong),
            26 => Some(InternalType::RegistrationRequest),
            27 => Some(InternalType::RegistrationResponse),
            _ => None,
        }
    }
}
