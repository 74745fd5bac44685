//! Error types for the sensormesh-core crate.

use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    TooShort { min: usize, actual: usize },
    UnsupportedVersion(u8),
    InvalidCommand(u8),
    /// Header length field claims more payload than a message can carry.
    InvalidLength(u8),
    PayloadTooLarge { max: usize, actual: usize },
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageError::TooShort { min, actual } => {
                write!(
                    f,
                    "message too short: need at least {min} bytes, got {actual}"
                )
            }
            MessageError::UnsupportedVersion(v) => write!(f, "unsupported protocol version: {v}"),
            MessageError::InvalidCommand(v) => write!(f, "invalid command: {v}"),
            MessageError::InvalidLength(v) => write!(f, "invalid payload length field: {v}"),
            MessageError::PayloadTooLarge { max, actual } => {
                write!(f, "payload too large: at most {max} bytes, got {actual}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for MessageError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_error_display_all_variants() {
        let variants = [
            MessageError::TooShort { min: 7, actual: 3 },
            MessageError::UnsupportedVersion(1),
            MessageError::InvalidCommand(6),
            MessageError::InvalidLength(31),
            MessageError::PayloadTooLarge {
                max: 25,
                actual: 26,
            },
        ];
        for variant in &variants {
            assert!(!variant.to_string().is_empty(), "{variant:?}");
        }
    }

    #[test]
    fn test_too_short_display() {
        assert_eq!(
            MessageError::TooShort { min: 7, actual: 3 }.to_string(),
            "message too short: need at least 7 bytes, got 3"
        );
    }
}
