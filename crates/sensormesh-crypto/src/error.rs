use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// A coprocessor transaction failed (no response, bad status, device asleep).
    Unavailable,
    /// The coprocessor configuration zone is not locked.
    NotPersonalized,
    /// An AEAD tag did not verify.
    AuthenticationFailed,
    InvalidLength { reason: &'static str },
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::Unavailable => write!(f, "crypto coprocessor unavailable"),
            CryptoError::NotPersonalized => write!(f, "crypto coprocessor not personalized"),
            CryptoError::AuthenticationFailed => write!(f, "authentication failed"),
            CryptoError::InvalidLength { reason } => write!(f, "invalid length: {reason}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CryptoError {}
