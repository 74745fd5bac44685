//! Newtype wrappers for node addressing and device identity.

use core::fmt;

use crate::constants::{AUTO, BROADCAST_ADDRESS, GATEWAY_ADDRESS, SERIAL_SIZE};

/// Helper to write lowercase hex without the `hex` crate.
fn fmt_hex(bytes: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for byte in bytes {
        write!(f, "{:02x}", byte)?;
    }
    Ok(())
}

/// A node address on the mesh.
///
/// 0 is the gateway, 1..=254 are ordinary nodes, and 255 doubles as the
/// "unassigned" marker ([`NodeId::AUTO`]) and the broadcast address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeId(pub u8);

impl NodeId {
    pub const GATEWAY: NodeId = NodeId(GATEWAY_ADDRESS);
    pub const AUTO: NodeId = NodeId(AUTO);
    pub const BROADCAST: NodeId = NodeId(BROADCAST_ADDRESS);

    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// Whether this is an assigned address (anything but [`NodeId::AUTO`]).
    pub const fn is_assigned(self) -> bool {
        self.0 != AUTO
    }

    pub const fn is_gateway(self) -> bool {
        self.0 == GATEWAY_ADDRESS
    }
}

impl From<u8> for NodeId {
    fn from(id: u8) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == AUTO {
            write!(f, "NodeId(AUTO)")
        } else {
            write!(f, "NodeId({})", self.0)
        }
    }
}

/// A 9-byte coprocessor serial number.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub struct Serial(pub(crate) [u8; SERIAL_SIZE]);

impl Serial {
    pub const fn new(bytes: [u8; SERIAL_SIZE]) -> Self {
        Self(bytes)
    }

    pub const fn to_bytes(self) -> [u8; SERIAL_SIZE] {
        self.0
    }
}

impl AsRef<[u8]> for Serial {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Serial {
    type Error = InvalidLength;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; SERIAL_SIZE] = bytes.try_into().map_err(|_| InvalidLength {
            expected: SERIAL_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Serial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_hex(&self.0, f)
    }
}

impl fmt::Debug for Serial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Serial(")?;
        fmt_hex(&self.0, f)?;
        write!(f, ")")
    }
}

/// Error returned when a byte slice has the wrong length for a newtype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidLength {
    pub expected: usize,
    pub actual: usize,
}

impl fmt::Display for InvalidLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid length: expected {} bytes, got {}",
            self.expected, self.actual
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for InvalidLength {}
