//! Transport state and the status snapshot exposed to the application.

use core::fmt;

use crate::constants::FAILURE_COUNTER_MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransportState {
    #[default]
    Init,
    ParentSearch,
    IdRequest,
    LinkCheck,
    Register,
    Operational,
    Failure,
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportState::Init => "INIT",
            TransportState::ParentSearch => "PARENT_SEARCH",
            TransportState::IdRequest => "ID_REQUEST",
            TransportState::LinkCheck => "LINK_CHECK",
            TransportState::Register => "REGISTER",
            TransportState::Operational => "OPERATIONAL",
            TransportState::Failure => "FAILURE",
        };
        f.write_str(name)
    }
}

/// Snapshot of the transport, mutated only by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransportStatus {
    pub state: TransportState,
    /// Set once the gateway acknowledged our registration.
    pub node_registered: bool,
    pub finding_parent: bool,
    pub preferred_parent_found: bool,
    pub ping_active: bool,
    pub pong_received: bool,
    /// Saturates at [`FAILURE_COUNTER_MAX`].
    pub failed_downlink_transmissions: u8,
    /// Saturates at [`FAILURE_COUNTER_MAX`].
    pub failed_uplink_transmissions: u8,
    /// Incremented on every send and receive; wraps.
    pub heartbeat: u32,
}

/// Increment a failure counter, holding at [`FAILURE_COUNTER_MAX`].
pub fn saturating_increment(counter: &mut u8) {
    if *counter < FAILURE_COUNTER_MAX {
        *counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saturating_increment_holds_at_max() {
        let mut counter = 0u8;
        for _ in 0..40 {
            saturating_increment(&mut counter);
        }
        assert_eq!(counter, FAILURE_COUNTER_MAX);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(TransportState::ParentSearch.to_string(), "PARENT_SEARCH");
        assert_eq!(TransportState::Operational.to_string(), "OPERATIONAL");
    }

    #[test]
    fn test_default_status() {
        let status = TransportStatus::default();
        assert_eq!(status.state, TransportState::Init);
        assert!(!status.node_registered);
        assert_eq!(status.heartbeat, 0);
    }
}
