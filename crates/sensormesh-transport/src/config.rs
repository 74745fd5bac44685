//! Transport state machine configuration.

use sensormesh_core::NodeId;

use crate::constants::{
    PARENT_SEARCH_WINDOW_MS, STATE_RETRIES, STATE_TIMEOUT_MS, TIMEOUT_FAILURE_STATE,
    TRANSMISSION_FAILURES,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Configured node id; [`NodeId::AUTO`] requests one from the gateway.
    pub address: NodeId,
    /// Skip discovery and use this parent.
    pub fixed_parent: Option<NodeId>,
    /// Drop unsigned application messages addressed to this node.
    pub require_signatures: bool,
    pub state_timeout_ms: u32,
    /// Request attempts per state; the last timeout enters `FAILURE`.
    pub state_retries: u8,
    pub failure_backoff_ms: u32,
    pub transmission_failure_threshold: u8,
    pub parent_search_window_ms: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            address: NodeId::AUTO,
            fixed_parent: None,
            require_signatures: false,
            state_timeout_ms: STATE_TIMEOUT_MS,
            state_retries: STATE_RETRIES,
            failure_backoff_ms: TIMEOUT_FAILURE_STATE,
            transmission_failure_threshold: TRANSMISSION_FAILURES,
            parent_search_window_ms: PARENT_SEARCH_WINDOW_MS,
        }
    }
}
