//! Pure functions for parent selection.

use sensormesh_core::NodeId;
use sensormesh_core::constants::{DISTANCE_INVALID, MAX_HOPS};

/// A node that answered our parent discovery broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentCandidate {
    pub node_id: NodeId,
    /// Hops from this node to the gateway through the candidate.
    pub distance: u8,
    pub rssi: i16,
}

/// Our distance to the gateway through a neighbor that reports
/// `reported` hops. `None` if the neighbor has no route or is too far.
#[must_use]
pub fn distance_through(reported: u8) -> Option<u8> {
    if reported == DISTANCE_INVALID || reported >= MAX_HOPS {
        None
    } else {
        Some(reported + 1)
    }
}

/// Pick the preferred parent: strongest signal, then fewest hops, then
/// lowest node id.
#[must_use]
pub fn select_parent(candidates: &[ParentCandidate]) -> Option<ParentCandidate> {
    candidates.iter().copied().min_by(|a, b| {
        b.rssi
            .cmp(&a.rssi)
            .then(a.distance.cmp(&b.distance))
            .then(a.node_id.cmp(&b.node_id))
    })
}
