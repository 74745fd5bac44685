//! Sender whitelist: binds a node id to the serial of its coprocessor.

use sensormesh_core::{NodeId, Serial};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WhitelistEntry {
    pub node_id: NodeId,
    pub serial: Serial,
}

/// Ordered whitelist. When enforced, every verified signature must be salted
/// with the sender's enrolled serial and unknown senders are rejected.
#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    entries: Vec<WhitelistEntry>,
    enforced: bool,
}

impl Whitelist {
    /// No whitelisting: signatures are verified unsalted.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn enforced(entries: Vec<WhitelistEntry>) -> Self {
        Self {
            entries,
            enforced: true,
        }
    }

    pub fn is_enforced(&self) -> bool {
        self.enforced
    }

    /// Serial enrolled for `node_id`; the first matching entry wins.
    pub fn lookup(&self, node_id: NodeId) -> Option<&Serial> {
        self.entries
            .iter()
            .find(|e| e.node_id == node_id)
            .map(|e| &e.serial)
    }

    pub fn entries(&self) -> &[WhitelistEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_first_match() {
        let list = Whitelist::enforced(vec![
            WhitelistEntry {
                node_id: NodeId(5),
                serial: Serial::new([1; 9]),
            },
            WhitelistEntry {
                node_id: NodeId(5),
                serial: Serial::new([2; 9]),
            },
        ]);
        assert_eq!(list.lookup(NodeId(5)), Some(&Serial::new([1; 9])));
        assert_eq!(list.lookup(NodeId(6)), None);
        assert!(list.is_enforced());
    }

    #[test]
    fn test_disabled_is_not_enforced() {
        let list = Whitelist::disabled();
        assert!(!list.is_enforced());
        assert!(list.entries().is_empty());
    }
}
