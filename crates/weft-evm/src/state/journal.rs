//! Reversible mutation log

use std::collections::HashSet;

use weft_primitives::{Address, H256, U256};

use super::journaled::StateObject;

/// One reversible state mutation, holding what is needed to undo it
#[derive(Debug, Clone)]
pub(super) enum JournalEntry {
    /// Account did not exist before
    CreateObject { address: Address },
    /// Account existed and was replaced by a fresh one
    ResetObject {
        address: Address,
        prev: Box<StateObject>,
    },
    BalanceChange { address: Address, prev: U256 },
    NonceChange { address: Address, prev: u64 },
    /// `prev` is the slot's previous dirty value, `None` if it was clean
    StorageChange {
        address: Address,
        key: H256,
        prev: Option<H256>,
    },
    CodeChange {
        address: Address,
        prev_code: Option<Vec<u8>>,
        prev_hash: H256,
        prev_dirty: bool,
    },
    Suicide {
        address: Address,
        prev: bool,
        prev_balance: U256,
    },
    RefundChange { prev: u64 },
    AddLog,
}

impl JournalEntry {
    /// Account touched by this entry
    pub(super) fn address(&self) -> Option<&Address> {
        match self {
            JournalEntry::CreateObject { address }
            | JournalEntry::ResetObject { address, .. }
            | JournalEntry::BalanceChange { address, .. }
            | JournalEntry::NonceChange { address, .. }
            | JournalEntry::StorageChange { address, .. }
            | JournalEntry::CodeChange { address, .. }
            | JournalEntry::Suicide { address, .. } => Some(address),
            JournalEntry::RefundChange { .. } | JournalEntry::AddLog => None,
        }
    }
}

/// Append-only list of entries; a snapshot is its length
#[derive(Debug, Default)]
pub(super) struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    pub(super) fn push(&mut self, entry: JournalEntry) {
        self.entries.push(entry);
    }

    pub(super) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Remove and return the entries recorded after `len`, newest first
    pub(super) fn drain_after(&mut self, len: usize) -> Vec<JournalEntry> {
        let start = len.min(self.entries.len());
        let mut tail = self.entries.split_off(start);
        tail.reverse();
        tail
    }

    /// Accounts touched by any surviving entry
    pub(super) fn dirty_addresses(&self) -> HashSet<Address> {
        self.entries
            .iter()
            .filter_map(JournalEntry::address)
            .copied()
            .collect()
    }

    pub(super) fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_after_is_newest_first() {
        let mut journal = Journal::default();
        journal.push(JournalEntry::RefundChange { prev: 1 });
        journal.push(JournalEntry::RefundChange { prev: 2 });
        journal.push(JournalEntry::RefundChange { prev: 3 });

        let drained: Vec<u64> = journal
            .drain_after(1)
            .into_iter()
            .map(|entry| match entry {
                JournalEntry::RefundChange { prev } => prev,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(drained, vec![3, 2]);
        assert_eq!(journal.len(), 1);
    }

    #[test]
    fn test_dirty_addresses_skip_refunds_and_logs() {
        let a = Address::from_bytes([1; 20]);
        let mut journal = Journal::default();
        journal.push(JournalEntry::BalanceChange {
            address: a,
            prev: U256::zero(),
        });
        journal.push(JournalEntry::NonceChange { address: a, prev: 0 });
        journal.push(JournalEntry::AddLog);
        journal.push(JournalEntry::RefundChange { prev: 0 });

        let dirty = journal.dirty_addresses();
        assert_eq!(dirty.len(), 1);
        assert!(dirty.contains(&a));
    }
}
