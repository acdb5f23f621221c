//! Journaled implementation of [`StateAccess`]

use std::collections::HashMap;

use tracing::{debug, warn};
use weft_crypto::{keccak256, EMPTY_CODE_HASH};
use weft_primitives::{Address, H256, U256};
use weft_storage::{Account, StateCache, StateStore, StateWriter, StorageError};

use super::journal::{Journal, JournalEntry};
use super::{StateAccess, StateError};
use crate::log::{encode_logs, Log};

/// In-memory view of one account for the current transaction
#[derive(Debug, Clone, Default)]
pub(crate) struct StateObject {
    account: Account,
    /// Loaded lazily; `None` until first needed
    code: Option<Vec<u8>>,
    /// Slots read from or committed to the backing store
    origin_storage: HashMap<H256, H256>,
    /// Slots written during this transaction
    dirty_storage: HashMap<H256, H256>,
    dirty_code: bool,
    /// Persisted storage does not apply (fresh or recreated account)
    storage_cleared: bool,
    suicided: bool,
}

impl StateObject {
    fn fresh() -> Self {
        Self {
            storage_cleared: true,
            ..Self::default()
        }
    }
}

/// Account state with a mutation journal over a [`StateStore`] backend
pub struct JournaledState<B> {
    backend: B,
    objects: HashMap<Address, StateObject>,
    journal: Journal,
    refund: u64,
    logs: Vec<Log>,
    tx_hash: H256,
    block_number: u64,
    /// First backing-store error met while executing
    db_err: Option<StorageError>,
    finalised: bool,
}

impl<B: StateStore> JournaledState<B> {
    /// Create a state over `backend`
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            objects: HashMap::new(),
            journal: Journal::default(),
            refund: 0,
            logs: Vec::new(),
            tx_hash: H256::ZERO,
            block_number: 0,
            db_err: None,
            finalised: false,
        }
    }

    /// Backing store
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Give back the backing store
    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Whether a backing-store read has failed
    pub fn has_db_error(&self) -> bool {
        self.db_err.is_some()
    }

    fn record_err(&mut self, err: StorageError) {
        warn!(error = %err, "state read failed");
        if self.db_err.is_none() {
            self.db_err = Some(err);
        }
    }

    /// Load an account into the object cache if the store has it
    fn load(&mut self, address: &Address) -> bool {
        if self.objects.contains_key(address) {
            return true;
        }
        match self.backend.get_account(address) {
            Ok(Some(account)) => {
                self.objects.insert(
                    *address,
                    StateObject {
                        account,
                        ..StateObject::default()
                    },
                );
                true
            }
            Ok(None) => false,
            Err(err) => {
                self.record_err(err);
                false
            }
        }
    }

    fn object(&mut self, address: &Address) -> Option<&StateObject> {
        if self.load(address) {
            self.objects.get(address)
        } else {
            None
        }
    }

    /// Existing object, or a journaled fresh one
    fn object_mut(&mut self, address: &Address) -> &mut StateObject {
        if !self.load(address) {
            self.journal
                .push(JournalEntry::CreateObject { address: *address });
        }
        self.objects.entry(*address).or_insert_with(StateObject::fresh)
    }

    fn load_code(&mut self, address: &Address) -> Option<Vec<u8>> {
        let code_hash = {
            let object = self.object(address)?;
            if let Some(code) = &object.code {
                return Some(code.clone());
            }
            object.account.code_hash
        };
        if code_hash == EMPTY_CODE_HASH {
            return Some(Vec::new());
        }
        let code = match self.backend.get_code(&code_hash) {
            Ok(code) => code.unwrap_or_default(),
            Err(err) => {
                self.record_err(err);
                return Some(Vec::new());
            }
        };
        if let Some(object) = self.objects.get_mut(address) {
            object.code = Some(code.clone());
        }
        Some(code)
    }

    fn set_balance(&mut self, address: &Address, balance: U256) {
        let object = self.object_mut(address);
        let prev = object.account.balance;
        object.account.balance = balance;
        self.journal.push(JournalEntry::BalanceChange {
            address: *address,
            prev,
        });
    }

    fn set_refund(&mut self, refund: u64) {
        self.journal
            .push(JournalEntry::RefundChange { prev: self.refund });
        self.refund = refund;
    }

    fn undo(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::CreateObject { address } => {
                self.objects.remove(&address);
            }
            JournalEntry::ResetObject { address, prev } => {
                self.objects.insert(address, *prev);
            }
            JournalEntry::BalanceChange { address, prev } => {
                if let Some(object) = self.objects.get_mut(&address) {
                    object.account.balance = prev;
                }
            }
            JournalEntry::NonceChange { address, prev } => {
                if let Some(object) = self.objects.get_mut(&address) {
                    object.account.nonce = prev;
                }
            }
            JournalEntry::StorageChange { address, key, prev } => {
                if let Some(object) = self.objects.get_mut(&address) {
                    match prev {
                        Some(value) => object.dirty_storage.insert(key, value),
                        None => object.dirty_storage.remove(&key),
                    };
                }
            }
            JournalEntry::CodeChange {
                address,
                prev_code,
                prev_hash,
                prev_dirty,
            } => {
                if let Some(object) = self.objects.get_mut(&address) {
                    object.code = prev_code;
                    object.account.code_hash = prev_hash;
                    object.dirty_code = prev_dirty;
                }
            }
            JournalEntry::Suicide {
                address,
                prev,
                prev_balance,
            } => {
                if let Some(object) = self.objects.get_mut(&address) {
                    object.suicided = prev;
                    object.account.balance = prev_balance;
                }
            }
            JournalEntry::RefundChange { prev } => self.refund = prev,
            JournalEntry::AddLog => {
                self.logs.pop();
            }
        }
    }

    /// Stage the dirty part of the transaction into a change set
    fn collect_changes(&mut self, delete_empty_objects: bool) -> StateCache {
        let mut changes = StateCache::new();
        for address in self.journal.dirty_addresses() {
            let Some(object) = self.objects.get_mut(&address) else {
                continue;
            };
            if object.suicided || (delete_empty_objects && object.account.is_empty()) {
                changes.delete_account(&address);
                changes.clear_storage(&address);
                self.objects.remove(&address);
                continue;
            }
            if object.storage_cleared {
                changes.clear_storage(&address);
                object.storage_cleared = false;
                object.origin_storage.clear();
            }
            if object.dirty_code {
                if let Some(code) = &object.code {
                    changes.set_code(object.account.code_hash, code.clone());
                }
                object.dirty_code = false;
            }
            for (key, value) in object.dirty_storage.drain() {
                changes.set_storage(address, key, value);
                object.origin_storage.insert(key, value);
            }
            changes.set_account(address, object.account.clone());
        }
        if !self.logs.is_empty() {
            changes.set_logs(self.tx_hash, encode_logs(&self.logs));
        }
        changes
    }
}

impl<B: StateStore> StateAccess for JournaledState<B> {
    fn create_account(&mut self, address: &Address) {
        let prev = if self.load(address) {
            self.objects.remove(address)
        } else {
            None
        };
        let mut object = StateObject::fresh();
        match prev {
            Some(prev) => {
                object.account.balance = prev.account.balance;
                self.journal.push(JournalEntry::ResetObject {
                    address: *address,
                    prev: Box::new(prev),
                });
            }
            None => self
                .journal
                .push(JournalEntry::CreateObject { address: *address }),
        }
        self.objects.insert(*address, object);
    }

    fn exist(&mut self, address: &Address) -> bool {
        self.load(address)
    }

    fn empty(&mut self, address: &Address) -> bool {
        self.object(address)
            .map_or(true, |object| object.account.is_empty())
    }

    fn get_balance(&mut self, address: &Address) -> U256 {
        self.object(address)
            .map_or_else(U256::zero, |object| object.account.balance)
    }

    fn add_balance(&mut self, address: &Address, amount: U256) {
        let balance = self.get_balance(address).saturating_add(amount);
        self.set_balance(address, balance);
    }

    fn sub_balance(&mut self, address: &Address, amount: U256) {
        let balance = self.get_balance(address).saturating_sub(amount);
        self.set_balance(address, balance);
    }

    fn get_nonce(&mut self, address: &Address) -> u64 {
        self.object(address).map_or(0, |object| object.account.nonce)
    }

    fn set_nonce(&mut self, address: &Address, nonce: u64) {
        let object = self.object_mut(address);
        let prev = object.account.nonce;
        object.account.nonce = nonce;
        self.journal.push(JournalEntry::NonceChange {
            address: *address,
            prev,
        });
    }

    fn get_code(&mut self, address: &Address) -> Vec<u8> {
        self.load_code(address).unwrap_or_default()
    }

    fn get_code_hash(&mut self, address: &Address) -> H256 {
        self.object(address)
            .map_or(H256::ZERO, |object| object.account.code_hash)
    }

    fn set_code(&mut self, address: &Address, code: Vec<u8>) {
        let prev_code = self.load_code(address);
        let object = self.object_mut(address);
        let entry = JournalEntry::CodeChange {
            address: *address,
            prev_code,
            prev_hash: object.account.code_hash,
            prev_dirty: object.dirty_code,
        };
        object.account.code_hash = if code.is_empty() {
            EMPTY_CODE_HASH
        } else {
            keccak256(&code)
        };
        object.code = Some(code);
        object.dirty_code = true;
        self.journal.push(entry);
    }

    fn get_state(&mut self, address: &Address, key: &H256) -> H256 {
        let Some(object) = self.object(address) else {
            return H256::ZERO;
        };
        if let Some(value) = object.dirty_storage.get(key) {
            return *value;
        }
        if object.storage_cleared {
            return H256::ZERO;
        }
        if let Some(value) = object.origin_storage.get(key) {
            return *value;
        }
        let value = match self.backend.get_storage(address, key) {
            Ok(value) => value,
            Err(err) => {
                self.record_err(err);
                return H256::ZERO;
            }
        };
        if let Some(object) = self.objects.get_mut(address) {
            object.origin_storage.insert(*key, value);
        }
        value
    }

    fn set_state(&mut self, address: &Address, key: H256, value: H256) {
        let object = self.object_mut(address);
        let prev = object.dirty_storage.insert(key, value);
        self.journal.push(JournalEntry::StorageChange {
            address: *address,
            key,
            prev,
        });
    }

    fn suicide(&mut self, address: &Address) -> bool {
        if !self.load(address) {
            return false;
        }
        let Some(object) = self.objects.get_mut(address) else {
            return false;
        };
        self.journal.push(JournalEntry::Suicide {
            address: *address,
            prev: object.suicided,
            prev_balance: object.account.balance,
        });
        object.suicided = true;
        object.account.balance = U256::zero();
        true
    }

    fn has_suicided(&mut self, address: &Address) -> bool {
        self.object(address).is_some_and(|object| object.suicided)
    }

    fn add_refund(&mut self, gas: u64) {
        self.set_refund(self.refund.saturating_add(gas));
    }

    fn sub_refund(&mut self, gas: u64) {
        self.set_refund(self.refund.saturating_sub(gas));
    }

    fn get_refund(&self) -> u64 {
        self.refund
    }

    fn add_log(&mut self, log: Log) {
        self.journal.push(JournalEntry::AddLog);
        self.logs.push(log);
    }

    fn logs(&self) -> &[Log] {
        &self.logs
    }

    fn prepare(&mut self, tx_hash: H256, block_number: u64) {
        self.tx_hash = tx_hash;
        self.block_number = block_number;
    }

    fn snapshot(&mut self) -> usize {
        self.journal.len()
    }

    fn revert_to_snapshot(&mut self, snapshot: usize) {
        for entry in self.journal.drain_after(snapshot) {
            self.undo(entry);
        }
    }

    fn finalise(&mut self, delete_empty_objects: bool) -> Result<(), StateError> {
        assert!(!self.finalised, "state finalised twice");
        self.finalised = true;

        if let Some(err) = self.db_err.take() {
            return Err(err.into());
        }
        let changes = self.collect_changes(delete_empty_objects);
        let accounts = changes.account_count();
        self.backend.commit(changes)?;
        self.journal.clear();
        self.refund = 0;

        debug!(
            tx_hash = %self.tx_hash,
            block = self.block_number,
            accounts,
            logs = self.logs.len(),
            "state finalised"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_storage::StateReader;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    fn slot(byte: u8) -> H256 {
        H256::from_bytes([byte; 32])
    }

    fn state() -> JournaledState<StateCache> {
        JournaledState::new(StateCache::new())
    }

    #[test]
    fn test_missing_account_reads_zero() {
        let mut state = state();
        assert!(!state.exist(&addr(1)));
        assert!(state.empty(&addr(1)));
        assert_eq!(state.get_balance(&addr(1)), U256::zero());
        assert_eq!(state.get_code_hash(&addr(1)), H256::ZERO);
        assert_eq!(state.get_state(&addr(1), &slot(1)), H256::ZERO);
    }

    #[test]
    fn test_revert_restores_everything() {
        let mut state = state();
        let a = addr(1);
        state.add_balance(&a, U256::from(100u64));
        state.set_state(&a, slot(1), slot(2));

        let snap = state.snapshot();
        state.add_balance(&a, U256::from(50u64));
        state.set_nonce(&a, 7);
        state.set_state(&a, slot(1), slot(3));
        state.set_code(&a, vec![0x60, 0x00]);
        state.add_refund(15000);
        state.add_log(Log::default());
        state.revert_to_snapshot(snap);

        assert_eq!(state.get_balance(&a), U256::from(100u64));
        assert_eq!(state.get_nonce(&a), 0);
        assert_eq!(state.get_state(&a, &slot(1)), slot(2));
        assert!(state.get_code(&a).is_empty());
        assert_eq!(state.get_code_hash(&a), EMPTY_CODE_HASH);
        assert_eq!(state.get_refund(), 0);
        assert!(state.logs().is_empty());
    }

    #[test]
    fn test_revert_removes_created_account() {
        let mut state = state();
        let snap = state.snapshot();
        state.create_account(&addr(2));
        assert!(state.exist(&addr(2)));
        state.revert_to_snapshot(snap);
        assert!(!state.exist(&addr(2)));
    }

    #[test]
    fn test_create_account_keeps_balance_and_drops_storage() {
        let mut backend = StateCache::new();
        let a = addr(3);
        backend.set_account(
            a,
            Account {
                nonce: 0,
                balance: U256::from(9u64),
                code_hash: EMPTY_CODE_HASH,
            },
        );
        backend.set_storage(a, slot(1), slot(1));
        let mut state = JournaledState::new(backend);

        assert_eq!(state.get_state(&a, &slot(1)), slot(1));
        state.create_account(&a);
        assert_eq!(state.get_balance(&a), U256::from(9u64));
        assert_eq!(state.get_state(&a, &slot(1)), H256::ZERO);
    }

    #[test]
    fn test_suicide_zeroes_balance_and_reverts() {
        let mut state = state();
        let a = addr(4);
        assert!(!state.suicide(&a));

        state.add_balance(&a, U256::from(10u64));
        let snap = state.snapshot();
        assert!(state.suicide(&a));
        assert!(state.has_suicided(&a));
        assert_eq!(state.get_balance(&a), U256::zero());

        state.revert_to_snapshot(snap);
        assert!(!state.has_suicided(&a));
        assert_eq!(state.get_balance(&a), U256::from(10u64));
    }

    #[test]
    fn test_finalise_commits_and_prunes() {
        let mut state = state();
        let kept = addr(5);
        let emptied = addr(6);
        state.add_balance(&kept, U256::from(1u64));
        state.set_state(&kept, slot(1), slot(9));
        state.set_code(&kept, vec![0x00]);
        state.add_balance(&emptied, U256::zero());
        state.prepare(slot(0xaa), 12);
        state.add_log(Log::default());

        state.finalise(true).unwrap();
        let backend = state.into_backend();

        let account = backend.get_account(&kept).unwrap().unwrap();
        assert_eq!(account.balance, U256::from(1u64));
        assert_eq!(backend.get_storage(&kept, &slot(1)).unwrap(), slot(9));
        assert_eq!(backend.get_account_code(&kept).unwrap(), vec![0x00]);
        assert_eq!(backend.get_account(&emptied).unwrap(), None);
        assert!(backend.get_logs(&slot(0xaa)).unwrap().is_some());
    }

    #[test]
    fn test_finalise_skips_reverted_accounts() {
        let mut state = state();
        let snap = state.snapshot();
        state.add_balance(&addr(7), U256::from(5u64));
        state.revert_to_snapshot(snap);

        state.finalise(false).unwrap();
        assert_eq!(state.backend().account_count(), 0);
    }

    #[test]
    #[should_panic(expected = "state finalised twice")]
    fn test_finalise_twice_panics() {
        let mut state = state();
        state.finalise(false).unwrap();
        let _ = state.finalise(false);
    }
}
