//! State records over RocksDB, plus in-memory staging layers

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::debug;
use weft_primitives::{Address, H256};

use crate::db::{cf, Database, DbConfig};
use crate::error::{StorageError, StorageResult};
use crate::traits::{Account, StateReader, StateStore, StateWriter};

/// Storage key combining address and slot
fn storage_key(address: &Address, slot: &H256) -> Vec<u8> {
    let mut key = Vec::with_capacity(20 + 32);
    key.extend_from_slice(address.as_bytes());
    key.extend_from_slice(slot.as_bytes());
    key
}

/// Key range `[from, to)` covering every storage slot of `address`
fn storage_range(address: &Address) -> (Vec<u8>, Vec<u8>) {
    let from = address.as_bytes().to_vec();
    let mut to = from.clone();
    to.extend_from_slice(&[0xff; 33]);
    (from, to)
}

/// State database backed by RocksDB
pub struct StateDb {
    db: Database,
}

impl StateDb {
    /// Wrap an already opened database
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open (or create) a state database at `path`
    pub fn open(path: impl AsRef<Path>, config: &DbConfig) -> StorageResult<Self> {
        let db = Database::new(path);
        db.open_with_config(config)?;
        Ok(Self { db })
    }

    /// Get the underlying database
    pub fn database(&self) -> &Database {
        &self.db
    }
}

impl StateReader for StateDb {
    fn get_account(&self, address: &Address) -> StorageResult<Option<Account>> {
        self.db
            .get(cf::ACCOUNTS, address.as_bytes())?
            .map(|bytes| Account::from_bytes(&bytes))
            .transpose()
    }

    fn get_storage(&self, address: &Address, key: &H256) -> StorageResult<H256> {
        match self.db.get(cf::STORAGE, &storage_key(address, key))? {
            Some(bytes) => {
                H256::from_slice(&bytes).map_err(|e| StorageError::Deserialization(e.to_string()))
            }
            None => Ok(H256::ZERO),
        }
    }

    fn get_code(&self, code_hash: &H256) -> StorageResult<Option<Vec<u8>>> {
        self.db.get(cf::CODE, code_hash.as_bytes())
    }

    fn get_logs(&self, tx_hash: &H256) -> StorageResult<Option<Vec<u8>>> {
        self.db.get(cf::LOGS, tx_hash.as_bytes())
    }
}

impl StateStore for StateDb {
    fn commit(&mut self, changes: StateCache) -> StorageResult<()> {
        let mut batch = self.db.batch();

        // Range deletes go first so that slots written afterwards survive.
        for address in &changes.cleared {
            let (from, to) = storage_range(address);
            batch.delete_range(cf::STORAGE, &from, &to);
        }

        for (address, account) in &changes.accounts {
            match account {
                Some(account) => batch.put(cf::ACCOUNTS, address.as_bytes(), &account.to_bytes()),
                None => batch.delete(cf::ACCOUNTS, address.as_bytes()),
            }
        }

        for ((address, slot), value) in &changes.storage {
            let key = storage_key(address, slot);
            if value.is_zero() {
                batch.delete(cf::STORAGE, &key);
            } else {
                batch.put(cf::STORAGE, &key, value.as_bytes());
            }
        }

        for (code_hash, code) in &changes.code {
            batch.put(cf::CODE, code_hash.as_bytes(), code);
        }

        for (tx_hash, logs) in &changes.logs {
            batch.put(cf::LOGS, tx_hash.as_bytes(), logs);
        }

        debug!(
            accounts = changes.accounts.len(),
            slots = changes.storage.len(),
            "committing state changes"
        );
        self.db.write_batch(batch)
    }
}

/// In-memory set of staged changes
#[derive(Clone, Debug, Default)]
pub struct StateCache {
    /// Cached accounts (None = deleted)
    accounts: HashMap<Address, Option<Account>>,
    storage: HashMap<(Address, H256), H256>,
    /// Accounts whose persisted storage is wiped before `storage` applies
    cleared: HashSet<Address>,
    code: HashMap<H256, Vec<u8>>,
    logs: HashMap<H256, Vec<u8>>,
}

impl StateCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get number of cached account changes
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Get number of cached storage changes
    pub fn storage_count(&self) -> usize {
        self.storage.len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
            && self.storage.is_empty()
            && self.cleared.is_empty()
            && self.code.is_empty()
            && self.logs.is_empty()
    }

    fn storage_cleared(&self, address: &Address) -> bool {
        self.cleared.contains(address)
    }
}

impl StateReader for StateCache {
    fn get_account(&self, address: &Address) -> StorageResult<Option<Account>> {
        Ok(self.accounts.get(address).cloned().flatten())
    }

    fn get_storage(&self, address: &Address, key: &H256) -> StorageResult<H256> {
        Ok(self.storage.get(&(*address, *key)).copied().unwrap_or(H256::ZERO))
    }

    fn get_code(&self, code_hash: &H256) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.code.get(code_hash).cloned())
    }

    fn get_logs(&self, tx_hash: &H256) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.logs.get(tx_hash).cloned())
    }
}

impl StateWriter for StateCache {
    fn set_account(&mut self, address: Address, account: Account) {
        self.accounts.insert(address, Some(account));
    }

    fn delete_account(&mut self, address: &Address) {
        self.accounts.insert(*address, None);
    }

    fn set_storage(&mut self, address: Address, key: H256, value: H256) {
        self.storage.insert((address, key), value);
    }

    fn clear_storage(&mut self, address: &Address) {
        self.storage.retain(|(owner, _), _| owner != address);
        self.cleared.insert(*address);
    }

    fn set_code(&mut self, code_hash: H256, code: Vec<u8>) {
        self.code.insert(code_hash, code);
    }

    fn set_logs(&mut self, tx_hash: H256, encoded: Vec<u8>) {
        self.logs.insert(tx_hash, encoded);
    }
}

impl StateStore for StateCache {
    fn commit(&mut self, changes: StateCache) -> StorageResult<()> {
        for address in &changes.cleared {
            self.clear_storage(address);
        }
        self.accounts.extend(changes.accounts);
        self.storage.extend(changes.storage);
        self.code.extend(changes.code);
        self.logs.extend(changes.logs);
        Ok(())
    }
}

/// Disposable overlay over another store. Commits land in the overlay only,
/// so dropping it discards every change.
pub struct CachedState<'a> {
    cache: StateCache,
    underlying: &'a dyn StateReader,
}

impl<'a> CachedState<'a> {
    /// Create a new overlay
    pub fn new(underlying: &'a dyn StateReader) -> Self {
        Self {
            cache: StateCache::new(),
            underlying,
        }
    }

    /// Changes staged so far
    pub fn cache(&self) -> &StateCache {
        &self.cache
    }

    /// Take ownership of the staged changes
    pub fn into_cache(self) -> StateCache {
        self.cache
    }
}

impl StateReader for CachedState<'_> {
    fn get_account(&self, address: &Address) -> StorageResult<Option<Account>> {
        if let Some(cached) = self.cache.accounts.get(address) {
            return Ok(cached.clone());
        }
        self.underlying.get_account(address)
    }

    fn get_storage(&self, address: &Address, key: &H256) -> StorageResult<H256> {
        if let Some(cached) = self.cache.storage.get(&(*address, *key)) {
            return Ok(*cached);
        }
        if self.cache.storage_cleared(address) {
            return Ok(H256::ZERO);
        }
        self.underlying.get_storage(address, key)
    }

    fn get_code(&self, code_hash: &H256) -> StorageResult<Option<Vec<u8>>> {
        if let Some(cached) = self.cache.code.get(code_hash) {
            return Ok(Some(cached.clone()));
        }
        self.underlying.get_code(code_hash)
    }

    fn get_logs(&self, tx_hash: &H256) -> StorageResult<Option<Vec<u8>>> {
        if let Some(cached) = self.cache.logs.get(tx_hash) {
            return Ok(Some(cached.clone()));
        }
        self.underlying.get_logs(tx_hash)
    }
}

impl StateStore for CachedState<'_> {
    fn commit(&mut self, changes: StateCache) -> StorageResult<()> {
        self.cache.commit(changes)
    }
}
