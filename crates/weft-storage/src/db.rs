//! RocksDB wrapper

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, MultiThreaded, Options, WriteBatch,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// Column family names
pub mod cf {
    /// Account records keyed by address
    pub const ACCOUNTS: &str = "accounts";
    /// Contract storage keyed by address ++ slot
    pub const STORAGE: &str = "storage";
    /// Contract code keyed by code hash
    pub const CODE: &str = "code";
    /// Encoded transaction logs keyed by transaction hash
    pub const LOGS: &str = "logs";
}

/// All column family names
pub const ALL_CFS: &[&str] = &[cf::ACCOUNTS, cf::STORAGE, cf::CODE, cf::LOGS];

type RocksDB = DBWithThreadMode<MultiThreaded>;

/// Database configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    /// Create database if missing
    #[serde(default = "default_create_if_missing")]
    pub create_if_missing: bool,
    /// Maximum number of open files
    #[serde(default = "default_max_open_files")]
    pub max_open_files: i32,
    /// Write buffer size in bytes
    #[serde(default = "default_write_buffer_size")]
    pub write_buffer_size: usize,
    /// Maximum write buffers
    #[serde(default = "default_max_write_buffer_number")]
    pub max_write_buffer_number: i32,
}

fn default_create_if_missing() -> bool {
    true
}

fn default_max_open_files() -> i32 {
    512
}

fn default_write_buffer_size() -> usize {
    64 * 1024 * 1024
}

fn default_max_write_buffer_number() -> i32 {
    3
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            create_if_missing: default_create_if_missing(),
            max_open_files: default_max_open_files(),
            write_buffer_size: default_write_buffer_size(),
            max_write_buffer_number: default_max_write_buffer_number(),
        }
    }
}

/// RocksDB wrapper with column family support
pub struct Database {
    db: Arc<RwLock<Option<RocksDB>>>,
    path: String,
}

impl Database {
    /// Create a new database instance (not yet opened)
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            db: Arc::new(RwLock::new(None)),
            path: path.as_ref().to_string_lossy().to_string(),
        }
    }

    /// Open the database with default config
    pub fn open(&self) -> StorageResult<()> {
        self.open_with_config(&DbConfig::default())
    }

    /// Open the database with custom config
    pub fn open_with_config(&self, config: &DbConfig) -> StorageResult<()> {
        let mut db_guard = self.db.write();
        if db_guard.is_some() {
            return Err(StorageError::AlreadyOpen);
        }

        let mut opts = Options::default();
        opts.create_if_missing(config.create_if_missing);
        opts.create_missing_column_families(true);
        opts.set_max_open_files(config.max_open_files);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_max_write_buffer_number(config.max_write_buffer_number);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = RocksDB::open_cf_descriptors(&opts, &self.path, cf_descriptors)?;
        *db_guard = Some(db);
        info!(path = %self.path, "opened state database");
        Ok(())
    }

    /// Close the database
    pub fn close(&self) {
        let mut db_guard = self.db.write();
        if db_guard.take().is_some() {
            info!(path = %self.path, "closed state database");
        }
    }

    /// Check if database is open
    pub fn is_open(&self) -> bool {
        self.db.read().is_some()
    }

    /// Get a value from a column family
    pub fn get(&self, cf_name: &str, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let db_guard = self.db.read();
        let db = db_guard.as_ref().ok_or(StorageError::NotOpen)?;
        let cf = Self::get_cf(db, cf_name)?;
        Ok(db.get_cf(&cf, key)?)
    }

    /// Put a value to a column family
    pub fn put(&self, cf_name: &str, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let db_guard = self.db.read();
        let db = db_guard.as_ref().ok_or(StorageError::NotOpen)?;
        let cf = Self::get_cf(db, cf_name)?;
        db.put_cf(&cf, key, value)?;
        Ok(())
    }

    /// Delete a value from a column family
    pub fn delete(&self, cf_name: &str, key: &[u8]) -> StorageResult<()> {
        let db_guard = self.db.read();
        let db = db_guard.as_ref().ok_or(StorageError::NotOpen)?;
        let cf = Self::get_cf(db, cf_name)?;
        db.delete_cf(&cf, key)?;
        Ok(())
    }

    /// Create a write batch
    pub fn batch(&self) -> WriteBatchWrapper {
        WriteBatchWrapper::new()
    }

    /// Apply a write batch atomically
    pub fn write_batch(&self, batch: WriteBatchWrapper) -> StorageResult<()> {
        let db_guard = self.db.read();
        let db = db_guard.as_ref().ok_or(StorageError::NotOpen)?;

        let op_count = batch.len();
        let mut rocks_batch = WriteBatch::default();
        for op in batch.operations {
            match op {
                BatchOp::Put { cf_name, key, value } => {
                    let cf = Self::get_cf(db, cf_name)?;
                    rocks_batch.put_cf(&cf, &key, &value);
                }
                BatchOp::Delete { cf_name, key } => {
                    let cf = Self::get_cf(db, cf_name)?;
                    rocks_batch.delete_cf(&cf, &key);
                }
                BatchOp::DeleteRange { cf_name, from, to } => {
                    let cf = Self::get_cf(db, cf_name)?;
                    rocks_batch.delete_range_cf(&cf, &from, &to);
                }
            }
        }

        db.write(rocks_batch)?;
        debug!(ops = op_count, "wrote batch");
        Ok(())
    }

    fn get_cf<'a>(db: &'a RocksDB, name: &str) -> StorageResult<Arc<BoundColumnFamily<'a>>> {
        db.cf_handle(name)
            .ok_or_else(|| StorageError::InvalidColumnFamily(name.to_string()))
    }

    /// Get database path
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            path: self.path.clone(),
        }
    }
}

enum BatchOp {
    Put {
        cf_name: &'static str,
        key: Vec<u8>,
        value: Vec<u8>,
    },
    Delete {
        cf_name: &'static str,
        key: Vec<u8>,
    },
    DeleteRange {
        cf_name: &'static str,
        from: Vec<u8>,
        to: Vec<u8>,
    },
}

/// Ordered list of writes applied in one RocksDB batch
pub struct WriteBatchWrapper {
    operations: Vec<BatchOp>,
}

impl WriteBatchWrapper {
    /// Create a new write batch
    pub fn new() -> Self {
        Self {
            operations: Vec::new(),
        }
    }

    /// Add a put operation
    pub fn put(&mut self, cf_name: &'static str, key: &[u8], value: &[u8]) {
        self.operations.push(BatchOp::Put {
            cf_name,
            key: key.to_vec(),
            value: value.to_vec(),
        });
    }

    /// Add a delete operation
    pub fn delete(&mut self, cf_name: &'static str, key: &[u8]) {
        self.operations.push(BatchOp::Delete {
            cf_name,
            key: key.to_vec(),
        });
    }

    /// Delete every key in `[from, to)`
    pub fn delete_range(&mut self, cf_name: &'static str, from: &[u8], to: &[u8]) {
        self.operations.push(BatchOp::DeleteRange {
            cf_name,
            from: from.to_vec(),
            to: to.to_vec(),
        });
    }

    /// Get number of operations
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Check if batch is empty
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl Default for WriteBatchWrapper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, Database) {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path());
        db.open().unwrap();
        (dir, db)
    }

    #[test]
    fn test_open_close() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path());

        assert!(!db.is_open());
        db.open().unwrap();
        assert!(db.is_open());
        assert!(matches!(db.open(), Err(StorageError::AlreadyOpen)));
        db.close();
        assert!(!db.is_open());
    }

    #[test]
    fn test_put_get_delete() {
        let (_dir, db) = open_temp();

        db.put(cf::CODE, b"hash", b"bytecode").unwrap();
        assert_eq!(db.get(cf::CODE, b"hash").unwrap(), Some(b"bytecode".to_vec()));
        assert_eq!(db.get(cf::CODE, b"missing").unwrap(), None);

        db.delete(cf::CODE, b"hash").unwrap();
        assert!(db.get(cf::CODE, b"hash").unwrap().is_none());
    }

    #[test]
    fn test_not_open_error() {
        let db = Database::new("/tmp/weft-never-opened");
        assert!(matches!(db.get(cf::ACCOUNTS, b"k"), Err(StorageError::NotOpen)));
    }

    #[test]
    fn test_write_batch_applies_in_order() {
        let (_dir, db) = open_temp();
        db.put(cf::STORAGE, b"a1", b"old").unwrap();
        db.put(cf::STORAGE, b"a2", b"old").unwrap();
        db.put(cf::STORAGE, b"b1", b"keep").unwrap();

        let mut batch = db.batch();
        batch.delete_range(cf::STORAGE, b"a", b"b");
        batch.put(cf::STORAGE, b"a1", b"new");
        batch.put(cf::ACCOUNTS, b"acc", b"data");
        assert_eq!(batch.len(), 3);
        db.write_batch(batch).unwrap();

        assert_eq!(db.get(cf::STORAGE, b"a1").unwrap(), Some(b"new".to_vec()));
        assert_eq!(db.get(cf::STORAGE, b"a2").unwrap(), None);
        assert_eq!(db.get(cf::STORAGE, b"b1").unwrap(), Some(b"keep".to_vec()));
        assert_eq!(db.get(cf::ACCOUNTS, b"acc").unwrap(), Some(b"data".to_vec()));
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path());
        db.open().unwrap();
        db.put(cf::LOGS, b"tx", b"logs").unwrap();
        db.close();

        db.open().unwrap();
        assert_eq!(db.get(cf::LOGS, b"tx").unwrap(), Some(b"logs".to_vec()));
    }
}
