//! # weft-storage
//!
//! Persistent store behind the contract engine's state layer.
//!
//! - [`Database`]: RocksDB with one column family per record kind
//! - [`StateDb`]: account, storage, code and log records over a [`Database`],
//!   committed atomically from a [`StateCache`]
//! - [`CachedState`]: a disposable overlay used for queries and gas estimation

#![warn(missing_docs)]
#![warn(clippy::all)]

mod db;
mod error;
mod state;
mod traits;

pub use db::{cf, Database, DbConfig, WriteBatchWrapper, ALL_CFS};
pub use error::{StorageError, StorageResult};
pub use state::{CachedState, StateCache, StateDb};
pub use traits::{Account, StateReader, StateStore, StateWriter};
