//! Transaction-scoped account state
//!
//! [`StateAccess`] is the capability the interpreter executes against.
//! [`JournaledState`] implements it over any [`StateStore`](weft_storage::StateStore): with a
//! `&mut StateDb` backend it is the live state, with a [`CachedState`]
//! backend it is a disposable copy whose commits never reach disk.

mod journal;
mod journaled;

use thiserror::Error;
use weft_primitives::{Address, H256, U256};
use weft_storage::{CachedState, StateDb, StorageError};

use crate::log::Log;

pub use journaled::JournaledState;

/// State layer errors
#[derive(Debug, Error)]
pub enum StateError {
    /// Backing store failure, possibly recorded earlier during execution
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Journaled state over the persistent store
pub type LiveState<'a> = JournaledState<&'a mut StateDb>;

/// Journaled state whose commits land in a throwaway overlay
pub type DisposableState<'a> = JournaledState<CachedState<'a>>;

/// Account and storage capability used by the interpreter.
///
/// Reads never fail: a backing-store error is recorded and returned from
/// [`StateAccess::finalise`], and the read observes the zero value.
pub trait StateAccess {
    /// Create (or reset) an account, keeping any balance it already held
    fn create_account(&mut self, address: &Address);

    /// Account exists, even if empty
    fn exist(&mut self, address: &Address) -> bool;

    /// Account does not exist or has zero nonce, zero balance and no code
    fn empty(&mut self, address: &Address) -> bool;

    /// Balance, zero for missing accounts
    fn get_balance(&mut self, address: &Address) -> U256;

    /// Credit an account, creating it if needed
    fn add_balance(&mut self, address: &Address, amount: U256);

    /// Debit an account, creating it if needed
    fn sub_balance(&mut self, address: &Address, amount: U256);

    /// Nonce, zero for missing accounts
    fn get_nonce(&mut self, address: &Address) -> u64;

    /// Set nonce
    fn set_nonce(&mut self, address: &Address, nonce: u64);

    /// Code, empty for missing accounts
    fn get_code(&mut self, address: &Address) -> Vec<u8>;

    /// Code size in bytes
    fn get_code_size(&mut self, address: &Address) -> usize {
        self.get_code(address).len()
    }

    /// Code hash, zero for missing accounts
    fn get_code_hash(&mut self, address: &Address) -> H256;

    /// Replace an account's code
    fn set_code(&mut self, address: &Address, code: Vec<u8>);

    /// Storage slot value, zero when absent
    fn get_state(&mut self, address: &Address, key: &H256) -> H256;

    /// Write a storage slot
    fn set_state(&mut self, address: &Address, key: H256, value: H256);

    /// Mark an account for deletion and zero its balance. Returns false if
    /// the account does not exist.
    fn suicide(&mut self, address: &Address) -> bool;

    /// Account was marked by [`StateAccess::suicide`] in this transaction
    fn has_suicided(&mut self, address: &Address) -> bool;

    /// Add to the refund counter
    fn add_refund(&mut self, gas: u64);

    /// Subtract from the refund counter
    fn sub_refund(&mut self, gas: u64);

    /// Current refund counter
    fn get_refund(&self) -> u64;

    /// Queue a log for the current transaction
    fn add_log(&mut self, log: Log);

    /// Logs queued so far
    fn logs(&self) -> &[Log];

    /// Bind subsequent logs to a transaction
    fn prepare(&mut self, tx_hash: H256, block_number: u64);

    /// Opaque revert marker
    fn snapshot(&mut self) -> usize;

    /// Undo every change made after `snapshot` was taken
    fn revert_to_snapshot(&mut self, snapshot: usize);

    /// Write all dirty accounts to the backing store and clear the journal.
    ///
    /// # Panics
    ///
    /// Panics if called twice on the same state.
    fn finalise(&mut self, delete_empty_objects: bool) -> Result<(), StateError>;
}
