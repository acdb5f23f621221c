//! Storage traits for state access

use weft_crypto::EMPTY_CODE_HASH;
use weft_primitives::{Address, H256, U256};

use crate::error::{StorageError, StorageResult};
use crate::state::StateCache;

const ACCOUNT_LEN: usize = 8 + 32 + 32;

/// Persistent account record
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    /// Account nonce
    pub nonce: u64,
    /// Account balance
    pub balance: U256,
    /// keccak256 of the account code, [`EMPTY_CODE_HASH`] when there is none
    pub code_hash: H256,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            nonce: 0,
            balance: U256::zero(),
            code_hash: EMPTY_CODE_HASH,
        }
    }
}

impl Account {
    /// Create a new empty account
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero nonce, zero balance and no code
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && !self.has_code()
    }

    /// Check if account has code
    pub fn has_code(&self) -> bool {
        self.code_hash != EMPTY_CODE_HASH && !self.code_hash.is_zero()
    }

    /// Encode as `nonce (8, BE) ++ balance (32, BE) ++ code_hash (32)`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(ACCOUNT_LEN);
        bytes.extend_from_slice(&self.nonce.to_be_bytes());
        bytes.extend_from_slice(H256::from_word(self.balance).as_bytes());
        bytes.extend_from_slice(self.code_hash.as_bytes());
        bytes
    }

    /// Decode bytes produced by [`Account::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> StorageResult<Self> {
        if bytes.len() != ACCOUNT_LEN {
            return Err(StorageError::Deserialization(format!(
                "account record has {} bytes, expected {}",
                bytes.len(),
                ACCOUNT_LEN
            )));
        }
        let mut nonce = [0u8; 8];
        nonce.copy_from_slice(&bytes[0..8]);
        let code_hash = H256::from_slice(&bytes[40..72])
            .map_err(|e| StorageError::Deserialization(e.to_string()))?;
        Ok(Self {
            nonce: u64::from_be_bytes(nonce),
            balance: U256::from_big_endian(&bytes[8..40]),
            code_hash,
        })
    }
}

/// Read access to persisted state
pub trait StateReader {
    /// Get account by address
    fn get_account(&self, address: &Address) -> StorageResult<Option<Account>>;

    /// Get storage value, zero when absent
    fn get_storage(&self, address: &Address, key: &H256) -> StorageResult<H256>;

    /// Get contract code by hash
    fn get_code(&self, code_hash: &H256) -> StorageResult<Option<Vec<u8>>>;

    /// Get the encoded logs recorded for a transaction
    fn get_logs(&self, tx_hash: &H256) -> StorageResult<Option<Vec<u8>>>;

    /// Get the code deployed at an address, empty when there is none
    fn get_account_code(&self, address: &Address) -> StorageResult<Vec<u8>> {
        match self.get_account(address)? {
            Some(account) if account.has_code() => {
                Ok(self.get_code(&account.code_hash)?.unwrap_or_default())
            }
            _ => Ok(Vec::new()),
        }
    }
}

/// Staged writes. Implementations only record; nothing is durable until committed.
pub trait StateWriter {
    /// Set account
    fn set_account(&mut self, address: Address, account: Account);

    /// Delete account
    fn delete_account(&mut self, address: &Address);

    /// Set storage value; zero deletes
    fn set_storage(&mut self, address: Address, key: H256, value: H256);

    /// Drop every storage slot of an account
    fn clear_storage(&mut self, address: &Address);

    /// Set contract code
    fn set_code(&mut self, code_hash: H256, code: Vec<u8>);

    /// Record the encoded logs of a transaction
    fn set_logs(&mut self, tx_hash: H256, encoded: Vec<u8>);
}

/// A store that can absorb a set of staged changes atomically
pub trait StateStore: StateReader {
    /// Apply every change in `changes`, all or nothing
    fn commit(&mut self, changes: StateCache) -> StorageResult<()>;
}

impl<T: StateReader + ?Sized> StateReader for &T {
    fn get_account(&self, address: &Address) -> StorageResult<Option<Account>> {
        (**self).get_account(address)
    }

    fn get_storage(&self, address: &Address, key: &H256) -> StorageResult<H256> {
        (**self).get_storage(address, key)
    }

    fn get_code(&self, code_hash: &H256) -> StorageResult<Option<Vec<u8>>> {
        (**self).get_code(code_hash)
    }

    fn get_logs(&self, tx_hash: &H256) -> StorageResult<Option<Vec<u8>>> {
        (**self).get_logs(tx_hash)
    }
}

impl<T: StateReader + ?Sized> StateReader for &mut T {
    fn get_account(&self, address: &Address) -> StorageResult<Option<Account>> {
        (**self).get_account(address)
    }

    fn get_storage(&self, address: &Address, key: &H256) -> StorageResult<H256> {
        (**self).get_storage(address, key)
    }

    fn get_code(&self, code_hash: &H256) -> StorageResult<Option<Vec<u8>>> {
        (**self).get_code(code_hash)
    }

    fn get_logs(&self, tx_hash: &H256) -> StorageResult<Option<Vec<u8>>> {
        (**self).get_logs(tx_hash)
    }
}

impl<T: StateStore + ?Sized> StateStore for &mut T {
    fn commit(&mut self, changes: StateCache) -> StorageResult<()> {
        (**self).commit(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_account_is_empty() {
        let account = Account::new();
        assert!(account.is_empty());
        assert!(!account.has_code());
        assert_eq!(account.code_hash, EMPTY_CODE_HASH);
    }

    #[test]
    fn test_account_with_balance_or_code_is_not_empty() {
        let funded = Account {
            balance: U256::from(1u64),
            ..Account::default()
        };
        assert!(!funded.is_empty());

        let contract = Account {
            code_hash: H256::from_bytes([9u8; 32]),
            ..Account::default()
        };
        assert!(contract.has_code());
        assert!(!contract.is_empty());
    }

    #[test]
    fn test_account_encoding() {
        let account = Account {
            nonce: 7,
            balance: U256::MAX - 1,
            code_hash: H256::from_bytes([0xab; 32]),
        };
        let bytes = account.to_bytes();
        assert_eq!(bytes.len(), ACCOUNT_LEN);
        assert_eq!(&bytes[..8], &7u64.to_be_bytes());
        assert_eq!(Account::from_bytes(&bytes).unwrap(), account);
    }

    #[test]
    fn test_account_decode_rejects_truncated_record() {
        let bytes = Account::new().to_bytes();
        assert!(matches!(
            Account::from_bytes(&bytes[..40]),
            Err(StorageError::Deserialization(_))
        ));
    }
}
