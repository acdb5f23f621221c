//! Execution context for the EVM

use std::fmt;
use std::sync::Arc;

use weft_primitives::{Address, H256, U256};

use crate::state::StateAccess;
use crate::word;

/// How many recent blocks BLOCKHASH can see
pub const BLOCK_HASH_WINDOW: u64 = 256;

/// Checks whether an account can pay `amount`
pub type CanTransferFn = fn(&mut dyn StateAccess, &Address, U256) -> bool;
/// Moves `amount` between two accounts
pub type TransferFn = fn(&mut dyn StateAccess, &Address, &Address, U256);
/// Resolves a block number to its hash
pub type GetHashFn = Arc<dyn Fn(u64) -> H256 + Send + Sync>;

/// Block environment information
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockContext {
    /// Block proposer
    pub coinbase: Address,
    /// Block number
    pub number: u64,
    /// Block timestamp
    pub time: u64,
    /// Block gas limit
    pub gas_limit: u64,
    /// Block difficulty
    pub difficulty: U256,
    /// Chain ID
    pub chain_id: U256,
}

impl Default for BlockContext {
    fn default() -> Self {
        Self {
            coinbase: Address::ZERO,
            number: 0,
            time: 0,
            gas_limit: 30_000_000,
            difficulty: U256::zero(),
            chain_id: U256::one(),
        }
    }
}

/// Transaction environment information
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxContext {
    /// Transaction origin (original sender)
    pub origin: Address,
    /// Gas price reported by GASPRICE
    pub gas_price: U256,
}

/// Default balance check
pub fn can_transfer(state: &mut dyn StateAccess, from: &Address, amount: U256) -> bool {
    state.get_balance(from) >= amount
}

/// Default value transfer
pub fn transfer(state: &mut dyn StateAccess, from: &Address, to: &Address, amount: U256) {
    state.sub_balance(from, amount);
    state.add_balance(to, amount);
}

/// Read-only environment of one transaction
#[derive(Clone)]
pub struct Context {
    /// Block context
    pub block: BlockContext,
    /// Transaction context
    pub tx: TxContext,
    /// Balance check used before value transfers
    pub can_transfer: CanTransferFn,
    /// Value transfer
    pub transfer: TransferFn,
    /// Block hash lookup
    pub get_hash: GetHashFn,
}

impl Context {
    /// Create a context with the default transfer functions and no block hashes
    pub fn new(block: BlockContext, tx: TxContext) -> Self {
        Self {
            block,
            tx,
            can_transfer,
            transfer,
            get_hash: Arc::new(|_| H256::ZERO),
        }
    }

    /// Replace the block hash lookup
    pub fn with_get_hash(mut self, get_hash: impl Fn(u64) -> H256 + Send + Sync + 'static) -> Self {
        self.get_hash = Arc::new(get_hash);
        self
    }

    /// Hash of block `number`, zero unless it is one of the 256 blocks
    /// before the current one
    pub fn block_hash(&self, number: U256) -> H256 {
        let Some(number) = word::to_u64(number) else {
            return H256::ZERO;
        };
        let current = self.block.number;
        let lowest = current.saturating_sub(BLOCK_HASH_WINDOW);
        if number >= lowest && number < current {
            (self.get_hash)(number)
        } else {
            H256::ZERO
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(BlockContext::default(), TxContext::default())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("block", &self.block)
            .field("tx", &self.tx)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_at(number: u64) -> Context {
        let block = BlockContext {
            number,
            ..BlockContext::default()
        };
        Context::new(block, TxContext::default())
            .with_get_hash(|n| H256::from_word(U256::from(n + 1)))
    }

    #[test]
    fn test_block_hash_window() {
        let ctx = context_at(1000);
        assert_eq!(ctx.block_hash(U256::from(999u64)), H256::from_word(U256::from(1000u64)));
        assert_eq!(ctx.block_hash(U256::from(744u64)), H256::from_word(U256::from(745u64)));
        assert_eq!(ctx.block_hash(U256::from(743u64)), H256::ZERO);
        assert_eq!(ctx.block_hash(U256::from(1000u64)), H256::ZERO);
        assert_eq!(ctx.block_hash(U256::MAX), H256::ZERO);
    }

    #[test]
    fn test_block_hash_near_genesis() {
        let ctx = context_at(3);
        assert_eq!(ctx.block_hash(U256::zero()), H256::from_word(U256::one()));
        assert_eq!(ctx.block_hash(U256::from(3u64)), H256::ZERO);
    }

    #[test]
    fn test_default_context() {
        let ctx = Context::default();
        assert_eq!(ctx.block.gas_limit, 30_000_000);
        assert_eq!(ctx.tx.origin, Address::ZERO);
        assert_eq!(ctx.block_hash(U256::zero()), H256::ZERO);
    }
}
