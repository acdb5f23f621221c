//! Message handling over the persistent state

use std::path::Path;

use tracing::{info, warn};
use weft_evm::{decode_logs, JournaledState, JumpTable, LiveState, Log, VmParams};
use weft_primitives::{Address, H256, U256};
use weft_storage::{Account, StateDb, StateReader};

use crate::config::VmConfig;
use crate::error::{VmError, VmResult};
use crate::events;
use crate::gas_meter::GasMeter;
use crate::message::Msg;
use crate::querier::Querier;
use crate::state_transition::{Receipt, StateTransition, TxEnv};

/// Owns the state database and the execution parameters.
///
/// Every handled message runs in its own journaled state over the database;
/// a successful transaction commits its changes and logs in one batch.
pub struct Keeper {
    db: StateDb,
    params: VmParams,
    table: JumpTable,
}

impl Keeper {
    /// Create a keeper over an opened database
    pub fn new(db: StateDb, params: VmParams) -> VmResult<Self> {
        params.validate()?;
        let table = JumpTable::new(&params);
        Ok(Self { db, params, table })
    }

    /// Open the database at `path` using `config`
    pub fn open(path: impl AsRef<Path>, config: &VmConfig) -> VmResult<Self> {
        config.validate()?;
        let db = StateDb::open(path, &config.db)?;
        Self::new(db, config.params.clone())
    }

    /// Execution parameters
    pub fn params(&self) -> &VmParams {
        &self.params
    }

    /// Opcode table built from the parameters
    pub fn jump_table(&self) -> &JumpTable {
        &self.table
    }

    /// Underlying state database
    pub fn db(&self) -> &StateDb {
        &self.db
    }

    /// Mutable state database, for genesis and maintenance writes
    pub fn db_mut(&mut self) -> &mut StateDb {
        &mut self.db
    }

    /// Read-only query surface
    pub fn querier(&self) -> Querier<'_> {
        Querier::new(self)
    }

    /// Validate and apply `msg`, charging its gas to `meter`.
    /// Only a successful receipt carries the `message` event.
    pub fn handle(
        &mut self,
        msg: &Msg,
        env: &TxEnv,
        meter: &mut dyn GasMeter,
    ) -> VmResult<Receipt> {
        msg.validate_basic()?;

        let transition = StateTransition::new(msg, env);
        let mut state: LiveState<'_> = JournaledState::new(&mut self.db);
        let result = transition.transition_db(&mut state, &self.params, &self.table, meter);
        if state.has_db_error() {
            warn!(tx_hash = %env.tx_hash, "storage error during execution");
        }

        let mut receipt = result?;
        if receipt.is_success() {
            receipt.events.insert(0, events::message(&msg.sender()));
        }
        info!(
            tx_hash = %env.tx_hash,
            msg = msg.type_name(),
            sender = %msg.sender(),
            success = receipt.is_success(),
            gas_used = receipt.gas_used,
            "message handled"
        );
        Ok(receipt)
    }

    /// Account record, if any
    pub fn get_account(&self, address: &Address) -> VmResult<Option<Account>> {
        Ok(self.db.get_account(address)?)
    }

    /// Balance, zero for missing accounts
    pub fn get_balance(&self, address: &Address) -> VmResult<U256> {
        Ok(self
            .get_account(address)?
            .map(|account| account.balance)
            .unwrap_or_default())
    }

    /// Nonce, zero for missing accounts
    pub fn get_nonce(&self, address: &Address) -> VmResult<u64> {
        Ok(self
            .get_account(address)?
            .map(|account| account.nonce)
            .unwrap_or_default())
    }

    /// Deployed code, empty when the account has none
    pub fn get_code(&self, address: &Address) -> VmResult<Vec<u8>> {
        Ok(self.db.get_account_code(address)?)
    }

    /// Committed storage value, zero when unset
    pub fn get_state(&self, address: &Address, key: &H256) -> VmResult<H256> {
        Ok(self.db.get_storage(address, key)?)
    }

    /// Logs committed by a transaction, empty when unknown
    pub fn get_logs(&self, tx_hash: &H256) -> VmResult<Vec<Log>> {
        match self.db.get_logs(tx_hash)? {
            Some(bytes) => decode_logs(&bytes).map_err(|e| VmError::LogDecode(e.to_string())),
            None => Ok(Vec::new()),
        }
    }
}
