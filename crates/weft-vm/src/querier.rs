//! Read-only queries
//!
//! Simulations run in a [`DisposableState`] over a [`CachedState`] overlay,
//! so nothing they write reaches the database.

use serde::{Deserialize, Serialize};
use tracing::debug;
use weft_evm::{DisposableState, JournaledState, Log};
use weft_primitives::{Address, H256, U256};
use weft_storage::CachedState;

use crate::error::{VmError, VmResult};
use crate::gas_meter::InfiniteGasMeter;
use crate::keeper::Keeper;
use crate::message::Msg;
use crate::state_transition::{Receipt, StateTransition, TxEnv};

/// Gas parameters as JSON
pub const QUERY_PARAMETERS: &str = "parameters";
/// Raw code of a 20-byte address
pub const QUERY_CONTRACT_CODE: &str = "code";
/// Output of a simulated call
pub const QUERY_CONTRACT_STATE: &str = "state";
/// One storage slot: `storage/<address>/<key>`
pub const QUERY_STORAGE: &str = "storage";
/// Logs of a transaction: `logs/<tx hash>`
pub const QUERY_TX_LOGS: &str = "logs";
/// Fee estimate of a create message
pub const QUERY_CREATE_FEE: &str = "create_fee";
/// Fee estimate of a call message
pub const QUERY_CALL_FEE: &str = "call_fee";

/// Arguments of a contract state query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractStateParams {
    /// Caller
    pub from: Address,
    /// Contract to call
    pub to: Address,
    /// Call data
    #[serde(default)]
    pub data: Vec<u8>,
}

/// Storage query response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageResponse {
    /// Slot value
    pub value: H256,
}

/// Logs query response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogsResponse {
    /// Logs in emission order
    pub logs: Vec<Log>,
}

/// Estimated cost of a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEstimate {
    /// Gas the message would use
    pub gas_used: u64,
    /// `gas_used * gas_price`
    pub fee: U256,
    /// Whether the simulated execution succeeded
    pub success: bool,
}

/// Query surface over a [`Keeper`]
pub struct Querier<'a> {
    keeper: &'a Keeper,
    env: TxEnv,
}

impl<'a> Querier<'a> {
    /// Querier simulating with the default transaction environment
    pub fn new(keeper: &'a Keeper) -> Self {
        Self {
            keeper,
            env: TxEnv::default(),
        }
    }

    /// Simulate with `env` instead of the default
    pub fn with_env(mut self, env: TxEnv) -> Self {
        self.env = env;
        self
    }

    /// Route a path query. Structured responses are JSON.
    pub fn query(&self, path: &[&str], data: &[u8]) -> VmResult<Vec<u8>> {
        let endpoint = path.first().copied().unwrap_or_default();
        match endpoint {
            QUERY_PARAMETERS => self.params(),
            QUERY_CONTRACT_CODE => self.code(data),
            QUERY_CONTRACT_STATE => {
                let params: ContractStateParams = serde_json::from_slice(data)?;
                self.contract_state(&params)
            }
            QUERY_STORAGE => {
                let (Some(address), Some(key)) = (path.get(1), path.get(2)) else {
                    return Err(VmError::InvalidQuery("expected storage/<address>/<key>".into()));
                };
                let address = parse_address(address)?;
                let key = parse_hash(key)?;
                let value = self.storage(&address, &key)?;
                Ok(serde_json::to_vec_pretty(&StorageResponse { value })?)
            }
            QUERY_TX_LOGS => {
                let Some(tx_hash) = path.get(1) else {
                    return Err(VmError::InvalidQuery("expected logs/<tx hash>".into()));
                };
                let logs = self.tx_logs(&parse_hash(tx_hash)?)?;
                Ok(serde_json::to_vec_pretty(&LogsResponse { logs })?)
            }
            QUERY_CREATE_FEE | QUERY_CALL_FEE => {
                let msg: Msg = serde_json::from_slice(data)?;
                let expected = if endpoint == QUERY_CREATE_FEE {
                    "contract_create"
                } else {
                    "contract_call"
                };
                if msg.type_name() != expected {
                    return Err(VmError::InvalidQuery(format!(
                        "{endpoint} expects a {expected} message"
                    )));
                }
                Ok(serde_json::to_vec_pretty(&self.estimate_fee(&msg)?)?)
            }
            other => Err(VmError::UnknownQuery(other.to_string())),
        }
    }

    /// Gas parameters as pretty JSON
    pub fn params(&self) -> VmResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self.keeper.params())?)
    }

    /// Code at a raw 20-byte address
    pub fn code(&self, address: &[u8]) -> VmResult<Vec<u8>> {
        if address.len() != Address::LEN {
            return Err(VmError::InvalidAddress(format!(
                "expected {} bytes, got {}",
                Address::LEN,
                address.len()
            )));
        }
        let address =
            Address::from_slice(address).map_err(|e| VmError::InvalidAddress(e.to_string()))?;
        self.keeper.get_code(&address)
    }

    /// Committed storage value
    pub fn storage(&self, address: &Address, key: &H256) -> VmResult<H256> {
        self.keeper.get_state(address, key)
    }

    /// Logs committed by a transaction
    pub fn tx_logs(&self, tx_hash: &H256) -> VmResult<Vec<Log>> {
        self.keeper.get_logs(tx_hash)
    }

    /// Output of calling `params.to` without committing anything
    pub fn contract_state(&self, params: &ContractStateParams) -> VmResult<Vec<u8>> {
        let msg = Msg::ContractCall {
            from: params.from,
            recipient: params.to,
            amount: U256::zero(),
            payload: params.data.clone(),
        };
        let receipt = self.simulate(&msg)?;
        if let Some(err) = &receipt.error {
            debug!(to = %params.to, error = %err, "contract state query failed");
        }
        Ok(receipt.output)
    }

    /// Gas and fee `msg` would cost, without committing anything
    pub fn estimate_fee(&self, msg: &Msg) -> VmResult<FeeEstimate> {
        let receipt = self.simulate(msg)?;
        Ok(FeeEstimate {
            gas_used: receipt.gas_used,
            fee: U256::from(receipt.gas_used).saturating_mul(self.env.gas_price),
            success: receipt.is_success(),
        })
    }

    fn simulate(&self, msg: &Msg) -> VmResult<Receipt> {
        msg.validate_basic()?;
        let transition = StateTransition::new(msg, &self.env);
        let mut state: DisposableState<'_> =
            JournaledState::new(CachedState::new(self.keeper.db()));
        let mut meter = InfiniteGasMeter::new();
        transition.transition_db(
            &mut state,
            self.keeper.params(),
            self.keeper.jump_table(),
            &mut meter,
        )
    }
}

fn parse_address(s: &str) -> VmResult<Address> {
    Address::from_hex(s).map_err(|e| VmError::InvalidAddress(e.to_string()))
}

fn parse_hash(s: &str) -> VmResult<H256> {
    H256::from_hex(s).map_err(|e| VmError::InvalidQuery(format!("invalid hash {s}: {e}")))
}
