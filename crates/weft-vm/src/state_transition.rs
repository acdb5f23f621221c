//! Applying one message to the state

use tracing::{debug, info};
use weft_evm::{
    BlockContext, Context, Evm, EvmError, ExecutionResult, JumpTable, Log, StateAccess, TxContext,
    VmParams,
};
use weft_primitives::{Address, H256, U256};

use crate::error::{VmError, VmResult};
use crate::events::{self, Event};
use crate::gas_meter::GasMeter;
use crate::message::Msg;

/// Default per-transaction gas limit
pub const DEFAULT_TX_GAS_LIMIT: u64 = 10_000_000;

/// Descriptor used when charging execution gas to the meter
pub const EXECUTION_GAS_DESCRIPTOR: &str = "contract execution";

/// Transaction execution status
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxStatus {
    /// Transaction failed
    Failure = 0,
    /// Transaction succeeded
    Success = 1,
}

impl From<bool> for TxStatus {
    fn from(success: bool) -> Self {
        if success {
            TxStatus::Success
        } else {
            TxStatus::Failure
        }
    }
}

/// Outcome of one applied transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    /// Whether execution succeeded
    pub status: TxStatus,
    /// Gas charged to the meter, intrinsic gas included and refund deducted
    pub gas_used: u64,
    /// Return data, deployed code for a create, or revert data
    pub output: Vec<u8>,
    /// Address of a contract created by this transaction
    pub contract_address: Option<Address>,
    /// Logs emitted, empty on failure
    pub logs: Vec<Log>,
    /// Module events
    pub events: Vec<Event>,
    /// Why execution failed
    pub error: Option<EvmError>,
}

impl Receipt {
    /// Whether the transaction succeeded
    pub fn is_success(&self) -> bool {
        self.status == TxStatus::Success
    }
}

/// Per-transaction environment supplied by the chain
///
/// No block history travels with it: BLOCKHASH yields zero for every
/// height when executed through a [`StateTransition`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxEnv {
    /// Gas limit of the transaction
    pub gas_limit: u64,
    /// Price per unit of gas
    pub gas_price: U256,
    /// Transaction hash, used as the log key
    pub tx_hash: H256,
    /// Enclosing block
    pub block: BlockContext,
}

impl Default for TxEnv {
    fn default() -> Self {
        Self {
            gas_limit: DEFAULT_TX_GAS_LIMIT,
            gas_price: U256::zero(),
            tx_hash: H256::ZERO,
            block: BlockContext::default(),
        }
    }
}

/// A message resolved against its transaction environment.
///
/// `recipient == None` deploys `payload` as init code, otherwise `payload`
/// is call data for the recipient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateTransition {
    /// Transaction sender and origin
    pub sender: Address,
    /// Called contract, absent for a create
    pub recipient: Option<Address>,
    /// Value transferred
    pub amount: U256,
    /// Init code or call data
    pub payload: Vec<u8>,
    /// Gas limit
    pub gas_limit: u64,
    /// Price per unit of gas, reported by GASPRICE
    pub gas_price: U256,
    /// Transaction hash
    pub tx_hash: H256,
    /// Enclosing block
    pub block: BlockContext,
}

impl StateTransition {
    /// Bind a message to its transaction environment
    pub fn new(msg: &Msg, env: &TxEnv) -> Self {
        let (sender, recipient, amount, payload) = match msg {
            Msg::ContractCreate { from, amount, code } => (*from, None, *amount, code.clone()),
            Msg::ContractCall {
                from,
                recipient,
                amount,
                payload,
            } => (*from, Some(*recipient), *amount, payload.clone()),
        };
        Self {
            sender,
            recipient,
            amount,
            payload,
            gas_limit: env.gas_limit,
            gas_price: env.gas_price,
            tx_hash: env.tx_hash,
            block: env.block.clone(),
        }
    }

    /// Whether this transition deploys a contract
    pub fn is_create(&self) -> bool {
        self.recipient.is_none()
    }

    /// Gas charged before execution
    pub fn intrinsic_gas(&self, params: &VmParams) -> u64 {
        params
            .intrinsic_gas(&self.payload, self.is_create())
            .unwrap_or(u64::MAX)
    }

    /// Execute against `state` and charge the gas used to `meter`.
    ///
    /// Returns `Err` only when the transaction is rejected before the EVM
    /// runs, when the meter cannot cover the gas used, or when the state
    /// cannot be committed. Contract failures yield a failed [`Receipt`]
    /// whose gas is still charged; their state changes are not finalised.
    pub fn transition_db(
        &self,
        state: &mut dyn StateAccess,
        params: &VmParams,
        table: &JumpTable,
        meter: &mut dyn GasMeter,
    ) -> VmResult<Receipt> {
        let intrinsic = self.intrinsic_gas(params);
        if self.gas_limit < intrinsic {
            return Err(VmError::IntrinsicGas {
                have: self.gas_limit,
                want: intrinsic,
            });
        }
        if let Some(recipient) = self.recipient {
            if state.get_code_size(&recipient) == 0 {
                return Err(VmError::NoCodeExist(recipient));
            }
            let nonce = state.get_nonce(&self.sender);
            let next = nonce
                .checked_add(1)
                .ok_or(VmError::NonceOverflow(self.sender))?;
            state.prepare(self.tx_hash, self.block.number);
            state.set_nonce(&self.sender, next);
        } else {
            state.prepare(self.tx_hash, self.block.number);
        }

        // No hash lookup is installed, BLOCKHASH reads as zero
        let context = Context::new(
            self.block.clone(),
            TxContext {
                origin: self.sender,
                gas_price: self.gas_price,
            },
        );
        let gas = self.gas_limit - intrinsic;
        let (result, contract_address) = self.execute(context, state, params, table, gas);

        let gas_used = self.gas_limit.saturating_sub(result.gas_left);
        let refund = state
            .get_refund()
            .min(gas_used.checked_div(params.max_refund_quotient).unwrap_or(0));
        let gas_used = gas_used - refund;
        meter.consume_gas(gas_used, EXECUTION_GAS_DESCRIPTOR)?;

        if let Some(err) = result.error {
            debug!(
                tx_hash = %self.tx_hash,
                sender = %self.sender,
                gas_used,
                error = %err,
                "transaction failed"
            );
            return Ok(Receipt {
                status: TxStatus::Failure,
                gas_used,
                output: result.output,
                contract_address: None,
                logs: Vec::new(),
                events: Vec::new(),
                error: Some(err),
            });
        }

        state.finalise(true)?;

        let mut events = Vec::new();
        if let Some(address) = contract_address {
            info!(%address, sender = %self.sender, gas_used, "contract deployed");
            events.push(events::create_contract(&address));
        }
        debug!(tx_hash = %self.tx_hash, gas_used, refund, "transaction applied");

        Ok(Receipt {
            status: TxStatus::Success,
            gas_used,
            output: result.output,
            contract_address,
            logs: state.logs().to_vec(),
            events,
            error: None,
        })
    }

    fn execute(
        &self,
        context: Context,
        state: &mut dyn StateAccess,
        params: &VmParams,
        table: &JumpTable,
        gas: u64,
    ) -> (ExecutionResult, Option<Address>) {
        let mut evm = Evm::new(context, state, params, table);
        match self.recipient {
            None => {
                let (result, address) =
                    evm.create(self.sender, self.payload.clone(), gas, self.amount);
                (result, Some(address))
            }
            Some(recipient) => (
                evm.call(self.sender, recipient, self.payload.clone(), gas, self.amount),
                None,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gas_meter::{BasicGasMeter, InfiniteGasMeter};
    use weft_evm::JournaledState;
    use weft_storage::StateCache;

    fn sender() -> Address {
        Address::from_bytes([0x5e; 20])
    }

    fn contract() -> Address {
        Address::from_bytes([0xc0; 20])
    }

    fn setup() -> (JournaledState<StateCache>, VmParams, JumpTable) {
        let params = VmParams::default();
        let table = JumpTable::new(&params);
        let mut state = JournaledState::new(StateCache::new());
        state.add_balance(&sender(), U256::from(1_000_000u64));
        (state, params, table)
    }

    fn call(payload: Vec<u8>, gas_limit: u64) -> StateTransition {
        let msg = Msg::ContractCall {
            from: sender(),
            recipient: contract(),
            amount: U256::zero(),
            payload,
        };
        StateTransition::new(
            &msg,
            &TxEnv {
                gas_limit,
                ..TxEnv::default()
            },
        )
    }

    #[test]
    fn test_from_msg() {
        let msg = Msg::ContractCreate {
            from: sender(),
            amount: U256::from(3u64),
            code: vec![0x00],
        };
        let st = StateTransition::new(&msg, &TxEnv::default());
        assert!(st.is_create());
        assert_eq!(st.amount, U256::from(3u64));
        assert_eq!(st.gas_limit, DEFAULT_TX_GAS_LIMIT);
        assert_eq!(st.intrinsic_gas(&VmParams::default()), 53_000 + 4);
    }

    #[test]
    fn test_call_without_code_is_rejected() {
        let (mut state, params, table) = setup();
        let mut meter = InfiniteGasMeter::new();
        let err = call(Vec::new(), 100_000)
            .transition_db(&mut state, &params, &table, &mut meter)
            .unwrap_err();
        assert!(matches!(err, VmError::NoCodeExist(addr) if addr == contract()));
        assert_eq!(meter.gas_consumed(), 0);
        assert_eq!(state.get_nonce(&sender()), 0);
    }

    #[test]
    fn test_intrinsic_gas_too_low() {
        let (mut state, params, table) = setup();
        state.set_code(&contract(), vec![0x00]);
        let mut meter = InfiniteGasMeter::new();
        let err = call(vec![1, 0], 21_000)
            .transition_db(&mut state, &params, &table, &mut meter)
            .unwrap_err();
        assert!(matches!(
            err,
            VmError::IntrinsicGas {
                have: 21_000,
                want: 21_072
            }
        ));
    }

    #[test]
    fn test_call_charges_intrinsic_and_execution() {
        let (mut state, params, table) = setup();
        // PUSH1 1 PUSH1 0 SSTORE STOP
        state.set_code(&contract(), vec![0x60, 0x01, 0x60, 0x00, 0x55, 0x00]);
        let mut meter = BasicGasMeter::new(1_000_000);

        let receipt = call(Vec::new(), 100_000)
            .transition_db(&mut state, &params, &table, &mut meter)
            .unwrap();
        assert!(receipt.is_success());
        assert_eq!(receipt.gas_used, 21_000 + 3 + 3 + 20_000);
        assert_eq!(meter.gas_consumed(), receipt.gas_used);
        assert_eq!(state.get_nonce(&sender()), 1);
        assert!(receipt.events.is_empty());
    }

    #[test]
    fn test_failure_charges_all_gas() {
        let (mut state, params, table) = setup();
        state.set_code(&contract(), vec![0xfe]);
        let mut meter = BasicGasMeter::new(1_000_000);

        let receipt = call(Vec::new(), 50_000)
            .transition_db(&mut state, &params, &table, &mut meter)
            .unwrap();
        assert_eq!(receipt.status, TxStatus::Failure);
        assert_eq!(receipt.error, Some(EvmError::InvalidOpcode(0xfe)));
        assert_eq!(receipt.gas_used, 50_000);
        assert_eq!(meter.gas_consumed(), 50_000);
    }

    #[test]
    fn test_meter_exhaustion_is_an_error() {
        let (mut state, params, table) = setup();
        state.set_code(&contract(), vec![0x00]);
        let mut meter = BasicGasMeter::new(20_000);

        let err = call(Vec::new(), 100_000)
            .transition_db(&mut state, &params, &table, &mut meter)
            .unwrap_err();
        assert!(matches!(err, VmError::OutOfGas { used: 21_000, .. }));
    }

    #[test]
    fn test_refund_is_capped() {
        let (mut state, params, table) = setup();
        let slot = H256::ZERO;
        state.set_state(&contract(), slot, H256::from_word(U256::one()));
        // PUSH1 0 PUSH1 0 SSTORE STOP
        state.set_code(&contract(), vec![0x60, 0x00, 0x60, 0x00, 0x55, 0x00]);
        let mut meter = InfiniteGasMeter::new();

        let receipt = call(Vec::new(), 100_000)
            .transition_db(&mut state, &params, &table, &mut meter)
            .unwrap();
        assert!(receipt.is_success());
        // 26006 used, refund 15000 capped at half
        let used = 21_000 + 3 + 3 + 5_000;
        assert_eq!(receipt.gas_used, used - used / 2);
    }

    #[test]
    fn test_blockhash_reads_zero() {
        let (mut state, params, table) = setup();
        // PUSH1 6 BLOCKHASH PUSH1 0 MSTORE PUSH1 32 PUSH1 0 RETURN
        state.set_code(&contract(), hex::decode("60064060005260206000f3").unwrap());
        let msg = Msg::ContractCall {
            from: sender(),
            recipient: contract(),
            amount: U256::zero(),
            payload: Vec::new(),
        };
        let env = TxEnv {
            block: BlockContext {
                number: 7,
                ..BlockContext::default()
            },
            ..TxEnv::default()
        };

        let receipt = StateTransition::new(&msg, &env)
            .transition_db(&mut state, &params, &table, &mut InfiniteGasMeter::new())
            .unwrap();
        assert!(receipt.is_success());
        assert_eq!(receipt.output, vec![0u8; 32]);
    }
}
