//! Call and create orchestration

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;
use weft_crypto::{create2_address, create_address, EMPTY_CODE_HASH};
use weft_primitives::{Address, H256, U256};

use crate::context::Context;
use crate::contract::Contract;
use crate::error::{EvmError, ExecutionResult};
use crate::interpreter::Interpreter;
use crate::jump_table::JumpTable;
use crate::params::VmParams;
use crate::state::StateAccess;

/// Runs calls and creates against a state.
///
/// Owns the call depth, the abort flag and the interpreter shared by
/// every nested frame of one transaction.
pub struct Evm<'a> {
    /// Transaction environment
    pub context: Context,
    /// State the frames execute against
    pub state: &'a mut dyn StateAccess,
    params: &'a VmParams,
    pub(crate) interpreter: Interpreter<'a>,
    pub(crate) depth: usize,
    pub(crate) abort: Arc<AtomicBool>,
    /// Gas selected for the next nested call by its gas function
    pub(crate) call_gas_temp: u64,
}

impl<'a> Evm<'a> {
    /// Create an EVM dispatching through `table`
    pub fn new(
        context: Context,
        state: &'a mut dyn StateAccess,
        params: &'a VmParams,
        table: &'a JumpTable,
    ) -> Self {
        Self {
            context,
            state,
            params,
            interpreter: Interpreter::new(table),
            depth: 0,
            abort: Arc::new(AtomicBool::new(false)),
            call_gas_temp: 0,
        }
    }

    /// Execution parameters
    pub fn params(&self) -> &'a VmParams {
        self.params
    }

    /// Number of frames currently executing
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The interpreter
    pub fn interpreter(&self) -> &Interpreter<'a> {
        &self.interpreter
    }

    /// Flag that stops execution at the next instruction once set
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    /// Stop any running execution
    pub fn cancel(&self) {
        self.abort.store(true, Ordering::SeqCst);
    }

    /// Whether [`Evm::cancel`] was called
    pub fn cancelled(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }

    fn too_deep(&self) -> bool {
        self.depth > self.params.call_create_depth
    }

    fn can_transfer(&mut self, from: &Address, value: U256) -> bool {
        value.is_zero() || (self.context.can_transfer)(&mut *self.state, from, value)
    }

    fn load_contract(
        &mut self,
        caller: Address,
        address: Address,
        code_address: Address,
        value: U256,
        gas: u64,
        input: Vec<u8>,
    ) -> Contract {
        let code = self.state.get_code(&code_address);
        let code_hash = self.state.get_code_hash(&code_address);
        Contract::new(caller, address, value, gas, code, code_hash)
            .with_code_address(code_address)
            .with_input(input)
    }

    /// Run a loaded frame, reverting its effects on failure. Every failure
    /// except REVERT consumes the frame's gas.
    fn execute_frame(&mut self, mut contract: Contract, snapshot: usize, read_only: bool) -> ExecutionResult {
        let (output, result) = self.run(&mut contract, read_only);
        if let Err(err) = &result {
            self.state.revert_to_snapshot(snapshot);
            if *err != EvmError::Revert {
                contract.gas = 0;
            }
            debug!(
                address = %contract.address,
                depth = self.depth,
                error = %err,
                "call failed"
            );
        }
        ExecutionResult::from_run(output, contract.gas, result)
    }

    /// Message call to `address`, transferring `value`
    pub fn call(
        &mut self,
        caller: Address,
        address: Address,
        input: Vec<u8>,
        gas: u64,
        value: U256,
    ) -> ExecutionResult {
        if self.too_deep() {
            return ExecutionResult::failure(EvmError::DepthLimitExceeded, gas);
        }
        if !self.can_transfer(&caller, value) {
            return ExecutionResult::failure(EvmError::InsufficientBalance, gas);
        }

        let snapshot = self.state.snapshot();
        if !self.state.exist(&address) {
            if value.is_zero() {
                return ExecutionResult::success(Vec::new(), gas);
            }
            self.state.create_account(&address);
        }
        (self.context.transfer)(&mut *self.state, &caller, &address, value);

        let contract = self.load_contract(caller, address, address, value, gas, input);
        self.execute_frame(contract, snapshot, false)
    }

    /// Run `address`'s code in the caller's own account context
    pub fn call_code(
        &mut self,
        caller: Address,
        address: Address,
        input: Vec<u8>,
        gas: u64,
        value: U256,
    ) -> ExecutionResult {
        if self.too_deep() {
            return ExecutionResult::failure(EvmError::DepthLimitExceeded, gas);
        }
        if !self.can_transfer(&caller, value) {
            return ExecutionResult::failure(EvmError::InsufficientBalance, gas);
        }

        let snapshot = self.state.snapshot();
        let contract = self.load_contract(caller, caller, address, value, gas, input);
        self.execute_frame(contract, snapshot, false)
    }

    /// Run `address`'s code as if it were `parent`'s, keeping the parent's
    /// caller, value and storage
    pub fn delegate_call(
        &mut self,
        parent: &Contract,
        address: Address,
        input: Vec<u8>,
        gas: u64,
    ) -> ExecutionResult {
        if self.too_deep() {
            return ExecutionResult::failure(EvmError::DepthLimitExceeded, gas);
        }

        let snapshot = self.state.snapshot();
        let contract = self
            .load_contract(parent.address, parent.address, address, U256::zero(), gas, input)
            .as_delegate(parent);
        self.execute_frame(contract, snapshot, false)
    }

    /// Call `address` with state modification forbidden for the whole subtree
    pub fn static_call(
        &mut self,
        caller: Address,
        address: Address,
        input: Vec<u8>,
        gas: u64,
    ) -> ExecutionResult {
        if self.too_deep() {
            return ExecutionResult::failure(EvmError::DepthLimitExceeded, gas);
        }

        let snapshot = self.state.snapshot();
        // Touch the callee so it is considered for empty-account pruning
        self.state.add_balance(&address, U256::zero());

        let contract = self.load_contract(caller, address, address, U256::zero(), gas, input);
        self.execute_frame(contract, snapshot, true)
    }

    /// Deploy `code` at the address derived from the caller's nonce
    pub fn create(
        &mut self,
        caller: Address,
        code: Vec<u8>,
        gas: u64,
        value: U256,
    ) -> (ExecutionResult, Address) {
        let address = create_address(&caller, self.state.get_nonce(&caller));
        self.create_at(caller, code, gas, value, address)
    }

    /// Deploy `code` at the address derived from `salt` and the init code
    pub fn create2(
        &mut self,
        caller: Address,
        code: Vec<u8>,
        gas: u64,
        value: U256,
        salt: H256,
    ) -> (ExecutionResult, Address) {
        let address = create2_address(&caller, &salt, &code);
        self.create_at(caller, code, gas, value, address)
    }

    fn create_at(
        &mut self,
        caller: Address,
        code: Vec<u8>,
        gas: u64,
        value: U256,
        address: Address,
    ) -> (ExecutionResult, Address) {
        if self.too_deep() {
            return (ExecutionResult::failure(EvmError::DepthLimitExceeded, gas), address);
        }
        if !self.can_transfer(&caller, value) {
            return (ExecutionResult::failure(EvmError::InsufficientBalance, gas), address);
        }
        let nonce = self.state.get_nonce(&caller);
        let Some(next_nonce) = nonce.checked_add(1) else {
            return (ExecutionResult::failure(EvmError::NonceOverflow, gas), address);
        };
        self.state.set_nonce(&caller, next_nonce);

        let existing_hash = self.state.get_code_hash(&address);
        if self.state.get_nonce(&address) != 0
            || (!existing_hash.is_zero() && existing_hash != EMPTY_CODE_HASH)
        {
            debug!(%address, "create collision");
            return (ExecutionResult::failure(EvmError::CreateCollision, 0), address);
        }

        let snapshot = self.state.snapshot();
        self.state.create_account(&address);
        self.state.set_nonce(&address, 1);
        (self.context.transfer)(&mut *self.state, &caller, &address, value);

        let mut contract = Contract::new(caller, address, value, gas, code, H256::ZERO);
        let (output, mut result) = self.run(&mut contract, false);

        let max_code_size_exceeded = output.len() as u64 > self.params.max_code_size;
        if result.is_ok() && !max_code_size_exceeded {
            let deposit_gas = (output.len() as u64).saturating_mul(self.params.create_data_gas);
            if contract.use_gas(deposit_gas) {
                self.state.set_code(&address, output.clone());
            } else {
                result = Err(EvmError::CodeStoreOutOfGas);
            }
        }

        if max_code_size_exceeded || result.is_err() {
            self.state.revert_to_snapshot(snapshot);
            if result != Err(EvmError::Revert) {
                contract.gas = 0;
            }
        }
        if max_code_size_exceeded && result.is_ok() {
            result = Err(EvmError::MaxCodeSizeExceeded);
        }

        match &result {
            Ok(()) => debug!(%address, code_size = output.len(), "contract created"),
            Err(err) => debug!(%address, error = %err, "contract creation failed"),
        }
        (ExecutionResult::from_run(output, contract.gas, result), address)
    }
}
