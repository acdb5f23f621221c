//! Contract creation, nested calls and frame termination

use weft_primitives::{Address, H256, U256};

use super::as_usize;
use crate::error::{EvmResult, ExecutionResult};
use crate::evm::Evm;
use crate::gas;
use crate::interpreter::{Control, Scope};
use crate::word;

/// Gas a CREATE hands to the new frame: all but one 64th of what is left
fn take_create_gas(scope: &mut Scope<'_>) -> EvmResult<u64> {
    let gas = gas::call_gas(scope.contract.gas, 0, U256::MAX)?;
    scope.contract.use_gas(gas);
    Ok(gas)
}

fn finish_create(
    evm: &mut Evm<'_>,
    scope: &mut Scope<'_>,
    result: ExecutionResult,
    address: Address,
) -> EvmResult<Control> {
    let pushed = if result.is_success() {
        address.to_word()
    } else {
        U256::zero()
    };
    scope.stack.push(pushed)?;
    scope.contract.gas = scope.contract.gas.saturating_add(result.gas_left);
    evm.interpreter.return_data = if result.is_revert() {
        result.output
    } else {
        Vec::new()
    };
    Ok(Control::Continue)
}

pub(crate) fn op_create(evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let value = scope.stack.pop()?;
    let offset = scope.stack.pop()?;
    let size = scope.stack.pop()?;
    let init_code = scope.memory.get(as_usize(offset), as_usize(size));
    let gas = take_create_gas(scope)?;

    let (result, address) = evm.create(scope.contract.address, init_code, gas, value);
    finish_create(evm, scope, result, address)
}

pub(crate) fn op_create2(evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let value = scope.stack.pop()?;
    let offset = scope.stack.pop()?;
    let size = scope.stack.pop()?;
    let salt = H256::from_word(scope.stack.pop()?);
    let init_code = scope.memory.get(as_usize(offset), as_usize(size));
    let gas = take_create_gas(scope)?;

    let (result, address) = evm.create2(scope.contract.address, init_code, gas, value, salt);
    finish_create(evm, scope, result, address)
}

/// Push the success flag, copy output into memory and refund unused gas
fn finish_call(
    evm: &mut Evm<'_>,
    scope: &mut Scope<'_>,
    result: ExecutionResult,
    ret_offset: U256,
    ret_size: U256,
) -> EvmResult<Control> {
    scope.stack.push(word::from_bool(result.is_success()))?;
    if result.is_success() || result.is_revert() {
        let len = as_usize(ret_size).min(result.output.len());
        scope
            .memory
            .set(as_usize(ret_offset), &result.output[..len]);
    }
    scope.contract.gas = scope.contract.gas.saturating_add(result.gas_left);
    evm.interpreter.return_data = result.output;
    Ok(Control::Continue)
}

pub(crate) fn op_call(evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    scope.stack.pop()?;
    let mut gas = evm.call_gas_temp;
    let to = Address::from_word(scope.stack.pop()?);
    let value = scope.stack.pop()?;
    let in_offset = scope.stack.pop()?;
    let in_size = scope.stack.pop()?;
    let ret_offset = scope.stack.pop()?;
    let ret_size = scope.stack.pop()?;
    let input = scope.memory.get(as_usize(in_offset), as_usize(in_size));

    if !value.is_zero() {
        gas = gas.saturating_add(evm.params().call_stipend);
    }
    let result = evm.call(scope.contract.address, to, input, gas, value);
    finish_call(evm, scope, result, ret_offset, ret_size)
}

pub(crate) fn op_call_code(evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    scope.stack.pop()?;
    let mut gas = evm.call_gas_temp;
    let to = Address::from_word(scope.stack.pop()?);
    let value = scope.stack.pop()?;
    let in_offset = scope.stack.pop()?;
    let in_size = scope.stack.pop()?;
    let ret_offset = scope.stack.pop()?;
    let ret_size = scope.stack.pop()?;
    let input = scope.memory.get(as_usize(in_offset), as_usize(in_size));

    if !value.is_zero() {
        gas = gas.saturating_add(evm.params().call_stipend);
    }
    let result = evm.call_code(scope.contract.address, to, input, gas, value);
    finish_call(evm, scope, result, ret_offset, ret_size)
}

pub(crate) fn op_delegate_call(evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    scope.stack.pop()?;
    let gas = evm.call_gas_temp;
    let to = Address::from_word(scope.stack.pop()?);
    let in_offset = scope.stack.pop()?;
    let in_size = scope.stack.pop()?;
    let ret_offset = scope.stack.pop()?;
    let ret_size = scope.stack.pop()?;
    let input = scope.memory.get(as_usize(in_offset), as_usize(in_size));

    let result = evm.delegate_call(&*scope.contract, to, input, gas);
    finish_call(evm, scope, result, ret_offset, ret_size)
}

pub(crate) fn op_static_call(evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    scope.stack.pop()?;
    let gas = evm.call_gas_temp;
    let to = Address::from_word(scope.stack.pop()?);
    let in_offset = scope.stack.pop()?;
    let in_size = scope.stack.pop()?;
    let ret_offset = scope.stack.pop()?;
    let ret_size = scope.stack.pop()?;
    let input = scope.memory.get(as_usize(in_offset), as_usize(in_size));

    let result = evm.static_call(scope.contract.address, to, input, gas);
    finish_call(evm, scope, result, ret_offset, ret_size)
}

pub(crate) fn op_return(_evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let offset = scope.stack.pop()?;
    let size = scope.stack.pop()?;
    Ok(Control::Stop(
        scope.memory.get(as_usize(offset), as_usize(size)),
    ))
}

pub(crate) fn op_revert(_evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let offset = scope.stack.pop()?;
    let size = scope.stack.pop()?;
    Ok(Control::Revert(
        scope.memory.get(as_usize(offset), as_usize(size)),
    ))
}

pub(crate) fn op_selfdestruct(evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let beneficiary = Address::from_word(scope.stack.pop()?);
    let address = scope.contract.address;
    let balance = evm.state.get_balance(&address);
    evm.state.add_balance(&beneficiary, balance);
    evm.state.suicide(&address);
    Ok(Control::Stop(Vec::new()))
}
