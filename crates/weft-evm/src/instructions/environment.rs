//! Hashing, call environment and block information instructions

use weft_crypto::keccak256;
use weft_primitives::{Address, U256};

use super::{as_usize, get_data};
use crate::error::{EvmError, EvmResult};
use crate::evm::Evm;
use crate::interpreter::{Control, Scope};
use crate::word;

fn push(scope: &mut Scope<'_>, value: U256) -> EvmResult<Control> {
    scope.stack.push(value)?;
    Ok(Control::Continue)
}

fn pop_address(scope: &mut Scope<'_>) -> EvmResult<Address> {
    Ok(Address::from_word(scope.stack.pop()?))
}

pub(crate) fn op_keccak256(_evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let offset = scope.stack.pop()?;
    let size = scope.stack.pop()?;
    let data = scope.memory.get(as_usize(offset), as_usize(size));
    push(scope, keccak256(&data).to_word())
}

pub(crate) fn op_address(_evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let address = scope.contract.address.to_word();
    push(scope, address)
}

pub(crate) fn op_balance(evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let address = pop_address(scope)?;
    push(scope, evm.state.get_balance(&address))
}

pub(crate) fn op_origin(evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    push(scope, evm.context.tx.origin.to_word())
}

pub(crate) fn op_caller(_evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let caller = scope.contract.caller.to_word();
    push(scope, caller)
}

pub(crate) fn op_callvalue(_evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let value = scope.contract.value;
    push(scope, value)
}

pub(crate) fn op_calldataload(_evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let offset = scope.stack.pop()?;
    let data = get_data(&scope.contract.input, offset, 32);
    push(scope, U256::from_big_endian(&data))
}

pub(crate) fn op_calldatasize(_evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let size = U256::from(scope.contract.input.len());
    push(scope, size)
}

pub(crate) fn op_calldatacopy(_evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let mem_offset = scope.stack.pop()?;
    let data_offset = scope.stack.pop()?;
    let len = scope.stack.pop()?;
    let data = get_data(&scope.contract.input, data_offset, as_usize(len));
    scope.memory.set(as_usize(mem_offset), &data);
    Ok(Control::Continue)
}

pub(crate) fn op_codesize(_evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let size = U256::from(scope.contract.code.len());
    push(scope, size)
}

pub(crate) fn op_codecopy(_evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let mem_offset = scope.stack.pop()?;
    let code_offset = scope.stack.pop()?;
    let len = scope.stack.pop()?;
    let data = get_data(&scope.contract.code, code_offset, as_usize(len));
    scope.memory.set(as_usize(mem_offset), &data);
    Ok(Control::Continue)
}

pub(crate) fn op_gasprice(evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    push(scope, evm.context.tx.gas_price)
}

pub(crate) fn op_extcodesize(evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let address = pop_address(scope)?;
    push(scope, U256::from(evm.state.get_code_size(&address)))
}

pub(crate) fn op_extcodecopy(evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let address = pop_address(scope)?;
    let mem_offset = scope.stack.pop()?;
    let code_offset = scope.stack.pop()?;
    let len = scope.stack.pop()?;
    let code = evm.state.get_code(&address);
    let data = get_data(&code, code_offset, as_usize(len));
    scope.memory.set(as_usize(mem_offset), &data);
    Ok(Control::Continue)
}

pub(crate) fn op_returndatasize(evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    push(scope, U256::from(evm.interpreter.return_data.len()))
}

pub(crate) fn op_returndatacopy(evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let mem_offset = scope.stack.pop()?;
    let data_offset = scope.stack.pop()?;
    let len = scope.stack.pop()?;

    let start = word::to_u64(data_offset).ok_or(EvmError::ReturnDataOutOfBounds)?;
    let len = word::to_u64(len).ok_or(EvmError::ReturnDataOutOfBounds)?;
    let end = start
        .checked_add(len)
        .ok_or(EvmError::ReturnDataOutOfBounds)?;
    let return_data = &evm.interpreter.return_data;
    if end > return_data.len() as u64 {
        return Err(EvmError::ReturnDataOutOfBounds);
    }
    scope
        .memory
        .set(as_usize(mem_offset), &return_data[start as usize..end as usize]);
    Ok(Control::Continue)
}

pub(crate) fn op_extcodehash(evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let address = pop_address(scope)?;
    let hash = if evm.state.empty(&address) {
        U256::zero()
    } else {
        evm.state.get_code_hash(&address).to_word()
    };
    push(scope, hash)
}

pub(crate) fn op_blockhash(evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let number = scope.stack.pop()?;
    push(scope, evm.context.block_hash(number).to_word())
}

pub(crate) fn op_coinbase(evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    push(scope, evm.context.block.coinbase.to_word())
}

pub(crate) fn op_timestamp(evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    push(scope, U256::from(evm.context.block.time))
}

pub(crate) fn op_number(evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    push(scope, U256::from(evm.context.block.number))
}

pub(crate) fn op_difficulty(evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    push(scope, evm.context.block.difficulty)
}

pub(crate) fn op_gaslimit(evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    push(scope, U256::from(evm.context.block.gas_limit))
}

pub(crate) fn op_chainid(evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    push(scope, evm.context.block.chain_id)
}

pub(crate) fn op_selfbalance(evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let address = scope.contract.address;
    push(scope, evm.state.get_balance(&address))
}
