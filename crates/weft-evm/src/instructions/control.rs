//! Stack, memory, storage, flow and logging instructions

use weft_primitives::{H256, U256};

use super::as_usize;
use crate::error::{EvmError, EvmResult};
use crate::evm::Evm;
use crate::interpreter::{Control, Scope};
use crate::log::Log;
use crate::opcode::Opcode;

pub(crate) fn op_stop(_evm: &mut Evm<'_>, _scope: &mut Scope<'_>) -> EvmResult<Control> {
    Ok(Control::Stop(Vec::new()))
}

pub(crate) fn op_pop(_evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    scope.stack.pop()?;
    Ok(Control::Continue)
}

pub(crate) fn op_mload(_evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let offset = scope.stack.pop()?;
    let value = scope.memory.get_word(as_usize(offset));
    scope.stack.push(value)?;
    Ok(Control::Continue)
}

pub(crate) fn op_mstore(_evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let offset = scope.stack.pop()?;
    let value = scope.stack.pop()?;
    scope.memory.set_word(as_usize(offset), value);
    Ok(Control::Continue)
}

pub(crate) fn op_mstore8(_evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let offset = scope.stack.pop()?;
    let value = scope.stack.pop()?;
    scope.memory.set_byte(as_usize(offset), value.byte(0));
    Ok(Control::Continue)
}

pub(crate) fn op_sload(evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let key = H256::from_word(scope.stack.pop()?);
    let value = evm.state.get_state(&scope.contract.address, &key);
    scope.stack.push(value.to_word())?;
    Ok(Control::Continue)
}

pub(crate) fn op_sstore(evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let key = H256::from_word(scope.stack.pop()?);
    let value = H256::from_word(scope.stack.pop()?);
    evm.state.set_state(&scope.contract.address, key, value);
    Ok(Control::Continue)
}

fn jump_to(scope: &mut Scope<'_>, dest: U256) -> EvmResult<Control> {
    if !scope.contract.valid_jump_dest(dest) {
        return Err(EvmError::InvalidJump(as_usize(dest)));
    }
    scope.pc = as_usize(dest);
    Ok(Control::Jump)
}

pub(crate) fn op_jump(_evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let dest = scope.stack.pop()?;
    jump_to(scope, dest)
}

pub(crate) fn op_jumpi(_evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let dest = scope.stack.pop()?;
    let condition = scope.stack.pop()?;
    if condition.is_zero() {
        Ok(Control::Continue)
    } else {
        jump_to(scope, dest)
    }
}

pub(crate) fn op_jumpdest(_evm: &mut Evm<'_>, _scope: &mut Scope<'_>) -> EvmResult<Control> {
    Ok(Control::Continue)
}

pub(crate) fn op_pc(_evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    scope.stack.push(U256::from(scope.pc))?;
    Ok(Control::Continue)
}

pub(crate) fn op_msize(_evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    scope.stack.push(U256::from(scope.memory.len()))?;
    Ok(Control::Continue)
}

pub(crate) fn op_gas(_evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    scope.stack.push(U256::from(scope.contract.gas))?;
    Ok(Control::Continue)
}

fn current_opcode(scope: &Scope<'_>) -> EvmResult<Opcode> {
    let byte = scope.contract.get_op(scope.pc);
    Opcode::from_byte(byte).ok_or(EvmError::InvalidOpcode(byte))
}

/// PUSH1..PUSH32. Immediates running past the end of the code are
/// right-padded with zeros.
pub(crate) fn op_push(_evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let size = current_opcode(scope)?.push_size();
    let code = &scope.contract.code;
    let start = (scope.pc + 1).min(code.len());
    let end = (start + size).min(code.len());

    let mut bytes = [0u8; 32];
    bytes[..end - start].copy_from_slice(&code[start..end]);
    let value = U256::from_big_endian(&bytes[..size]);

    scope.stack.push(value)?;
    scope.pc += size;
    Ok(Control::Continue)
}

pub(crate) fn op_dup(_evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let depth = current_opcode(scope)?.dup_depth();
    scope.stack.dup(depth)?;
    Ok(Control::Continue)
}

pub(crate) fn op_swap(_evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let depth = current_opcode(scope)?.swap_depth();
    scope.stack.swap(depth)?;
    Ok(Control::Continue)
}

pub(crate) fn op_log(evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
    let count = current_opcode(scope)?.log_topics();
    let offset = scope.stack.pop()?;
    let size = scope.stack.pop()?;
    let mut topics = Vec::with_capacity(count);
    for _ in 0..count {
        topics.push(H256::from_word(scope.stack.pop()?));
    }
    let data = scope.memory.get(as_usize(offset), as_usize(size));

    evm.state.add_log(Log {
        address: scope.contract.address,
        topics,
        data,
        block_number: evm.context.block.number,
    });
    Ok(Control::Continue)
}
