//! Gas cost calculations

use weft_primitives::{Address, U256};

use crate::error::{EvmError, EvmResult};
use crate::evm::Evm;
use crate::interpreter::Scope;
use crate::memory::{to_word_size, Memory};
use crate::opcode::Opcode;
use crate::word;

/// Default gas costs
pub mod cost {
    /// Zero gas
    pub const ZERO: u64 = 0;
    /// Base gas
    pub const BASE: u64 = 2;
    /// Very low gas
    pub const VERYLOW: u64 = 3;
    /// Low gas
    pub const LOW: u64 = 5;
    /// Mid gas
    pub const MID: u64 = 8;
    /// High gas
    pub const HIGH: u64 = 10;
    /// Ext gas
    pub const EXT: u64 = 20;

    /// Jump dest gas
    pub const JUMPDEST: u64 = 1;
    /// Exp base gas
    pub const EXP: u64 = 10;
    /// Exp gas per exponent byte
    pub const EXP_BYTE: u64 = 50;
    /// SHA3 base gas
    pub const SHA3: u64 = 30;
    /// SHA3 gas per word
    pub const SHA3_WORD: u64 = 6;

    /// BALANCE
    pub const BALANCE: u64 = 700;
    /// EXTCODESIZE, EXTCODECOPY base
    pub const EXTCODE: u64 = 700;
    /// EXTCODEHASH
    pub const EXTCODEHASH: u64 = 700;
    /// SLOAD
    pub const SLOAD: u64 = 800;
    /// SSTORE from zero to non-zero
    pub const SSTORE_SET: u64 = 20000;
    /// Any other SSTORE
    pub const SSTORE_RESET: u64 = 5000;
    /// Refund for clearing a slot
    pub const SSTORE_CLEAR_REFUND: u64 = 15000;

    /// Log base gas
    pub const LOG: u64 = 375;
    /// Log gas per topic
    pub const LOG_TOPIC: u64 = 375;
    /// Log gas per data byte
    pub const LOG_DATA: u64 = 8;

    /// CREATE and CREATE2
    pub const CREATE: u64 = 32000;
    /// Code deposit gas per byte
    pub const CREATE_DATA: u64 = 200;
    /// CALL family base gas
    pub const CALL: u64 = 700;
    /// Extra gas for a value transfer
    pub const CALL_VALUE: u64 = 9000;
    /// Extra gas for a value transfer that creates an account
    pub const CALL_NEW_ACCOUNT: u64 = 25000;
    /// Free gas handed to a callee receiving value
    pub const CALL_STIPEND: u64 = 2300;

    /// Memory gas per word
    pub const MEMORY: u64 = 3;
    /// Memory quadratic divisor
    pub const QUAD_COEFF_DIV: u64 = 512;
    /// Copy gas per word
    pub const COPY: u64 = 3;

    /// Intrinsic gas of a call transaction
    pub const TX: u64 = 21000;
    /// Intrinsic gas of a create transaction
    pub const TX_CREATE: u64 = 53000;
    /// Intrinsic gas per zero payload byte
    pub const TX_DATA_ZERO: u64 = 4;
    /// Intrinsic gas per non-zero payload byte
    pub const TX_DATA_NONZERO: u64 = 68;

    /// SELFDESTRUCT
    pub const SELFDESTRUCT: u64 = 5000;
    /// SELFDESTRUCT paying a previously empty beneficiary
    pub const SELFDESTRUCT_NEW_ACCOUNT: u64 = 25000;
    /// Refund for the first SELFDESTRUCT of an account
    pub const SELFDESTRUCT_REFUND: u64 = 24000;

    /// Max nested call/create depth
    pub const CALL_CREATE_DEPTH: usize = 1024;
    /// Default max deployed code size
    pub const MAX_CODE_SIZE: u64 = 1024 * 1024;
}

/// Default constant gas for an opcode
pub fn static_gas(opcode: Opcode) -> u64 {
    use Opcode::*;

    if opcode.push_size() > 0 || opcode.dup_depth() > 0 || opcode.swap_depth() > 0 {
        return cost::VERYLOW;
    }
    if (LOG0..=LOG4).contains(&opcode) {
        return cost::LOG + cost::LOG_TOPIC * opcode.log_topics() as u64;
    }
    match opcode {
        STOP | RETURN | REVERT | SSTORE | INVALID => cost::ZERO,

        ADDRESS | ORIGIN | CALLER | CALLVALUE | CALLDATASIZE | CODESIZE | GASPRICE
        | COINBASE | TIMESTAMP | NUMBER | DIFFICULTY | GASLIMIT | CHAINID | RETURNDATASIZE
        | POP | PC | MSIZE | GAS => cost::BASE,

        ADD | SUB | NOT | LT | GT | SLT | SGT | EQ | ISZERO | AND | OR | XOR | BYTE | SHL
        | SHR | SAR | CALLDATALOAD | MLOAD | MSTORE | MSTORE8 | CALLDATACOPY | CODECOPY
        | RETURNDATACOPY => cost::VERYLOW,

        MUL | DIV | SDIV | MOD | SMOD | SIGNEXTEND | SELFBALANCE => cost::LOW,

        ADDMOD | MULMOD | JUMP => cost::MID,
        JUMPI => cost::HIGH,
        JUMPDEST => cost::JUMPDEST,

        EXP => cost::EXP,
        KECCAK256 => cost::SHA3,
        BALANCE => cost::BALANCE,
        EXTCODESIZE | EXTCODECOPY => cost::EXTCODE,
        EXTCODEHASH => cost::EXTCODEHASH,
        BLOCKHASH => cost::EXT,
        SLOAD => cost::SLOAD,
        CREATE | CREATE2 => cost::CREATE,
        CALL | CALLCODE | DELEGATECALL | STATICCALL => cost::CALL,
        SELFDESTRUCT => cost::SELFDESTRUCT,

        _ => cost::ZERO,
    }
}

/// Total cost of holding `words` words of memory: `words * per_word + words^2 / quad_div`
pub fn memory_cost(words: u64, per_word: u64, quad_div: u64) -> u64 {
    let words = words as u128;
    let total = words * per_word as u128 + words * words / quad_div.max(1) as u128;
    u64::try_from(total).unwrap_or(u64::MAX)
}

/// Largest memory size whose cost still fits the gas arithmetic
const MAX_MEMORY_SIZE: u64 = 0x1F_FFFF_FFE0;

/// Gas for growing `memory` to `new_size` bytes
pub fn memory_expansion_gas(evm: &Evm<'_>, memory: &Memory, new_size: u64) -> EvmResult<u64> {
    if new_size == 0 {
        return Ok(0);
    }
    if new_size > MAX_MEMORY_SIZE {
        return Err(EvmError::GasUintOverflow);
    }
    let new_words = to_word_size(new_size);
    let old_words = memory.words();
    if new_words <= old_words {
        return Ok(0);
    }
    let params = evm.params();
    Ok(memory_cost(new_words, params.memory_gas, params.quad_coeff_div)
        - memory_cost(old_words, params.memory_gas, params.quad_coeff_div))
}

/// Gas forwarded to a callee under the 63/64 rule.
///
/// `available` is the caller's gas after the call's own costs `base`; the
/// callee receives `requested` capped at `floor(available * 63 / 64)`.
pub fn call_gas(available: u64, base: u64, requested: U256) -> EvmResult<u64> {
    let available = available.checked_sub(base).ok_or(EvmError::OutOfGas)?;
    let cap = (available as u128 * 63 / 64) as u64;
    match word::to_u64(requested) {
        Some(requested) if requested < cap => Ok(requested),
        _ => Ok(cap),
    }
}

fn checked_add(a: u64, b: u64) -> EvmResult<u64> {
    a.checked_add(b).ok_or(EvmError::GasUintOverflow)
}

fn per_word(len: U256, cost: u64) -> EvmResult<u64> {
    let len = word::to_u64(len).ok_or(EvmError::GasUintOverflow)?;
    to_word_size(len)
        .checked_mul(cost)
        .ok_or(EvmError::GasUintOverflow)
}

pub(crate) fn gas_memory(evm: &mut Evm<'_>, scope: &Scope<'_>, memory_size: u64) -> EvmResult<u64> {
    memory_expansion_gas(evm, &scope.memory, memory_size)
}

fn copy_gas_at(evm: &Evm<'_>, scope: &Scope<'_>, memory_size: u64, len_pos: usize) -> EvmResult<u64> {
    let gas = memory_expansion_gas(evm, &scope.memory, memory_size)?;
    let words = per_word(scope.stack.peek_at(len_pos)?, evm.params().copy_gas)?;
    checked_add(gas, words)
}

pub(crate) fn gas_copy(evm: &mut Evm<'_>, scope: &Scope<'_>, memory_size: u64) -> EvmResult<u64> {
    copy_gas_at(evm, scope, memory_size, 2)
}

pub(crate) fn gas_ext_code_copy(
    evm: &mut Evm<'_>,
    scope: &Scope<'_>,
    memory_size: u64,
) -> EvmResult<u64> {
    copy_gas_at(evm, scope, memory_size, 3)
}

pub(crate) fn gas_sha3(evm: &mut Evm<'_>, scope: &Scope<'_>, memory_size: u64) -> EvmResult<u64> {
    let gas = memory_expansion_gas(evm, &scope.memory, memory_size)?;
    let words = per_word(scope.stack.peek_at(1)?, evm.params().sha3_word_gas)?;
    checked_add(gas, words)
}

pub(crate) fn gas_create2(evm: &mut Evm<'_>, scope: &Scope<'_>, memory_size: u64) -> EvmResult<u64> {
    let gas = memory_expansion_gas(evm, &scope.memory, memory_size)?;
    let words = per_word(scope.stack.peek_at(2)?, evm.params().sha3_word_gas)?;
    checked_add(gas, words)
}

pub(crate) fn gas_exp(evm: &mut Evm<'_>, scope: &Scope<'_>, _memory_size: u64) -> EvmResult<u64> {
    let exponent_bytes = (scope.stack.peek_at(1)?.bits() as u64).div_ceil(8);
    exponent_bytes
        .checked_mul(evm.params().exp_byte_gas)
        .ok_or(EvmError::GasUintOverflow)
}

pub(crate) fn gas_log(evm: &mut Evm<'_>, scope: &Scope<'_>, memory_size: u64) -> EvmResult<u64> {
    let gas = memory_expansion_gas(evm, &scope.memory, memory_size)?;
    let len = word::to_u64(scope.stack.peek_at(1)?).ok_or(EvmError::GasUintOverflow)?;
    let data = len
        .checked_mul(evm.params().log_data_gas)
        .ok_or(EvmError::GasUintOverflow)?;
    checked_add(gas, data)
}

/// Legacy SSTORE pricing: setting a zero slot costs the set price, clearing
/// a slot earns a refund, everything else costs the reset price.
pub(crate) fn gas_sstore(evm: &mut Evm<'_>, scope: &Scope<'_>, _memory_size: u64) -> EvmResult<u64> {
    let key = scope.stack.peek_at(0)?;
    let new_value = scope.stack.peek_at(1)?;
    let address = scope.contract.address;
    let current = evm.state.get_state(&address, &key.into());
    let params = evm.params();
    let (set, reset, refund) = (
        params.sstore_set_gas,
        params.sstore_reset_gas,
        params.sstore_clear_refund,
    );

    if current.is_zero() && !new_value.is_zero() {
        Ok(set)
    } else if !current.is_zero() && new_value.is_zero() {
        evm.state.add_refund(refund);
        Ok(reset)
    } else {
        Ok(reset)
    }
}

fn call_target(scope: &Scope<'_>) -> EvmResult<Address> {
    Ok(Address::from_word(scope.stack.peek_at(1)?))
}

fn finish_call_gas(
    evm: &mut Evm<'_>,
    scope: &Scope<'_>,
    memory_size: u64,
    mut gas: u64,
) -> EvmResult<u64> {
    gas = checked_add(gas, memory_expansion_gas(evm, &scope.memory, memory_size)?)?;
    let forwarded = call_gas(scope.contract.gas, gas, scope.stack.peek_at(0)?)?;
    evm.call_gas_temp = forwarded;
    checked_add(gas, forwarded)
}

pub(crate) fn gas_call(evm: &mut Evm<'_>, scope: &Scope<'_>, memory_size: u64) -> EvmResult<u64> {
    let transfers_value = !scope.stack.peek_at(2)?.is_zero();
    let target = call_target(scope)?;
    let mut gas = 0;
    if transfers_value && evm.state.empty(&target) {
        gas += evm.params().call_new_account_gas;
    }
    if transfers_value {
        gas += evm.params().call_value_transfer_gas;
    }
    finish_call_gas(evm, scope, memory_size, gas)
}

pub(crate) fn gas_call_code(evm: &mut Evm<'_>, scope: &Scope<'_>, memory_size: u64) -> EvmResult<u64> {
    let gas = if scope.stack.peek_at(2)?.is_zero() {
        0
    } else {
        evm.params().call_value_transfer_gas
    };
    finish_call_gas(evm, scope, memory_size, gas)
}

pub(crate) fn gas_delegate_or_static_call(
    evm: &mut Evm<'_>,
    scope: &Scope<'_>,
    memory_size: u64,
) -> EvmResult<u64> {
    finish_call_gas(evm, scope, memory_size, 0)
}

pub(crate) fn gas_selfdestruct(evm: &mut Evm<'_>, scope: &Scope<'_>, _memory_size: u64) -> EvmResult<u64> {
    let beneficiary = Address::from_word(scope.stack.peek_at(0)?);
    let address = scope.contract.address;
    let mut gas = 0;
    if evm.state.empty(&beneficiary) && !evm.state.get_balance(&address).is_zero() {
        gas += evm.params().create_by_selfdestruct_gas;
    }
    if !evm.state.has_suicided(&address) {
        let refund = evm.params().selfdestruct_refund_gas;
        evm.state.add_refund(refund);
    }
    Ok(gas)
}
