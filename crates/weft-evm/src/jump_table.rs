//! Opcode dispatch table

use weft_primitives::U256;

use crate::error::{EvmError, EvmResult};
use crate::evm::Evm;
use crate::gas;
use crate::instructions::{arithmetic, control, environment, system};
use crate::interpreter::{Control, Scope};
use crate::opcode::Opcode;
use crate::params::VmParams;
use crate::stack::{Stack, STACK_LIMIT};
use crate::word;

/// Executes an instruction
pub type ExecuteFn = fn(&mut Evm<'_>, &mut Scope<'_>) -> EvmResult<Control>;
/// Computes the gas an instruction costs on top of its constant gas.
/// Receives the word-aligned memory size the instruction needs.
pub type GasFn = fn(&mut Evm<'_>, &Scope<'_>, u64) -> EvmResult<u64>;
/// Computes the memory size in bytes an instruction touches
pub type MemorySizeFn = fn(&Stack) -> EvmResult<u64>;

/// Everything the interpreter needs to run one opcode
#[derive(Clone, Copy)]
pub struct Operation {
    /// Instruction body
    pub execute: ExecuteFn,
    /// Gas charged before anything else
    pub constant_gas: u64,
    /// Operand-dependent gas
    pub dynamic_gas: Option<GasFn>,
    /// Memory the instruction touches
    pub memory_size: Option<MemorySizeFn>,
    /// Fewest stack items the instruction needs
    pub min_stack: usize,
    /// Most stack items allowed before the instruction would overflow
    pub max_stack: usize,
    /// Modifies state, forbidden in static frames
    pub writes: bool,
}

impl Operation {
    fn new(execute: ExecuteFn, constant_gas: u64, pops: usize, pushes: usize) -> Self {
        Self {
            execute,
            constant_gas,
            dynamic_gas: None,
            memory_size: None,
            min_stack: pops,
            max_stack: STACK_LIMIT + pops - pushes,
            writes: false,
        }
    }

    fn gas(mut self, dynamic_gas: GasFn) -> Self {
        self.dynamic_gas = Some(dynamic_gas);
        self
    }

    fn memory(mut self, memory_size: MemorySizeFn) -> Self {
        self.memory_size = Some(memory_size);
        self
    }

    fn writes(mut self) -> Self {
        self.writes = true;
        self
    }
}

/// Immutable opcode table, built once from the gas parameters and handed
/// to the interpreter
pub struct JumpTable {
    table: [Option<Operation>; 256],
}

impl JumpTable {
    /// Build the table, taking constant gas from `params`
    pub fn new(params: &VmParams) -> Self {
        let mut table = [None; 256];
        for byte in 0..=u8::MAX {
            table[byte as usize] =
                Opcode::from_byte(byte).and_then(|opcode| operation(opcode, params.op_gas(byte)));
        }
        Self { table }
    }

    /// Operation for an opcode byte, `None` when undefined
    pub fn get(&self, byte: u8) -> Option<&Operation> {
        self.table[byte as usize].as_ref()
    }
}

fn operation(opcode: Opcode, constant_gas: u64) -> Option<Operation> {
    use arithmetic::*;
    use control::*;
    use environment::*;
    use system::*;
    use Opcode::*;

    let op = |execute: ExecuteFn, pops: usize, pushes: usize| {
        Operation::new(execute, constant_gas, pops, pushes)
    };

    if opcode.push_size() > 0 {
        return Some(op(op_push, 0, 1));
    }
    let depth = opcode.dup_depth();
    if depth > 0 {
        return Some(op(op_dup, depth, depth + 1));
    }
    let depth = opcode.swap_depth();
    if depth > 0 {
        return Some(op(op_swap, depth + 1, depth + 1));
    }
    if (LOG0..=LOG4).contains(&opcode) {
        let topics = opcode.log_topics();
        return Some(
            op(op_log, topics + 2, 0)
                .gas(gas::gas_log)
                .memory(memory_log)
                .writes(),
        );
    }

    let operation = match opcode {
        STOP => op(op_stop, 0, 0),
        ADD => op(op_add, 2, 1),
        MUL => op(op_mul, 2, 1),
        SUB => op(op_sub, 2, 1),
        DIV => op(op_div, 2, 1),
        SDIV => op(op_sdiv, 2, 1),
        MOD => op(op_mod, 2, 1),
        SMOD => op(op_smod, 2, 1),
        ADDMOD => op(op_addmod, 3, 1),
        MULMOD => op(op_mulmod, 3, 1),
        EXP => op(op_exp, 2, 1).gas(gas::gas_exp),
        SIGNEXTEND => op(op_signextend, 2, 1),

        LT => op(op_lt, 2, 1),
        GT => op(op_gt, 2, 1),
        SLT => op(op_slt, 2, 1),
        SGT => op(op_sgt, 2, 1),
        EQ => op(op_eq, 2, 1),
        ISZERO => op(op_iszero, 1, 1),
        AND => op(op_and, 2, 1),
        OR => op(op_or, 2, 1),
        XOR => op(op_xor, 2, 1),
        NOT => op(op_not, 1, 1),
        BYTE => op(op_byte, 2, 1),
        SHL => op(op_shl, 2, 1),
        SHR => op(op_shr, 2, 1),
        SAR => op(op_sar, 2, 1),

        KECCAK256 => op(op_keccak256, 2, 1)
            .gas(gas::gas_sha3)
            .memory(memory_keccak256),

        ADDRESS => op(op_address, 0, 1),
        BALANCE => op(op_balance, 1, 1),
        ORIGIN => op(op_origin, 0, 1),
        CALLER => op(op_caller, 0, 1),
        CALLVALUE => op(op_callvalue, 0, 1),
        CALLDATALOAD => op(op_calldataload, 1, 1),
        CALLDATASIZE => op(op_calldatasize, 0, 1),
        CALLDATACOPY => op(op_calldatacopy, 3, 0)
            .gas(gas::gas_copy)
            .memory(memory_copy),
        CODESIZE => op(op_codesize, 0, 1),
        CODECOPY => op(op_codecopy, 3, 0)
            .gas(gas::gas_copy)
            .memory(memory_copy),
        GASPRICE => op(op_gasprice, 0, 1),
        EXTCODESIZE => op(op_extcodesize, 1, 1),
        EXTCODECOPY => op(op_extcodecopy, 4, 0)
            .gas(gas::gas_ext_code_copy)
            .memory(memory_ext_code_copy),
        RETURNDATASIZE => op(op_returndatasize, 0, 1),
        RETURNDATACOPY => op(op_returndatacopy, 3, 0)
            .gas(gas::gas_copy)
            .memory(memory_copy),
        EXTCODEHASH => op(op_extcodehash, 1, 1),

        BLOCKHASH => op(op_blockhash, 1, 1),
        COINBASE => op(op_coinbase, 0, 1),
        TIMESTAMP => op(op_timestamp, 0, 1),
        NUMBER => op(op_number, 0, 1),
        DIFFICULTY => op(op_difficulty, 0, 1),
        GASLIMIT => op(op_gaslimit, 0, 1),
        CHAINID => op(op_chainid, 0, 1),
        SELFBALANCE => op(op_selfbalance, 0, 1),

        POP => op(op_pop, 1, 0),
        MLOAD => op(op_mload, 1, 1)
            .gas(gas::gas_memory)
            .memory(memory_mload),
        MSTORE => op(op_mstore, 2, 0)
            .gas(gas::gas_memory)
            .memory(memory_mstore),
        MSTORE8 => op(op_mstore8, 2, 0)
            .gas(gas::gas_memory)
            .memory(memory_mstore8),
        SLOAD => op(op_sload, 1, 1),
        SSTORE => op(op_sstore, 2, 0).gas(gas::gas_sstore).writes(),
        JUMP => op(op_jump, 1, 0),
        JUMPI => op(op_jumpi, 2, 0),
        PC => op(op_pc, 0, 1),
        MSIZE => op(op_msize, 0, 1),
        GAS => op(op_gas, 0, 1),
        JUMPDEST => op(op_jumpdest, 0, 0),

        CREATE => op(op_create, 3, 1)
            .gas(gas::gas_memory)
            .memory(memory_create)
            .writes(),
        CALL => op(op_call, 7, 1)
            .gas(gas::gas_call)
            .memory(memory_call),
        CALLCODE => op(op_call_code, 7, 1)
            .gas(gas::gas_call_code)
            .memory(memory_call),
        RETURN => op(op_return, 2, 0)
            .gas(gas::gas_memory)
            .memory(memory_return),
        DELEGATECALL => op(op_delegate_call, 6, 1)
            .gas(gas::gas_delegate_or_static_call)
            .memory(memory_delegate_or_static_call),
        CREATE2 => op(op_create2, 4, 1)
            .gas(gas::gas_create2)
            .memory(memory_create)
            .writes(),
        STATICCALL => op(op_static_call, 6, 1)
            .gas(gas::gas_delegate_or_static_call)
            .memory(memory_delegate_or_static_call),
        REVERT => op(op_revert, 2, 0)
            .gas(gas::gas_memory)
            .memory(memory_return),
        SELFDESTRUCT => op(op_selfdestruct, 1, 0)
            .gas(gas::gas_selfdestruct)
            .writes(),

        _ => return None,
    };
    Some(operation)
}

/// Bytes touched by an access of `len` bytes at `offset`; nothing when
/// `len` is zero
fn mem_size(offset: U256, len: U256) -> EvmResult<u64> {
    if len.is_zero() {
        return Ok(0);
    }
    let offset = word::to_u64(offset).ok_or(EvmError::GasUintOverflow)?;
    let len = word::to_u64(len).ok_or(EvmError::GasUintOverflow)?;
    offset.checked_add(len).ok_or(EvmError::GasUintOverflow)
}

fn mem_at(stack: &Stack, offset: usize, len: usize) -> EvmResult<u64> {
    mem_size(stack.peek_at(offset)?, stack.peek_at(len)?)
}

fn memory_keccak256(stack: &Stack) -> EvmResult<u64> {
    mem_at(stack, 0, 1)
}

fn memory_copy(stack: &Stack) -> EvmResult<u64> {
    mem_at(stack, 0, 2)
}

fn memory_ext_code_copy(stack: &Stack) -> EvmResult<u64> {
    mem_at(stack, 1, 3)
}

fn memory_mload(stack: &Stack) -> EvmResult<u64> {
    mem_size(stack.peek_at(0)?, U256::from(32u64))
}

fn memory_mstore(stack: &Stack) -> EvmResult<u64> {
    mem_size(stack.peek_at(0)?, U256::from(32u64))
}

fn memory_mstore8(stack: &Stack) -> EvmResult<u64> {
    mem_size(stack.peek_at(0)?, U256::one())
}

fn memory_create(stack: &Stack) -> EvmResult<u64> {
    mem_at(stack, 1, 2)
}

fn memory_return(stack: &Stack) -> EvmResult<u64> {
    mem_at(stack, 0, 1)
}

fn memory_log(stack: &Stack) -> EvmResult<u64> {
    mem_at(stack, 0, 1)
}

fn memory_call(stack: &Stack) -> EvmResult<u64> {
    let input = mem_at(stack, 3, 4)?;
    let output = mem_at(stack, 5, 6)?;
    Ok(input.max(output))
}

fn memory_delegate_or_static_call(stack: &Stack) -> EvmResult<u64> {
    let input = mem_at(stack, 2, 3)?;
    let output = mem_at(stack, 4, 5)?;
    Ok(input.max(output))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_opcodes_are_missing() {
        let table = JumpTable::new(&VmParams::default());
        assert!(table.get(0x0c).is_none());
        assert!(table.get(0x5f).is_none());
        assert!(table.get(Opcode::INVALID.byte()).is_none());
        assert!(table.get(0xef).is_none());
    }

    #[test]
    fn test_stack_bounds() {
        let table = JumpTable::new(&VmParams::default());
        let add = table.get(Opcode::ADD.byte()).unwrap();
        assert_eq!(add.min_stack, 2);
        assert_eq!(add.max_stack, STACK_LIMIT + 1);

        let push = table.get(Opcode::PUSH1.byte()).unwrap();
        assert_eq!(push.min_stack, 0);
        assert_eq!(push.max_stack, STACK_LIMIT - 1);

        let dup16 = table.get(Opcode::DUP16.byte()).unwrap();
        assert_eq!(dup16.min_stack, 16);
        assert_eq!(dup16.max_stack, STACK_LIMIT - 1);

        let swap1 = table.get(Opcode::SWAP1.byte()).unwrap();
        assert_eq!(swap1.min_stack, 2);
        assert_eq!(swap1.max_stack, STACK_LIMIT);
    }

    #[test]
    fn test_constant_gas_comes_from_params() {
        let mut params = VmParams::default();
        params.op_gas[Opcode::SLOAD.byte() as usize] = 200;
        let table = JumpTable::new(&params);
        assert_eq!(table.get(Opcode::SLOAD.byte()).unwrap().constant_gas, 200);
        assert_eq!(table.get(Opcode::ADD.byte()).unwrap().constant_gas, 3);
    }

    #[test]
    fn test_state_modifying_ops_are_marked() {
        let table = JumpTable::new(&VmParams::default());
        for op in [
            Opcode::SSTORE,
            Opcode::LOG0,
            Opcode::LOG4,
            Opcode::CREATE,
            Opcode::CREATE2,
            Opcode::SELFDESTRUCT,
        ] {
            assert!(table.get(op.byte()).unwrap().writes, "{:?}", op);
        }
        assert!(!table.get(Opcode::CALL.byte()).unwrap().writes);
        assert!(!table.get(Opcode::SLOAD.byte()).unwrap().writes);
    }

    #[test]
    fn test_mem_size() {
        assert_eq!(mem_size(U256::MAX, U256::zero()), Ok(0));
        assert_eq!(mem_size(U256::from(10u64), U256::from(5u64)), Ok(15));
        assert_eq!(
            mem_size(U256::MAX, U256::one()),
            Err(EvmError::GasUintOverflow)
        );
        assert_eq!(
            mem_size(U256::from(u64::MAX), U256::one()),
            Err(EvmError::GasUintOverflow)
        );
    }
}
