//! Fetch-decode-execute loop for one call frame

use std::sync::atomic::Ordering;

use tracing::trace;

use crate::contract::Contract;
use crate::error::{EvmError, EvmResult};
use crate::evm::Evm;
use crate::jump_table::JumpTable;
use crate::memory::{to_word_size, Memory};
use crate::opcode::Opcode;
use crate::stack::Stack;

/// What the interpreter does after an instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    /// Advance to the next instruction
    Continue,
    /// The instruction moved the program counter itself
    Jump,
    /// Halt successfully with output
    Stop(Vec<u8>),
    /// Halt with REVERT and revert data
    Revert(Vec<u8>),
}

/// Mutable state of the frame being executed
pub struct Scope<'c> {
    /// Operand stack
    pub stack: Stack,
    /// Frame memory
    pub memory: Memory,
    /// Frame being executed
    pub contract: &'c mut Contract,
    /// Program counter
    pub pc: usize,
}

impl<'c> Scope<'c> {
    fn new(contract: &'c mut Contract) -> Self {
        Self {
            stack: Stack::new(),
            memory: Memory::new(),
            contract,
            pc: 0,
        }
    }
}

/// Interpreter configured with an opcode table.
///
/// One interpreter serves every frame of a transaction; the read-only flag
/// and the return buffer are shared across nested frames.
pub struct Interpreter<'a> {
    table: &'a JumpTable,
    pub(crate) read_only: bool,
    pub(crate) return_data: Vec<u8>,
}

impl<'a> Interpreter<'a> {
    /// Create an interpreter dispatching through `table`
    pub fn new(table: &'a JumpTable) -> Self {
        Self {
            table,
            read_only: false,
            return_data: Vec::new(),
        }
    }

    /// Whether state modification is currently forbidden
    pub fn read_only(&self) -> bool {
        self.read_only
    }

    /// Output of the most recent nested call
    pub fn return_data(&self) -> &[u8] {
        &self.return_data
    }
}

impl<'a> Evm<'a> {
    /// Run `contract` until it halts. `read_only` makes this frame and
    /// everything it calls static.
    pub(crate) fn run(&mut self, contract: &mut Contract, read_only: bool) -> (Vec<u8>, EvmResult<()>) {
        self.depth += 1;
        let enter_static = read_only && !self.interpreter.read_only;
        if enter_static {
            self.interpreter.read_only = true;
        }
        self.interpreter.return_data.clear();

        let result = if contract.code.is_empty() {
            (Vec::new(), Ok(()))
        } else {
            self.execute(contract)
        };

        if enter_static {
            self.interpreter.read_only = false;
        }
        self.depth -= 1;
        result
    }

    fn execute(&mut self, contract: &mut Contract) -> (Vec<u8>, EvmResult<()>) {
        let table = self.interpreter.table;
        let mut scope = Scope::new(contract);

        loop {
            match self.step(table, &mut scope) {
                Ok(Control::Continue) => scope.pc += 1,
                Ok(Control::Jump) => {}
                Ok(Control::Stop(output)) => return (output, Ok(())),
                Ok(Control::Revert(output)) => return (output, Err(EvmError::Revert)),
                Err(err) => {
                    trace!(pc = scope.pc, depth = self.depth, error = %err, "frame failed");
                    return (Vec::new(), Err(err));
                }
            }
        }
    }

    fn step(&mut self, table: &JumpTable, scope: &mut Scope<'_>) -> EvmResult<Control> {
        if self.abort.load(Ordering::SeqCst) {
            return Err(EvmError::Aborted);
        }

        let op = scope.contract.get_op(scope.pc);
        let operation = table.get(op).ok_or(EvmError::InvalidOpcode(op))?;

        let stack_len = scope.stack.len();
        if stack_len < operation.min_stack {
            return Err(EvmError::StackUnderflow);
        }
        if stack_len > operation.max_stack {
            return Err(EvmError::StackOverflow);
        }

        if self.interpreter.read_only
            && (operation.writes
                || (op == Opcode::CALL.byte() && !scope.stack.peek_at(2)?.is_zero()))
        {
            return Err(EvmError::WriteProtection);
        }

        if !scope.contract.use_gas(operation.constant_gas) {
            return Err(EvmError::OutOfGas);
        }

        let mut memory_size = 0u64;
        if let Some(size_fn) = operation.memory_size {
            let size = size_fn(&scope.stack)?;
            memory_size = to_word_size(size)
                .checked_mul(32)
                .ok_or(EvmError::GasUintOverflow)?;
        }

        if let Some(gas_fn) = operation.dynamic_gas {
            let cost = gas_fn(self, scope, memory_size)?;
            if !scope.contract.use_gas(cost) {
                return Err(EvmError::OutOfGas);
            }
        }

        if memory_size > 0 {
            let size = usize::try_from(memory_size).map_err(|_| EvmError::GasUintOverflow)?;
            scope.memory.resize(size);
        }

        (operation.execute)(self, scope)
    }
}
