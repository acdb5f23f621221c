//! Operand stack

use weft_primitives::U256;

use crate::error::{EvmError, EvmResult};

/// Maximum number of words on the stack
pub const STACK_LIMIT: usize = 1024;

/// Per-frame operand stack of 256-bit words
#[derive(Clone, Debug)]
pub struct Stack {
    data: Vec<U256>,
}

impl Stack {
    /// Create a new empty stack
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(STACK_LIMIT),
        }
    }

    /// Push a value onto the stack
    pub fn push(&mut self, value: U256) -> EvmResult<()> {
        if self.data.len() >= STACK_LIMIT {
            return Err(EvmError::StackOverflow);
        }
        self.data.push(value);
        Ok(())
    }

    /// Pop a value from the stack
    pub fn pop(&mut self) -> EvmResult<U256> {
        self.data.pop().ok_or(EvmError::StackUnderflow)
    }

    /// Top of the stack
    pub fn peek(&self) -> EvmResult<U256> {
        self.peek_at(0)
    }

    /// Value at `depth` below the top (0 = top)
    pub fn peek_at(&self, depth: usize) -> EvmResult<U256> {
        if depth >= self.data.len() {
            return Err(EvmError::StackUnderflow);
        }
        Ok(self.data[self.data.len() - 1 - depth])
    }

    /// Exchange the top with the `n`-th value below it (1 = second item)
    pub fn swap(&mut self, n: usize) -> EvmResult<()> {
        if n == 0 || n >= self.data.len() {
            return Err(EvmError::StackUnderflow);
        }
        let len = self.data.len();
        self.data.swap(len - 1, len - 1 - n);
        Ok(())
    }

    /// Push a copy of the `n`-th value from the top (1 = top)
    pub fn dup(&mut self, n: usize) -> EvmResult<()> {
        if n == 0 || n > self.data.len() {
            return Err(EvmError::StackUnderflow);
        }
        let value = self.data[self.data.len() - n];
        self.push(value)
    }

    /// Get current stack size
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if stack is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Values bottom to top
    pub fn data(&self) -> &[U256] {
        &self.data
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}
