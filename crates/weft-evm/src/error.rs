//! EVM error types

use thiserror::Error;

/// Frame-level execution errors.
///
/// Every variant aborts only the frame that raised it. Except for
/// [`EvmError::Revert`], the frame's remaining gas is consumed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvmError {
    /// Out of gas
    #[error("out of gas")]
    OutOfGas,

    /// Stack underflow
    #[error("stack underflow")]
    StackUnderflow,

    /// Stack overflow
    #[error("stack overflow (max 1024)")]
    StackOverflow,

    /// Jump target is not a JUMPDEST
    #[error("invalid jump destination: {0}")]
    InvalidJump(usize),

    /// Undefined opcode
    #[error("invalid opcode: 0x{0:02x}")]
    InvalidOpcode(u8),

    /// State modification attempted under a static call
    #[error("write protection")]
    WriteProtection,

    /// RETURNDATACOPY past the end of the return buffer
    #[error("return data out of bounds")]
    ReturnDataOutOfBounds,

    /// A memory offset or size does not fit the gas arithmetic
    #[error("gas uint64 overflow")]
    GasUintOverflow,

    /// Contract creation collision
    #[error("contract address collision")]
    CreateCollision,

    /// Deployed code is larger than the configured maximum
    #[error("max code size exceeded")]
    MaxCodeSizeExceeded,

    /// Not enough gas left to pay for storing the deployed code
    #[error("contract creation code storage out of gas")]
    CodeStoreOutOfGas,

    /// Call depth exceeded
    #[error("max call depth exceeded")]
    DepthLimitExceeded,

    /// Caller cannot afford the transferred value
    #[error("insufficient balance for transfer")]
    InsufficientBalance,

    /// Nonce would wrap
    #[error("nonce uint64 overflow")]
    NonceOverflow,

    /// Contract-issued REVERT
    #[error("execution reverted")]
    Revert,

    /// Execution was cancelled through the abort handle
    #[error("execution aborted")]
    Aborted,
}

/// Result type for EVM operations
pub type EvmResult<T> = Result<T, EvmError>;

/// Outcome of one call or create frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Return data, or revert data when `error` is [`EvmError::Revert`]
    pub output: Vec<u8>,
    /// Gas handed back to the caller
    pub gas_left: u64,
    /// Why the frame failed, if it did
    pub error: Option<EvmError>,
}

impl ExecutionResult {
    /// Successful frame
    pub fn success(output: Vec<u8>, gas_left: u64) -> Self {
        Self {
            output,
            gas_left,
            error: None,
        }
    }

    /// Failed frame without output
    pub fn failure(error: EvmError, gas_left: u64) -> Self {
        Self {
            output: Vec::new(),
            gas_left,
            error: Some(error),
        }
    }

    /// Build from the interpreter's `(output, result)` pair
    pub fn from_run(output: Vec<u8>, gas_left: u64, result: EvmResult<()>) -> Self {
        Self {
            output,
            gas_left,
            error: result.err(),
        }
    }

    /// Whether the frame completed without error
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Whether the frame ended in REVERT
    pub fn is_revert(&self) -> bool {
        matches!(self.error, Some(EvmError::Revert))
    }
}
