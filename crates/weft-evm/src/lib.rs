//! # weft-evm
//!
//! Contract execution engine for Weft.
//!
//! - [`Stack`] and [`Memory`]: per-frame operand stack and linear memory
//! - [`JumpTable`]: opcode dispatch table built from [`VmParams`] and
//!   injected into the [`Interpreter`]
//! - [`Contract`]: one call frame
//! - [`StateAccess`]: journaled account state with snapshot and revert,
//!   live ([`LiveState`]) or disposable ([`DisposableState`])
//! - [`Evm`]: nested calls and contract creation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod contract;
pub mod error;
pub mod evm;
pub mod gas;
mod instructions;
pub mod interpreter;
pub mod jump_table;
pub mod log;
pub mod memory;
pub mod opcode;
pub mod params;
pub mod stack;
pub mod state;
pub mod word;

pub use context::{BlockContext, Context, TxContext};
pub use contract::Contract;
pub use error::{EvmError, EvmResult, ExecutionResult};
pub use evm::Evm;
pub use interpreter::{Control, Interpreter, Scope};
pub use jump_table::{JumpTable, Operation};
pub use log::{decode_logs, encode_logs, Log};
pub use memory::Memory;
pub use opcode::Opcode;
pub use params::{ParamsError, VmParams};
pub use stack::{Stack, STACK_LIMIT};
pub use state::{DisposableState, JournaledState, LiveState, StateAccess, StateError};
