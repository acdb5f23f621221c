//! # weft-vm
//!
//! The chain-facing contract module.
//!
//! - [`Msg`]: create and call messages
//! - [`StateTransition`]: applies one message through the EVM and charges a [`GasMeter`]
//! - [`Keeper`]: message handling and persistence over the state database
//! - [`Querier`]: code, storage, logs, simulated calls and fee estimates

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;
pub mod events;
mod gas_meter;
mod keeper;
mod message;
mod querier;
mod state_transition;

pub use config::VmConfig;
pub use error::{VmError, VmResult};
pub use events::{Attribute, Event};
pub use gas_meter::{BasicGasMeter, GasMeter, InfiniteGasMeter};
pub use keeper::Keeper;
pub use message::{Msg, ROUTER_KEY};
pub use querier::{
    ContractStateParams, FeeEstimate, LogsResponse, Querier, StorageResponse, QUERY_CALL_FEE,
    QUERY_CONTRACT_CODE, QUERY_CONTRACT_STATE, QUERY_CREATE_FEE, QUERY_PARAMETERS, QUERY_STORAGE,
    QUERY_TX_LOGS,
};
pub use state_transition::{
    Receipt, StateTransition, TxEnv, TxStatus, DEFAULT_TX_GAS_LIMIT, EXECUTION_GAS_DESCRIPTOR,
};
