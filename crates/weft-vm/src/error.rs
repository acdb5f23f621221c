//! Contract module error types

use thiserror::Error;
use weft_evm::{ParamsError, StateError};
use weft_primitives::Address;
use weft_storage::StorageError;

/// Errors that reject a message or query outright.
///
/// A contract that fails while executing is not an error at this level; it
/// produces a failed [`Receipt`](crate::Receipt) instead.
#[derive(Debug, Error)]
pub enum VmError {
    /// Call to an account without code
    #[error("no contract code at {0}")]
    NoCodeExist(Address),

    /// Gas limit does not cover the intrinsic cost
    #[error("intrinsic gas too low: have {have}, want {want}")]
    IntrinsicGas {
        /// Gas limit supplied
        have: u64,
        /// Intrinsic gas required
        want: u64,
    },

    /// Gas meter exhausted
    #[error("out of gas in location: {descriptor}; gas limit: {limit}, gas used: {used}")]
    OutOfGas {
        /// What was being charged
        descriptor: String,
        /// Meter limit
        limit: u64,
        /// Gas the charge would have brought the meter to
        used: u64,
    },

    /// Sender nonce would wrap
    #[error("nonce overflow for {0}")]
    NonceOverflow(Address),

    /// Message failed stateless validation
    #[error("invalid message: {0}")]
    InvalidMsg(String),

    /// Malformed address in a query
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Unknown query path
    #[error("unknown query endpoint: {0}")]
    UnknownQuery(String),

    /// Query arguments could not be parsed
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// State layer error
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// Storage error
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Stored logs could not be decoded
    #[error("log decoding error: {0}")]
    LogDecode(String),

    /// Gas parameters rejected
    #[error("invalid params: {0}")]
    InvalidParams(#[from] ParamsError),

    /// JSON encoding or decoding failed
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Config file could not be read
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the contract module
pub type VmResult<T> = Result<T, VmError>;
