//! # weft-crypto
//!
//! Cryptographic helpers for the contract engine.
//!
//! - Keccak-256 hashing
//! - CREATE / CREATE2 contract address derivation

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod hash;

pub use address::{create2_address, create_address};
pub use hash::{keccak256, keccak256_concat, EMPTY_CODE_HASH};
