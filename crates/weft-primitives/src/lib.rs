//! # weft-primitives
//!
//! Fixed-width value types used by every layer of the contract engine:
//! 20-byte account addresses, 32-byte hashes and the 256-bit machine word.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod hash;

pub use address::{Address, AddressError};
pub use hash::{HashError, H256};

/// 256-bit machine word. A value type, so arithmetic never allocates.
pub use primitive_types::{U256, U512};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_wraps_on_overflow() {
        let (sum, overflow) = U256::MAX.overflowing_add(U256::from(2u64));
        assert!(overflow);
        assert_eq!(sum, U256::one());
    }

    #[test]
    fn test_word_hash_address_agree() {
        let addr = Address::from_hex("0x00000000000000000000000000000000deadbeef").unwrap();
        let word = addr.to_word();
        assert_eq!(H256::from_word(word).to_word(), word);
        assert_eq!(Address::from_word(H256::from_word(word).to_word()), addr);
    }
}
