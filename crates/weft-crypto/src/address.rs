//! Contract address derivation

use rlp::RlpStream;
use weft_primitives::{Address, H256};

use crate::hash::{keccak256, keccak256_concat};

fn address_from_hash(hash: H256) -> Address {
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash.as_bytes()[12..]);
    Address::from_bytes(bytes)
}

/// Address of a contract created by `sender` with account nonce `nonce`:
/// `keccak256(rlp([sender, nonce]))[12..]`.
pub fn create_address(sender: &Address, nonce: u64) -> Address {
    let mut stream = RlpStream::new_list(2);
    stream.append(sender);
    stream.append(&nonce);
    address_from_hash(keccak256(&stream.out()))
}

/// Address of a contract created through CREATE2:
/// `keccak256(0xff ++ sender ++ salt ++ keccak256(init_code))[12..]`.
pub fn create2_address(sender: &Address, salt: &H256, init_code: &[u8]) -> Address {
    let code_hash = keccak256(init_code);
    address_from_hash(keccak256_concat(&[
        &[0xff],
        sender.as_bytes(),
        salt.as_bytes(),
        code_hash.as_bytes(),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_address_known_vector() {
        let sender = Address::from_hex("0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0").unwrap();
        assert_eq!(
            create_address(&sender, 0).to_hex(),
            "0xcd234a471b72ba2f1ccf0a70fcaba648a5eecd8d"
        );
        assert_eq!(
            create_address(&sender, 1).to_hex(),
            "0x343c43a37d37dff08ae8c4a11544c718abb4fcf8"
        );
    }

    #[test]
    fn test_create2_address_eip1014_vectors() {
        let sender = Address::ZERO;
        let salt = H256::ZERO;
        assert_eq!(
            create2_address(&sender, &salt, &[0x00]).to_hex(),
            "0x4d1a2e2bb4f88f0250f26ffff098b0b30b26bf38"
        );

        let sender = Address::from_hex("0xdeadbeef00000000000000000000000000000000").unwrap();
        let salt = H256::from_hex(
            "0x000000000000000000000000feed000000000000000000000000000000000000",
        )
        .unwrap();
        assert_eq!(
            create2_address(&sender, &salt, &[0x00]).to_hex(),
            "0xd04116cdd17bebe565eb2422f2497e06cc1c9833"
        );
    }

    #[test]
    fn test_create_address_depends_on_nonce() {
        let sender = Address::from_bytes([1u8; 20]);
        assert_ne!(create_address(&sender, 0), create_address(&sender, 1));
    }

    #[test]
    fn test_create2_address_depends_on_code() {
        let sender = Address::from_bytes([1u8; 20]);
        let salt = H256::ZERO;
        assert_ne!(
            create2_address(&sender, &salt, &[0x00]),
            create2_address(&sender, &salt, &[0x01])
        );
        assert_eq!(hex::encode(create2_address(&sender, &salt, b"").as_bytes()).len(), 40);
    }
}
