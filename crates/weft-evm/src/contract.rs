//! Call frame

use std::collections::HashSet;
use std::sync::Arc;

use weft_primitives::{Address, H256, U256};

use crate::opcode::Opcode;

/// Offsets of JUMPDEST bytes that are not PUSH data
pub fn analyze_jump_dests(code: &[u8]) -> HashSet<usize> {
    let mut dests = HashSet::new();
    let mut i = 0;

    while i < code.len() {
        let opcode = code[i];
        if opcode == Opcode::JUMPDEST.byte() {
            dests.insert(i);
        }
        if let Some(op) = Opcode::from_byte(opcode) {
            i += op.push_size();
        }
        i += 1;
    }

    dests
}

/// Execution context of one nested invocation
#[derive(Clone, Debug)]
pub struct Contract {
    /// Account that initiated the frame
    pub caller: Address,
    /// Account whose storage and balance the frame acts on
    pub address: Address,
    /// Account the code was loaded from
    pub code_address: Address,
    /// Code being executed
    pub code: Arc<Vec<u8>>,
    /// Hash of `code`, zero for init code
    pub code_hash: H256,
    /// Call data
    pub input: Vec<u8>,
    /// Value carried by the frame
    pub value: U256,
    /// Gas remaining
    pub gas: u64,
    jump_dests: Arc<HashSet<usize>>,
}

impl Contract {
    /// Create a frame running `code` on behalf of `caller`
    pub fn new(
        caller: Address,
        address: Address,
        value: U256,
        gas: u64,
        code: Vec<u8>,
        code_hash: H256,
    ) -> Self {
        let jump_dests = Arc::new(analyze_jump_dests(&code));
        Self {
            caller,
            address,
            code_address: address,
            code: Arc::new(code),
            code_hash,
            input: Vec::new(),
            value,
            gas,
            jump_dests,
        }
    }

    /// Set the call data
    pub fn with_input(mut self, input: Vec<u8>) -> Self {
        self.input = input;
        self
    }

    /// Load code from another account while keeping this frame's storage context
    pub fn with_code_address(mut self, code_address: Address) -> Self {
        self.code_address = code_address;
        self
    }

    /// Turn this frame into a delegate of `parent`: caller and value are
    /// inherited from the parent frame
    pub fn as_delegate(mut self, parent: &Contract) -> Self {
        self.caller = parent.caller;
        self.value = parent.value;
        self
    }

    /// Deduct gas, returning false if there is not enough
    pub fn use_gas(&mut self, gas: u64) -> bool {
        if self.gas < gas {
            return false;
        }
        self.gas -= gas;
        true
    }

    /// Opcode byte at `pc`, STOP past the end of the code
    pub fn get_op(&self, pc: usize) -> u8 {
        self.code.get(pc).copied().unwrap_or(Opcode::STOP.byte())
    }

    /// `dest` is a JUMPDEST outside PUSH data
    pub fn valid_jump_dest(&self, dest: U256) -> bool {
        if dest.bits() > 63 {
            return false;
        }
        self.jump_dests.contains(&(dest.low_u64() as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(code: Vec<u8>) -> Contract {
        Contract::new(
            Address::from_bytes([1; 20]),
            Address::from_bytes([2; 20]),
            U256::zero(),
            100,
            code,
            H256::ZERO,
        )
    }

    #[test]
    fn test_jump_dests_skip_push_data() {
        // PUSH1 0x5b, JUMPDEST, PUSH2 0x5b5b, JUMPDEST
        let code = vec![0x60, 0x5b, 0x5b, 0x61, 0x5b, 0x5b, 0x5b];
        let dests = analyze_jump_dests(&code);
        assert_eq!(dests.len(), 2);
        assert!(dests.contains(&2));
        assert!(dests.contains(&6));
    }

    #[test]
    fn test_truncated_push_at_end() {
        let code = vec![0x5b, 0x7f, 0x5b];
        let dests = analyze_jump_dests(&code);
        assert_eq!(dests.len(), 1);
        assert!(dests.contains(&0));
    }

    #[test]
    fn test_valid_jump_dest() {
        let c = contract(vec![0x60, 0x5b, 0x5b]);
        assert!(c.valid_jump_dest(U256::from(2u64)));
        assert!(!c.valid_jump_dest(U256::from(1u64)));
        assert!(!c.valid_jump_dest(U256::from(99u64)));
        assert!(!c.valid_jump_dest(U256::MAX));
    }

    #[test]
    fn test_use_gas() {
        let mut c = contract(vec![]);
        assert!(c.use_gas(60));
        assert_eq!(c.gas, 40);
        assert!(!c.use_gas(41));
        assert_eq!(c.gas, 40);
    }

    #[test]
    fn test_get_op_past_end_is_stop() {
        let c = contract(vec![0x01]);
        assert_eq!(c.get_op(0), 0x01);
        assert_eq!(c.get_op(1), 0x00);
    }

    #[test]
    fn test_as_delegate_inherits_caller_and_value() {
        let mut parent = contract(vec![]);
        parent.value = U256::from(5u64);
        let origin = parent.caller;
        let child = Contract::new(
            parent.address,
            parent.address,
            U256::zero(),
            10,
            vec![],
            H256::ZERO,
        )
        .as_delegate(&parent);
        assert_eq!(child.caller, origin);
        assert_eq!(child.value, U256::from(5u64));
    }
}
