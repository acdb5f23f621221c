//! Messages routed to the contract module

use serde::{Deserialize, Serialize};
use weft_primitives::{Address, U256};

use crate::error::{VmError, VmResult};

/// Message route name
pub const ROUTER_KEY: &str = "vm";

/// A transaction message handled by the contract module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Msg {
    /// Deploy `code` as a new contract
    ContractCreate {
        /// Sender paying for the deployment
        from: Address,
        /// Value endowed to the new contract
        amount: U256,
        /// Init code
        code: Vec<u8>,
    },
    /// Call an existing contract
    ContractCall {
        /// Caller
        from: Address,
        /// Contract being called
        recipient: Address,
        /// Value transferred with the call
        amount: U256,
        /// Call data
        payload: Vec<u8>,
    },
}

impl Msg {
    /// Route this message belongs to
    pub fn route(&self) -> &'static str {
        ROUTER_KEY
    }

    /// Short name of the message type
    pub fn type_name(&self) -> &'static str {
        match self {
            Msg::ContractCreate { .. } => "contract_create",
            Msg::ContractCall { .. } => "contract_call",
        }
    }

    /// Sender of the message
    pub fn sender(&self) -> Address {
        match self {
            Msg::ContractCreate { from, .. } | Msg::ContractCall { from, .. } => *from,
        }
    }

    /// Checks that need no state
    pub fn validate_basic(&self) -> VmResult<()> {
        match self {
            Msg::ContractCreate { from, code, .. } => {
                if from.is_zero() {
                    return Err(VmError::InvalidMsg("missing sender address".into()));
                }
                if code.is_empty() {
                    return Err(VmError::InvalidMsg("contract code is empty".into()));
                }
            }
            Msg::ContractCall {
                from, recipient, ..
            } => {
                if from.is_zero() {
                    return Err(VmError::InvalidMsg("missing sender address".into()));
                }
                if recipient.is_zero() {
                    return Err(VmError::InvalidMsg("missing recipient address".into()));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> Address {
        Address::from_bytes([0x01; 20])
    }

    #[test]
    fn test_validate_create() {
        let msg = Msg::ContractCreate {
            from: sender(),
            amount: U256::zero(),
            code: vec![0x00],
        };
        assert!(msg.validate_basic().is_ok());
        assert_eq!(msg.type_name(), "contract_create");
        assert_eq!(msg.route(), "vm");

        let empty = Msg::ContractCreate {
            from: sender(),
            amount: U256::zero(),
            code: Vec::new(),
        };
        assert!(matches!(empty.validate_basic(), Err(VmError::InvalidMsg(_))));
    }

    #[test]
    fn test_validate_rejects_zero_addresses() {
        let no_sender = Msg::ContractCall {
            from: Address::ZERO,
            recipient: sender(),
            amount: U256::zero(),
            payload: Vec::new(),
        };
        assert!(no_sender.validate_basic().is_err());

        let no_recipient = Msg::ContractCall {
            from: sender(),
            recipient: Address::ZERO,
            amount: U256::zero(),
            payload: Vec::new(),
        };
        assert!(no_recipient.validate_basic().is_err());
    }

    #[test]
    fn test_json_is_tagged() {
        let msg = Msg::ContractCall {
            from: sender(),
            recipient: sender(),
            amount: U256::from(5u64),
            payload: vec![1, 2],
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "contract_call");
        let back: Msg = serde_json::from_value(json).unwrap();
        assert_eq!(back, msg);
    }
}
