//! Events emitted by the contract module

use serde::{Deserialize, Serialize};
use weft_primitives::Address;

/// Event type for every successfully handled message
pub const EVENT_TYPE_MESSAGE: &str = "message";
/// Event type for a successful contract creation
pub const EVENT_TYPE_CREATE_CONTRACT: &str = "create_contract";

/// Attribute naming the emitting module
pub const ATTRIBUTE_KEY_MODULE: &str = "module";
/// Attribute naming the message sender
pub const ATTRIBUTE_KEY_SENDER: &str = "sender";
/// Attribute carrying a contract address
pub const ATTRIBUTE_KEY_ADDRESS: &str = "address";
/// Module name reported in message events
pub const ATTRIBUTE_VALUE_CATEGORY: &str = "vm";

/// Key/value pair attached to an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute key
    pub key: String,
    /// Attribute value
    pub value: String,
}

/// Typed event with ordered attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event type
    #[serde(rename = "type")]
    pub kind: String,
    /// Attributes in emission order
    pub attributes: Vec<Attribute>,
}

impl Event {
    /// Event without attributes
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: Vec::new(),
        }
    }

    /// Append an attribute
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// First value recorded under `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.key == key)
            .map(|attr| attr.value.as_str())
    }
}

/// `message` event for a message handled by this module
pub fn message(sender: &Address) -> Event {
    Event::new(EVENT_TYPE_MESSAGE)
        .attribute(ATTRIBUTE_KEY_MODULE, ATTRIBUTE_VALUE_CATEGORY)
        .attribute(ATTRIBUTE_KEY_SENDER, sender.to_hex())
}

/// `create_contract` event carrying the new contract's address
pub fn create_contract(address: &Address) -> Event {
    Event::new(EVENT_TYPE_CREATE_CONTRACT).attribute(ATTRIBUTE_KEY_ADDRESS, address.to_hex())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_event() {
        let sender = Address::from_bytes([0xab; 20]);
        let event = message(&sender);
        assert_eq!(event.kind, EVENT_TYPE_MESSAGE);
        assert_eq!(event.get(ATTRIBUTE_KEY_MODULE), Some("vm"));
        assert_eq!(event.get(ATTRIBUTE_KEY_SENDER), Some(sender.to_hex().as_str()));
    }

    #[test]
    fn test_create_event_json() {
        let event = create_contract(&Address::ZERO);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "create_contract");
        assert_eq!(json["attributes"][0]["key"], "address");
    }
}
