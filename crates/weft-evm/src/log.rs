//! Event logs emitted by LOG0..LOG4

use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Serialize};
use weft_primitives::{Address, H256};

/// Log entry emitted by LOG opcodes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// Contract address that emitted the log
    pub address: Address,
    /// Log topics (0-4)
    pub topics: Vec<H256>,
    /// Log data
    pub data: Vec<u8>,
    /// Block the emitting transaction was executed in
    pub block_number: u64,
}

impl Encodable for Log {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(4);
        s.append(&self.address);
        s.append_list::<H256, H256>(&self.topics);
        s.append(&self.data);
        s.append(&self.block_number);
    }
}

impl Decodable for Log {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 4 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(Self {
            address: rlp.val_at(0)?,
            topics: rlp.list_at(1)?,
            data: rlp.val_at(2)?,
            block_number: rlp.val_at(3)?,
        })
    }
}

/// Encode the logs of one transaction for storage
pub fn encode_logs(logs: &[Log]) -> Vec<u8> {
    rlp::encode_list::<Log, Log>(logs).to_vec()
}

/// Decode logs written by [`encode_logs`]
pub fn decode_logs(bytes: &[u8]) -> Result<Vec<Log>, DecoderError> {
    Rlp::new(bytes).as_list()
}
