//! Tunable execution parameters

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gas::{cost, static_gas};
use crate::opcode::Opcode;

/// Size of the per-opcode constant gas table
pub const OP_GAS_TABLE_SIZE: usize = 256;

/// Invalid parameter set
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParamsError {
    /// Max code size must be positive
    #[error("max code size must be positive")]
    ZeroMaxCodeSize,

    /// Op gas table must have one entry per byte value
    #[error("op gas table must have {OP_GAS_TABLE_SIZE} entries, got {0}")]
    OpGasTableSize(usize),

    /// Quadratic memory divisor must be positive
    #[error("memory quadratic divisor must be positive")]
    ZeroQuadCoeffDiv,

    /// Call depth limit must be positive
    #[error("call create depth must be positive")]
    ZeroCallCreateDepth,

    /// Refund quotient must be positive
    #[error("max refund quotient must be positive")]
    ZeroRefundQuotient,
}

/// Parameters governing gas pricing and execution limits.
///
/// Every field falls back to its default when absent from a serialized
/// parameter set, so partial overrides are valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmParams {
    /// Largest code a create may deploy, in bytes
    pub max_code_size: u64,
    /// Max nested call/create depth
    pub call_create_depth: usize,
    /// Constant gas per opcode byte
    pub op_gas: Vec<u64>,

    /// Memory gas per word
    pub memory_gas: u64,
    /// Memory quadratic divisor
    pub quad_coeff_div: u64,
    /// Code deposit gas per byte
    pub create_data_gas: u64,
    /// Copy gas per word
    pub copy_gas: u64,
    /// KECCAK256 gas per word
    pub sha3_word_gas: u64,
    /// EXP gas per exponent byte
    pub exp_byte_gas: u64,
    /// LOG gas per data byte
    pub log_data_gas: u64,

    /// Free gas handed to a callee receiving value
    pub call_stipend: u64,
    /// Extra gas for a value-bearing call
    pub call_value_transfer_gas: u64,
    /// Extra gas for a value-bearing call to an empty account
    pub call_new_account_gas: u64,

    /// SSTORE from zero to non-zero
    pub sstore_set_gas: u64,
    /// Any other SSTORE
    pub sstore_reset_gas: u64,
    /// Refund for clearing a slot
    pub sstore_clear_refund: u64,

    /// Refund for the first SELFDESTRUCT of an account
    pub selfdestruct_refund_gas: u64,
    /// SELFDESTRUCT paying a previously empty beneficiary
    pub create_by_selfdestruct_gas: u64,

    /// Intrinsic gas of a call transaction
    pub tx_gas: u64,
    /// Intrinsic gas of a create transaction
    pub tx_gas_contract_creation: u64,
    /// Intrinsic gas per zero payload byte
    pub tx_data_zero_gas: u64,
    /// Intrinsic gas per non-zero payload byte
    pub tx_data_non_zero_gas: u64,
    /// At most `gas_used / max_refund_quotient` is refunded
    pub max_refund_quotient: u64,
}

impl Default for VmParams {
    fn default() -> Self {
        Self {
            max_code_size: cost::MAX_CODE_SIZE,
            call_create_depth: cost::CALL_CREATE_DEPTH,
            op_gas: default_op_gas(),
            memory_gas: cost::MEMORY,
            quad_coeff_div: cost::QUAD_COEFF_DIV,
            create_data_gas: cost::CREATE_DATA,
            copy_gas: cost::COPY,
            sha3_word_gas: cost::SHA3_WORD,
            exp_byte_gas: cost::EXP_BYTE,
            log_data_gas: cost::LOG_DATA,
            call_stipend: cost::CALL_STIPEND,
            call_value_transfer_gas: cost::CALL_VALUE,
            call_new_account_gas: cost::CALL_NEW_ACCOUNT,
            sstore_set_gas: cost::SSTORE_SET,
            sstore_reset_gas: cost::SSTORE_RESET,
            sstore_clear_refund: cost::SSTORE_CLEAR_REFUND,
            selfdestruct_refund_gas: cost::SELFDESTRUCT_REFUND,
            create_by_selfdestruct_gas: cost::SELFDESTRUCT_NEW_ACCOUNT,
            tx_gas: cost::TX,
            tx_gas_contract_creation: cost::TX_CREATE,
            tx_data_zero_gas: cost::TX_DATA_ZERO,
            tx_data_non_zero_gas: cost::TX_DATA_NONZERO,
            max_refund_quotient: 2,
        }
    }
}

/// Constant gas table indexed by opcode byte; unassigned bytes cost nothing
pub fn default_op_gas() -> Vec<u64> {
    (0..OP_GAS_TABLE_SIZE)
        .map(|byte| Opcode::from_byte(byte as u8).map(static_gas).unwrap_or(0))
        .collect()
}

impl VmParams {
    /// Check the parameter set is usable
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.max_code_size == 0 {
            return Err(ParamsError::ZeroMaxCodeSize);
        }
        if self.op_gas.len() != OP_GAS_TABLE_SIZE {
            return Err(ParamsError::OpGasTableSize(self.op_gas.len()));
        }
        if self.quad_coeff_div == 0 {
            return Err(ParamsError::ZeroQuadCoeffDiv);
        }
        if self.call_create_depth == 0 {
            return Err(ParamsError::ZeroCallCreateDepth);
        }
        if self.max_refund_quotient == 0 {
            return Err(ParamsError::ZeroRefundQuotient);
        }
        Ok(())
    }

    /// Constant gas of an opcode byte
    pub fn op_gas(&self, byte: u8) -> u64 {
        self.op_gas.get(byte as usize).copied().unwrap_or(0)
    }

    /// Gas charged before execution for a transaction carrying `data`
    pub fn intrinsic_gas(&self, data: &[u8], is_create: bool) -> Option<u64> {
        let base = if is_create {
            self.tx_gas_contract_creation
        } else {
            self.tx_gas
        };
        let zeros = data.iter().filter(|b| **b == 0).count() as u64;
        let non_zeros = data.len() as u64 - zeros;
        base.checked_add(zeros.checked_mul(self.tx_data_zero_gas)?)?
            .checked_add(non_zeros.checked_mul(self.tx_data_non_zero_gas)?)
    }
}
