//! Instruction implementations, grouped by opcode range

pub(crate) mod arithmetic;
pub(crate) mod control;
pub(crate) mod environment;
pub(crate) mod system;

use weft_primitives::U256;

use crate::word;

/// `size` bytes of `data` starting at `start`, zero-padded past the end
pub(crate) fn get_data(data: &[u8], start: U256, size: usize) -> Vec<u8> {
    let mut out = vec![0u8; size];
    let start = word::to_usize_saturating(start).min(data.len());
    let end = start.saturating_add(size).min(data.len());
    out[..end - start].copy_from_slice(&data[start..end]);
    out
}

/// Offset or length already validated by the memory size check
pub(crate) fn as_usize(value: U256) -> usize {
    word::to_usize_saturating(value)
}
