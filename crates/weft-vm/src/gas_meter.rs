//! Transaction gas meters

use crate::error::{VmError, VmResult};

/// Tracks gas charged to a transaction
pub trait GasMeter {
    /// Charge `amount`, failing if the limit would be exceeded
    fn consume_gas(&mut self, amount: u64, descriptor: &str) -> VmResult<()>;

    /// Gas charged so far
    fn gas_consumed(&self) -> u64;

    /// Gas limit, `u64::MAX` for an unlimited meter
    fn limit(&self) -> u64;

    /// Gas still available
    fn gas_remaining(&self) -> u64 {
        self.limit().saturating_sub(self.gas_consumed())
    }
}

/// Meter bounded by a fixed limit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicGasMeter {
    limit: u64,
    consumed: u64,
}

impl BasicGasMeter {
    /// Create a meter with `limit` gas
    pub fn new(limit: u64) -> Self {
        Self { limit, consumed: 0 }
    }
}

impl GasMeter for BasicGasMeter {
    fn consume_gas(&mut self, amount: u64, descriptor: &str) -> VmResult<()> {
        let used = self.consumed.saturating_add(amount);
        if used > self.limit {
            // An exhausted meter reports its whole limit as consumed
            self.consumed = self.limit;
            return Err(VmError::OutOfGas {
                descriptor: descriptor.to_string(),
                limit: self.limit,
                used,
            });
        }
        self.consumed = used;
        Ok(())
    }

    fn gas_consumed(&self) -> u64 {
        self.consumed
    }

    fn limit(&self) -> u64 {
        self.limit
    }
}

/// Meter that never runs out, used for queries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfiniteGasMeter {
    consumed: u64,
}

impl InfiniteGasMeter {
    /// Create an unlimited meter
    pub fn new() -> Self {
        Self::default()
    }
}

impl GasMeter for InfiniteGasMeter {
    fn consume_gas(&mut self, amount: u64, _descriptor: &str) -> VmResult<()> {
        self.consumed = self.consumed.saturating_add(amount);
        Ok(())
    }

    fn gas_consumed(&self) -> u64 {
        self.consumed
    }

    fn limit(&self) -> u64 {
        u64::MAX
    }
}
