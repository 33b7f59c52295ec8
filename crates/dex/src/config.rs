//! Exchange configuration parameters.

use crate::error::DexError;
use crate::math::{self, BPS};
use crate::types::Amount;

/// Configuration for pools and routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DexConfig {
    /// Fee charged on every swap input in basis points (1 bp = 0.01%).
    /// For example, 30 = 0.30% fee.
    pub fee_bps: u32,

    /// Maximum number of hops allowed when routing through multiple pools.
    pub max_routing_hops: usize,

    /// How far a liquidity deposit may deviate from the pool's reserve ratio,
    /// in basis points of the supplied amount. Excess within this tolerance is
    /// refunded; anything beyond fails the deposit.
    pub liquidity_tolerance_bps: u32,
}

impl Default for DexConfig {
    fn default() -> Self {
        Self {
            fee_bps: 30,                  // 0.30% default fee
            max_routing_hops: 3,          // Max 3 hops (4 tokens in path)
            liquidity_tolerance_bps: 100, // 1%
        }
    }
}

impl DexConfig {
    /// Create a new configuration with custom fee.
    pub fn with_fee_bps(mut self, fee_bps: u32) -> Self {
        self.fee_bps = fee_bps;
        self
    }

    /// Create a new configuration with custom max routing hops.
    pub fn with_max_routing_hops(mut self, max_hops: usize) -> Self {
        self.max_routing_hops = max_hops;
        self
    }

    /// Create a new configuration with a custom deposit ratio tolerance.
    pub fn with_liquidity_tolerance_bps(mut self, tolerance_bps: u32) -> Self {
        self.liquidity_tolerance_bps = tolerance_bps;
        self
    }

    /// Check that the parameters are usable.
    pub fn validate(&self) -> Result<(), DexError> {
        if self.fee_bps >= BPS {
            return Err(DexError::InvalidAction("fee must be below 10000 bps"));
        }
        if self.max_routing_hops == 0 {
            return Err(DexError::InvalidAction("at least one routing hop required"));
        }
        Ok(())
    }

    /// Calculate the fee taken from a given swap input, rounded up.
    pub fn calculate_fee(&self, amount_in: Amount) -> Result<Amount, DexError> {
        math::fee_amount(amount_in, self.fee_bps)
    }

    /// Calculate the swap input that remains after the fee.
    pub fn amount_after_fee(&self, amount_in: Amount) -> Result<Amount, DexError> {
        math::sub(amount_in, self.calculate_fee(amount_in)?)
    }
}
