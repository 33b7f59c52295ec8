//! Core type definitions for the exchange.
//!
//! Re-exports from alloy-primitives for Ethereum-compatible types.

pub use alloy::primitives::{Address, U256};

/// Unique identifier for a token (contract address).
pub type TokenId = Address;

/// Amount of tokens in the smallest unit of the token (fixed point with the
/// token's decimals). All arithmetic on amounts is checked integer math.
pub type Amount = U256;

/// Unix timestamp in seconds, supplied by whoever orders transactions.
pub type Timestamp = u64;

/// Price represented as a rational number (numerator/denominator) for precision.
/// Price is expressed as: how much token1 per 1 unit of token0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Price {
    /// Numerator of the price ratio.
    pub numerator: U256,
    /// Denominator of the price ratio (never zero).
    pub denominator: U256,
}

impl Price {
    /// Create a new price. Returns `None` if the denominator is zero.
    pub fn new(numerator: U256, denominator: U256) -> Option<Self> {
        if denominator.is_zero() {
            return None;
        }
        Some(Self {
            numerator,
            denominator,
        })
    }

    /// Create a price from u128 values for convenience.
    pub fn from_u128(numerator: u128, denominator: u128) -> Option<Self> {
        Self::new(U256::from(numerator), U256::from(denominator))
    }

    /// Calculate the amount of token1 for a given token0 amount, rounded down.
    pub fn quote_amount(&self, base_amount: Amount) -> Option<Amount> {
        base_amount
            .checked_mul(self.numerator)?
            .checked_div(self.denominator)
    }

    /// Compare two prices by their ratio values.
    pub fn cmp_value(&self, other: &Self) -> std::cmp::Ordering {
        // a/b vs c/d  <=>  a*d vs c*b
        let lhs = self.numerator.saturating_mul(other.denominator);
        let rhs = other.numerator.saturating_mul(self.denominator);
        lhs.cmp(&rhs)
    }

    /// Invert the price. Returns `None` for a zero price.
    pub fn invert(&self) -> Option<Self> {
        Self::new(self.denominator, self.numerator)
    }
}

impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Price {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.cmp_value(other)
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.denominator == U256::from(1) {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}
