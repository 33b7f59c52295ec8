//! Error types shared by every exchange component.

use crate::pair::PoolId;
use crate::types::{Amount, Timestamp, TokenId};

/// Broad classification of a failure, telling the caller how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input. Retry with corrected arguments.
    InputValidation,
    /// Rejected to protect the economic invariants of a pool.
    /// Retry with adjusted limits or accept the current market state.
    InvariantProtection,
    /// The target entity is in the wrong state for this operation.
    LifecycleState,
    /// An intermediate value does not fit in 256 bits.
    Arithmetic,
}

/// Errors that can occur in the exchange core.
///
/// Every failing operation leaves all state exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DexError {
    #[error("identical tokens: {0}")]
    IdenticalTokens(TokenId),

    #[error("invalid path: {0}")]
    InvalidPath(&'static str),

    #[error("path needs {hops} hops, at most {max} allowed")]
    TooManyHops { hops: usize, max: usize },

    #[error("insufficient balance: have {balance}, need {required}")]
    InsufficientBalance { balance: Amount, required: Amount },

    #[error("insufficient token balance: have {balance}, need {required}")]
    InsufficientTokenBalance { balance: Amount, required: Amount },

    #[error("invalid governance action: {0}")]
    InvalidAction(&'static str),

    #[error("insufficient input amount")]
    InsufficientInputAmount,

    #[error("insufficient output amount")]
    InsufficientOutputAmount,

    #[error("slippage tolerance exceeded: got {actual}, wanted at least {minimum}")]
    SlippageExceeded { actual: Amount, minimum: Amount },

    #[error("insufficient liquidity")]
    InsufficientLiquidity,

    #[error("excessive input amount: need {required}, max {maximum}")]
    ExcessiveInputAmount { required: Amount, maximum: Amount },

    #[error("insufficient liquidity minted")]
    InsufficientLiquidityMinted,

    #[error("insufficient shares: have {held}, requested {requested}")]
    InsufficientShares { held: Amount, requested: Amount },

    #[error("deposit ratio deviates from pool reserves beyond tolerance")]
    LiquidityRatioMismatch,

    #[error("hop {hop} needed {actual} input, solved for {expected}")]
    HopAmountMismatch {
        hop: usize,
        expected: Amount,
        actual: Amount,
    },

    #[error("pair already exists: {0}")]
    PairExists(PoolId),

    #[error("pair not found: {0} / {1}")]
    PairNotFound(TokenId, TokenId),

    #[error("pool not found: {0}")]
    PoolNotFound(PoolId),

    #[error("no route found")]
    NoRouteFound,

    #[error("transaction expired: deadline {deadline}, now {now}")]
    Expired { deadline: Timestamp, now: Timestamp },

    #[error("proposal {0} not found")]
    ProposalNotFound(u64),

    #[error("proposal {0} is not active")]
    ProposalNotActive(u64),

    #[error("already voted on proposal {0}")]
    AlreadyVoted(u64),

    #[error("proposal {0} has not succeeded")]
    ProposalNotSucceeded(u64),

    #[error("proposal {0} already executed")]
    AlreadyExecuted(u64),

    #[error("arithmetic overflow")]
    Overflow,
}

impl DexError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DexError::IdenticalTokens(_)
            | DexError::InvalidPath(_)
            | DexError::TooManyHops { .. }
            | DexError::InsufficientBalance { .. }
            | DexError::InsufficientTokenBalance { .. }
            | DexError::InvalidAction(_)
            | DexError::InsufficientInputAmount
            | DexError::PairNotFound(..)
            | DexError::PoolNotFound(_)
            | DexError::NoRouteFound
            | DexError::ProposalNotFound(_) => ErrorKind::InputValidation,
            DexError::InsufficientOutputAmount
            | DexError::SlippageExceeded { .. }
            | DexError::InsufficientLiquidity
            | DexError::ExcessiveInputAmount { .. }
            | DexError::InsufficientLiquidityMinted
            | DexError::InsufficientShares { .. }
            | DexError::LiquidityRatioMismatch
            | DexError::HopAmountMismatch { .. } => ErrorKind::InvariantProtection,
            DexError::PairExists(_)
            | DexError::Expired { .. }
            | DexError::ProposalNotActive(_)
            | DexError::AlreadyVoted(_)
            | DexError::ProposalNotSucceeded(_)
            | DexError::AlreadyExecuted(_) => ErrorKind::LifecycleState,
            DexError::Overflow => ErrorKind::Arithmetic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::U256;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            DexError::InvalidPath("empty").kind(),
            ErrorKind::InputValidation
        );
        assert_eq!(
            DexError::SlippageExceeded {
                actual: U256::from(1),
                minimum: U256::from(2)
            }
            .kind(),
            ErrorKind::InvariantProtection
        );
        assert_eq!(DexError::AlreadyVoted(3).kind(), ErrorKind::LifecycleState);
        assert_eq!(
            DexError::Expired { deadline: 1, now: 2 }.kind(),
            ErrorKind::LifecycleState
        );
    }

    #[test]
    fn test_error_display() {
        let err = DexError::InsufficientShares {
            held: U256::from(5),
            requested: U256::from(9),
        };
        assert_eq!(err.to_string(), "insufficient shares: have 5, requested 9");
    }
}
