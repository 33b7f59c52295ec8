//! Mutating operations as data, so they can be logged and replayed.

use crate::governance::{ProposalAction, Vote};
use crate::pair::PoolId;
use crate::pool::{LiquidityAdded, LiquidityRemoved};
use crate::router::Route;
use crate::types::{Address, Amount, Timestamp, TokenId};

/// Every state-changing call the exchange accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    CreatePair {
        token_a: TokenId,
        token_b: TokenId,
    },
    /// Amounts are in the pool's canonical token order.
    AddLiquidity {
        pool: PoolId,
        amount0: Amount,
        amount1: Amount,
    },
    RemoveLiquidity {
        pool: PoolId,
        shares: Amount,
    },
    Swap {
        pool: PoolId,
        amount_in: Amount,
        token_in_is_first: bool,
        min_amount_out: Amount,
    },
    SwapExactTokensForTokens {
        amount_in: Amount,
        amount_out_min: Amount,
        path: Vec<TokenId>,
        deadline: Timestamp,
    },
    SwapTokensForExactTokens {
        amount_out: Amount,
        amount_in_max: Amount,
        path: Vec<TokenId>,
        deadline: Timestamp,
    },
    Propose {
        description: String,
        action: ProposalAction,
    },
    Vote {
        proposal_id: u64,
        support: bool,
        /// `None` casts the voter's full snapshot balance.
        weight: Option<Amount>,
    },
    Execute {
        proposal_id: u64,
    },
    /// Move governance tokens from the caller.
    Transfer {
        to: Address,
        amount: Amount,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::CreatePair { .. } => "createPair",
            Operation::AddLiquidity { .. } => "addLiquidity",
            Operation::RemoveLiquidity { .. } => "removeLiquidity",
            Operation::Swap { .. } => "swap",
            Operation::SwapExactTokensForTokens { .. } => "swapExactTokensForTokens",
            Operation::SwapTokensForExactTokens { .. } => "swapTokensForExactTokens",
            Operation::Propose { .. } => "propose",
            Operation::Vote { .. } => "vote",
            Operation::Execute { .. } => "execute",
            Operation::Transfer { .. } => "transfer",
        }
    }
}

/// What a successful [`Operation`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    PairCreated(PoolId),
    LiquidityAdded(LiquidityAdded),
    LiquidityRemoved(LiquidityRemoved),
    /// Output of a single-pool swap.
    Swapped(Amount),
    /// Hops of a routed swap.
    Routed(Route),
    Proposed(u64),
    Voted(Vote),
    Executed(ProposalAction),
    Transferred,
}

/// An operation as it was ordered: who sent it and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedOperation {
    pub caller: Address,
    pub timestamp: Timestamp,
    pub operation: Operation,
}

impl LoggedOperation {
    pub fn new(caller: Address, timestamp: Timestamp, operation: Operation) -> Self {
        Self {
            caller,
            timestamp,
            operation,
        }
    }
}
