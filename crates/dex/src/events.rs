//! Event records emitted by successful operations.

use crate::governance::ProposalAction;
use crate::pair::PoolId;
use crate::types::{Address, Amount, TokenId};

/// A structured record of a committed state change, for indexers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DexEvent {
    PairCreated {
        pool: PoolId,
        token0: TokenId,
        token1: TokenId,
        /// Number of pairs after this one was created.
        pair_count: u64,
    },
    /// Liquidity added. Amounts are what the pool kept, after refunds.
    Mint {
        pool: PoolId,
        provider: Address,
        amount0: Amount,
        amount1: Amount,
        shares: Amount,
    },
    Burn {
        pool: PoolId,
        provider: Address,
        amount0: Amount,
        amount1: Amount,
        shares: Amount,
    },
    /// One per hop of a routed swap.
    Swap {
        pool: PoolId,
        sender: Address,
        token_in: TokenId,
        token_out: TokenId,
        amount_in: Amount,
        amount_out: Amount,
    },
    ProposalCreated {
        id: u64,
        proposer: Address,
        action: ProposalAction,
        deadline: u64,
        description: String,
    },
    VoteCast {
        id: u64,
        voter: Address,
        support: bool,
        weight: Amount,
    },
    ProposalExecuted {
        id: u64,
    },
    /// A governance action changed a parameter.
    ConfigUpdated {
        action: ProposalAction,
    },
    /// Governance token transfer.
    Transfer {
        from: Address,
        to: Address,
        amount: Amount,
    },
}

impl DexEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DexEvent::PairCreated { .. } => "PairCreated",
            DexEvent::Mint { .. } => "Mint",
            DexEvent::Burn { .. } => "Burn",
            DexEvent::Swap { .. } => "Swap",
            DexEvent::ProposalCreated { .. } => "ProposalCreated",
            DexEvent::VoteCast { .. } => "VoteCast",
            DexEvent::ProposalExecuted { .. } => "ProposalExecuted",
            DexEvent::ConfigUpdated { .. } => "ConfigUpdated",
            DexEvent::Transfer { .. } => "Transfer",
        }
    }

    /// The pool this event concerns, if any.
    pub fn pool(&self) -> Option<PoolId> {
        match self {
            DexEvent::PairCreated { pool, .. }
            | DexEvent::Mint { pool, .. }
            | DexEvent::Burn { pool, .. }
            | DexEvent::Swap { pool, .. } => Some(*pool),
            _ => None,
        }
    }
}
