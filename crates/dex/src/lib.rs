//! In-memory constant-product DEX core with token-weighted governance.
//!
//! This library provides:
//! - Constant-product pools with liquidity-share accounting
//! - A pair registry with deterministic pool identities
//! - Multi-hop routing with atomic execution and rollback
//! - Proposal and voting governance over a snapshot-weighted token
//! - Operation logs, events and a deterministic state root for replay

pub mod config;
pub mod error;
pub mod events;
pub mod governance;
pub mod math;
pub mod operation;
pub mod pair;
pub mod pool;
pub mod pool_manager;
pub mod registry;
pub mod router;
pub mod token;
pub mod types;

pub use config::DexConfig;
pub use error::{DexError, ErrorKind};
pub use events::DexEvent;
pub use governance::{
    GovernanceConfig, GovernanceModule, Proposal, ProposalAction, ProposalStatus, Vote, DAY,
};
pub use math::Rounding;
pub use operation::{LoggedOperation, Operation, Outcome};
pub use pair::{PairKey, PoolId};
pub use pool::{LiquidityAdded, LiquidityRemoved, Pool};
pub use pool_manager::PoolManager;
pub use registry::PairRegistry;
pub use router::{Quote, Route, RouteHop, Router};
pub use token::{whole_tokens, GovernanceToken, VotingPower};
pub use types::{Address, Amount, Price, Timestamp, TokenId, U256};
