//! Pool manager: the single owner of all exchange state.

use crate::config::DexConfig;
use crate::error::DexError;
use crate::events::DexEvent;
use crate::governance::{GovernanceConfig, GovernanceModule, ProposalAction, Vote};
use crate::operation::{LoggedOperation, Operation, Outcome};
use crate::pair::PoolId;
use crate::pool::{LiquidityAdded, LiquidityRemoved, Pool};
use crate::registry::PairRegistry;
use crate::router::{Quote, Route, Router};
use crate::token::{whole_tokens, GovernanceToken, VotingPower, GOVERNANCE_TOKEN_SUPPLY};
use crate::types::{Address, Amount, Timestamp, TokenId, U256};
use alloy::primitives::{keccak256, B256};
use tracing::{debug, info};

/// The main DEX pool manager.
///
/// Owns the configuration, the pair registry with its pools, the governance
/// module and the governance token. Operations are applied one at a time;
/// each either commits all of its effects and events or returns an error
/// with nothing changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolManager {
    config: DexConfig,
    registry: PairRegistry,
    governance: GovernanceModule,
    token: GovernanceToken,
    /// Events of committed operations not yet taken by the caller.
    events: Vec<DexEvent>,
}

impl Default for PoolManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolManager {
    /// Create a new pool manager with default configuration.
    pub fn new() -> Self {
        Self::with_config(DexConfig::default(), GovernanceConfig::default())
    }

    /// Create a new pool manager with custom configuration.
    pub fn with_config(config: DexConfig, governance: GovernanceConfig) -> Self {
        Self {
            config,
            registry: PairRegistry::new(),
            governance: GovernanceModule::new(governance),
            token: GovernanceToken::new(),
            events: Vec::new(),
        }
    }

    /// Mint the initial governance token supply to `holder`.
    pub fn with_genesis(mut self, holder: Address, now: Timestamp) -> Result<Self, DexError> {
        let amount = whole_tokens(GOVERNANCE_TOKEN_SUPPLY);
        self.token.mint(holder, amount, now)?;
        self.events.push(DexEvent::Transfer {
            from: Address::ZERO,
            to: holder,
            amount,
        });
        info!(%holder, %amount, "governance token genesis");
        Ok(self)
    }

    pub fn config(&self) -> &DexConfig {
        &self.config
    }

    pub fn governance_config(&self) -> &GovernanceConfig {
        self.governance.config()
    }

    pub fn registry(&self) -> &PairRegistry {
        &self.registry
    }

    pub fn governance(&self) -> &GovernanceModule {
        &self.governance
    }

    pub fn token(&self) -> &GovernanceToken {
        &self.token
    }

    pub fn pool(&self, pool_id: &PoolId) -> Option<&Pool> {
        self.registry.pool(pool_id)
    }

    /// Events committed since the last [`PoolManager::take_events`].
    pub fn events(&self) -> &[DexEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<DexEvent> {
        std::mem::take(&mut self.events)
    }

    fn router(&self) -> Router<'_> {
        Router::new(&self.config)
    }

    // Pairs

    pub fn create_pair(&mut self, token_a: TokenId, token_b: TokenId) -> Result<PoolId, DexError> {
        let pool_id = self.registry.create_pair(token_a, token_b)?;
        let key = self.registry.require_pool(&pool_id)?.key();
        self.events.push(DexEvent::PairCreated {
            pool: pool_id,
            token0: key.token0(),
            token1: key.token1(),
            pair_count: self.registry.all_pairs_length() as u64,
        });
        Ok(pool_id)
    }

    pub fn get_pair(&self, token_a: TokenId, token_b: TokenId) -> Option<PoolId> {
        self.registry.get_pair(token_a, token_b)
    }

    pub fn all_pairs(&self) -> impl Iterator<Item = PoolId> + '_ {
        self.registry.all_pairs()
    }

    // Liquidity

    pub fn add_liquidity(
        &mut self,
        provider: Address,
        pool_id: PoolId,
        amount0: Amount,
        amount1: Amount,
    ) -> Result<LiquidityAdded, DexError> {
        let pool = self.registry.require_pool_mut(&pool_id)?;
        let added = pool.add_liquidity(provider, amount0, amount1, &self.config)?;
        self.events.push(DexEvent::Mint {
            pool: pool_id,
            provider,
            amount0: added.amount0,
            amount1: added.amount1,
            shares: added.shares,
        });
        Ok(added)
    }

    pub fn remove_liquidity(
        &mut self,
        provider: Address,
        pool_id: PoolId,
        shares: Amount,
    ) -> Result<LiquidityRemoved, DexError> {
        let pool = self.registry.require_pool_mut(&pool_id)?;
        let removed = pool.remove_liquidity(provider, shares)?;
        self.events.push(DexEvent::Burn {
            pool: pool_id,
            provider,
            amount0: removed.amount0,
            amount1: removed.amount1,
            shares: removed.shares,
        });
        Ok(removed)
    }

    // Swaps

    /// Swap directly against one pool.
    pub fn swap(
        &mut self,
        sender: Address,
        pool_id: PoolId,
        amount_in: Amount,
        token_in_is_first: bool,
        min_amount_out: Amount,
    ) -> Result<Amount, DexError> {
        let pool = self.registry.require_pool_mut(&pool_id)?;
        let amount_out = pool.swap(amount_in, token_in_is_first, min_amount_out, &self.config)?;
        let key = pool.key();
        let (token_in, token_out) = if token_in_is_first {
            (key.token0(), key.token1())
        } else {
            (key.token1(), key.token0())
        };
        self.events.push(DexEvent::Swap {
            pool: pool_id,
            sender,
            token_in,
            token_out,
            amount_in,
            amount_out,
        });
        Ok(amount_out)
    }

    pub fn get_amounts_out(
        &self,
        amount_in: Amount,
        path: &[TokenId],
    ) -> Result<Vec<Amount>, DexError> {
        self.router().get_amounts_out(&self.registry, amount_in, path)
    }

    pub fn get_amounts_in(
        &self,
        amount_out: Amount,
        path: &[TokenId],
    ) -> Result<Vec<Amount>, DexError> {
        self.router().get_amounts_in(&self.registry, amount_out, path)
    }

    pub fn quote(&self, amount_in: Amount, path: &[TokenId]) -> Result<Quote, DexError> {
        self.router().quote(&self.registry, amount_in, path)
    }

    /// Best quote across all paths between two tokens.
    pub fn find_best_path(
        &self,
        token_in: TokenId,
        token_out: TokenId,
        amount_in: Amount,
    ) -> Result<Quote, DexError> {
        self.router()
            .find_best_path(&self.registry, token_in, token_out, amount_in)
    }

    pub fn swap_exact_tokens_for_tokens(
        &mut self,
        sender: Address,
        amount_in: Amount,
        amount_out_min: Amount,
        path: &[TokenId],
        deadline: Timestamp,
        now: Timestamp,
    ) -> Result<Route, DexError> {
        let router = Router::new(&self.config);
        let route = router.swap_exact_tokens_for_tokens(
            &mut self.registry,
            amount_in,
            amount_out_min,
            path,
            deadline,
            now,
        )?;
        self.push_route_events(sender, &route);
        Ok(route)
    }

    pub fn swap_tokens_for_exact_tokens(
        &mut self,
        sender: Address,
        amount_out: Amount,
        amount_in_max: Amount,
        path: &[TokenId],
        deadline: Timestamp,
        now: Timestamp,
    ) -> Result<Route, DexError> {
        let router = Router::new(&self.config);
        let route = router.swap_tokens_for_exact_tokens(
            &mut self.registry,
            amount_out,
            amount_in_max,
            path,
            deadline,
            now,
        )?;
        self.push_route_events(sender, &route);
        Ok(route)
    }

    fn push_route_events(&mut self, sender: Address, route: &Route) {
        self.events.extend(route.hops.iter().map(|hop| DexEvent::Swap {
            pool: hop.pool,
            sender,
            token_in: hop.token_in,
            token_out: hop.token_out,
            amount_in: hop.amount_in,
            amount_out: hop.amount_out,
        }));
    }

    // Governance

    pub fn propose(
        &mut self,
        proposer: Address,
        description: String,
        action: ProposalAction,
        now: Timestamp,
    ) -> Result<u64, DexError> {
        let id = self
            .governance
            .propose(proposer, description.clone(), action, now, &self.token)?;
        self.governance.refresh(now);
        let deadline = self
            .governance
            .proposal(id)
            .map(|p| p.deadline)
            .unwrap_or_default();
        self.events.push(DexEvent::ProposalCreated {
            id,
            proposer,
            action,
            deadline,
            description,
        });
        Ok(id)
    }

    pub fn vote(
        &mut self,
        voter: Address,
        proposal_id: u64,
        support: bool,
        weight: Option<Amount>,
        now: Timestamp,
    ) -> Result<Vote, DexError> {
        let vote = self
            .governance
            .vote(voter, proposal_id, support, weight, now, &self.token)?;
        self.governance.refresh(now);
        self.events.push(DexEvent::VoteCast {
            id: proposal_id,
            voter,
            support,
            weight: vote.weight,
        });
        Ok(vote)
    }

    /// Execute a succeeded proposal and apply its action.
    pub fn execute(
        &mut self,
        proposal_id: u64,
        now: Timestamp,
    ) -> Result<ProposalAction, DexError> {
        let action = self.governance.execute(proposal_id, now)?;
        self.apply_action(action);
        self.governance.refresh(now);
        self.events.push(DexEvent::ProposalExecuted { id: proposal_id });
        self.events.push(DexEvent::ConfigUpdated { action });
        Ok(action)
    }

    fn apply_action(&mut self, action: ProposalAction) {
        match action {
            ProposalAction::SetFeeBps(fee_bps) => self.config.fee_bps = fee_bps,
            ProposalAction::SetProposalThreshold(threshold) => {
                self.governance.config_mut().proposal_threshold = threshold
            }
            ProposalAction::SetQuorum(quorum) => self.governance.config_mut().quorum = quorum,
            ProposalAction::SetVotingPeriod(period) => {
                self.governance.config_mut().voting_period = period
            }
        }
        info!(%action, "configuration updated");
    }

    /// Transfer governance tokens.
    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: Amount,
        now: Timestamp,
    ) -> Result<(), DexError> {
        self.token.transfer(from, to, amount, now)?;
        self.events.push(DexEvent::Transfer { from, to, amount });
        Ok(())
    }

    pub fn balance_of(&self, holder: Address) -> Amount {
        self.token.balance_of(holder)
    }

    // Operation log

    /// Apply one operation on behalf of `caller` at time `now`.
    pub fn apply(
        &mut self,
        caller: Address,
        now: Timestamp,
        operation: Operation,
    ) -> Result<Outcome, DexError> {
        let name = operation.name();
        let result = match operation {
            Operation::CreatePair { token_a, token_b } => {
                self.create_pair(token_a, token_b).map(Outcome::PairCreated)
            }
            Operation::AddLiquidity {
                pool,
                amount0,
                amount1,
            } => self
                .add_liquidity(caller, pool, amount0, amount1)
                .map(Outcome::LiquidityAdded),
            Operation::RemoveLiquidity { pool, shares } => self
                .remove_liquidity(caller, pool, shares)
                .map(Outcome::LiquidityRemoved),
            Operation::Swap {
                pool,
                amount_in,
                token_in_is_first,
                min_amount_out,
            } => self
                .swap(caller, pool, amount_in, token_in_is_first, min_amount_out)
                .map(Outcome::Swapped),
            Operation::SwapExactTokensForTokens {
                amount_in,
                amount_out_min,
                path,
                deadline,
            } => self
                .swap_exact_tokens_for_tokens(caller, amount_in, amount_out_min, &path, deadline, now)
                .map(Outcome::Routed),
            Operation::SwapTokensForExactTokens {
                amount_out,
                amount_in_max,
                path,
                deadline,
            } => self
                .swap_tokens_for_exact_tokens(caller, amount_out, amount_in_max, &path, deadline, now)
                .map(Outcome::Routed),
            Operation::Propose {
                description,
                action,
            } => self
                .propose(caller, description, action, now)
                .map(Outcome::Proposed),
            Operation::Vote {
                proposal_id,
                support,
                weight,
            } => self
                .vote(caller, proposal_id, support, weight, now)
                .map(Outcome::Voted),
            Operation::Execute { proposal_id } => {
                self.execute(proposal_id, now).map(Outcome::Executed)
            }
            Operation::Transfer { to, amount } => self
                .transfer(caller, to, amount, now)
                .map(|()| Outcome::Transferred),
        };

        if let Err(err) = &result {
            debug!(op = name, %caller, now, %err, "operation rejected");
        }
        result
    }

    /// Apply a log of operations in order, returning each result.
    pub fn replay<'a, I>(&mut self, log: I) -> Vec<Result<Outcome, DexError>>
    where
        I: IntoIterator<Item = &'a LoggedOperation>,
    {
        log.into_iter()
            .map(|entry| self.apply(entry.caller, entry.timestamp, entry.operation.clone()))
            .collect()
    }

    /// Hash of a deterministic encoding of all state.
    ///
    /// Two managers that applied the same operation log from the same
    /// configuration have the same root. Pending events are not included.
    pub fn state_root(&self) -> B256 {
        let mut buf = StateEncoder::default();

        buf.u64(self.config.fee_bps.into());
        buf.u64(self.config.max_routing_hops as u64);
        buf.u64(self.config.liquidity_tolerance_bps.into());

        let gov = self.governance.config();
        buf.u64(gov.voting_delay);
        buf.u64(gov.voting_period);
        buf.u64(gov.grace_period);
        buf.u256(gov.proposal_threshold);
        buf.u256(gov.quorum);
        buf.bool(gov.allow_vote_change);

        buf.u64(self.registry.all_pairs_length() as u64);
        for pool in self.registry.all_pairs().filter_map(|id| self.registry.pool(&id)) {
            let key = pool.key();
            let (reserve0, reserve1) = pool.reserves();
            buf.bytes(pool.id().as_b256().as_slice());
            buf.bytes(key.token0().as_slice());
            buf.bytes(key.token1().as_slice());
            buf.u256(reserve0);
            buf.u256(reserve1);
            buf.u256(pool.total_shares());
            let holders: Vec<_> = pool.share_holders().collect();
            buf.u64(holders.len() as u64);
            for (provider, shares) in holders {
                buf.bytes(provider.as_slice());
                buf.u256(shares);
            }
        }

        for proposal in self.governance.proposals() {
            buf.u64(proposal.id);
            buf.bytes(proposal.proposer.as_slice());
            buf.bytes(keccak256(proposal.description.as_bytes()).as_slice());
            buf.u64(proposal.action.kind().into());
            buf.u256(proposal.action.value());
            buf.u64(proposal.created_at);
            buf.u64(proposal.voting_starts);
            buf.u64(proposal.deadline);
            buf.u64(proposal.expires_at);
            buf.u256(proposal.quorum);
            buf.u256(proposal.for_votes);
            buf.u256(proposal.against_votes);
            buf.u64(proposal.status.code().into());
            buf.bool(proposal.executed_at.is_some());
            buf.u64(proposal.executed_at.unwrap_or_default());
        }

        for vote in self.governance.votes() {
            buf.u64(vote.proposal_id);
            buf.bytes(vote.voter.as_slice());
            buf.bool(vote.support);
            buf.u256(vote.weight);
        }

        buf.u256(self.token.total_supply());
        for (holder, balance) in self.token.holders() {
            buf.bytes(holder.as_slice());
            buf.u256(balance);
        }

        keccak256(&buf.0)
    }
}

/// Big-endian, fixed-width byte encoder for state hashing.
#[derive(Default)]
struct StateEncoder(Vec<u8>);

impl StateEncoder {
    fn bytes(&mut self, bytes: &[u8]) {
        self.0.extend_from_slice(bytes);
    }

    fn u64(&mut self, value: u64) {
        self.0.extend_from_slice(&value.to_be_bytes());
    }

    fn u256(&mut self, value: U256) {
        self.0.extend_from_slice(&value.to_be_bytes::<32>());
    }

    fn bool(&mut self, value: bool) {
        self.0.push(value as u8);
    }
}
