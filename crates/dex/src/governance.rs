//! Proposal lifecycle and token-weighted voting.

use crate::error::DexError;
use crate::math::{self, BPS};
use crate::token::{whole_tokens, VotingPower};
use crate::types::{Address, Amount, Timestamp, U256};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

/// Seconds in a day.
pub const DAY: u64 = 86_400;

/// Governance parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovernanceConfig {
    /// Delay between creation and the start of voting.
    pub voting_delay: u64,
    /// Length of the voting window.
    pub voting_period: u64,
    /// Time after the voting deadline during which a passed proposal can be
    /// executed before it expires.
    pub grace_period: u64,
    /// Minimum current balance required to create a proposal.
    pub proposal_threshold: Amount,
    /// Minimum total weight cast for a proposal to pass.
    pub quorum: Amount,
    /// Whether a voter may replace an earlier vote.
    pub allow_vote_change: bool,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            voting_delay: 0,
            voting_period: 3 * DAY,
            grace_period: 14 * DAY,
            proposal_threshold: whole_tokens(1_000),
            quorum: U256::ZERO,
            allow_vote_change: false,
        }
    }
}

impl GovernanceConfig {
    pub fn with_voting_delay(mut self, delay: u64) -> Self {
        self.voting_delay = delay;
        self
    }

    pub fn with_voting_period(mut self, period: u64) -> Self {
        self.voting_period = period;
        self
    }

    pub fn with_grace_period(mut self, grace: u64) -> Self {
        self.grace_period = grace;
        self
    }

    pub fn with_proposal_threshold(mut self, threshold: Amount) -> Self {
        self.proposal_threshold = threshold;
        self
    }

    pub fn with_quorum(mut self, quorum: Amount) -> Self {
        self.quorum = quorum;
        self
    }

    pub fn with_vote_change(mut self, allow: bool) -> Self {
        self.allow_vote_change = allow;
        self
    }
}

/// Status of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProposalStatus {
    /// Created, voting has not started yet.
    Pending,
    /// Voting is open.
    Active,
    /// Voting closed with more weight for than against (and quorum reached).
    Succeeded,
    /// Voting closed without passing. Ties are defeated.
    Defeated,
    /// The action has been applied.
    Executed,
    /// The grace window ran out before execution.
    Expired,
}

impl ProposalStatus {
    /// Stable numeric code, used for hashing and ABI encoding.
    pub fn code(&self) -> u8 {
        match self {
            ProposalStatus::Pending => 0,
            ProposalStatus::Active => 1,
            ProposalStatus::Succeeded => 2,
            ProposalStatus::Defeated => 3,
            ProposalStatus::Executed => 4,
            ProposalStatus::Expired => 5,
        }
    }
}

/// A configuration change a proposal applies when executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalAction {
    /// Change the swap fee, in basis points.
    SetFeeBps(u32),
    /// Change the balance needed to create a proposal.
    SetProposalThreshold(Amount),
    /// Change the minimum total weight a proposal needs to pass.
    SetQuorum(Amount),
    /// Change the voting period for proposals created afterwards.
    SetVotingPeriod(u64),
}

impl ProposalAction {
    /// Reject actions that could never be applied.
    pub fn validate(&self) -> Result<(), DexError> {
        match self {
            ProposalAction::SetFeeBps(fee_bps) if *fee_bps >= BPS => {
                Err(DexError::InvalidAction("fee must be below 10000 bps"))
            }
            ProposalAction::SetVotingPeriod(0) => {
                Err(DexError::InvalidAction("voting period must be positive"))
            }
            _ => Ok(()),
        }
    }

    /// Stable numeric code of the action kind.
    pub fn kind(&self) -> u8 {
        match self {
            ProposalAction::SetFeeBps(_) => 0,
            ProposalAction::SetProposalThreshold(_) => 1,
            ProposalAction::SetQuorum(_) => 2,
            ProposalAction::SetVotingPeriod(_) => 3,
        }
    }

    /// The action's argument widened to 256 bits.
    pub fn value(&self) -> U256 {
        match self {
            ProposalAction::SetFeeBps(fee_bps) => U256::from(*fee_bps),
            ProposalAction::SetProposalThreshold(amount) | ProposalAction::SetQuorum(amount) => {
                *amount
            }
            ProposalAction::SetVotingPeriod(period) => U256::from(*period),
        }
    }

    /// Rebuild an action from its kind code and argument.
    pub fn from_parts(kind: u8, value: U256) -> Result<Self, DexError> {
        let action = match kind {
            0 => ProposalAction::SetFeeBps(
                value
                    .try_into()
                    .map_err(|_| DexError::InvalidAction("fee out of range"))?,
            ),
            1 => ProposalAction::SetProposalThreshold(value),
            2 => ProposalAction::SetQuorum(value),
            3 => ProposalAction::SetVotingPeriod(
                value
                    .try_into()
                    .map_err(|_| DexError::InvalidAction("voting period out of range"))?,
            ),
            _ => return Err(DexError::InvalidAction("unknown action kind")),
        };
        Ok(action)
    }
}

impl fmt::Display for ProposalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProposalAction::SetFeeBps(fee_bps) => write!(f, "set fee to {fee_bps} bps"),
            ProposalAction::SetProposalThreshold(amount) => {
                write!(f, "set proposal threshold to {amount}")
            }
            ProposalAction::SetQuorum(amount) => write!(f, "set quorum to {amount}"),
            ProposalAction::SetVotingPeriod(period) => {
                write!(f, "set voting period to {period}s")
            }
        }
    }
}

/// A governance proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub id: u64,
    pub proposer: Address,
    pub description: String,
    pub action: ProposalAction,
    /// Creation time; vote weights are balances from before this instant.
    pub created_at: Timestamp,
    pub voting_starts: Timestamp,
    /// Last instant at which votes are accepted.
    pub deadline: Timestamp,
    /// Last instant at which a passed proposal can be executed.
    pub expires_at: Timestamp,
    /// Turnout needed to pass, fixed when the proposal is created.
    pub quorum: Amount,
    pub for_votes: Amount,
    pub against_votes: Amount,
    /// Status as of the last successful operation on this proposal.
    /// Use [`Proposal::status_at`] for the status at a given time.
    pub status: ProposalStatus,
    pub executed_at: Option<Timestamp>,
}

impl Proposal {
    /// Resolve the status at `now` from the stored tally and timestamps.
    pub fn status_at(&self, now: Timestamp) -> ProposalStatus {
        match self.status {
            ProposalStatus::Executed | ProposalStatus::Expired => return self.status,
            _ => {}
        }
        if now > self.expires_at {
            return ProposalStatus::Expired;
        }
        if now < self.voting_starts {
            return ProposalStatus::Pending;
        }
        if now <= self.deadline {
            return ProposalStatus::Active;
        }
        let turnout = self.for_votes.saturating_add(self.against_votes);
        if self.for_votes > self.against_votes && turnout >= self.quorum {
            ProposalStatus::Succeeded
        } else {
            ProposalStatus::Defeated
        }
    }
}

/// A recorded vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vote {
    pub proposal_id: u64,
    pub voter: Address,
    pub support: bool,
    pub weight: Amount,
}

/// Owns proposals and votes. Reads token balances through [`VotingPower`]
/// and never changes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovernanceModule {
    config: GovernanceConfig,
    proposals: BTreeMap<u64, Proposal>,
    votes: BTreeMap<(u64, Address), Vote>,
    next_id: u64,
}

impl Default for GovernanceModule {
    fn default() -> Self {
        Self::new(GovernanceConfig::default())
    }
}

impl GovernanceModule {
    pub fn new(config: GovernanceConfig) -> Self {
        Self {
            config,
            proposals: BTreeMap::new(),
            votes: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    pub(crate) fn config_mut(&mut self) -> &mut GovernanceConfig {
        &mut self.config
    }

    pub fn proposal(&self, id: u64) -> Option<&Proposal> {
        self.proposals.get(&id)
    }

    /// All proposals in id order.
    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> + '_ {
        self.proposals.values()
    }

    pub fn vote_of(&self, id: u64, voter: Address) -> Option<&Vote> {
        self.votes.get(&(id, voter))
    }

    /// All votes ordered by proposal id, then voter.
    pub fn votes(&self) -> impl Iterator<Item = &Vote> + '_ {
        self.votes.values()
    }

    /// Status of a proposal at `now`.
    pub fn status_at(&self, id: u64, now: Timestamp) -> Result<ProposalStatus, DexError> {
        let proposal = self
            .proposals
            .get(&id)
            .ok_or(DexError::ProposalNotFound(id))?;
        Ok(proposal.status_at(now))
    }

    /// Store the status each open proposal resolves to at `now`.
    pub fn refresh(&mut self, now: Timestamp) {
        for proposal in self.proposals.values_mut() {
            let status = proposal.status_at(now);
            if status != proposal.status {
                debug!(
                    id = proposal.id,
                    from = ?proposal.status,
                    to = ?status,
                    "proposal status changed"
                );
                proposal.status = status;
            }
        }
    }

    /// Create a proposal. The proposer's current balance must reach the
    /// proposal threshold.
    pub fn propose<P: VotingPower>(
        &mut self,
        proposer: Address,
        description: String,
        action: ProposalAction,
        now: Timestamp,
        power: &P,
    ) -> Result<u64, DexError> {
        action.validate()?;
        let balance = power.balance_of(proposer);
        if balance < self.config.proposal_threshold {
            return Err(DexError::InsufficientBalance {
                balance,
                required: self.config.proposal_threshold,
            });
        }

        let voting_starts = now.checked_add(self.config.voting_delay).ok_or(DexError::Overflow)?;
        let deadline = voting_starts
            .checked_add(self.config.voting_period)
            .ok_or(DexError::Overflow)?;
        let expires_at = deadline
            .checked_add(self.config.grace_period)
            .ok_or(DexError::Overflow)?;

        let id = self.next_id;
        let status = if voting_starts > now {
            ProposalStatus::Pending
        } else {
            ProposalStatus::Active
        };
        self.proposals.insert(
            id,
            Proposal {
                id,
                proposer,
                description,
                action,
                created_at: now,
                voting_starts,
                deadline,
                expires_at,
                quorum: self.config.quorum,
                for_votes: U256::ZERO,
                against_votes: U256::ZERO,
                status,
                executed_at: None,
            },
        );
        self.next_id += 1;

        info!(id, %proposer, %action, deadline, "proposal created");
        Ok(id)
    }

    /// Cast a vote. `weight` defaults to the voter's whole balance from
    /// before the proposal was created and may not exceed it.
    ///
    /// Returns the vote as recorded.
    pub fn vote<P: VotingPower>(
        &mut self,
        voter: Address,
        id: u64,
        support: bool,
        weight: Option<Amount>,
        now: Timestamp,
        power: &P,
    ) -> Result<Vote, DexError> {
        let proposal = self
            .proposals
            .get(&id)
            .ok_or(DexError::ProposalNotFound(id))?;
        if proposal.status_at(now) != ProposalStatus::Active {
            return Err(DexError::ProposalNotActive(id));
        }

        let snapshot = power.balance_at(voter, proposal.created_at);
        let weight = weight.unwrap_or(snapshot);
        if weight.is_zero() || weight > snapshot {
            return Err(DexError::InsufficientBalance {
                balance: snapshot,
                required: weight.max(U256::from(1)),
            });
        }

        let (mut for_votes, mut against_votes) = (proposal.for_votes, proposal.against_votes);
        if let Some(prior) = self.votes.get(&(id, voter)) {
            if !self.config.allow_vote_change {
                return Err(DexError::AlreadyVoted(id));
            }
            if prior.support {
                for_votes = math::sub(for_votes, prior.weight)?;
            } else {
                against_votes = math::sub(against_votes, prior.weight)?;
            }
        }
        if support {
            for_votes = math::add(for_votes, weight)?;
        } else {
            against_votes = math::add(against_votes, weight)?;
        }

        let vote = Vote {
            proposal_id: id,
            voter,
            support,
            weight,
        };
        if let Some(proposal) = self.proposals.get_mut(&id) {
            proposal.for_votes = for_votes;
            proposal.against_votes = against_votes;
            proposal.status = ProposalStatus::Active;
        }
        self.votes.insert((id, voter), vote);

        info!(id, %voter, support, %weight, "vote cast");
        Ok(vote)
    }

    /// Mark a succeeded proposal as executed and hand back its action.
    ///
    /// The caller applies the action; each proposal yields it exactly once.
    pub fn execute(&mut self, id: u64, now: Timestamp) -> Result<ProposalAction, DexError> {
        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(DexError::ProposalNotFound(id))?;
        match proposal.status_at(now) {
            ProposalStatus::Executed => Err(DexError::AlreadyExecuted(id)),
            ProposalStatus::Succeeded => {
                proposal.status = ProposalStatus::Executed;
                proposal.executed_at = Some(now);
                info!(id, action = %proposal.action, "proposal executed");
                Ok(proposal.action)
            }
            _ => Err(DexError::ProposalNotSucceeded(id)),
        }
    }
}
