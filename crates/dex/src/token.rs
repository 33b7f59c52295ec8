//! Governance token ledger with balance checkpoints.

use crate::error::DexError;
use crate::math;
use crate::types::{Address, Amount, Timestamp, U256};
use std::collections::BTreeMap;
use tracing::debug;

/// Decimals of the governance token.
pub const GOVERNANCE_TOKEN_DECIMALS: u8 = 18;

/// Whole tokens minted to the genesis holder.
pub const GOVERNANCE_TOKEN_SUPPLY: u64 = 1_000_000;

/// One whole governance token in base units.
pub fn whole_tokens(amount: u64) -> Amount {
    U256::from(amount) * U256::from(10u64.pow(GOVERNANCE_TOKEN_DECIMALS as u32))
}

/// Read access to token balances for vote weighting.
///
/// Governance only ever reads through this trait.
pub trait VotingPower {
    /// Current balance of `holder`.
    fn balance_of(&self, holder: Address) -> Amount;

    /// Balance of `holder` from transfers made strictly before `timestamp`.
    fn balance_at(&self, holder: Address, timestamp: Timestamp) -> Amount;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Checkpoint {
    timestamp: Timestamp,
    balance: Amount,
}

/// Fungible governance token (DEXG) that remembers every holder's balance
/// history, so votes can be weighted by a past snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GovernanceToken {
    total_supply: Amount,
    checkpoints: BTreeMap<Address, Vec<Checkpoint>>,
}

impl GovernanceToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token with the full initial supply minted to `holder` at `now`.
    pub fn with_genesis(holder: Address, now: Timestamp) -> Result<Self, DexError> {
        let mut token = Self::new();
        token.mint(holder, whole_tokens(GOVERNANCE_TOKEN_SUPPLY), now)?;
        Ok(token)
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Create new tokens for `to`.
    pub fn mint(&mut self, to: Address, amount: Amount, now: Timestamp) -> Result<(), DexError> {
        let total_supply = math::add(self.total_supply, amount)?;
        let balance = math::add(self.balance_of(to), amount)?;
        self.total_supply = total_supply;
        self.write_checkpoint(to, balance, now);
        debug!(%to, %amount, "governance tokens minted");
        Ok(())
    }

    /// Move tokens between holders.
    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: Amount,
        now: Timestamp,
    ) -> Result<(), DexError> {
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(DexError::InsufficientTokenBalance {
                balance: from_balance,
                required: amount,
            });
        }
        if from == to {
            return Ok(());
        }
        let to_balance = math::add(self.balance_of(to), amount)?;
        self.write_checkpoint(from, from_balance - amount, now);
        self.write_checkpoint(to, to_balance, now);
        debug!(%from, %to, %amount, "governance tokens transferred");
        Ok(())
    }

    /// Current balances of all holders, ordered by address.
    pub fn holders(&self) -> impl Iterator<Item = (Address, Amount)> + '_ {
        self.checkpoints.iter().filter_map(|(holder, history)| {
            let balance = history.last()?.balance;
            (!balance.is_zero()).then_some((*holder, balance))
        })
    }

    fn write_checkpoint(&mut self, holder: Address, balance: Amount, now: Timestamp) {
        let history = self.checkpoints.entry(holder).or_default();
        match history.last_mut() {
            // history stays sorted even if a caller's clock goes backwards
            Some(last) if last.timestamp >= now => last.balance = balance,
            _ => history.push(Checkpoint {
                timestamp: now,
                balance,
            }),
        }
    }
}

impl VotingPower for GovernanceToken {
    fn balance_of(&self, holder: Address) -> Amount {
        self.checkpoints
            .get(&holder)
            .and_then(|history| history.last())
            .map(|c| c.balance)
            .unwrap_or_default()
    }

    fn balance_at(&self, holder: Address, timestamp: Timestamp) -> Amount {
        let Some(history) = self.checkpoints.get(&holder) else {
            return U256::ZERO;
        };
        let idx = history.partition_point(|c| c.timestamp < timestamp);
        idx.checked_sub(1)
            .map(|i| history[i].balance)
            .unwrap_or_default()
    }
}
