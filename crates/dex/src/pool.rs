//! Constant-product liquidity pool.

use crate::config::DexConfig;
use crate::error::DexError;
use crate::math::{self, Rounding, BPS};
use crate::pair::{PairKey, PoolId};
use crate::types::{Address, Amount, Price, U256};
use alloy::primitives::U512;
use std::collections::BTreeMap;
use tracing::debug;

/// Result of a successful liquidity deposit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidityAdded {
    /// Shares minted to the provider.
    pub shares: Amount,
    /// Amount of token0 moved into the reserves.
    pub amount0: Amount,
    /// Amount of token1 moved into the reserves.
    pub amount1: Amount,
    /// Part of the supplied token0 returned to the provider.
    pub refund0: Amount,
    /// Part of the supplied token1 returned to the provider.
    pub refund1: Amount,
}

/// Result of a successful liquidity withdrawal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidityRemoved {
    /// Shares burned.
    pub shares: Amount,
    /// Amount of token0 paid out.
    pub amount0: Amount,
    /// Amount of token1 paid out.
    pub amount1: Amount,
}

/// A reserve pair plus liquidity-share ledger for one token pair.
///
/// Invariants:
/// - `total_shares == 0` iff both reserves are zero.
/// - `reserve0 * reserve1` never decreases across a swap.
/// - The sum of all provider balances equals `total_shares`.
///
/// Every mutating method either applies all of its changes or none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    key: PairKey,
    reserve0: Amount,
    reserve1: Amount,
    total_shares: Amount,
    shares: BTreeMap<Address, Amount>,
}

impl Pool {
    /// Create an empty pool for a pair.
    pub fn new(key: PairKey) -> Self {
        Self {
            key,
            reserve0: U256::ZERO,
            reserve1: U256::ZERO,
            total_shares: U256::ZERO,
            shares: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> PoolId {
        self.key.id()
    }

    pub fn key(&self) -> PairKey {
        self.key
    }

    pub fn reserves(&self) -> (Amount, Amount) {
        (self.reserve0, self.reserve1)
    }

    pub fn total_shares(&self) -> Amount {
        self.total_shares
    }

    /// Shares held by a liquidity provider.
    pub fn shares_of(&self, provider: Address) -> Amount {
        self.shares.get(&provider).copied().unwrap_or_default()
    }

    /// All provider balances, ordered by address.
    pub fn share_holders(&self) -> impl Iterator<Item = (Address, Amount)> + '_ {
        self.shares.iter().map(|(holder, amount)| (*holder, *amount))
    }

    /// The constant product `reserve0 * reserve1`, computed without overflow.
    pub fn k(&self) -> U512 {
        product(self.reserve0, self.reserve1)
    }

    /// Price of token0 in token1 (`reserve1 / reserve0`).
    /// Returns `None` while the pool is empty.
    pub fn spot_price(&self) -> Option<Price> {
        if self.reserve1.is_zero() {
            return None;
        }
        Price::new(self.reserve1, self.reserve0)
    }

    /// `(reserve_in, reserve_out)` for a swap direction.
    pub fn reserves_for(&self, token_in_is_first: bool) -> (Amount, Amount) {
        if token_in_is_first {
            (self.reserve0, self.reserve1)
        } else {
            (self.reserve1, self.reserve0)
        }
    }

    /// Output a swap of `amount_in` would produce right now.
    pub fn quote_out(
        &self,
        amount_in: Amount,
        token_in_is_first: bool,
        config: &DexConfig,
    ) -> Result<Amount, DexError> {
        let (reserve_in, reserve_out) = self.reserves_for(token_in_is_first);
        swap_output(amount_in, reserve_in, reserve_out, config.fee_bps)
    }

    /// Input needed right now to receive exactly `amount_out`.
    pub fn quote_in(
        &self,
        amount_out: Amount,
        token_in_is_first: bool,
        config: &DexConfig,
    ) -> Result<Amount, DexError> {
        let (reserve_in, reserve_out) = self.reserves_for(token_in_is_first);
        math::get_amount_in(amount_out, reserve_in, reserve_out, config.fee_bps)
    }

    /// Deposit both tokens in canonical order and mint shares to `provider`.
    ///
    /// An empty pool is seeded with `sqrt(amount0 * amount1)` shares at the
    /// supplied ratio. Otherwise the scarcer side limits the shares minted, the
    /// amounts actually taken are rounded up and any excess is refunded. A
    /// refund larger than `liquidity_tolerance_bps` of what was supplied fails
    /// the deposit with [`DexError::LiquidityRatioMismatch`].
    pub fn add_liquidity(
        &mut self,
        provider: Address,
        amount0: Amount,
        amount1: Amount,
        config: &DexConfig,
    ) -> Result<LiquidityAdded, DexError> {
        let added = if self.total_shares.is_zero() {
            let shares = math::sqrt_product(amount0, amount1);
            LiquidityAdded {
                shares,
                amount0,
                amount1,
                refund0: U256::ZERO,
                refund1: U256::ZERO,
            }
        } else {
            let total = self.total_shares;
            let shares0 = math::mul_div(amount0, total, self.reserve0, Rounding::Down)?;
            let shares1 = math::mul_div(amount1, total, self.reserve1, Rounding::Down)?;
            let shares = shares0.min(shares1);
            if shares.is_zero() {
                return Err(DexError::InsufficientLiquidityMinted);
            }
            let used0 = math::mul_div(shares, self.reserve0, total, Rounding::Up)?;
            let used1 = math::mul_div(shares, self.reserve1, total, Rounding::Up)?;
            let added = LiquidityAdded {
                shares,
                amount0: used0,
                amount1: used1,
                refund0: math::sub(amount0, used0)?,
                refund1: math::sub(amount1, used1)?,
            };
            check_tolerance(added.refund0, amount0, config.liquidity_tolerance_bps)?;
            check_tolerance(added.refund1, amount1, config.liquidity_tolerance_bps)?;
            added
        };

        if added.shares.is_zero() {
            return Err(DexError::InsufficientLiquidityMinted);
        }

        let reserve0 = math::add(self.reserve0, added.amount0)?;
        let reserve1 = math::add(self.reserve1, added.amount1)?;
        let total_shares = math::add(self.total_shares, added.shares)?;
        let held = math::add(self.shares_of(provider), added.shares)?;

        self.reserve0 = reserve0;
        self.reserve1 = reserve1;
        self.total_shares = total_shares;
        self.shares.insert(provider, held);

        debug!(
            pool = %self.id(),
            %provider,
            shares = %added.shares,
            amount0 = %added.amount0,
            amount1 = %added.amount1,
            "liquidity added"
        );
        Ok(added)
    }

    /// Burn `share_amount` of the provider's shares for a proportional cut of
    /// both reserves, rounded down.
    pub fn remove_liquidity(
        &mut self,
        provider: Address,
        share_amount: Amount,
    ) -> Result<LiquidityRemoved, DexError> {
        if share_amount.is_zero() {
            return Err(DexError::InsufficientInputAmount);
        }
        let held = self.shares_of(provider);
        if held < share_amount {
            return Err(DexError::InsufficientShares {
                held,
                requested: share_amount,
            });
        }

        let total = self.total_shares;
        let amount0 = math::mul_div(self.reserve0, share_amount, total, Rounding::Down)?;
        let amount1 = math::mul_div(self.reserve1, share_amount, total, Rounding::Down)?;
        if amount0.is_zero() || amount1.is_zero() {
            return Err(DexError::InsufficientOutputAmount);
        }

        self.reserve0 = math::sub(self.reserve0, amount0)?;
        self.reserve1 = math::sub(self.reserve1, amount1)?;
        self.total_shares = total - share_amount;
        let remaining = held - share_amount;
        if remaining.is_zero() {
            self.shares.remove(&provider);
        } else {
            self.shares.insert(provider, remaining);
        }

        debug!(
            pool = %self.id(),
            %provider,
            shares = %share_amount,
            %amount0,
            %amount1,
            "liquidity removed"
        );
        Ok(LiquidityRemoved {
            shares: share_amount,
            amount0,
            amount1,
        })
    }

    /// Swap an exact input for as much output as the curve gives.
    ///
    /// Fails with [`DexError::SlippageExceeded`] if the output is below
    /// `min_amount_out`, and with [`DexError::InsufficientLiquidity`] if either
    /// reserve is empty or the trade would drain the output side.
    pub fn swap(
        &mut self,
        amount_in: Amount,
        token_in_is_first: bool,
        min_amount_out: Amount,
        config: &DexConfig,
    ) -> Result<Amount, DexError> {
        let (reserve_in, reserve_out) = self.reserves_for(token_in_is_first);
        let amount_out = swap_output(amount_in, reserve_in, reserve_out, config.fee_bps)?;
        if amount_out < min_amount_out {
            return Err(DexError::SlippageExceeded {
                actual: amount_out,
                minimum: min_amount_out,
            });
        }

        self.apply_swap(amount_in, amount_out, token_in_is_first)?;
        Ok(amount_out)
    }

    /// Swap as little input as needed to receive exactly `amount_out`.
    ///
    /// Fails with [`DexError::ExcessiveInputAmount`] if that input exceeds
    /// `max_amount_in`.
    pub fn swap_exact_out(
        &mut self,
        amount_out: Amount,
        token_in_is_first: bool,
        max_amount_in: Amount,
        config: &DexConfig,
    ) -> Result<Amount, DexError> {
        let amount_in = self.quote_in(amount_out, token_in_is_first, config)?;
        if amount_in > max_amount_in {
            return Err(DexError::ExcessiveInputAmount {
                required: amount_in,
                maximum: max_amount_in,
            });
        }

        self.apply_swap(amount_in, amount_out, token_in_is_first)?;
        Ok(amount_in)
    }

    fn apply_swap(
        &mut self,
        amount_in: Amount,
        amount_out: Amount,
        token_in_is_first: bool,
    ) -> Result<(), DexError> {
        let k_before = self.k();
        let (reserve_in, reserve_out) = self.reserves_for(token_in_is_first);
        let new_in = math::add(reserve_in, amount_in)?;
        let new_out = math::sub(reserve_out, amount_out)?;

        if token_in_is_first {
            self.reserve0 = new_in;
            self.reserve1 = new_out;
        } else {
            self.reserve1 = new_in;
            self.reserve0 = new_out;
        }
        debug_assert!(self.k() >= k_before, "constant product decreased");

        debug!(
            pool = %self.id(),
            %amount_in,
            %amount_out,
            token_in_is_first,
            "swap applied"
        );
        Ok(())
    }
}

/// Output of a swap against the given reserves, with the same checks
/// [`Pool::swap`] applies before touching state.
pub(crate) fn swap_output(
    amount_in: Amount,
    reserve_in: Amount,
    reserve_out: Amount,
    fee_bps: u32,
) -> Result<Amount, DexError> {
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(DexError::InsufficientLiquidity);
    }
    let amount_out = math::get_amount_out(amount_in, reserve_in, reserve_out, fee_bps)?;
    if amount_out.is_zero() {
        return Err(DexError::InsufficientOutputAmount);
    }
    if amount_out >= reserve_out {
        return Err(DexError::InsufficientLiquidity);
    }
    Ok(amount_out)
}

fn product(a: U256, b: U256) -> U512 {
    U512::from(a) * U512::from(b)
}

fn check_tolerance(refund: Amount, supplied: Amount, tolerance_bps: u32) -> Result<(), DexError> {
    if refund.is_zero() {
        return Ok(());
    }
    let excess = product(refund, U256::from(BPS));
    let allowed = product(supplied, U256::from(tolerance_bps));
    if excess > allowed {
        return Err(DexError::LiquidityRatioMismatch);
    }
    Ok(())
}
