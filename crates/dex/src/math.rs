//! Checked integer math for pool accounting.
//!
//! Every division performed by pools and the router goes through this module
//! so that rounding is decided in one place: amounts paid out by the protocol
//! round down, amounts owed to the protocol round up.

use crate::error::DexError;
use crate::types::{Amount, U256};
use alloy::primitives::{Uint, U512};

/// Basis point denominator (10000 bps = 100%).
pub const BPS: u32 = 10_000;

/// Direction of a rounded division.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Toward zero. Used for anything the protocol pays out.
    Down,
    /// Away from zero. Used for anything the protocol is owed.
    Up,
}

/// Compute `a * b / denominator` with the given rounding.
///
/// Fails with [`DexError::Overflow`] if the product does not fit in 256 bits
/// or the denominator is zero.
pub fn mul_div(a: U256, b: U256, denominator: U256, rounding: Rounding) -> Result<U256, DexError> {
    if denominator.is_zero() {
        return Err(DexError::Overflow);
    }
    let product = a.checked_mul(b).ok_or(DexError::Overflow)?;
    let quotient = product / denominator;
    match rounding {
        Rounding::Down => Ok(quotient),
        Rounding::Up if (product % denominator).is_zero() => Ok(quotient),
        Rounding::Up => quotient.checked_add(U256::from(1)).ok_or(DexError::Overflow),
    }
}

/// Floored integer square root.
pub fn sqrt<const BITS: usize, const LIMBS: usize>(y: Uint<BITS, LIMBS>) -> Uint<BITS, LIMBS> {
    let one = Uint::<BITS, LIMBS>::from(1u64);
    let two = Uint::<BITS, LIMBS>::from(2u64);
    if y.is_zero() {
        return y;
    }
    if y <= Uint::from(3u64) {
        return one;
    }
    let mut z = y;
    let mut x = y / two + one;
    while x < z {
        z = x;
        x = (y / x + x) / two;
    }
    z
}

/// `floor(sqrt(a * b))`, with the product taken in 512 bits.
pub fn sqrt_product(a: U256, b: U256) -> U256 {
    let root = sqrt(U512::from(a) * U512::from(b));
    U256::from_limbs_slice(&root.as_limbs()[..4])
}

/// Checked addition.
pub fn add(a: U256, b: U256) -> Result<U256, DexError> {
    a.checked_add(b).ok_or(DexError::Overflow)
}

/// Checked subtraction.
pub fn sub(a: U256, b: U256) -> Result<U256, DexError> {
    a.checked_sub(b).ok_or(DexError::Overflow)
}

/// Checked multiplication.
pub fn mul(a: U256, b: U256) -> Result<U256, DexError> {
    a.checked_mul(b).ok_or(DexError::Overflow)
}

fn fee_complement(fee_bps: u32) -> Result<U256, DexError> {
    BPS.checked_sub(fee_bps)
        .map(U256::from)
        .ok_or(DexError::InvalidAction("fee must be below 10000 bps"))
}

/// Fee charged on `amount_in`, rounded up.
pub fn fee_amount(amount_in: Amount, fee_bps: u32) -> Result<Amount, DexError> {
    mul_div(amount_in, U256::from(fee_bps), U256::from(BPS), Rounding::Up)
}

/// Output of a constant-product swap after the input fee.
///
/// `out = reserve_out - ceil(reserve_in * reserve_out / (reserve_in + in_after_fee))`,
/// computed in the equivalent single-division form
/// `floor(in_fee * reserve_out / (reserve_in * BPS + in_fee))` where
/// `in_fee = amount_in * (BPS - fee_bps)`.
pub fn get_amount_out(
    amount_in: Amount,
    reserve_in: Amount,
    reserve_out: Amount,
    fee_bps: u32,
) -> Result<Amount, DexError> {
    if amount_in.is_zero() {
        return Err(DexError::InsufficientInputAmount);
    }
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(DexError::InsufficientLiquidity);
    }
    let in_with_fee = mul(amount_in, fee_complement(fee_bps)?)?;
    let denominator = add(mul(reserve_in, U256::from(BPS))?, in_with_fee)?;
    mul_div(in_with_fee, reserve_out, denominator, Rounding::Down)
}

/// Input required to receive exactly `amount_out`, rounded up.
pub fn get_amount_in(
    amount_out: Amount,
    reserve_in: Amount,
    reserve_out: Amount,
    fee_bps: u32,
) -> Result<Amount, DexError> {
    if amount_out.is_zero() {
        return Err(DexError::InsufficientOutputAmount);
    }
    if reserve_in.is_zero() || reserve_out.is_zero() || amount_out >= reserve_out {
        return Err(DexError::InsufficientLiquidity);
    }
    let numerator = mul(reserve_in, U256::from(BPS))?;
    let denominator = mul(sub(reserve_out, amount_out)?, fee_complement(fee_bps)?)?;
    // floor + 1 keeps the solved input strictly on the protocol's side
    add(
        mul_div(numerator, amount_out, denominator, Rounding::Down)?,
        U256::from(1),
    )
}
