//! Conversion between decimal [`Money`] and the token's fixed-point integer units.

use alloy_primitives::U256;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;
use crate::simplifier::Debt;
use crate::types::{Address, Money};

/// Amount in the token's smallest unit (what the settlement contract takes as `uint256`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenAmount(pub u128);

impl TokenAmount {
    pub fn value(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// The amount as the contract's `uint256`.
    pub fn to_u256(&self) -> U256 {
        U256::from(self.0)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A debt expressed in token units, ready to pass to the settlement contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDebt {
    pub debtor: Address,
    pub creditor: Address,
    pub amount: TokenAmount,
}

impl Debt {
    pub fn to_token_debt(&self, decimals: u32) -> Result<TokenDebt, CoreError> {
        Ok(TokenDebt {
            debtor: self.debtor,
            creditor: self.creditor,
            amount: to_token_units(self.amount, decimals)?,
        })
    }
}

/// Convert a list of debts, dropping any that round to zero units.
pub fn to_token_debts(debts: &[Debt], decimals: u32) -> Result<Vec<TokenDebt>, CoreError> {
    let mut converted = Vec::with_capacity(debts.len());
    for debt in debts {
        let token_debt = debt.to_token_debt(decimals)?;
        if !token_debt.amount.is_zero() {
            converted.push(token_debt);
        }
    }
    Ok(converted)
}

/// Scale `amount` to `decimals` fixed-point units, truncating extra precision.
pub fn to_token_units(amount: Money, decimals: u32) -> Result<TokenAmount, CoreError> {
    if amount.is_negative() {
        return Err(CoreError::InvalidAmount(format!(
            "cannot convert negative amount {amount} to token units"
        )));
    }
    let truncated = amount
        .value()
        .round_dp_with_strategy(decimals, RoundingStrategy::ToZero);
    let scale = truncated.scale();
    let mantissa = u128::try_from(truncated.mantissa())
        .map_err(|_| CoreError::InvalidAmount(format!("{amount} out of range")))?;
    let factor = 10u128.checked_pow(decimals - scale).ok_or_else(|| {
        CoreError::InvalidAmount(format!("{decimals} decimals overflow token units"))
    })?;
    mantissa
        .checked_mul(factor)
        .map(TokenAmount)
        .ok_or_else(|| CoreError::InvalidAmount(format!("{amount} overflows token units")))
}

/// Interpret `units` as a fixed-point amount with `decimals` places.
pub fn from_token_units(units: TokenAmount, decimals: u32) -> Result<Money, CoreError> {
    let signed = i128::try_from(units.0)
        .map_err(|_| CoreError::InvalidAmount(format!("{units} out of range")))?;
    Decimal::try_from_i128_with_scale(signed, decimals)
        .map(|d| Money::new(d.normalize()))
        .map_err(|e| CoreError::InvalidAmount(format!("{units} with {decimals} decimals: {e}")))
}
