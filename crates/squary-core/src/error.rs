use crate::types::{Address, Money};

/// Core errors raised at the expense boundary and by the debt simplifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// An expense, group, or proposal failed boundary validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Balances did not net out after simplification.
    #[error("consistency error: {address} left with residual balance {residual}")]
    Consistency { address: Address, residual: Money },

    /// Accumulating a balance left the representable decimal range.
    #[error("balance overflow for {0}")]
    BalanceOverflow(Address),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid group id: {0}")]
    InvalidGroupId(String),

    #[error("{0} is not a member of the group")]
    NotMember(Address),

    #[error("{0} has already signed this proposal")]
    AlreadySigned(Address),
}

impl CoreError {
    /// Whether this error was raised by boundary validation.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
