//! Squary core: the expense data model, boundary validation, net balances,
//! and the debt simplifier that turns a group's unsettled expenses into the
//! minimal set of transfers handed to the settlement flow.

pub mod error;
pub mod types;
pub mod expense;
pub mod group;
pub mod balance;
pub mod simplifier;
pub mod units;
pub mod proposal;

pub use error::CoreError;
pub use types::{
    Address, ExpenseId, GroupId, Money, MAX_EXPENSE_AMOUNT, MONEY_SCALE, SETTLEMENT_EPSILON,
};
pub use expense::{validate_all, validate_expense, Expense};
pub use group::Group;
pub use balance::{compute_balances, Balances};
pub use simplifier::{net_flows, simplify_balances, simplify_debts, Debt};
pub use units::{from_token_units, to_token_debts, to_token_units, TokenAmount, TokenDebt};
pub use proposal::{ProposalSignature, SettleProposal};
