//! JSON group document read by the CLI.
//!
//! ```json
//! {
//!   "name": "Lisbon trip",
//!   "members": ["0x…", "0x…"],
//!   "signature_threshold": 2,
//!   "expenses": [
//!     { "amount": "90", "description": "Dinner", "paid_by": "0x…", "shared_with": ["0x…"] }
//!   ]
//! }
//! ```
//!
//! `members` and `signature_threshold` are optional: members default to
//! everyone who appears in an expense, the threshold to all members.

use anyhow::Context;
use serde::Deserialize;
use squary_core::{validate_all, Address, Expense, Group, GroupId};
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct GroupFile {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub members: Vec<Address>,
    #[serde(default)]
    pub signature_threshold: Option<usize>,
    pub expenses: Vec<Expense>,
}

fn default_name() -> String {
    "group".into()
}

impl GroupFile {
    /// Read and validate a group document.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let file: GroupFile = serde_json::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        validate_all(&file.expenses)?;
        Ok(file)
    }

    /// Declared members, or everyone seen in the expenses in encounter order.
    pub fn members(&self) -> Vec<Address> {
        if !self.members.is_empty() {
            return self.members.clone();
        }
        let mut members: Vec<Address> = Vec::new();
        for expense in &self.expenses {
            for address in std::iter::once(&expense.paid_by).chain(&expense.shared_with) {
                if !members.contains(address) {
                    members.push(*address);
                }
            }
        }
        members
    }

    /// Build the group, checking every expense against its membership.
    pub fn to_group(&self, threshold: Option<usize>, token: Address) -> anyhow::Result<Group> {
        let members = self.members();
        let threshold = threshold
            .or(self.signature_threshold)
            .unwrap_or(members.len());
        let group = Group::new(GroupId::new(), self.name.clone(), members, threshold, token)?;
        for (i, expense) in self.expenses.iter().enumerate() {
            group
                .validate_expense(expense)
                .with_context(|| format!("expense #{i}"))?;
        }
        Ok(group)
    }
}
