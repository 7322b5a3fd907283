use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::group::Group;
use crate::types::{Address, ExpenseId, GroupId};
use crate::units::TokenDebt;

/// A member's signature over a proposal's action hash.
///
/// Signatures are opaque here; verification belongs to the settlement contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalSignature {
    pub signer: Address,
    pub signature: Vec<u8>,
}

/// A pending settlement awaiting enough member signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettleProposal {
    pub id: Uuid,
    pub group_id: GroupId,
    /// Simplified debts in token units, in the order they are hashed and executed.
    pub debts: Vec<TokenDebt>,
    /// Unsettled expenses the debts were computed from.
    pub expense_ids: Vec<ExpenseId>,
    /// Contract nonce the action hash was computed against.
    pub nonce: u64,
    pub action_hash: [u8; 32],
    pub proposer: Address,
    pub signatures: Vec<ProposalSignature>,
    pub created_at: DateTime<Utc>,
}

impl SettleProposal {
    /// Create a proposal already carrying the proposer's signature.
    pub fn new(
        group: &Group,
        debts: Vec<TokenDebt>,
        expense_ids: Vec<ExpenseId>,
        nonce: u64,
        action_hash: [u8; 32],
        proposer: Address,
        signature: Vec<u8>,
    ) -> Result<Self, CoreError> {
        if !group.is_member(&proposer) {
            return Err(CoreError::NotMember(proposer));
        }
        Ok(Self {
            id: Uuid::now_v7(),
            group_id: group.id,
            debts,
            expense_ids,
            nonce,
            action_hash,
            proposer,
            signatures: vec![ProposalSignature {
                signer: proposer,
                signature,
            }],
            created_at: Utc::now(),
        })
    }

    pub fn has_signed(&self, signer: &Address) -> bool {
        self.signatures.iter().any(|s| s.signer == *signer)
    }

    /// Record a member's signature; returns the new signature count.
    pub fn add_signature(
        &mut self,
        group: &Group,
        signer: Address,
        signature: Vec<u8>,
    ) -> Result<usize, CoreError> {
        if !group.is_member(&signer) {
            return Err(CoreError::NotMember(signer));
        }
        if self.has_signed(&signer) {
            return Err(CoreError::AlreadySigned(signer));
        }
        self.signatures.push(ProposalSignature { signer, signature });
        Ok(self.signatures.len())
    }

    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_ready(&self, threshold: usize) -> bool {
        self.signatures.len() >= threshold
    }

    pub fn action_hash_hex(&self) -> String {
        format!("0x{}", hex::encode(self.action_hash))
    }
}
