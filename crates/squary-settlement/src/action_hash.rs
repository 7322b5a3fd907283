//! Action hash signed by group members to authorize a settlement.
//!
//! The hash chains keccak256 over ABI-encoded parameters so the settlement
//! contract can recompute it on-chain:
//!
//! ```text
//! h = keccak(abi.encode(bytes32 group_id))
//! h = keccak(abi.encode(bytes32 h, address debtor, address creditor, uint256 amount))   // per debt
//! action = keccak(abi.encode(bytes32 h, string "settleDebts", uint256 nonce))
//! ```

use alloy_primitives::{eip191_hash_message, keccak256, Address as EvmAddress, B256, U256};
use alloy_sol_types::SolValue;
use squary_core::{GroupId, TokenDebt};

/// Action tag the contract expects for debt settlement.
pub const SETTLE_ACTION: &str = "settleDebts";

fn debt_link(hash: B256, debt: &TokenDebt) -> B256 {
    let debtor: EvmAddress = debt.debtor.into();
    let creditor: EvmAddress = debt.creditor.into();
    keccak256((hash, debtor, creditor, debt.amount.to_u256()).abi_encode_params())
}

fn tagged(hash: B256, nonce: u64) -> Vec<u8> {
    (hash, SETTLE_ACTION.to_string(), U256::from(nonce)).abi_encode_params()
}

/// Compute the action hash for settling `debts` at contract nonce `nonce`.
///
/// Debt order matters: the same debts in a different order hash differently.
pub fn settle_action_hash(group_id: &GroupId, debts: &[TokenDebt], nonce: u64) -> [u8; 32] {
    let seed = keccak256(B256::from(*group_id.as_bytes()).abi_encode());
    let chained = debts.iter().fold(seed, debt_link);
    keccak256(tagged(chained, nonce)).0
}

/// EIP-191 digest a wallet actually signs for a 32-byte action hash.
pub fn eth_signed_message_hash(action_hash: &[u8; 32]) -> [u8; 32] {
    eip191_hash_message(action_hash).0
}
