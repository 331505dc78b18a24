//! Token metadata and the per-token faucet snapshot

use crate::utils::as_checksum;
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

/// Identity of one ERC-20 token, supplied by the caller's registry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMeta {
    pub name: String,
    pub symbol: String,
    #[serde(serialize_with = "as_checksum")]
    pub address: Address,
}

/// Read-only snapshot of one token's balance and faucet state for one owner
///
/// Staleness is acceptable, but a snapshot must be explicitly refreshed before
/// it gates a claim attempt; amounts are fixed-point with 18 decimals.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenRow {
    pub meta: TokenMeta,
    pub balance: U256,
    pub claimed: bool,
    pub faucet_amount: U256,
    pub faucet_enabled: bool,
}

impl TokenRow {
    /// Best-effort placeholder row used when a token's reads keep failing,
    /// so one bad token never blocks the rest of the batch
    pub fn unavailable(meta: TokenMeta) -> Self {
        Self {
            meta,
            balance: U256::zero(),
            claimed: false,
            faucet_amount: U256::zero(),
            faucet_enabled: false,
        }
    }
}
