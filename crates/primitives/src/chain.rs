//! Network registry: per-chain RPC, relay and contract configuration
//!
//! Every component that needs chain data goes through [ChainRegistry]; nothing
//! else in the pipeline is allowed to compare chain-id literals.

use crate::constants::{account, entry_point, hub, supported_chains};
use ethers::types::{Address, H256};
use lazy_static::lazy_static;
use std::{collections::HashMap, env};
use thiserror::Error;
use url::Url;

lazy_static! {
    /// Process-wide registry, built from environment on first access
    pub static ref REGISTRY: ChainRegistry = ChainRegistry::from_env();
}

/// Returned when a chain id has no [ChainProfile] in the registry
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("chain {0} is not supported")]
pub struct UnsupportedChain(pub u64);

/// Transport and contract configuration for one chain
#[derive(Clone, Debug)]
pub struct ChainProfile {
    /// Numeric chain id
    pub chain_id: u64,
    /// Short chain name, also used to derive environment variable names
    pub name: String,
    /// Symbol of the native currency
    pub native_symbol: String,
    /// JSON-RPC endpoint of the execution client
    pub rpc_url: Url,
    /// Endpoint of the ERC-4337 bundler relay, if one is configured
    pub bundler_url: Option<Url>,
    /// Base URL of the block explorer
    pub explorer_url: Url,
    /// Entry point contract address
    pub entry_point: Address,
    /// AppHub contract address (faucet + transfer hub)
    pub hub: Address,
    /// Smart account factory address
    pub factory: Address,
    /// Smart account implementation address behind the factory's proxies
    pub implementation: Address,
}

impl ChainProfile {
    /// Explorer link for a transaction hash
    pub fn explorer_tx_url(&self, hash: H256) -> String {
        format!("{}tx/{hash:?}", self.explorer_url)
    }
}

/// Immutable chain-id keyed lookup of [ChainProfile]s
///
/// Built once at startup; safe to share behind an `Arc` across all concurrent
/// pipeline invocations.
#[derive(Clone, Debug, Default)]
pub struct ChainRegistry {
    chains: HashMap<u64, ChainProfile>,
}

impl ChainRegistry {
    /// Creates a registry with the built-in chains, applying `APPHUB_<CHAIN>_RPC_URL`
    /// and `APPHUB_<CHAIN>_BUNDLER_URL` environment overrides
    pub fn from_env() -> Self {
        let mut registry = Self::default();

        registry.insert(profile_from_env(
            supported_chains::MONAD_TESTNET,
            "monad",
            "MON",
            "https://testnet-rpc.monad.xyz",
            "https://testnet.monadexplorer.com/",
            hub::MONAD_TESTNET,
        ));
        registry.insert(profile_from_env(
            supported_chains::SEPOLIA,
            "sepolia",
            "ETH",
            "https://ethereum-sepolia.publicnode.com",
            "https://sepolia.etherscan.io/",
            hub::SEPOLIA,
        ));

        registry
    }

    /// Adds or replaces a chain profile
    pub fn insert(&mut self, profile: ChainProfile) {
        self.chains.insert(profile.chain_id, profile);
    }

    /// O(1) profile lookup by chain id
    pub fn get(&self, chain_id: u64) -> Result<&ChainProfile, UnsupportedChain> {
        self.chains.get(&chain_id).ok_or(UnsupportedChain(chain_id))
    }

    /// All registered chain ids
    pub fn chain_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.chains.keys().copied()
    }
}

fn profile_from_env(
    chain_id: u64,
    name: &str,
    native_symbol: &str,
    default_rpc: &str,
    explorer: &str,
    hub: &str,
) -> ChainProfile {
    let upper = name.to_uppercase();

    let rpc_url = env::var(format!("APPHUB_{upper}_RPC_URL"))
        .ok()
        .and_then(|url| url.parse().ok())
        .unwrap_or_else(|| default_rpc.parse().expect("default RPC URL is valid"));
    let bundler_url =
        env::var(format!("APPHUB_{upper}_BUNDLER_URL")).ok().and_then(|url| url.parse().ok());
    let hub = env::var(format!("APPHUB_{upper}_HUB_ADDRESS"))
        .ok()
        .and_then(|addr| addr.parse().ok())
        .unwrap_or_else(|| hub.parse().expect("default hub address is valid"));

    ChainProfile {
        chain_id,
        name: name.into(),
        native_symbol: native_symbol.into(),
        rpc_url,
        bundler_url,
        explorer_url: explorer.parse().expect("explorer URL is valid"),
        entry_point: entry_point::ADDRESS.parse().expect("entry point address is valid"),
        hub,
        factory: account::FACTORY.parse().expect("factory address is valid"),
        implementation: account::IMPLEMENTATION.parse().expect("implementation address is valid"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_supported_chains() {
        let registry = ChainRegistry::from_env();

        let monad = registry.get(supported_chains::MONAD_TESTNET).unwrap();
        assert_eq!(monad.native_symbol, "MON");

        let sepolia = registry.get(supported_chains::SEPOLIA).unwrap();
        assert_eq!(sepolia.native_symbol, "ETH");
        assert_eq!(sepolia.entry_point, entry_point::ADDRESS.parse().unwrap());
    }

    #[test]
    fn unknown_chain_is_unsupported() {
        let registry = ChainRegistry::from_env();
        assert_eq!(registry.get(1).unwrap_err(), UnsupportedChain(1));
    }

    #[test]
    fn explorer_tx_link() {
        let registry = ChainRegistry::from_env();
        let sepolia = registry.get(supported_chains::SEPOLIA).unwrap();
        let url = sepolia.explorer_tx_url(H256::zero());
        assert!(url.starts_with("https://sepolia.etherscan.io/tx/0x"));
    }
}
