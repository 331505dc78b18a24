//! Counterfactual account derivation
//!
//! Derivation is a pure function of (owner, chain, implementation, salt
//! policy): no I/O, safe to call repeatedly and concurrently. The deployed
//! address still differs across chains whenever factory or implementation
//! differ, so callers must never assume cross-chain equality.

use crate::error::PipelineError;
use apphub_contracts::gen::account_factory_api::CreateAccountCall;
use apphub_primitives::{ChainProfile, ChainRegistry};
use ethers::{
    abi::AbiEncode,
    types::{Address, Bytes, H256},
    utils::{get_create2_address, keccak256},
};

/// Smart account implementation variant
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Implementation {
    /// Single-owner account behind the factory's proxy
    #[default]
    Hybrid,
}

/// How the deployment salt is computed
///
/// The original deployment derives the salt from the owner alone, which makes
/// it identical across chains; that is kept as the default but is a policy
/// choice, not an invariant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SaltPolicy {
    /// keccak256(owner): one salt per owner, shared across chains
    #[default]
    PerOwner,
    /// keccak256(owner || chain_id): unique salt per (owner, chain)
    PerOwnerAndChain,
}

impl SaltPolicy {
    fn salt(&self, owner: Address, chain_id: u64) -> H256 {
        match self {
            Self::PerOwner => keccak256(owner.as_bytes()).into(),
            Self::PerOwnerAndChain => {
                let mut buf = Vec::with_capacity(28);
                buf.extend_from_slice(owner.as_bytes());
                buf.extend_from_slice(&chain_id.to_be_bytes());
                keccak256(&buf).into()
            }
        }
    }
}

/// Everything needed to reference, fund and deploy one counterfactual account
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SmartAccountHandle {
    /// Externally owned address controlling the account
    pub owner: Address,
    /// Chain the handle was derived for
    pub chain_id: u64,
    /// The counterfactual smart account address
    pub address: Address,
    /// Deployment salt
    pub salt: H256,
    /// Implementation variant
    pub implementation: Implementation,
    /// Factory that deploys the account
    pub factory: Address,
    /// Call data for the factory's createAccount
    pub factory_data: Bytes,
}

impl SmartAccountHandle {
    /// Factory address concatenated with the construction call, as the entry
    /// point expects it in `init_code`
    pub fn init_code(&self) -> Bytes {
        [self.factory.as_bytes(), &self.factory_data].concat().into()
    }
}

/// Derives counterfactual smart account handles from the chain registry
#[derive(Clone, Debug, Default)]
pub struct AccountDeriver {
    salt_policy: SaltPolicy,
}

impl AccountDeriver {
    pub fn new(salt_policy: SaltPolicy) -> Self {
        Self { salt_policy }
    }

    /// Derives the handle for `owner` on `chain_id`
    ///
    /// Deterministic: identical inputs always yield an identical address and
    /// salt. Fails only with `UnsupportedChain`.
    pub fn derive(
        &self,
        registry: &ChainRegistry,
        owner: Address,
        chain_id: u64,
    ) -> Result<SmartAccountHandle, PipelineError> {
        let profile = registry.get(chain_id)?;
        Ok(self.derive_for_profile(profile, owner))
    }

    fn derive_for_profile(&self, profile: &ChainProfile, owner: Address) -> SmartAccountHandle {
        let salt = self.salt_policy.salt(owner, profile.chain_id);
        let factory_data: Bytes = CreateAccountCall { owner, salt: salt.0 }.encode().into();
        let address =
            get_create2_address(profile.factory, salt, proxy_init_code(profile.implementation));

        SmartAccountHandle {
            owner,
            chain_id: profile.chain_id,
            address,
            salt,
            implementation: Implementation::Hybrid,
            factory: profile.factory,
            factory_data,
        }
    }
}

/// Creation code of the proxy the factory deploys: an ERC-1167 minimal proxy
/// pointing at the account implementation
fn proxy_init_code(implementation: Address) -> Vec<u8> {
    const PREFIX: [u8; 20] = [
        0x3d, 0x60, 0x2d, 0x80, 0x60, 0x0a, 0x3d, 0x39, 0x81, 0xf3, 0x36, 0x3d, 0x3d, 0x37, 0x3d,
        0x3d, 0x3d, 0x36, 0x3d, 0x73,
    ];
    const SUFFIX: [u8; 15] = [
        0x5a, 0xf4, 0x3d, 0x82, 0x80, 0x3e, 0x90, 0x3d, 0x91, 0x60, 0x2b, 0x57, 0xfd, 0x5b, 0xf3,
    ];

    let mut code = Vec::with_capacity(PREFIX.len() + 20 + SUFFIX.len());
    code.extend_from_slice(&PREFIX);
    code.extend_from_slice(implementation.as_bytes());
    code.extend_from_slice(&SUFFIX);
    code
}

#[cfg(test)]
mod tests {
    use super::*;
    use apphub_primitives::constants::supported_chains;

    fn owner() -> Address {
        "0x9c5754De1443984659E1b3a8d1931D83475ba29C".parse().unwrap()
    }

    #[test]
    fn derivation_is_deterministic() {
        let registry = ChainRegistry::from_env();
        let deriver = AccountDeriver::default();

        let a = deriver.derive(&registry, owner(), supported_chains::SEPOLIA).unwrap();
        let b = deriver.derive(&registry, owner(), supported_chains::SEPOLIA).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.address, b.address);
        assert_eq!(a.salt, b.salt);
    }

    #[test]
    fn different_owners_get_different_accounts() {
        let registry = ChainRegistry::from_env();
        let deriver = AccountDeriver::default();

        let a = deriver.derive(&registry, owner(), supported_chains::SEPOLIA).unwrap();
        let b = deriver
            .derive(&registry, Address::random(), supported_chains::SEPOLIA)
            .unwrap();

        assert_ne!(a.salt, b.salt);
        assert_ne!(a.address, b.address);
    }

    #[test]
    fn unknown_chain_fails_with_unsupported_chain() {
        let registry = ChainRegistry::from_env();
        let deriver = AccountDeriver::default();

        let err = deriver.derive(&registry, owner(), 1).unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedChain(_)));
    }

    #[test]
    fn per_owner_salt_is_chain_independent() {
        let registry = ChainRegistry::from_env();
        let deriver = AccountDeriver::new(SaltPolicy::PerOwner);

        let sepolia = deriver.derive(&registry, owner(), supported_chains::SEPOLIA).unwrap();
        let monad = deriver.derive(&registry, owner(), supported_chains::MONAD_TESTNET).unwrap();

        assert_eq!(sepolia.salt, monad.salt);
    }

    #[test]
    fn per_owner_and_chain_salt_differs_across_chains() {
        let registry = ChainRegistry::from_env();
        let deriver = AccountDeriver::new(SaltPolicy::PerOwnerAndChain);

        let sepolia = deriver.derive(&registry, owner(), supported_chains::SEPOLIA).unwrap();
        let monad = deriver.derive(&registry, owner(), supported_chains::MONAD_TESTNET).unwrap();

        assert_ne!(sepolia.salt, monad.salt);
        assert_ne!(sepolia.address, monad.address);
    }

    #[test]
    fn init_code_prefixes_factory_address() {
        let registry = ChainRegistry::from_env();
        let handle = AccountDeriver::default()
            .derive(&registry, owner(), supported_chains::SEPOLIA)
            .unwrap();

        let init_code = handle.init_code();
        assert_eq!(&init_code[..20], handle.factory.as_bytes());
        assert_eq!(&init_code[20..], handle.factory_data.as_ref());
    }
}
