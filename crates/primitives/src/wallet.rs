//! A `Wallet` wraps the owner's signing key: the capability to sign user
//! operations and send directly-funded transactions. It is owned by the
//! caller's session and never persisted by the pipeline.

use crate::user_operation::{SignedUserOperation, UserOperation};
use ethers::{
    prelude::k256::ecdsa::SigningKey,
    signers::{coins_bip39::English, LocalWallet, MnemonicBuilder, Signer},
    types::Address,
};

/// Wrapper around an ethers wallet
#[derive(Clone, Debug)]
pub struct Wallet {
    /// Signing key of the wallet
    pub signer: ethers::signers::Wallet<SigningKey>,
}

impl Wallet {
    /// Creates a wallet from a raw hex-encoded private key
    pub fn from_key(key: &str, chain_id: u64) -> eyre::Result<Self> {
        let signer = key.trim_start_matches("0x").parse::<LocalWallet>()?;
        Ok(Self { signer: signer.with_chain_id(chain_id) })
    }

    /// Creates a wallet from a mnemonic phrase
    pub fn from_phrase(phrase: &str, chain_id: u64) -> eyre::Result<Self> {
        let signer = MnemonicBuilder::<English>::default()
            .phrase(phrase)
            .derivation_path("m/44'/60'/0'/0/0")?
            .build()?;
        Ok(Self { signer: signer.with_chain_id(chain_id) })
    }

    /// The externally owned address controlling the smart account
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Signs the user operation for the given entry point and chain
    ///
    /// The returned [SignedUserOperation] remembers the hash it covers; the
    /// submitter refuses envelopes whose bytes no longer match that hash.
    pub async fn sign_user_operation(
        &self,
        uo: &UserOperation,
        entry_point: &Address,
        chain_id: u64,
    ) -> eyre::Result<SignedUserOperation> {
        let hash = uo.hash(entry_point, chain_id);
        let sig = self.signer.sign_message(hash.0.as_bytes()).await?;
        Ok(SignedUserOperation {
            user_operation: UserOperation { signature: sig.to_vec().into(), ..uo.clone() },
            hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::U256;

    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    #[tokio::test]
    async fn signature_covers_the_signed_envelope() {
        let wallet = Wallet::from_key(KEY, 11155111).unwrap();
        let ep: Address = "0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789".parse().unwrap();

        let uo = UserOperation::default()
            .sender(wallet.address())
            .nonce(U256::zero())
            .call_gas_limit(400_000.into());

        let signed = wallet.sign_user_operation(&uo, &ep, 11155111).await.unwrap();
        assert!(!signed.user_operation.signature.is_empty());
        assert!(signed.covers(&ep, 11155111));

        // mutating any field after signing breaks the commitment
        let mut mutated = signed.clone();
        mutated.user_operation.call_gas_limit = 400_001.into();
        assert!(!mutated.covers(&ep, 11155111));
    }
}
