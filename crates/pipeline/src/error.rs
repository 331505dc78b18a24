use apphub_contracts::ReadError;
use apphub_primitives::{UnsupportedChain, UserOperationHash};
use ethers::types::Address;
use std::time::Duration;
use thiserror::Error;

/// Pipeline errors
///
/// Terminal variants carry the derived account address, chain id or asset
/// symbol so a user can self-diagnose without digging through logs, and
/// underlying relay/provider messages are preserved verbatim.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The chain id has no profile in the registry
    #[error(transparent)]
    UnsupportedChain(#[from] UnsupportedChain),

    /// The smart account (not the owner address) holds none of the asset
    #[error("smart account {account:?} holds no {symbol} on chain {chain_id}; deposit {symbol} to this address first")]
    InsufficientFunds {
        /// The derived smart account address to fund
        account: Address,
        /// Asset symbol
        symbol: String,
        /// Chain the check ran on
        chain_id: u64,
    },

    /// A read-layer failure, after any internal rate-limit retries
    #[error(transparent)]
    Read(#[from] ReadError),

    /// Malformed intents or missing chain configuration
    #[error("could not build operation: {reason}")]
    BuildFailed {
        /// What was wrong
        reason: String,
    },

    /// The envelope no longer matches the hash it was signed over
    #[error("operation {hash:?} was mutated after signing; rebuild and re-sign before submitting")]
    SignatureMismatch {
        /// Hash the signature covers
        hash: UserOperationHash,
    },

    /// The relay refused the operation; its message is attached verbatim
    #[error("relay rejected the operation: {message}")]
    SubmissionRejected {
        /// The relay's error message
        message: String,
    },

    /// No receipt arrived in time; the operation hash stays queryable and the
    /// operation may still be included later
    #[error("no receipt for operation {hash:?} within {timeout:?}; it may still be included, keep the hash")]
    InclusionTimeout {
        /// The still-valid operation hash
        hash: UserOperationHash,
        /// How long we waited
        timeout: Duration,
    },

    /// The factory deployment transaction reverted or never confirmed
    #[error("deployment of smart account {account:?} failed: {reason}")]
    DeploymentFailed {
        /// The derived account that was being deployed
        account: Address,
        /// On-chain status or timeout description
        reason: String,
    },

    /// The faucet claim transaction reverted or never confirmed
    #[error("faucet claim of {symbol} failed: {reason}")]
    ClaimFailed {
        /// Token being claimed
        symbol: String,
        /// On-chain status or timeout description
        reason: String,
    },

    /// Execution client failure outside the read layer
    #[error("provider error: {inner}")]
    Provider {
        /// The underlying error message, verbatim
        inner: String,
    },
}

impl PipelineError {
    /// Wraps a middleware failure, keeping its message
    pub fn provider<E: std::fmt::Display>(err: E) -> Self {
        Self::Provider { inner: err.to_string() }
    }
}
