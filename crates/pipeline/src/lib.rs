//! AppHub smart account operation pipeline
//!
//! Turns an owner wallet into transfers executed by its counterfactual smart
//! account: derive the account, deploy it on first use, build and sign a
//! batched user operation, submit it to the bundler relay and confirm the
//! receipt. Faucet claims and the deployment path run as plain owner
//! transactions outside the relay.

pub mod account;
pub mod builder;
pub mod deployer;
pub mod error;
pub mod faucet;
pub mod relay;
pub mod submitter;

#[cfg(test)]
mod mock_relay;

pub use account::{AccountDeriver, Implementation, SaltPolicy, SmartAccountHandle};
pub use builder::{fetch_gas_fees, CallIntent, GasFees, OperationBuilder, TransferAsset};
pub use deployer::{Deployment, DeploymentExecutor};
pub use error::PipelineError;
pub use faucet::FaucetClaimer;
pub use relay::{HttpRelay, RelayClient};
pub use submitter::{classify, OperationOutcome, OperationSubmitter};
