//! On-demand account deployment
//!
//! Deployment goes straight through the factory with a regular transaction
//! from the owner wallet, not through the relay. Deploying is idempotent:
//! an account with code on chain is left alone.

use crate::{account::SmartAccountHandle, error::PipelineError};
use apphub_primitives::constants::{gas, wait};
use ethers::{
    providers::Middleware,
    types::{TransactionRequest, H256},
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info};

/// Result of a deployment attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Deployment {
    /// The account already had code; no transaction was sent
    AlreadyDeployed,
    /// The factory deployed the account in this transaction
    Deployed {
        /// Hash of the confirmed deployment transaction
        transaction_hash: H256,
    },
}

/// Deploys counterfactual accounts through their factory
///
/// `M` must sign transactions, typically a `SignerMiddleware` over the owner
/// wallet.
pub struct DeploymentExecutor<M: Middleware + 'static> {
    eth_client: Arc<M>,
}

impl<M: Middleware + 'static> DeploymentExecutor<M> {
    pub fn new(eth_client: Arc<M>) -> Self {
        Self { eth_client }
    }

    /// Ensures `handle`'s account exists on chain
    pub async fn deploy(&self, handle: &SmartAccountHandle) -> Result<Deployment, PipelineError> {
        let code = self
            .eth_client
            .get_code(handle.address, None)
            .await
            .map_err(PipelineError::provider)?;

        if !code.is_empty() {
            debug!("Account {:?} already deployed, skipping", handle.address);
            return Ok(Deployment::AlreadyDeployed);
        }

        info!("Deploying account {:?} via factory {:?}", handle.address, handle.factory);

        let tx = TransactionRequest::new()
            .to(handle.factory)
            .data(handle.factory_data.clone())
            .gas(gas::DEPLOYMENT_GAS);

        let pending = self
            .eth_client
            .send_transaction(tx, None)
            .await
            .map_err(PipelineError::provider)?;

        let window = Duration::from_secs(wait::TRANSACTION_TIMEOUT_SECS);
        let receipt = tokio::time::timeout(window, pending)
            .await
            .map_err(|_| PipelineError::DeploymentFailed {
                account: handle.address,
                reason: format!("no confirmation within {window:?}"),
            })?
            .map_err(PipelineError::provider)?
            .ok_or_else(|| PipelineError::DeploymentFailed {
                account: handle.address,
                reason: "transaction dropped from the mempool".into(),
            })?;

        if receipt.status == Some(0.into()) {
            return Err(PipelineError::DeploymentFailed {
                account: handle.address,
                reason: format!("factory call reverted in tx {:?}", receipt.transaction_hash),
            });
        }

        info!("Account {:?} deployed in tx {:?}", handle.address, receipt.transaction_hash);

        Ok(Deployment::Deployed { transaction_hash: receipt.transaction_hash })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountDeriver;
    use apphub_primitives::{constants::supported_chains, ChainRegistry};
    use ethers::{
        providers::{MockResponse, Provider},
        types::Address,
    };

    fn handle() -> SmartAccountHandle {
        AccountDeriver::default()
            .derive(&ChainRegistry::from_env(), Address::random(), supported_chains::SEPOLIA)
            .unwrap()
    }

    fn code(hex: &str) -> MockResponse {
        MockResponse::Value(serde_json::Value::String(hex.to_string()))
    }

    #[tokio::test]
    async fn deployed_account_is_left_alone() {
        let (client, mock) = Provider::mocked();
        let executor = DeploymentExecutor::new(Arc::new(client));
        let handle = handle();

        // two code reads scripted, nothing else: any transaction attempt
        // would hit an empty mock and fail the test
        mock.push_response(code("0x60806040"));
        mock.push_response(code("0x60806040"));

        assert_eq!(executor.deploy(&handle).await.unwrap(), Deployment::AlreadyDeployed);
        assert_eq!(executor.deploy(&handle).await.unwrap(), Deployment::AlreadyDeployed);
    }

    #[tokio::test]
    async fn provider_failure_on_code_read_surfaces() {
        let (client, _mock) = Provider::mocked();
        let executor = DeploymentExecutor::new(Arc::new(client));

        // empty mock stack: the code read itself errors
        let err = executor.deploy(&handle()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Provider { .. }));
    }
}
