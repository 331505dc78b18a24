//! Faucet claims
//!
//! A claim is a plain owner-signed transaction to the hub, guarded by a fresh
//! read of the claim flag and the faucet's enabled state so a doomed
//! transaction is never sent.

use crate::error::PipelineError;
use apphub_contracts::{gen::AppHubAPI, HubReader};
use apphub_primitives::{constants::wait, TokenMeta};
use ethers::{providers::Middleware, types::Address, types::H256};
use std::{sync::Arc, time::Duration};
use tracing::info;

/// Claims faucet tokens from the hub with the owner wallet
///
/// `M` must sign transactions.
pub struct FaucetClaimer<M: Middleware + 'static> {
    hub: AppHubAPI<M>,
    reader: HubReader<M>,
}

impl<M: Middleware + 'static> FaucetClaimer<M> {
    pub fn new(eth_client: Arc<M>, hub: Address) -> Self {
        Self { hub: AppHubAPI::new(hub, eth_client.clone()), reader: HubReader::new(eth_client, hub) }
    }

    /// Claims `meta`'s faucet allowance for `owner`
    ///
    /// Re-reads the claim flag and faucet state first; the one-claim-per-user
    /// rule is enforced on chain and a stale row must not trigger a revert.
    pub async fn claim(&self, owner: Address, meta: &TokenMeta) -> Result<H256, PipelineError> {
        if self.reader.user_claimed(owner, meta.address).await? {
            return Err(PipelineError::ClaimFailed {
                symbol: meta.symbol.clone(),
                reason: "already claimed by this account".into(),
            });
        }

        let (enabled, amount) = self.reader.faucet_token(meta.address).await?;
        if !enabled {
            return Err(PipelineError::ClaimFailed {
                symbol: meta.symbol.clone(),
                reason: "faucet is disabled for this token".into(),
            });
        }

        info!("Claiming {amount} {} from the faucet", meta.symbol);

        let call = self.hub.faucet(meta.address);
        let pending = call.send().await.map_err(|e| {
            PipelineError::ClaimFailed { symbol: meta.symbol.clone(), reason: e.to_string() }
        })?;

        let window = Duration::from_secs(wait::TRANSACTION_TIMEOUT_SECS);
        let receipt = tokio::time::timeout(window, pending)
            .await
            .map_err(|_| PipelineError::ClaimFailed {
                symbol: meta.symbol.clone(),
                reason: format!("no confirmation within {window:?}"),
            })?
            .map_err(PipelineError::provider)?
            .ok_or_else(|| PipelineError::ClaimFailed {
                symbol: meta.symbol.clone(),
                reason: "transaction dropped from the mempool".into(),
            })?;

        if receipt.status == Some(0.into()) {
            return Err(PipelineError::ClaimFailed {
                symbol: meta.symbol.clone(),
                reason: format!("claim reverted in tx {:?}", receipt.transaction_hash),
            });
        }

        info!("Claimed {} in tx {:?}", meta.symbol, receipt.transaction_hash);

        Ok(receipt.transaction_hash)
    }
}
