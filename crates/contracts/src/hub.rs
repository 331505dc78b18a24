//! Resilient read layer over the AppHub and token contracts
//!
//! Third-party testnet RPC endpoints throttle aggressively; every read here
//! goes through the bounded-backoff retry policy and the token batch paces
//! itself so a burst of balance queries does not trip the limiter in the
//! first place.

use crate::{
    error::ReadError,
    gen::{AppHubAPI, TokenAPI},
};
use apphub_primitives::{constants::read, RetryPolicy, TokenMeta, TokenRow};
use ethers::{contract::ContractError, providers::Middleware, types::Address, types::U256};
use std::{future::Future, sync::Arc, time::Duration};
use tracing::{debug, warn};

/// Reader for balances, claim flags and faucet parameters on one chain
#[derive(Clone)]
pub struct HubReader<M: Middleware + 'static> {
    eth_client: Arc<M>,
    hub: AppHubAPI<M>,
    policy: RetryPolicy,
    spacing: Duration,
}

impl<M: Middleware + 'static> HubReader<M> {
    pub fn new(eth_client: Arc<M>, hub: Address) -> Self {
        Self {
            hub: AppHubAPI::new(hub, eth_client.clone()),
            eth_client,
            policy: RetryPolicy::default(),
            spacing: Duration::from_millis(read::REQUEST_SPACING_MILLIS),
        }
    }

    /// Overrides the retry policy, mainly for tests
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Address of the hub contract this reader queries
    pub fn hub_address(&self) -> Address {
        self.hub.address()
    }

    /// ERC-20 balance of `owner`
    pub async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, ReadError> {
        let api = TokenAPI::new(token, self.eth_client.clone());
        self.read(token, "balanceOf", || {
            let call = api.balance_of(owner);
            async move { call.call().await }
        })
        .await
    }

    /// Whether `user` already claimed the faucet for `token`
    pub async fn user_claimed(&self, user: Address, token: Address) -> Result<bool, ReadError> {
        self.read(self.hub.address(), "userClaimed", || {
            let call = self.hub.user_claimed(user, token);
            async move { call.call().await }
        })
        .await
    }

    /// Faucet parameters for `token`: (enabled, claim amount)
    pub async fn faucet_token(&self, token: Address) -> Result<(bool, U256), ReadError> {
        self.read(self.hub.address(), "faucetTokens", || {
            let call = self.hub.faucet_tokens(token);
            async move { call.call().await }
        })
        .await
    }

    /// Loads the full token-info row for one token
    pub async fn token_row(&self, owner: Address, meta: &TokenMeta) -> Result<TokenRow, ReadError> {
        let balance = self.balance_of(meta.address, owner).await?;
        let claimed = self.user_claimed(owner, meta.address).await?;
        let (faucet_enabled, faucet_amount) = self.faucet_token(meta.address).await?;

        Ok(TokenRow { meta: meta.clone(), balance, claimed, faucet_amount, faucet_enabled })
    }

    /// Loads token-info rows for all `tokens`, sequentially with inter-request
    /// spacing against the endpoint
    ///
    /// Best effort: a token whose reads keep failing yields a zeroed row so
    /// the rest of the batch still comes back.
    pub async fn token_rows(&self, owner: Address, tokens: &[TokenMeta]) -> Vec<TokenRow> {
        let mut rows = Vec::with_capacity(tokens.len());

        for (i, meta) in tokens.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.spacing).await;
            }
            match self.token_row(owner, meta).await {
                Ok(row) => rows.push(row),
                Err(err) => {
                    warn!("Loading token info for {} failed: {err}", meta.symbol);
                    rows.push(TokenRow::unavailable(meta.clone()));
                }
            }
        }

        rows
    }

    /// Runs one contract read through the retry policy; only classified
    /// rate-limit failures are retried, and an exhausted budget escalates as
    /// `ReadFailed`
    async fn read<T, F, Fut>(
        &self,
        target: Address,
        function: &'static str,
        call: F,
    ) -> Result<T, ReadError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ContractError<M>>>,
    {
        debug!("Reading {function} on {target:?}");

        let res = self
            .policy
            .retry(ReadError::is_rate_limit, || async {
                call().await.map_err(|e| ReadError::classify(target, function, e))
            })
            .await;

        match res {
            Err(ReadError::RateLimited { target, function, inner }) => {
                Err(ReadError::ReadFailed {
                    target,
                    function,
                    inner: format!(
                        "still rate limited after {} attempts: {inner}",
                        self.policy.max_attempts
                    ),
                })
            }
            other => other,
        }
    }
}
