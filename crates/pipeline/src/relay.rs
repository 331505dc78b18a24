//! Bundler relay client
//!
//! The relay speaks JSON-RPC over HTTP with a chain-specific endpoint. The
//! wire shape is bundler-implementation-defined; we treat it as an opaque
//! versioned contract and surface its rejections verbatim.

use crate::error::PipelineError;
use apphub_primitives::{
    UserOperation, UserOperationGasEstimation, UserOperationHash, UserOperationReceipt,
};
use async_trait::async_trait;
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

/// The relay operations the pipeline needs
#[async_trait]
pub trait RelayClient: Send + Sync + 'static {
    /// Asks the relay for a gas estimate; `None` when the relay has no
    /// estimate for this operation
    async fn estimate_user_operation_gas(
        &self,
        uo: &UserOperation,
        entry_point: Address,
    ) -> Result<Option<UserOperationGasEstimation>, PipelineError>;

    /// Submits a signed operation, returning the relay's operation hash
    async fn send_user_operation(
        &self,
        uo: &UserOperation,
        entry_point: Address,
    ) -> Result<UserOperationHash, PipelineError>;

    /// Fetches the receipt for a previously submitted operation; `None` until
    /// the operation is included
    async fn get_user_operation_receipt(
        &self,
        hash: &UserOperationHash,
    ) -> Result<Option<UserOperationReceipt>, PipelineError>;
}

#[derive(Debug, Serialize)]
struct Request {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Response<T> {
    result: Option<T>,
    error: Option<ErrorObject>,
}

#[derive(Debug, Deserialize)]
struct ErrorObject {
    code: i64,
    message: String,
    data: Option<Value>,
}

impl ErrorObject {
    fn render(&self) -> String {
        match &self.data {
            Some(data) => format!("{} (code {}, data {data})", self.message, self.code),
            None => format!("{} (code {})", self.message, self.code),
        }
    }
}

/// HTTP JSON-RPC client for one chain's bundler endpoint
#[derive(Clone, Debug)]
pub struct HttpRelay {
    client: reqwest::Client,
    url: Url,
}

impl HttpRelay {
    pub fn new(url: Url) -> Self {
        Self { client: reqwest::Client::new(), url }
    }

    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        method: &'static str,
        params: Vec<Value>,
    ) -> Result<Response<T>, reqwest::Error> {
        debug!("Relay request {method} to {}", self.url);

        let body = Request { jsonrpc: "2.0", id: 1, method, params };
        self.client.post(self.url.clone()).json(&body).send().await?.json().await
    }
}

#[async_trait]
impl RelayClient for HttpRelay {
    async fn estimate_user_operation_gas(
        &self,
        uo: &UserOperation,
        entry_point: Address,
    ) -> Result<Option<UserOperationGasEstimation>, PipelineError> {
        let params = vec![
            serde_json::to_value(uo).map_err(PipelineError::provider)?,
            Value::String(format!("{entry_point:?}")),
        ];

        let res: Response<UserOperationGasEstimation> = self
            .request("eth_estimateUserOperationGas", params)
            .await
            .map_err(|e| PipelineError::BuildFailed { reason: format!("gas estimation failed: {e}") })?;

        match (res.result, res.error) {
            (Some(estimate), _) => Ok(Some(estimate)),
            // some relays answer "method not found" on exotic networks; the
            // builder falls back to its gas floors
            (None, Some(err)) if err.code == -32601 => Ok(None),
            (None, Some(err)) => {
                Err(PipelineError::BuildFailed { reason: format!("gas estimation failed: {}", err.render()) })
            }
            (None, None) => Ok(None),
        }
    }

    async fn send_user_operation(
        &self,
        uo: &UserOperation,
        entry_point: Address,
    ) -> Result<UserOperationHash, PipelineError> {
        let params = vec![
            serde_json::to_value(uo).map_err(PipelineError::provider)?,
            Value::String(format!("{entry_point:?}")),
        ];

        let res: Response<UserOperationHash> = self
            .request("eth_sendUserOperation", params)
            .await
            .map_err(|e| PipelineError::SubmissionRejected { message: e.to_string() })?;

        match (res.result, res.error) {
            (Some(hash), _) => Ok(hash),
            (None, Some(err)) => {
                Err(PipelineError::SubmissionRejected { message: err.render() })
            }
            (None, None) => Err(PipelineError::SubmissionRejected {
                message: "relay returned neither result nor error".into(),
            }),
        }
    }

    async fn get_user_operation_receipt(
        &self,
        hash: &UserOperationHash,
    ) -> Result<Option<UserOperationReceipt>, PipelineError> {
        let params = vec![serde_json::to_value(hash).map_err(PipelineError::provider)?];

        let res: Response<UserOperationReceipt> = self
            .request("eth_getUserOperationReceipt", params)
            .await
            .map_err(PipelineError::provider)?;

        match (res.result, res.error) {
            (Some(receipt), _) => Ok(Some(receipt)),
            (None, Some(err)) => Err(PipelineError::Provider { inner: err.render() }),
            (None, None) => Ok(None),
        }
    }
}
