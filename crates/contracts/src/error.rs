use ethers::{
    contract::ContractError,
    providers::{JsonRpcError, Middleware, MiddlewareError, ProviderError},
    types::Address,
};
use thiserror::Error;

/// Read layer errors
///
/// `RateLimited` is internal to the retry loop; once the budget is exhausted
/// it is escalated as `ReadFailed` with the throttling message preserved.
#[derive(Debug, Error, Clone)]
pub enum ReadError {
    /// The endpoint is throttling us; retryable
    #[error("rate limited while calling {function} on {target:?}: {inner}")]
    RateLimited {
        /// Contract the call targeted
        target: Address,
        /// Function name, for diagnosis
        function: &'static str,
        /// The endpoint's message, verbatim
        inner: String,
    },

    /// Terminal read failure, tagged with the target and function
    #[error("read of {function} on {target:?} failed: {inner}")]
    ReadFailed {
        /// Contract the call targeted
        target: Address,
        /// Function name, for diagnosis
        function: &'static str,
        /// The underlying error message, verbatim
        inner: String,
    },
}

impl ReadError {
    /// True for the retryable variant
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Converts a contract call failure into a read error, classifying
    /// transport-level throttling as `RateLimited`
    pub fn classify<M: Middleware>(
        target: Address,
        function: &'static str,
        err: ContractError<M>,
    ) -> Self {
        let rate_limited = match &err {
            ContractError::MiddlewareError { e } => {
                e.as_error_response().map(is_rate_limit_response).unwrap_or(false)
            }
            ContractError::ProviderError { e } => is_rate_limit_provider_error(e),
            _ => false,
        };

        if rate_limited {
            Self::RateLimited { target, function, inner: err.to_string() }
        } else {
            Self::ReadFailed { target, function, inner: err.to_string() }
        }
    }
}

/// JSON-RPC error codes and message patterns indicating throttling
fn is_rate_limit_response(err: &JsonRpcError) -> bool {
    if err.code == 429 || err.code == -32005 || err.code == -32016 {
        return true;
    }
    let msg = err.message.to_lowercase();
    msg.contains("rate limit") || msg.contains("too many requests")
}

fn is_rate_limit_provider_error(err: &ProviderError) -> bool {
    match err {
        ProviderError::JsonRpcClientError(e) => {
            e.as_error_response().map(is_rate_limit_response).unwrap_or(false)
        }
        ProviderError::HTTPError(e) => e.status().map(|s| s.as_u16() == 429).unwrap_or(false),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_throttling_codes_and_messages() {
        for err in [
            JsonRpcError { code: -32005, message: "limit exceeded".into(), data: None },
            JsonRpcError { code: 429, message: "".into(), data: None },
            JsonRpcError { code: -32016, message: "".into(), data: None },
            JsonRpcError { code: -32000, message: "Rate limit reached".into(), data: None },
            JsonRpcError { code: -32000, message: "Too many requests".into(), data: None },
        ] {
            assert!(is_rate_limit_response(&err), "{err:?} should classify as throttling");
        }

        let revert =
            JsonRpcError { code: 3, message: "execution reverted".into(), data: None };
        assert!(!is_rate_limit_response(&revert));
    }
}
