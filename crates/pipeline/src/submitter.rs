//! Operation submission and confirmation
//!
//! Submission hands the signed envelope to the relay and returns the
//! operation hash immediately; waiting for inclusion is a separate call so
//! callers can persist the hash first. A timed-out wait is not a failed
//! operation: the hash stays valid and queryable.

use crate::{error::PipelineError, relay::RelayClient};
use apphub_contracts::gen::{app_hub_api::TransferExecutedFilter, token_api::ApprovalFilter};
use apphub_primitives::{
    constants::wait, SignedUserOperation, UserOperationHash, UserOperationReceipt,
};
use ethers::{contract::EthEvent, types::Address, types::H256};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

/// How an included operation actually went
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationOutcome {
    /// Every call in the batch took effect
    Executed,
    /// The batch ran but the hub transfer never fired; typically the approval
    /// landed and the transfer itself did not
    PartiallyExecuted,
    /// The operation reverted on chain
    Reverted,
}

/// Classifies a receipt by its success flag and emitted events
pub fn classify(receipt: &UserOperationReceipt) -> OperationOutcome {
    if !receipt.success {
        return OperationOutcome::Reverted;
    }

    let emitted = |signature: H256| {
        receipt.logs.iter().any(|log| log.topics.first() == Some(&signature))
    };

    if emitted(ApprovalFilter::signature()) && !emitted(TransferExecutedFilter::signature()) {
        OperationOutcome::PartiallyExecuted
    } else {
        OperationOutcome::Executed
    }
}

/// Submits signed operations to one chain's relay and awaits their receipts
pub struct OperationSubmitter<R: RelayClient> {
    relay: R,
    entry_point: Address,
    chain_id: u64,
}

impl<R: RelayClient> OperationSubmitter<R> {
    pub fn new(relay: R, entry_point: Address, chain_id: u64) -> Self {
        Self { relay, entry_point, chain_id }
    }

    /// Sends the operation to the relay, returning its hash without waiting
    /// for inclusion
    ///
    /// Rejects locally, before any relay traffic, when the envelope is
    /// unsigned or no longer matches the hash it was signed over.
    pub async fn submit(&self, signed: &SignedUserOperation) -> Result<UserOperationHash, PipelineError> {
        if signed.user_operation.signature.is_empty() {
            return Err(PipelineError::BuildFailed {
                reason: "operation is unsigned; sign it before submitting".into(),
            });
        }
        if !signed.covers(&self.entry_point, self.chain_id) {
            return Err(PipelineError::SignatureMismatch { hash: signed.hash });
        }

        let hash = self.relay.send_user_operation(&signed.user_operation, self.entry_point).await?;
        info!("Submitted operation {:?}", hash.0);

        Ok(hash)
    }

    /// Polls the relay until the operation's receipt arrives or the inclusion
    /// window closes
    ///
    /// Transient poll failures are logged and retried; they never abort the
    /// wait early.
    pub async fn await_receipt(
        &self,
        hash: &UserOperationHash,
    ) -> Result<UserOperationReceipt, PipelineError> {
        let timeout = Duration::from_secs(wait::RECEIPT_TIMEOUT_SECS);
        let poll = Duration::from_secs(wait::RECEIPT_POLL_SECS);
        let deadline = Instant::now() + timeout;

        loop {
            match self.relay.get_user_operation_receipt(hash).await {
                Ok(Some(receipt)) => {
                    info!(
                        "Operation {:?} included in tx {:?} (success: {})",
                        hash.0, receipt.tx_receipt.transaction_hash, receipt.success
                    );
                    return Ok(receipt);
                }
                Ok(None) => {}
                Err(err) => warn!("Receipt poll for {:?} failed, retrying: {err}", hash.0),
            }

            if Instant::now() + poll > deadline {
                return Err(PipelineError::InclusionTimeout { hash: *hash, timeout });
            }
            sleep(poll).await;
        }
    }
}
