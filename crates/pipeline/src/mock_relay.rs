//! Scriptable in-memory relay for tests

use crate::{error::PipelineError, relay::RelayClient};
use apphub_primitives::{
    UserOperation, UserOperationGasEstimation, UserOperationHash, UserOperationReceipt,
};
use async_trait::async_trait;
use ethers::types::Address;
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

/// Relay double recording every call and answering from scripted responses
///
/// Receipts pop in push order, one per poll; an empty queue answers "not
/// included yet".
#[derive(Clone, Default)]
pub struct MockRelay {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    estimate: Option<UserOperationGasEstimation>,
    send: Option<Result<UserOperationHash, String>>,
    receipts: VecDeque<Option<UserOperationReceipt>>,
    estimate_calls: usize,
    send_calls: usize,
    receipt_calls: usize,
}

impl MockRelay {
    pub fn script_estimate(&self, estimate: Option<UserOperationGasEstimation>) {
        self.inner.lock().unwrap().estimate = estimate;
    }

    pub fn script_send(&self, hash: UserOperationHash) {
        self.inner.lock().unwrap().send = Some(Ok(hash));
    }

    pub fn script_rejection(&self, message: &str) {
        self.inner.lock().unwrap().send = Some(Err(message.to_string()));
    }

    pub fn push_receipt(&self, receipt: Option<UserOperationReceipt>) {
        self.inner.lock().unwrap().receipts.push_back(receipt);
    }

    pub fn estimate_calls(&self) -> usize {
        self.inner.lock().unwrap().estimate_calls
    }

    pub fn send_calls(&self) -> usize {
        self.inner.lock().unwrap().send_calls
    }

    pub fn receipt_calls(&self) -> usize {
        self.inner.lock().unwrap().receipt_calls
    }
}

#[async_trait]
impl RelayClient for MockRelay {
    async fn estimate_user_operation_gas(
        &self,
        _uo: &UserOperation,
        _entry_point: Address,
    ) -> Result<Option<UserOperationGasEstimation>, PipelineError> {
        let mut inner = self.inner.lock().unwrap();
        inner.estimate_calls += 1;
        Ok(inner.estimate.clone())
    }

    async fn send_user_operation(
        &self,
        uo: &UserOperation,
        entry_point: Address,
    ) -> Result<UserOperationHash, PipelineError> {
        let mut inner = self.inner.lock().unwrap();
        inner.send_calls += 1;
        match inner.send.clone() {
            Some(Ok(hash)) => Ok(hash),
            Some(Err(message)) => Err(PipelineError::SubmissionRejected { message }),
            None => Ok(uo.hash(&entry_point, 0)),
        }
    }

    async fn get_user_operation_receipt(
        &self,
        _hash: &UserOperationHash,
    ) -> Result<Option<UserOperationReceipt>, PipelineError> {
        let mut inner = self.inner.lock().unwrap();
        inner.receipt_calls += 1;
        Ok(inner.receipts.pop_front().unwrap_or(None))
    }
}
