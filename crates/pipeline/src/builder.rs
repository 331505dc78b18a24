//! Operation builder
//!
//! Turns a transfer request into an unsigned `UserOperation`. The builder
//! checks the smart account's funds before anything else touches the network
//! beyond that read, encodes the intents into one `executeBatch` call, and
//! sizes gas from the relay's estimate with a safety margin on top.

use crate::{account::SmartAccountHandle, error::PipelineError, relay::RelayClient};
use apphub_contracts::gen::{
    account_api::ExecuteBatchCall,
    app_hub_api::TransferTokenCall,
    token_api::ApproveCall,
};
use apphub_contracts::HubReader;
use apphub_primitives::{
    constants::gas, ChainProfile, TokenMeta, UserOperation, UserOperationGasEstimation,
};
use ethers::{
    abi::AbiEncode,
    providers::Middleware,
    types::{Address, Bytes, U256},
};
use std::sync::Arc;
use tracing::{debug, info};

/// One call the smart account should make
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallIntent {
    /// Call target
    pub to: Address,
    /// Native value attached to the call
    pub value: U256,
    /// Encoded call data, empty for a plain value transfer
    pub data: Bytes,
}

/// What is being transferred
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransferAsset {
    /// The chain's native currency
    Native,
    /// An ERC-20 token routed through the hub
    Token(TokenMeta),
}

impl TransferAsset {
    fn symbol(&self, profile: &ChainProfile) -> String {
        match self {
            Self::Native => profile.native_symbol.clone(),
            Self::Token(meta) => meta.symbol.clone(),
        }
    }
}

/// EIP-1559 fee pair applied to every built operation
#[derive(Clone, Copy, Debug, Default)]
pub struct GasFees {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

/// Fetches the current EIP-1559 fee pair from the execution client
pub async fn fetch_gas_fees<M: Middleware + 'static>(
    eth_client: &Arc<M>,
) -> Result<GasFees, PipelineError> {
    let (max_fee_per_gas, max_priority_fee_per_gas) = eth_client
        .estimate_eip1559_fees(None)
        .await
        .map_err(PipelineError::provider)?;
    Ok(GasFees { max_fee_per_gas, max_priority_fee_per_gas })
}

/// Widens an estimated gas value by the configured safety margin
fn with_margin(value: U256) -> U256 {
    value * (100 + gas::ESTIMATE_MARGIN_PERC) / 100
}

/// Final (call, verification, pre-verification) gas limits
///
/// Each estimated field is widened independently; when the relay offered no
/// estimate the conservative floor limits are used instead.
pub fn gas_limits(estimate: Option<UserOperationGasEstimation>) -> (U256, U256, U256) {
    match estimate {
        Some(est) => (
            with_margin(est.call_gas_limit),
            with_margin(est.verification_gas_limit),
            with_margin(est.pre_verification_gas),
        ),
        None => (
            gas::CALL_GAS_FLOOR.into(),
            gas::VERIFICATION_GAS_FLOOR.into(),
            gas::PRE_VERIFICATION_GAS_FLOOR.into(),
        ),
    }
}

/// Assembles unsigned user operations for one chain
pub struct OperationBuilder<M: Middleware + 'static, R: RelayClient> {
    eth_client: Arc<M>,
    relay: R,
    reader: HubReader<M>,
    profile: ChainProfile,
}

impl<M: Middleware + 'static, R: RelayClient> OperationBuilder<M, R> {
    pub fn new(eth_client: Arc<M>, relay: R, profile: ChainProfile) -> Self {
        Self { reader: HubReader::new(eth_client.clone(), profile.hub), eth_client, relay, profile }
    }

    /// The call intents a transfer of `asset` expands into
    ///
    /// A native transfer is a single value call. A token transfer goes through
    /// the hub so the `TransferExecuted` event is emitted: the account first
    /// approves the hub, then asks it to move the tokens.
    pub fn transfer_intents(&self, asset: &TransferAsset, to: Address, amount: U256) -> Vec<CallIntent> {
        match asset {
            TransferAsset::Native => {
                vec![CallIntent { to, value: amount, data: Bytes::default() }]
            }
            TransferAsset::Token(meta) => vec![
                CallIntent {
                    to: meta.address,
                    value: U256::zero(),
                    data: ApproveCall { spender: self.reader.hub_address(), amount }.encode().into(),
                },
                CallIntent {
                    to: self.reader.hub_address(),
                    value: U256::zero(),
                    data: TransferTokenCall { token: meta.address, to, amount }.encode().into(),
                },
            ],
        }
    }

    /// Builds an unsigned transfer operation for the account
    ///
    /// The funds check runs against the smart account address, never the
    /// owner, and nothing is sent to the relay until it passes.
    pub async fn build_transfer(
        &self,
        handle: &SmartAccountHandle,
        asset: &TransferAsset,
        to: Address,
        amount: U256,
        fees: GasFees,
    ) -> Result<UserOperation, PipelineError> {
        let balance = match asset {
            TransferAsset::Native => self
                .eth_client
                .get_balance(handle.address, None)
                .await
                .map_err(PipelineError::provider)?,
            TransferAsset::Token(meta) => self.reader.balance_of(meta.address, handle.address).await?,
        };

        // an empty account never reaches the relay, whatever the amount
        if balance.is_zero() || balance < amount {
            return Err(PipelineError::InsufficientFunds {
                account: handle.address,
                symbol: asset.symbol(&self.profile),
                chain_id: self.profile.chain_id,
            });
        }

        let intents = self.transfer_intents(asset, to, amount);
        self.build(handle, &intents, fees).await
    }

    /// Builds an unsigned operation executing `intents` as one batch
    pub async fn build(
        &self,
        handle: &SmartAccountHandle,
        intents: &[CallIntent],
        fees: GasFees,
    ) -> Result<UserOperation, PipelineError> {
        if intents.is_empty() {
            return Err(PipelineError::BuildFailed { reason: "no call intents".into() });
        }

        let code = self
            .eth_client
            .get_code(handle.address, None)
            .await
            .map_err(PipelineError::provider)?;
        let init_code = if code.is_empty() { handle.init_code() } else { Bytes::default() };

        let nonce = self.nonce(handle.address).await?;

        debug!(
            "Building operation for {:?} (nonce {nonce}, {} intents, deployed: {})",
            handle.address,
            intents.len(),
            init_code.is_empty()
        );

        let uo = UserOperation::default()
            .sender(handle.address)
            .nonce(nonce)
            .init_code(init_code)
            .call_data(encode_batch(intents))
            .call_gas_limit(gas::CALL_GAS_FLOOR.into())
            .verification_gas_limit(gas::VERIFICATION_GAS_FLOOR.into())
            .pre_verification_gas(gas::PRE_VERIFICATION_GAS_FLOOR.into())
            .max_fee_per_gas(fees.max_fee_per_gas)
            .max_priority_fee_per_gas(fees.max_priority_fee_per_gas);

        let estimate =
            self.relay.estimate_user_operation_gas(&uo, self.profile.entry_point).await?;
        let (call_gas_limit, verification_gas_limit, pre_verification_gas) = gas_limits(estimate);

        info!(
            "Built operation for {:?}: call gas {call_gas_limit}, verification gas {verification_gas_limit}, pre-verification gas {pre_verification_gas}",
            handle.address
        );

        Ok(uo
            .call_gas_limit(call_gas_limit)
            .verification_gas_limit(verification_gas_limit)
            .pre_verification_gas(pre_verification_gas))
    }

    /// Entry point nonce for the account, valid even before deployment
    async fn nonce(&self, sender: Address) -> Result<U256, PipelineError> {
        let entry_point = apphub_contracts::gen::EntryPointAPI::new(
            self.profile.entry_point,
            self.eth_client.clone(),
        );
        entry_point.get_nonce(sender, U256::zero()).call().await.map_err(PipelineError::provider)
    }
}

/// Encodes intents as the account's `executeBatch(dest[], value[], func[])`
fn encode_batch(intents: &[CallIntent]) -> Bytes {
    let call = ExecuteBatchCall {
        dest: intents.iter().map(|i| i.to).collect(),
        value: intents.iter().map(|i| i.value).collect(),
        func: intents.iter().map(|i| i.data.clone()).collect(),
    };
    call.encode().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{account::AccountDeriver, mock_relay::MockRelay};
    use apphub_primitives::{constants::supported_chains, ChainRegistry};
    use ethers::providers::{MockProvider, MockResponse, Provider};

    fn profile() -> ChainProfile {
        ChainRegistry::from_env().get(supported_chains::SEPOLIA).unwrap().clone()
    }

    fn handle() -> SmartAccountHandle {
        let registry = ChainRegistry::from_env();
        AccountDeriver::default()
            .derive(&registry, Address::random(), supported_chains::SEPOLIA)
            .unwrap()
    }

    fn value(json: serde_json::Value) -> MockResponse {
        MockResponse::Value(json)
    }

    fn fees() -> GasFees {
        GasFees { max_fee_per_gas: 100.into(), max_priority_fee_per_gas: 10.into() }
    }

    #[test]
    fn margin_widens_each_field_independently() {
        let (call, verification, pre) = gas_limits(Some(UserOperationGasEstimation {
            call_gas_limit: 100_000.into(),
            verification_gas_limit: 200_000.into(),
            pre_verification_gas: 50_000.into(),
        }));

        assert_eq!(call, U256::from(130_000));
        assert_eq!(verification, U256::from(260_000));
        assert_eq!(pre, U256::from(65_000));
    }

    #[test]
    fn missing_estimate_falls_back_to_floors() {
        let (call, verification, pre) = gas_limits(None);

        assert_eq!(call, U256::from(400_000));
        assert_eq!(verification, U256::from(1_000_000));
        assert_eq!(pre, U256::from(800_000));
    }

    #[test]
    fn token_transfer_expands_to_approve_then_hub_transfer() {
        let (client, _mock) = Provider::mocked();
        let builder = OperationBuilder::new(Arc::new(client), MockRelay::default(), profile());

        let meta = TokenMeta {
            name: "USD Coin".into(),
            symbol: "USDC".into(),
            address: Address::random(),
        };
        let to = Address::random();
        let intents = builder.transfer_intents(&TransferAsset::Token(meta.clone()), to, 77.into());

        assert_eq!(intents.len(), 2);
        assert_eq!(intents[0].to, meta.address);
        assert_eq!(
            intents[0].data,
            Bytes::from(
                ApproveCall { spender: builder.reader.hub_address(), amount: 77.into() }.encode()
            )
        );
        assert_eq!(intents[1].to, builder.reader.hub_address());
        assert_eq!(
            intents[1].data,
            Bytes::from(
                TransferTokenCall { token: meta.address, to, amount: 77.into() }.encode()
            )
        );
    }

    #[tokio::test]
    async fn funds_check_precedes_any_relay_traffic() {
        let (client, mock) = Provider::mocked();
        let relay = MockRelay::default();
        let builder = OperationBuilder::new(Arc::new(client), relay.clone(), profile());

        // the smart account holds nothing
        mock.push_response(value(serde_json::json!("0x0")));

        let err = builder
            .build_transfer(&handle(), &TransferAsset::Native, Address::random(), 1.into(), fees())
            .await
            .unwrap_err();

        match err {
            PipelineError::InsufficientFunds { symbol, chain_id, account } => {
                assert_eq!(symbol, "ETH");
                assert_eq!(chain_id, supported_chains::SEPOLIA);
                assert_ne!(account, Address::zero());
            }
            other => panic!("expected InsufficientFunds, got {other:?}"),
        }
        assert_eq!(relay.estimate_calls(), 0);
        assert_eq!(relay.send_calls(), 0);
    }

    #[tokio::test]
    async fn zero_balance_account_is_rejected_even_for_zero_amount() {
        let (client, mock) = Provider::mocked();
        let relay = MockRelay::default();
        let builder = OperationBuilder::new(Arc::new(client), relay.clone(), profile());

        mock.push_response(value(serde_json::json!("0x0")));

        let err = builder
            .build_transfer(
                &handle(),
                &TransferAsset::Native,
                Address::random(),
                U256::zero(),
                fees(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::InsufficientFunds { .. }));
        assert_eq!(relay.estimate_calls(), 0);
    }

    #[tokio::test]
    async fn undeployed_account_gets_init_code_and_margined_gas() {
        let (client, mock) = Provider::mocked();
        let relay = MockRelay::default();
        relay.script_estimate(Some(UserOperationGasEstimation {
            call_gas_limit: 100_000.into(),
            verification_gas_limit: 200_000.into(),
            pre_verification_gas: 50_000.into(),
        }));
        let builder = OperationBuilder::new(Arc::new(client), relay.clone(), profile());
        let handle = handle();

        // LIFO: balance pops first, then code, then the nonce eth_call
        mock.push_response(value(serde_json::Value::String(U256::from(3).encode_hex())));
        mock.push_response(value(serde_json::json!("0x")));
        mock.push_response(value(serde_json::json!("0xde0b6b3a7640000")));

        let uo = builder
            .build_transfer(&handle, &TransferAsset::Native, Address::random(), 5.into(), fees())
            .await
            .unwrap();

        assert_eq!(uo.sender, handle.address);
        assert_eq!(uo.nonce, U256::from(3));
        assert_eq!(uo.init_code, handle.init_code());
        assert_eq!(uo.call_gas_limit, U256::from(130_000));
        assert_eq!(uo.verification_gas_limit, U256::from(260_000));
        assert_eq!(uo.pre_verification_gas, U256::from(65_000));
        assert_eq!(uo.max_fee_per_gas, U256::from(100));
        assert!(uo.signature.is_empty());
        assert_eq!(relay.estimate_calls(), 1);
    }

    #[tokio::test]
    async fn deployed_account_builds_without_init_code() {
        let (client, mock) = Provider::mocked();
        let relay = MockRelay::default();
        relay.script_estimate(None);
        let builder = OperationBuilder::new(Arc::new(client), relay, profile());
        let handle = handle();

        mock.push_response(value(serde_json::Value::String(U256::zero().encode_hex())));
        mock.push_response(value(serde_json::json!("0x60806040")));
        mock.push_response(value(serde_json::json!("0xde0b6b3a7640000")));

        let uo = builder
            .build_transfer(&handle, &TransferAsset::Native, Address::random(), 5.into(), fees())
            .await
            .unwrap();

        assert!(uo.init_code.is_empty());
        // no estimate from the relay, floors apply
        assert_eq!(uo.call_gas_limit, U256::from(400_000));
        assert_eq!(uo.verification_gas_limit, U256::from(1_000_000));
        assert_eq!(uo.pre_verification_gas, U256::from(800_000));
    }

    #[tokio::test]
    async fn empty_intent_list_is_rejected() {
        let (client, _mock) = Provider::mocked();
        let builder = OperationBuilder::new(Arc::new(client), MockRelay::default(), profile());

        let err = builder.build(&handle(), &[], fees()).await.unwrap_err();
        assert!(matches!(err, PipelineError::BuildFailed { .. }));
    }
}
