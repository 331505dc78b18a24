use crate::{
    tokens::{builtin_tokens, find_token},
    utils::{parse_address, parse_u256},
};
use apphub_contracts::HubReader;
use apphub_pipeline::{
    classify, fetch_gas_fees, AccountDeriver, Deployment, DeploymentExecutor, FaucetClaimer,
    HttpRelay, OperationBuilder, OperationOutcome, OperationSubmitter, SmartAccountHandle,
    TransferAsset,
};
use apphub_primitives::{chain::REGISTRY, ChainProfile, Wallet};
use clap::Parser;
use ethers::{
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    types::{Address, U256},
    utils::format_ether,
};
use std::sync::Arc;
use tracing::info;

/// Args shared by every command: which chain and whose key
#[derive(Clone, Debug, Parser)]
pub struct CommonArgs {
    /// Chain id to operate on
    #[clap(long, default_value = "11155111")]
    pub chain: u64,

    /// Owner private key (hex); defaults to the APPHUB_PRIVATE_KEY environment variable
    #[clap(long)]
    pub key: Option<String>,

    /// Owner mnemonic phrase; defaults to the APPHUB_MNEMONIC environment variable
    #[clap(long)]
    pub mnemonic: Option<String>,
}

impl CommonArgs {
    fn profile(&self) -> eyre::Result<ChainProfile> {
        Ok(REGISTRY.get(self.chain)?.clone())
    }

    fn wallet(&self) -> eyre::Result<Wallet> {
        if let Some(key) = self.key.clone().or_else(|| std::env::var("APPHUB_PRIVATE_KEY").ok()) {
            return Wallet::from_key(&key, self.chain);
        }
        if let Some(phrase) =
            self.mnemonic.clone().or_else(|| std::env::var("APPHUB_MNEMONIC").ok())
        {
            return Wallet::from_phrase(&phrase, self.chain);
        }
        eyre::bail!("no signing key: pass --key/--mnemonic or set APPHUB_PRIVATE_KEY")
    }

    fn provider(&self, profile: &ChainProfile) -> eyre::Result<Provider<Http>> {
        Ok(Provider::<Http>::try_from(profile.rpc_url.as_str())?)
    }

    fn eth_client(&self, profile: &ChainProfile) -> eyre::Result<Arc<Provider<Http>>> {
        Ok(Arc::new(self.provider(profile)?))
    }

    fn derive(&self, owner: Address) -> eyre::Result<SmartAccountHandle> {
        Ok(AccountDeriver::default().derive(&REGISTRY, owner, self.chain)?)
    }

    fn relay(&self, profile: &ChainProfile) -> eyre::Result<HttpRelay> {
        let url = profile.bundler_url.clone().ok_or_else(|| {
            eyre::eyre!(
                "no bundler relay configured for chain {}; set APPHUB_{}_BUNDLER_URL",
                profile.chain_id,
                profile.name.to_uppercase()
            )
        })?;
        Ok(HttpRelay::new(url))
    }
}

/// Derive the counterfactual smart account for an owner
#[derive(Debug, Parser)]
pub struct DeriveCommand {
    #[clap(flatten)]
    common: CommonArgs,

    /// Owner address; defaults to the wallet's address
    #[clap(long, value_parser = parse_address)]
    owner: Option<Address>,
}

impl DeriveCommand {
    pub async fn execute(self) -> eyre::Result<()> {
        let owner = match self.owner {
            Some(owner) => owner,
            None => self.common.wallet()?.address(),
        };
        let handle = self.common.derive(owner)?;

        println!("owner:         {:?}", handle.owner);
        println!("smart account: {:?}", handle.address);
        println!("salt:          {:?}", handle.salt);
        println!("factory:       {:?}", handle.factory);

        Ok(())
    }
}

/// Show native and token balances, claim flags and faucet parameters
#[derive(Debug, Parser)]
pub struct StatusCommand {
    #[clap(flatten)]
    common: CommonArgs,

    /// Owner address; defaults to the wallet's address
    #[clap(long, value_parser = parse_address)]
    owner: Option<Address>,
}

impl StatusCommand {
    pub async fn execute(self) -> eyre::Result<()> {
        let profile = self.common.profile()?;
        let owner = match self.owner {
            Some(owner) => owner,
            None => self.common.wallet()?.address(),
        };
        let handle = self.common.derive(owner)?;
        let eth_client = self.common.eth_client(&profile)?;

        let native = eth_client.get_balance(handle.address, None).await?;
        println!("smart account: {:?}", handle.address);
        println!("{}: {}", profile.native_symbol, format_ether(native));

        let reader = HubReader::new(eth_client, profile.hub);
        let rows = reader.token_rows(handle.address, &builtin_tokens(self.common.chain)).await;

        for row in rows {
            let faucet = if row.faucet_enabled {
                format!("faucet {} available", row.faucet_amount)
            } else {
                "faucet disabled".into()
            };
            let claimed = if row.claimed { "claimed" } else { "not claimed" };
            println!("{}: {} ({claimed}, {faucet})", row.meta.symbol, row.balance);
        }

        Ok(())
    }
}

/// Deploy the smart account through its factory
#[derive(Debug, Parser)]
pub struct DeployCommand {
    #[clap(flatten)]
    common: CommonArgs,
}

impl DeployCommand {
    pub async fn execute(self) -> eyre::Result<()> {
        let profile = self.common.profile()?;
        let wallet = self.common.wallet()?;
        let handle = self.common.derive(wallet.address())?;
        let signing_client =
            Arc::new(SignerMiddleware::new(self.common.provider(&profile)?, wallet.signer));

        match DeploymentExecutor::new(signing_client).deploy(&handle).await? {
            Deployment::AlreadyDeployed => {
                println!("smart account {:?} is already deployed", handle.address);
            }
            Deployment::Deployed { transaction_hash } => {
                println!("smart account {:?} deployed", handle.address);
                println!("{}", profile.explorer_tx_url(transaction_hash));
            }
        }

        Ok(())
    }
}

/// Claim a token's faucet allowance
#[derive(Debug, Parser)]
pub struct ClaimCommand {
    #[clap(flatten)]
    common: CommonArgs,

    /// Symbol of the token to claim
    #[clap(long)]
    token: String,
}

impl ClaimCommand {
    pub async fn execute(self) -> eyre::Result<()> {
        let profile = self.common.profile()?;
        let wallet = self.common.wallet()?;
        let meta = find_token(self.common.chain, &self.token)
            .ok_or_else(|| eyre::eyre!("unknown token {} on chain {}", self.token, self.common.chain))?;

        let signing_client = Arc::new(SignerMiddleware::new(
            self.common.provider(&profile)?,
            wallet.signer.clone(),
        ));

        let tx = FaucetClaimer::new(signing_client, profile.hub)
            .claim(wallet.address(), &meta)
            .await?;

        println!("claimed {}", meta.symbol);
        println!("{}", profile.explorer_tx_url(tx));

        Ok(())
    }
}

/// Transfer native currency or a hub token from the smart account
#[derive(Debug, Parser)]
pub struct TransferCommand {
    #[clap(flatten)]
    common: CommonArgs,

    /// Symbol of the token to send; omit to send the native currency
    #[clap(long)]
    token: Option<String>,

    /// Recipient address
    #[clap(long, value_parser = parse_address)]
    to: Address,

    /// Amount in base units
    #[clap(long, value_parser = parse_u256)]
    amount: U256,
}

impl TransferCommand {
    pub async fn execute(self) -> eyre::Result<()> {
        let profile = self.common.profile()?;
        let wallet = self.common.wallet()?;
        let handle = self.common.derive(wallet.address())?;
        let eth_client = self.common.eth_client(&profile)?;
        let relay = self.common.relay(&profile)?;

        let asset = match &self.token {
            Some(symbol) => TransferAsset::Token(
                find_token(self.common.chain, symbol).ok_or_else(|| {
                    eyre::eyre!("unknown token {symbol} on chain {}", self.common.chain)
                })?,
            ),
            None => TransferAsset::Native,
        };

        let fees = fetch_gas_fees(&eth_client).await?;
        let builder = OperationBuilder::new(eth_client, relay.clone(), profile.clone());
        let uo = builder.build_transfer(&handle, &asset, self.to, self.amount, fees).await?;

        let signed =
            wallet.sign_user_operation(&uo, &profile.entry_point, self.common.chain).await?;

        let submitter = OperationSubmitter::new(relay, profile.entry_point, self.common.chain);
        let hash = submitter.submit(&signed).await?;
        info!("Operation submitted: {:?}", hash.0);

        let receipt = submitter.await_receipt(&hash).await?;
        match classify(&receipt) {
            OperationOutcome::Executed => println!("transfer executed"),
            OperationOutcome::PartiallyExecuted => {
                println!("operation included but the hub transfer did not fire; check the receipt")
            }
            OperationOutcome::Reverted => println!("operation reverted: {}", receipt.reason),
        }
        println!("{}", profile.explorer_tx_url(receipt.tx_receipt.transaction_hash));

        Ok(())
    }
}
