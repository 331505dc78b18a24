use clap::{value_parser, Parser, Subcommand};

pub mod commands;

/// The main AppHub CLI interface
#[derive(Debug, Parser)]
#[command(author, version, about = "AppHub", long_about = None)]
pub struct Cli {
    /// The command to execute
    #[clap(subcommand)]
    command: Commands,

    /// The verbosity level
    #[clap(long, short, global = true, default_value_t = 2, value_parser = value_parser!(u8).range(..=4))]
    verbosity: u8,
}

impl Cli {
    /// Get the log level based on the verbosity level
    pub fn get_log_level(&self) -> String {
        match self.verbosity {
            0 => "error",
            1 => "warn",
            2 => "info",
            3 => "debug",
            _ => "trace",
        }
        .into()
    }
}

/// Commands to be executed
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Derive the counterfactual smart account for an owner
    #[command(name = "derive")]
    Derive(commands::DeriveCommand),

    /// Show native and token balances, claim flags and faucet parameters
    #[command(name = "status")]
    Status(commands::StatusCommand),

    /// Deploy the smart account through its factory
    #[command(name = "deploy")]
    Deploy(commands::DeployCommand),

    /// Claim a token's faucet allowance
    #[command(name = "claim")]
    Claim(commands::ClaimCommand),

    /// Transfer native currency or a hub token from the smart account
    #[command(name = "transfer")]
    Transfer(commands::TransferCommand),
}

pub fn run() -> eyre::Result<()> {
    let cli = Cli::parse();

    let rust_log = match std::env::var("RUST_LOG") {
        Ok(val) => format!("{val},apphub={}", cli.get_log_level()),
        Err(_) => format!("apphub={}", cli.get_log_level()),
    };
    std::env::set_var("RUST_LOG", rust_log);
    tracing_subscriber::fmt::init();

    let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;

    rt.block_on(async move {
        match cli.command {
            Commands::Derive(command) => command.execute().await,
            Commands::Status(command) => command.execute().await,
            Commands::Deploy(command) => command.execute().await,
            Commands::Claim(command) => command.execute().await,
            Commands::Transfer(command) => command.execute().await,
        }
    })
}
