//! Pipeline-wide constants

/// Entry point smart contract
pub mod entry_point {
    /// Address of the entry point smart contract (v0.6)
    pub const ADDRESS: &str = "0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789";
    /// Version of the entry point smart contract
    pub const VERSION: &str = "0.6.0";
}

/// Smart account factory and implementation
pub mod account {
    /// Address of the smart account factory, same on every supported chain
    pub const FACTORY: &str = "0x9406Cc6185a346906296840746125a0E44976454";
    /// Address of the account implementation the factory proxies to
    pub const IMPLEMENTATION: &str = "0x8ABB13360b87Be5EEb1B98647A016adD927a136c";
}

/// Gas budgeting for user operations
pub mod gas {
    /// Safety margin applied on top of every relay gas estimate (percent)
    pub const ESTIMATE_MARGIN_PERC: u64 = 30;
    /// Call gas limit used when the relay returns no estimate
    pub const CALL_GAS_FLOOR: u64 = 400_000;
    /// Verification gas limit used when the relay returns no estimate
    pub const VERIFICATION_GAS_FLOOR: u64 = 1_000_000;
    /// Pre-verification gas used when the relay returns no estimate
    pub const PRE_VERIFICATION_GAS_FLOOR: u64 = 800_000;
    /// Gas limit for the direct factory deployment transaction
    pub const DEPLOYMENT_GAS: u64 = 1_000_000;
}

/// Read layer behavior under third-party RPC rate limiting
pub mod read {
    /// Maximum attempts for a rate-limited read
    pub const MAX_ATTEMPTS: u32 = 3;
    /// Base backoff delay, doubled after each rate-limited attempt (in milliseconds)
    pub const BASE_DELAY_MILLIS: u64 = 1000;
    /// Minimum spacing between sequential reads against the same endpoint (in milliseconds)
    pub const REQUEST_SPACING_MILLIS: u64 = 200;
}

/// Timeouts for relay and chain confirmation waits
pub mod wait {
    /// How long to wait for a user operation receipt (in seconds)
    pub const RECEIPT_TIMEOUT_SECS: u64 = 120;
    /// Interval between receipt polls (in seconds)
    pub const RECEIPT_POLL_SECS: u64 = 3;
    /// How long to wait for a direct transaction (deployment, faucet claim) (in seconds)
    pub const TRANSACTION_TIMEOUT_SECS: u64 = 60;
}

/// Supported chains
pub mod supported_chains {
    /// Monad testnet
    pub const MONAD_TESTNET: u64 = 10143;
    /// Ethereum Sepolia testnet
    pub const SEPOLIA: u64 = 11155111;
}

/// AppHub contract deployments
pub mod hub {
    /// AppHub address on Monad testnet
    pub const MONAD_TESTNET: &str = "0x7bA1e4fD5F2Ee1f2A9157aB3bb2E392475DB8dE7";
    /// AppHub address on Sepolia
    pub const SEPOLIA: &str = "0xD5a4E35c8A9eC38BdB5E8b0A2F7F15dC2A51BbF3";
}
