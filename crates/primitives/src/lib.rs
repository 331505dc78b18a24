//! AppHub smart account pipeline primitive types
//!
//! This crate contains the chain registry, user operation types, signer wallet
//! and retry policy shared by the rest of the pipeline.

pub mod chain;
pub mod constants;
pub mod retry;
pub mod token;
mod user_operation;
mod utils;
mod wallet;

pub use chain::{ChainProfile, ChainRegistry, UnsupportedChain};
pub use retry::RetryPolicy;
pub use token::{TokenMeta, TokenRow};
pub use user_operation::{
    SignedUserOperation, UserOperation, UserOperationGasEstimation, UserOperationHash,
    UserOperationReceipt,
};
pub use wallet::Wallet;
