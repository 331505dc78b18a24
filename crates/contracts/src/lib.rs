//! AppHub smart contract interfaces
//!
//! Generated bindings for the contracts the pipeline talks to (hub, tokens,
//! smart account, factory, entry point) plus the resilient read layer used for
//! balances, claim flags and faucet parameters.

pub mod error;
pub mod gen;
pub mod hub;

pub use error::ReadError;
pub use hub::HubReader;
