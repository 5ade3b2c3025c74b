//! Relayer key custody and pre-submission simulation
//!
//! The relayer private key never leaves [`SecureWallet`]: it is not
//! serialized, logged or returned by any endpoint.

mod signer;
mod simulator;

pub use signer::SecureWallet;
pub use simulator::{describe_revert, SimulationResult, TransactionSimulator};
