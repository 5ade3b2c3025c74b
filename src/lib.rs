//! Execution planning and session-relay engine
//!
//! Turns a validated execution intent into a bounded plan of adapter calls,
//! enforces hard guards on it before any signature exists, relays it through
//! an on-chain session and follows the receipt to a terminal state.
//!
//! # Safety model
//!
//! - Guards run at prepare time and again on the exact calldata the relayer
//!   is about to send
//! - Every relayed plan is simulated and then broadcast at most once
//! - Session status reads degrade to "disabled" instead of failing
//! - The relayer key never leaves the wallet module

pub mod audit;
pub mod chain;
pub mod clock;
pub mod codec;
pub mod config;
pub mod execution;
pub mod guards;
pub mod plan;
pub mod portfolio;
pub mod relay;
pub mod server;
pub mod session;
pub mod throttle;
pub mod tokens;
pub mod wallet;

mod error;

pub use config::ExecutionConfig;
pub use error::{Error, Result};
pub use execution::{ExecutionResult, ExecutionService};
pub use plan::{Plan, PlanHash};
