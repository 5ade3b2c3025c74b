//! Error types for the execution engine

use thiserror::Error;

use crate::chain::ChainError;
use crate::config::ConfigError;
use crate::guards::ValidationError;
use crate::plan::PlanError;
use crate::relay::RelayError;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error("Direct execution is disabled in the v1 demo; use a session")]
    DirectModeBlocked,

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wire error code reported to HTTP callers
    pub fn code(&self) -> &'static str {
        match self {
            Error::Plan(e) => e.code(),
            Error::Validation(_) => "VALIDATION_FAILED",
            Error::Config(_) => "EXECUTION_DISABLED",
            Error::Chain(_) => "RPC_ERROR",
            Error::Relay(e) => e.kind.code(),
            Error::DirectModeBlocked => "V1_DEMO_DIRECT_BLOCKED",
            Error::Wallet(_) => "WALLET_ERROR",
            Error::InvalidArgument(_) | Error::Json(_) => "INVALID_REQUEST",
            Error::Io(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
