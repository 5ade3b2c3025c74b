//! Execution plans
//!
//! A [`Plan`] is the ordered, bounded list of adapter calls produced from an
//! [`ExecutionRequest`]. Plans are plain request-scoped values: building,
//! validating and hashing them never touches shared state.

mod builder;
mod request;
mod signer;

pub use builder::{
    ApprovalRequirement, NonceSource, PlanBuilder, PreparedPlan, RouterNonceSource,
    StaticSwapVenue, SwapRoute, SwapVenue,
};
pub use request::{EventOutcome, ExecutionMode, ExecutionRequest, PerpSide};
pub use signer::{PlanSigner, SignedPlan};

use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chain::ChainError;

/// Operation implemented by an adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Swap,
    Wrap,
    Pull,
    Supply,
    Perp,
    Event,
}

impl ActionType {
    pub fn as_u8(&self) -> u8 {
        match self {
            ActionType::Swap => 0,
            ActionType::Wrap => 1,
            ActionType::Pull => 2,
            ActionType::Supply => 3,
            ActionType::Perp => 4,
            ActionType::Event => 5,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ActionType::Swap),
            1 => Some(ActionType::Wrap),
            2 => Some(ActionType::Pull),
            3 => Some(ActionType::Supply),
            4 => Some(ActionType::Perp),
            5 => Some(ActionType::Event),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ActionType::Swap => "SWAP",
            ActionType::Wrap => "WRAP",
            ActionType::Pull => "PULL",
            ActionType::Supply => "SUPPLY",
            ActionType::Perp => "PERP",
            ActionType::Event => "EVENT",
        }
    }
}

/// One adapter call with pre-encoded call data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub action_type: ActionType,
    pub adapter: Address,
    pub data: Bytes,
}

/// Ordered actions plus user, nonce and deadline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub user: Address,
    pub nonce: U256,
    /// Unix seconds
    pub deadline: u64,
    pub actions: Vec<Action>,
}

/// Deterministic digest of a plan
pub type PlanHash = B256;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Unsupported intent: no adapter configured for {kind}")]
    UnsupportedIntent { kind: &'static str },

    #[error("Missing required parameter: {field}")]
    MissingParameter { field: &'static str },

    #[error("Unsupported asset: {0}")]
    UnsupportedAsset(String),

    #[error("Invalid amount for {field}: {reason}")]
    InvalidAmount { field: &'static str, reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to fetch plan nonce: {0}")]
    Nonce(#[source] ChainError),
}

impl PlanError {
    pub fn code(&self) -> &'static str {
        match self {
            PlanError::UnsupportedIntent { .. } => "UNSUPPORTED_INTENT",
            PlanError::MissingParameter { .. } => "MISSING_PARAMETER",
            PlanError::UnsupportedAsset(_) => "UNSUPPORTED_ASSET",
            PlanError::InvalidAmount { .. } => "INVALID_AMOUNT",
            PlanError::InvalidRequest(_) => "INVALID_REQUEST",
            PlanError::Nonce(_) => "RPC_ERROR",
        }
    }
}
