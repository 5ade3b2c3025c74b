//! Relayed execution
//!
//! [`Relayer`] re-validates, simulates and submits session plans exactly once;
//! [`ReceiptConfirmer`] follows the resulting transaction to a terminal
//! state. Failures carry a [`RelayErrorKind`] decided from typed revert data
//! at the point they happen.

mod ledger;
mod receipt;
mod relayer;

pub use ledger::{LedgerEntry, SubmissionLedger};
pub use receipt::{ReceiptConfirmer, ReceiptOutcome, ReceiptStatus};
pub use relayer::{RelayRequest, RelaySubmission, Relayer};

use alloy::primitives::B256;
use serde::Serialize;
use thiserror::Error;

use crate::chain::ChainError;
use crate::codec::abi::ExecutionRouter::ExecutionRouterErrors;
use crate::codec::abi::IERC20::IERC20Errors;
use crate::codec;
use crate::wallet::describe_revert;

/// Fixed set of relay failure classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelayErrorKind {
    SessionExpired,
    SessionNotActive,
    InsufficientBalance,
    SlippageExceeded,
    DuplicateSubmission,
    RelayerFailed,
}

impl RelayErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            RelayErrorKind::SessionExpired => "SESSION_EXPIRED",
            RelayErrorKind::SessionNotActive => "SESSION_NOT_ACTIVE",
            RelayErrorKind::InsufficientBalance => "INSUFFICIENT_BALANCE",
            RelayErrorKind::SlippageExceeded => "SLIPPAGE_FAILURE",
            RelayErrorKind::DuplicateSubmission => "DUPLICATE_SUBMISSION",
            RelayErrorKind::RelayerFailed => "RELAYER_FAILED",
        }
    }

    /// Classify raw revert data. Unknown data is a relayer failure.
    pub fn from_revert(data: &[u8]) -> Self {
        if let Some(err) = codec::decode_router_revert(data) {
            return match err {
                ExecutionRouterErrors::SessionExpired(_) => RelayErrorKind::SessionExpired,
                ExecutionRouterErrors::SessionNotActive(_)
                | ExecutionRouterErrors::UnauthorizedExecutor(_) => {
                    RelayErrorKind::SessionNotActive
                }
                ExecutionRouterErrors::InsufficientBalance(_)
                | ExecutionRouterErrors::SpendLimitExceeded(_) => {
                    RelayErrorKind::InsufficientBalance
                }
                ExecutionRouterErrors::SlippageExceeded(_) => RelayErrorKind::SlippageExceeded,
                ExecutionRouterErrors::AdapterNotAllowed(_)
                | ExecutionRouterErrors::DeadlineExpired(_)
                | ExecutionRouterErrors::InvalidNonce(_) => RelayErrorKind::RelayerFailed,
            };
        }
        match codec::decode_token_revert(data) {
            Some(IERC20Errors::ERC20InsufficientBalance(_))
            | Some(IERC20Errors::ERC20InsufficientAllowance(_)) => {
                RelayErrorKind::InsufficientBalance
            }
            None => RelayErrorKind::RelayerFailed,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RelayError {
    pub kind: RelayErrorKind,
    pub message: String,
    /// Existing or failed transaction, when one is known
    pub tx_hash: Option<B256>,
}

impl RelayError {
    pub fn new(kind: RelayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            tx_hash: None,
        }
    }

    pub fn with_tx(mut self, tx_hash: B256) -> Self {
        self.tx_hash = Some(tx_hash);
        self
    }

    /// Classify a chain failure from simulation or broadcast
    pub fn from_chain(err: &ChainError) -> Self {
        match err {
            ChainError::Revert {
                data: Some(data), ..
            } => Self::new(RelayErrorKind::from_revert(data), describe_revert(data)),
            other => Self::new(RelayErrorKind::RelayerFailed, other.to_string()),
        }
    }
}
