//! Receipt confirmation
//!
//! `Submitted -> Pending -> {Confirmed | Reverted | TimedOut}`. The poll loop
//! is bounded by wall-clock time and always ends in a terminal outcome;
//! read errors while polling count as "not yet".

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::B256;
use serde::Serialize;
use tokio::time::Instant;

use crate::chain::{ChainClient, ChainError, ChainReceipt};
use crate::config::ReceiptSettings;

/// Receipt state as reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Pending,
    Confirmed,
    /// Nothing was mined because submission never happened
    Failed,
    Reverted,
    Timeout,
}

/// Terminal result of following a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptOutcome {
    Confirmed { block_number: Option<u64> },
    Reverted { block_number: Option<u64> },
    /// Unknown outcome; nothing may be assumed about funds
    TimedOut,
}

impl ReceiptOutcome {
    pub fn status(&self) -> ReceiptStatus {
        match self {
            ReceiptOutcome::Confirmed { .. } => ReceiptStatus::Confirmed,
            ReceiptOutcome::Reverted { .. } => ReceiptStatus::Reverted,
            ReceiptOutcome::TimedOut => ReceiptStatus::Timeout,
        }
    }

    pub fn block_number(&self) -> Option<u64> {
        match self {
            ReceiptOutcome::Confirmed { block_number }
            | ReceiptOutcome::Reverted { block_number } => *block_number,
            ReceiptOutcome::TimedOut => None,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, ReceiptOutcome::Confirmed { .. })
    }

    fn from_receipt(receipt: ChainReceipt) -> Self {
        if receipt.success {
            ReceiptOutcome::Confirmed {
                block_number: receipt.block_number,
            }
        } else {
            ReceiptOutcome::Reverted {
                block_number: receipt.block_number,
            }
        }
    }
}

pub struct ReceiptConfirmer {
    chain: Arc<dyn ChainClient>,
    poll_interval: Duration,
    timeout: Duration,
}

impl ReceiptConfirmer {
    pub fn new(chain: Arc<dyn ChainClient>, settings: &ReceiptSettings) -> Self {
        Self {
            chain,
            poll_interval: Duration::from_millis(settings.poll_interval_ms.max(1)),
            timeout: Duration::from_millis(settings.timeout_ms.max(1)),
        }
    }

    /// Poll until the transaction is mined or the budget runs out
    pub async fn confirm(&self, tx_hash: B256) -> ReceiptOutcome {
        let started = Instant::now();
        tracing::debug!(tx_hash = %tx_hash, "Awaiting receipt");

        let polled = tokio::time::timeout(self.timeout, async {
            let mut attempts = 0u32;
            loop {
                attempts += 1;
                match self.chain.receipt(tx_hash).await {
                    Ok(Some(receipt)) => return ReceiptOutcome::from_receipt(receipt),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::debug!(tx_hash = %tx_hash, attempts, error = %e, "Receipt read failed; retrying");
                    }
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        })
        .await;

        let outcome = polled.unwrap_or(ReceiptOutcome::TimedOut);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome {
            ReceiptOutcome::Confirmed { block_number } => {
                tracing::info!(tx_hash = %tx_hash, ?block_number, elapsed_ms, "Transaction confirmed")
            }
            ReceiptOutcome::Reverted { block_number } => {
                tracing::warn!(tx_hash = %tx_hash, ?block_number, elapsed_ms, "Transaction reverted")
            }
            ReceiptOutcome::TimedOut => {
                tracing::warn!(tx_hash = %tx_hash, elapsed_ms, "Receipt confirmation timed out")
            }
        }
        outcome
    }

    /// Single read: `None` while pending
    pub async fn check(&self, tx_hash: B256) -> Result<Option<ReceiptOutcome>, ChainError> {
        Ok(self
            .chain
            .receipt(tx_hash)
            .await?
            .map(ReceiptOutcome::from_receipt))
    }
}
