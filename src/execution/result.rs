//! Outcome of one submitted transaction

use alloy::primitives::B256;
use serde::Serialize;

use crate::portfolio::{PortfolioDelta, PortfolioSnapshot};
use crate::relay::{ReceiptOutcome, ReceiptStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Failed,
}

/// Created once per transaction and never updated
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    pub status: ResultStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<B256>,
    pub receipt_status: ReceiptStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio_delta: Option<PortfolioDelta>,
    pub portfolio: PortfolioSnapshot,
}

impl ExecutionResult {
    /// Confirmed receipt with the snapshots taken around it
    pub fn confirmed(
        tx_hash: B256,
        block_number: Option<u64>,
        before: &PortfolioSnapshot,
        after: PortfolioSnapshot,
    ) -> Self {
        Self {
            success: true,
            status: ResultStatus::Success,
            tx_hash: Some(tx_hash),
            receipt_status: ReceiptStatus::Confirmed,
            block_number,
            error: None,
            error_code: None,
            portfolio_delta: Some(PortfolioDelta::between(before, &after)),
            portfolio: after,
        }
    }

    /// Reverted or timed-out receipt. The portfolio is left as it was.
    pub fn unsettled(tx_hash: B256, outcome: ReceiptOutcome, before: PortfolioSnapshot) -> Self {
        let error = match outcome {
            ReceiptOutcome::Reverted { .. } => "Transaction reverted on chain".to_string(),
            ReceiptOutcome::TimedOut => {
                "No receipt before the confirmation deadline; outcome unknown".to_string()
            }
            ReceiptOutcome::Confirmed { .. } => "Receipt confirmed without settlement".to_string(),
        };
        Self {
            success: false,
            status: ResultStatus::Failed,
            tx_hash: Some(tx_hash),
            receipt_status: outcome.status(),
            block_number: outcome.block_number(),
            error: Some(error),
            error_code: None,
            portfolio_delta: Some(PortfolioDelta::between(&before, &before)),
            portfolio: before,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::Balance;
    use serde_json::json;

    fn snapshot(usdc: f64) -> PortfolioSnapshot {
        PortfolioSnapshot::new(
            vec![Balance {
                symbol: "USDC".into(),
                balance_usd: usdc,
            }],
            0.0,
        )
    }

    #[test]
    fn confirmed_result_serializes_camel_case() {
        let result = ExecutionResult::confirmed(B256::repeat_byte(1), Some(1000), &snapshot(10.0), snapshot(25.0));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["status"], "success");
        assert_eq!(value["receiptStatus"], "confirmed");
        assert_eq!(value["blockNumber"], 1000);
        assert_eq!(value["portfolioDelta"]["accountValueDeltaUsd"], 15.0);
        assert!(value.get("error").is_none());
    }

    #[test]
    fn timed_out_result_keeps_portfolio() {
        let before = snapshot(10.0);
        let result = ExecutionResult::unsettled(B256::repeat_byte(1), ReceiptOutcome::TimedOut, before.clone());
        assert!(!result.success);
        assert_eq!(result.status, ResultStatus::Failed);
        assert_eq!(result.receipt_status, ReceiptStatus::Timeout);
        assert_eq!(result.portfolio, before);
        assert!(result.portfolio_delta.unwrap().is_zero());

        let value = serde_json::to_value(ExecutionResult::unsettled(
            B256::repeat_byte(1),
            ReceiptOutcome::Reverted { block_number: Some(7) },
            before,
        ))
        .unwrap();
        assert_eq!(value["receiptStatus"], json!("reverted"));
        assert_eq!(value["blockNumber"], 7);
    }
}
