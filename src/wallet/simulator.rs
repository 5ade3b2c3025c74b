//! Transaction simulation before submission
//!
//! Runs `eth_call` with the exact calldata, sender and value the relayer is
//! about to broadcast, so reverts surface before any gas is spent.
//!
//! SECURITY NOTE:
//! - This module is read-only - it never signs or submits transactions
//! - Simulation uses the relayer's public address only

use std::sync::Arc;

use alloy::primitives::Bytes;
use serde::Serialize;

use crate::chain::{CallRequest, ChainClient, ChainError};
use crate::codec;

/// Result of simulating a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationResult {
    pub success: bool,
    /// Raw return data from eth_call
    pub return_data: Option<Bytes>,
    /// Raw revert data, when the node returned any
    pub revert_data: Option<Bytes>,
    /// Human-readable revert reason (if failed)
    pub revert_reason: Option<String>,
}

impl SimulationResult {
    pub fn success(return_data: Bytes) -> Self {
        Self {
            success: true,
            return_data: Some(return_data),
            revert_data: None,
            revert_reason: None,
        }
    }

    pub fn reverted(revert_data: Option<Bytes>, message: &str) -> Self {
        let revert_reason = revert_data
            .as_deref()
            .map(|d| describe_revert(d))
            .unwrap_or_else(|| message.to_string());
        Self {
            success: false,
            return_data: None,
            revert_data,
            revert_reason: Some(revert_reason),
        }
    }
}

/// Describe revert data for logs and error messages
pub fn describe_revert(data: &[u8]) -> String {
    if let Some(err) = codec::decode_router_revert(data) {
        return format!("{:?}", err);
    }
    if let Some(err) = codec::decode_token_revert(data) {
        return format!("{:?}", err);
    }
    if let Some(reason) = codec::decode_revert_string(data) {
        return reason;
    }
    if data.is_empty() {
        return "execution reverted".to_string();
    }
    format!("Reverted with data: {}", Bytes::copy_from_slice(data))
}

/// Transaction simulator using eth_call
pub struct TransactionSimulator {
    chain: Arc<dyn ChainClient>,
}

impl TransactionSimulator {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self { chain }
    }

    /// A revert is a result; only transport failures are errors
    pub async fn simulate(&self, request: CallRequest) -> Result<SimulationResult, ChainError> {
        match self.chain.call(request).await {
            Ok(data) => Ok(SimulationResult::success(data)),
            Err(ChainError::Revert { data, message }) => {
                let result = SimulationResult::reverted(data, &message);
                tracing::info!(reason = ?result.revert_reason, "Simulation reverted");
                Ok(result)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{Scripted, ScriptedChain};
    use crate::codec::abi::ExecutionRouter;
    use alloy::primitives::{Address, B256, U256};
    use alloy::sol_types::SolError;

    #[test]
    fn test_describe_typed_router_revert() {
        let data = ExecutionRouter::SessionExpired {
            sessionId: B256::ZERO,
        }
        .abi_encode();
        assert!(describe_revert(&data).contains("SessionExpired"));
    }

    #[test]
    fn test_describe_plain_reverts() {
        let data = alloy::sol_types::Revert::from("Insufficient balance").abi_encode();
        assert_eq!(describe_revert(&data), "Insufficient balance");
        assert_eq!(describe_revert(&[]), "execution reverted");
        assert_eq!(describe_revert(&[0xab]), "Reverted with data: 0xab");
    }

    #[tokio::test]
    async fn test_simulation_reports_revert_as_result() {
        let chain = Arc::new(ScriptedChain::new(1));
        let revert = ExecutionRouter::SlippageExceeded {
            amountOut: U256::from(1u64),
            amountOutMin: U256::from(2u64),
        }
        .abi_encode();
        chain.on_call([0xde, 0xad, 0xbe, 0xef], Scripted::Revert(revert.clone().into()));

        let simulator = TransactionSimulator::new(chain);
        let result = simulator
            .simulate(CallRequest::new(
                Address::ZERO,
                Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]),
            ))
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.revert_data, Some(Bytes::from(revert)));
        assert!(result.revert_reason.unwrap().contains("SlippageExceeded"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_an_error() {
        let chain = Arc::new(ScriptedChain::new(1));
        chain.set_unreachable(true);
        let simulator = TransactionSimulator::new(chain);
        let err = simulator
            .simulate(CallRequest::new(Address::ZERO, Bytes::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::Transport(_)));
    }
}
