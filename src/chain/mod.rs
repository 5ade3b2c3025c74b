//! Chain access seam
//!
//! Everything that reads from or writes to the test network goes through
//! [`ChainClient`]. The production implementation wraps an alloy provider;
//! [`ScriptedChain`] answers from an in-memory script.

mod rpc;
mod scripted;

pub use rpc::RpcChainClient;
pub use scripted::{ReceiptPoll, Scripted, ScriptedChain};

use std::future::Future;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use thiserror::Error;

use crate::codec::CodecError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("{op} timed out after {ms}ms")]
    Timeout { op: &'static str, ms: u64 },

    #[error("RPC transport error: {0}")]
    Transport(String),

    /// The node executed the call and it reverted
    #[error("Execution reverted: {message}")]
    Revert { data: Option<Bytes>, message: String },

    #[error(transparent)]
    Decode(#[from] CodecError),
}

impl ChainError {
    pub fn revert_data(&self) -> Option<&Bytes> {
        match self {
            ChainError::Revert { data, .. } => data.as_ref(),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ChainError::Timeout { .. })
    }
}

/// Call or transaction parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Option<Address>,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl CallRequest {
    pub fn new(to: Address, data: Bytes) -> Self {
        Self {
            from: None,
            to,
            data,
            value: U256::ZERO,
        }
    }

    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// First four bytes of the call data
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.data.get(..4).and_then(|s| s.try_into().ok())
    }
}

/// Mined transaction outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainReceipt {
    /// `true` when status is 1
    pub success: bool,
    pub block_number: Option<u64>,
}

/// Fields of a sent transaction needed to tell what it executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTransaction {
    pub from: Address,
    /// `None` for contract creation
    pub to: Option<Address>,
    pub input: Bytes,
    pub value: U256,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn chain_id(&self) -> Result<u64, ChainError>;

    /// `eth_call` against the latest block
    async fn call(&self, request: CallRequest) -> Result<Bytes, ChainError>;

    async fn code_at(&self, address: Address) -> Result<Bytes, ChainError>;

    async fn transaction_count(&self, address: Address) -> Result<u64, ChainError>;

    /// `eth_getTransactionByHash`. `None` when the node does not know the hash.
    async fn transaction(&self, tx_hash: B256) -> Result<Option<ChainTransaction>, ChainError>;

    /// `None` while the transaction is not mined
    async fn receipt(&self, tx_hash: B256) -> Result<Option<ChainReceipt>, ChainError>;

    /// Sign with the relayer key and broadcast. Returns the transaction hash.
    async fn send_transaction(&self, request: CallRequest) -> Result<B256, ChainError>;

    /// Relayer address used as `from`, if this client can sign
    fn signer_address(&self) -> Option<Address>;
}

/// Bound a chain read by a timeout
pub async fn with_timeout<T, F>(op: &'static str, limit: Duration, fut: F) -> Result<T, ChainError>
where
    F: Future<Output = Result<T, ChainError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ChainError::Timeout {
            op,
            ms: limit.as_millis() as u64,
        }),
    }
}
