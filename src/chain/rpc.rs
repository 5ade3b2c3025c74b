//! alloy-backed chain client

use std::time::Duration;

use alloy::consensus::Transaction;
use alloy::network::{ReceiptResponse, TransactionResponse};
use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::TransportError;
use async_trait::async_trait;

use super::{with_timeout, CallRequest, ChainClient, ChainError, ChainReceipt, ChainTransaction};
use crate::wallet::SecureWallet;

/// Chain client over a single HTTP RPC endpoint
pub struct RpcChainClient {
    provider: DynProvider,
    signer: Option<Address>,
    read_timeout: Duration,
}

impl RpcChainClient {
    /// Read-only client
    pub fn connect(rpc_url: &str, read_timeout: Duration) -> Result<Self, ChainError> {
        let url = parse_url(rpc_url)?;
        let provider = ProviderBuilder::new().connect_http(url).erased();
        Ok(Self {
            provider,
            signer: None,
            read_timeout,
        })
    }

    /// Client that signs transactions with the relayer wallet
    pub fn connect_with_wallet(
        rpc_url: &str,
        wallet: &SecureWallet,
        read_timeout: Duration,
    ) -> Result<Self, ChainError> {
        let url = parse_url(rpc_url)?;
        let provider = ProviderBuilder::new()
            .wallet(wallet.wallet().clone())
            .connect_http(url)
            .erased();
        Ok(Self {
            provider,
            signer: Some(wallet.address()),
            read_timeout,
        })
    }

    fn to_tx(request: CallRequest) -> TransactionRequest {
        let mut tx = TransactionRequest::default()
            .to(request.to)
            .input(request.data.into())
            .value(request.value);
        if let Some(from) = request.from {
            tx = tx.from(from);
        }
        tx
    }
}

impl std::fmt::Debug for RpcChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcChainClient")
            .field("signer", &self.signer)
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

fn parse_url(raw: &str) -> Result<url::Url, ChainError> {
    raw.parse()
        .map_err(|e: url::ParseError| ChainError::Transport(format!("invalid RPC URL: {}", e)))
}

/// Keep typed revert data when the node returned any
fn map_rpc_error(err: TransportError) -> ChainError {
    if let Some(payload) = err.as_error_resp() {
        if let Some(data) = payload.as_revert_data() {
            return ChainError::Revert {
                data: Some(data),
                message: payload.message.to_string(),
            };
        }
    }
    ChainError::Transport(err.to_string())
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        with_timeout("eth_chainId", self.read_timeout, async {
            self.provider.get_chain_id().await.map_err(map_rpc_error)
        })
        .await
    }

    async fn call(&self, request: CallRequest) -> Result<Bytes, ChainError> {
        let tx = Self::to_tx(request);
        with_timeout("eth_call", self.read_timeout, async {
            self.provider.call(tx).await.map_err(map_rpc_error)
        })
        .await
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, ChainError> {
        with_timeout("eth_getCode", self.read_timeout, async {
            self.provider.get_code_at(address).await.map_err(map_rpc_error)
        })
        .await
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, ChainError> {
        with_timeout("eth_getTransactionCount", self.read_timeout, async {
            self.provider
                .get_transaction_count(address)
                .await
                .map_err(map_rpc_error)
        })
        .await
    }

    async fn transaction(&self, tx_hash: B256) -> Result<Option<ChainTransaction>, ChainError> {
        let tx = with_timeout("eth_getTransactionByHash", self.read_timeout, async {
            self.provider
                .get_transaction_by_hash(tx_hash)
                .await
                .map_err(map_rpc_error)
        })
        .await?;

        Ok(tx.map(|tx| ChainTransaction {
            from: TransactionResponse::from(&tx),
            to: Transaction::to(&tx),
            input: Transaction::input(&tx).clone(),
            value: Transaction::value(&tx),
        }))
    }

    async fn receipt(&self, tx_hash: B256) -> Result<Option<ChainReceipt>, ChainError> {
        let receipt = with_timeout("eth_getTransactionReceipt", self.read_timeout, async {
            self.provider
                .get_transaction_receipt(tx_hash)
                .await
                .map_err(map_rpc_error)
        })
        .await?;

        Ok(receipt.map(|r| ChainReceipt {
            success: ReceiptResponse::status(&r),
            block_number: ReceiptResponse::block_number(&r),
        }))
    }

    async fn send_transaction(&self, request: CallRequest) -> Result<B256, ChainError> {
        if self.signer.is_none() {
            return Err(ChainError::Transport(
                "client has no signing wallet".to_string(),
            ));
        }
        let tx = Self::to_tx(request);
        // No timeout here: a dropped broadcast could still land on chain.
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(map_rpc_error)?;
        Ok(*pending.tx_hash())
    }

    fn signer_address(&self) -> Option<Address> {
        self.signer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unparseable_url() {
        let err = RpcChainClient::connect("not a url", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ChainError::Transport(_)));
    }

    #[test]
    fn revert_without_data_stays_a_transport_error() {
        let err = TransportError::ErrorResp(alloy::rpc::json_rpc::ErrorPayload {
            code: 3,
            message: "execution reverted: slippage".into(),
            data: None,
        });
        assert!(matches!(map_rpc_error(err), ChainError::Transport(_)));
    }

    #[test]
    fn read_only_client_has_no_signer() {
        let client = RpcChainClient::connect("http://127.0.0.1:8545", Duration::from_secs(1)).unwrap();
        assert_eq!(client.signer_address(), None);
    }

    #[test]
    fn wallet_client_exposes_relayer_address() {
        let wallet = SecureWallet::from_hex(
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )
        .unwrap();
        let client =
            RpcChainClient::connect_with_wallet("http://127.0.0.1:8545", &wallet, Duration::from_secs(1))
                .unwrap();
        assert_eq!(client.signer_address(), Some(wallet.address()));
        assert!(!format!("{:?}", client).contains("ac0974"));
    }
}
