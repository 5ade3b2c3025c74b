//! Execution service
//!
//! Wires the pipeline together:
//! `ExecutionRequest -> PlanBuilder -> GuardValidator -> PlanSigner ->
//! (session check) -> Relayer -> ReceiptConfirmer -> PortfolioDelta`.
//! Each stage is a hard gate. Portfolio effects are applied only after a
//! confirmed receipt.

pub mod preflight;
mod result;

pub use preflight::{AdapterCheck, PreflightReport};
pub use result::{ExecutionResult, ResultStatus};

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::audit::{AuditKind, AuditLog};
use crate::chain::{ChainClient, RpcChainClient};
use crate::clock::SharedClock;
use crate::codec;
use crate::config::{prerequisites, ConfigError, ExecutionConfig};
use crate::guards::GuardValidator;
use crate::plan::{
    ExecutionMode, ExecutionRequest, Plan, PlanBuilder, PlanSigner, PreparedPlan,
    RouterNonceSource, SignedPlan, StaticSwapVenue,
};
use crate::portfolio::{PortfolioStore, PortfolioSnapshot, ReceiptEffect};
use crate::relay::{
    ReceiptConfirmer, ReceiptOutcome, ReceiptStatus, RelayRequest, Relayer, SubmissionLedger,
};
use crate::session::{PreparedCall, SessionManager};
use crate::tokens::TokenRegistry;
use crate::wallet::SecureWallet;
use crate::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareRequest {
    pub user_address: Address,
    #[serde(default)]
    pub mode: ExecutionMode,
    pub execution_request: ExecutionRequest,
}

/// Plan ready for signature or relay
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedExecution {
    #[serde(flatten)]
    pub signed: SignedPlan,
    #[serde(flatten)]
    pub prepared: PreparedPlan,
    /// Direct mode only: the `executeBySender` call the wallet sends
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call: Option<PreparedCall>,
}

/// A transaction the user's wallet sent itself
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub tx_hash: B256,
    pub user_address: Address,
    /// Plan the transaction executed, used to derive portfolio effects
    #[serde(default)]
    pub plan: Option<Plan>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStatus {
    pub tx_hash: B256,
    pub receipt_status: ReceiptStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Components that need a reachable router
struct Pipeline {
    router: Address,
    builder: PlanBuilder,
    signer: PlanSigner,
    confirmer: ReceiptConfirmer,
    relayer: Option<Relayer>,
}

pub struct ExecutionService {
    config: Arc<ExecutionConfig>,
    chain: Option<Arc<dyn ChainClient>>,
    guards: Arc<GuardValidator>,
    sessions: Arc<SessionManager>,
    pipeline: Option<Pipeline>,
    portfolio: Arc<dyn PortfolioStore>,
    registry: TokenRegistry,
    audit: AuditLog,
    clock: SharedClock,
}

impl ExecutionService {
    pub fn new(
        config: Arc<ExecutionConfig>,
        chain: Option<Arc<dyn ChainClient>>,
        portfolio: Arc<dyn PortfolioStore>,
        audit: AuditLog,
        clock: SharedClock,
    ) -> Self {
        let guards = Arc::new(GuardValidator::from_config(&config));
        let relayer_address = chain.as_ref().and_then(|c| c.signer_address());
        let sessions = Arc::new(SessionManager::new(
            config.clone(),
            chain.clone(),
            relayer_address,
            clock.clone(),
        ));

        let pipeline = match (&chain, config.router_address) {
            (Some(chain), Some(router)) => {
                let venue = Arc::new(StaticSwapVenue::new(config.adapters.swap, config.plan.swap_fee_tier));
                let nonces = Arc::new(RouterNonceSource::new(chain.clone(), router));
                let relayer = relayer_address.map(|address| {
                    Relayer::new(
                        chain.clone(),
                        router,
                        address,
                        guards.clone(),
                        sessions.clone(),
                        Arc::new(SubmissionLedger::new(clock.clone())),
                        clock.clone(),
                    )
                });
                Some(Pipeline {
                    router,
                    builder: PlanBuilder::new(&config, router, venue, nonces),
                    signer: PlanSigner::new(config.chain_id, router),
                    confirmer: ReceiptConfirmer::new(chain.clone(), &config.receipt),
                    relayer,
                })
            }
            _ => None,
        };

        Self {
            registry: config.token_registry(),
            config,
            chain,
            guards,
            sessions,
            pipeline,
            portfolio,
            audit,
            clock,
        }
    }

    /// Connect to the configured RPC, signing with the relayer key when set
    pub fn from_config(
        config: Arc<ExecutionConfig>,
        portfolio: Arc<dyn PortfolioStore>,
        clock: SharedClock,
    ) -> Result<Self> {
        let read_timeout = Duration::from_millis(config.receipt.read_timeout_ms);
        let chain: Option<Arc<dyn ChainClient>> = match (&config.rpc_url, &config.relayer_private_key) {
            (Some(url), Some(key)) => {
                let wallet = SecureWallet::from_secret(key)?;
                tracing::info!(relayer = %wallet.address(), "Relayer wallet loaded");
                Some(Arc::new(RpcChainClient::connect_with_wallet(url, &wallet, read_timeout)?))
            }
            (Some(url), None) => Some(Arc::new(RpcChainClient::connect(url, read_timeout)?)),
            (None, _) => {
                tracing::warn!("No RPC URL configured; execution is disabled");
                None
            }
        };

        let audit = match &config.audit_log_path {
            Some(path) => AuditLog::new(path),
            None => AuditLog::disabled(),
        };
        Ok(Self::new(config, chain, portfolio, audit, clock))
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn relayer_address(&self) -> Option<Address> {
        self.chain.as_ref().and_then(|c| c.signer_address())
    }

    fn pipeline(&self) -> Result<&Pipeline> {
        self.config.execution_prerequisites()?;
        self.pipeline
            .as_ref()
            .ok_or_else(|| ConfigError::Missing(vec![prerequisites::RPC_URL]).into())
    }

    /// Build, guard-check and hash a plan
    pub async fn prepare(&self, request: &PrepareRequest) -> Result<PreparedExecution> {
        let result = self.prepare_inner(request).await;
        match &result {
            Ok(prepared) => {
                self.audit
                    .success(
                        AuditKind::Prepare,
                        json!({
                            "user": request.user_address,
                            "mode": request.mode,
                            "kind": request.execution_request.kind(),
                            "planHash": prepared.signed.plan_hash,
                        }),
                    )
                    .await
            }
            Err(e) => {
                self.audit
                    .failure(
                        AuditKind::Prepare,
                        e.code(),
                        json!({
                            "user": request.user_address,
                            "mode": request.mode,
                            "error": e.to_string(),
                        }),
                    )
                    .await
            }
        }
        result
    }

    async fn prepare_inner(&self, request: &PrepareRequest) -> Result<PreparedExecution> {
        if request.mode == ExecutionMode::Direct && self.config.v1_demo {
            return Err(Error::DirectModeBlocked);
        }
        let pipeline = self.pipeline()?;
        let now = self.clock.now_unix();

        let prepared = pipeline
            .builder
            .build(&request.execution_request, request.user_address, request.mode, now)
            .await?;
        self.guards.validate(&prepared.plan, prepared.value, now)?;

        let signed = pipeline.signer.sign(&prepared.plan);
        let call = (prepared.mode == ExecutionMode::Direct).then(|| PreparedCall {
            to: pipeline.router,
            data: codec::execute_by_sender_calldata(&prepared.plan),
            value: prepared.value,
        });

        tracing::info!(
            plan_hash = %signed.plan_hash,
            user = %request.user_address,
            mode = ?prepared.mode,
            actions = prepared.plan.actions.len(),
            "Prepared execution plan"
        );
        Ok(PreparedExecution {
            signed,
            prepared,
            call,
        })
    }

    /// Relay a session plan and wait for its receipt
    pub async fn relayed(&self, request: &RelayRequest) -> Result<ExecutionResult> {
        let user = request.plan.user;
        let outcome = self.relayed_inner(request).await;
        match &outcome {
            Ok(result) => {
                self.audit
                    .success(
                        AuditKind::Relay,
                        json!({
                            "user": user,
                            "sessionId": request.session_id,
                            "txHash": result.tx_hash,
                            "receiptStatus": result.receipt_status,
                        }),
                    )
                    .await
            }
            Err(e) => {
                self.audit
                    .failure(
                        AuditKind::Relay,
                        e.code(),
                        json!({
                            "user": user,
                            "sessionId": request.session_id,
                            "error": e.to_string(),
                        }),
                    )
                    .await
            }
        }
        outcome
    }

    async fn relayed_inner(&self, request: &RelayRequest) -> Result<ExecutionResult> {
        let pipeline = self.pipeline()?;
        let relayer = pipeline
            .relayer
            .as_ref()
            .ok_or_else(|| ConfigError::Missing(vec![prerequisites::RELAYER_KEY]))?;

        let user = request.plan.user;
        let before = self.portfolio.snapshot(user).await;
        let submission = relayer.submit(request).await?;
        let outcome = pipeline.confirmer.confirm(submission.tx_hash).await;
        Ok(self
            .settle(user, Some(&request.plan), submission.tx_hash, outcome, before)
            .await)
    }

    /// Follow a transaction the user's wallet sent directly
    pub async fn submit(&self, request: &SubmitRequest) -> Result<ExecutionResult> {
        let result = self.submit_inner(request).await;
        let details = json!({
            "user": request.user_address,
            "txHash": request.tx_hash,
        });
        match &result {
            Ok(_) => self.audit.success(AuditKind::Submit, details).await,
            Err(e) => self.audit.failure(AuditKind::Submit, e.code(), details).await,
        }
        result
    }

    async fn submit_inner(&self, request: &SubmitRequest) -> Result<ExecutionResult> {
        let pipeline = self.pipeline()?;
        if let Some(plan) = &request.plan {
            if plan.user != request.user_address {
                return Err(Error::InvalidArgument(format!(
                    "plan user {} does not match {}",
                    plan.user, request.user_address
                )));
            }
        }

        let user = request.user_address;
        let before = self.portfolio.snapshot(user).await;
        let outcome = pipeline.confirmer.confirm(request.tx_hash).await;
        let executed = if outcome.is_confirmed() {
            self.executed_plan(pipeline.router, user, request.tx_hash, request.plan.as_ref())
                .await
        } else {
            None
        };
        Ok(self
            .settle(user, executed.as_ref(), request.tx_hash, outcome, before)
            .await)
    }

    /// The plan a mined transaction actually executed for `user`, read back
    /// from its calldata. `None` when the transaction is not a router
    /// execution sent by `user` (or by our relayer under a session), or when
    /// it differs from the plan the caller claims.
    async fn executed_plan(
        &self,
        router: Address,
        user: Address,
        tx_hash: B256,
        claimed: Option<&Plan>,
    ) -> Option<Plan> {
        let chain = self.chain.as_ref()?;
        let tx = match chain.transaction(tx_hash).await {
            Ok(Some(tx)) => tx,
            Ok(None) => {
                tracing::warn!(tx_hash = %tx_hash, "Confirmed transaction not found");
                return None;
            }
            Err(e) => {
                tracing::warn!(tx_hash = %tx_hash, error = %e, "Transaction read failed");
                return None;
            }
        };

        if tx.to != Some(router) {
            tracing::warn!(tx_hash = %tx_hash, to = ?tx.to, "Transaction is not a router call");
            return None;
        }
        let decoded = match codec::decode_execution_calldata(&tx.input) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!(tx_hash = %tx_hash, error = %e, "Transaction is not a plan execution");
                return None;
            }
        };

        let sender_ok = match decoded.session_id {
            None => tx.from == user,
            Some(_) => Some(tx.from) == self.relayer_address(),
        };
        if !sender_ok || decoded.plan.user != user {
            tracing::warn!(tx_hash = %tx_hash, from = %tx.from, user = %user, "Transaction was not executed for this user");
            return None;
        }
        if claimed.is_some_and(|plan| *plan != decoded.plan) {
            tracing::warn!(tx_hash = %tx_hash, "Submitted plan does not match the executed calldata");
            return None;
        }
        Some(decoded.plan)
    }

    /// Apply the effects of `plan` once `outcome` is confirmed. Without a
    /// plan nothing is applied and the delta is zero.
    async fn settle(
        &self,
        user: Address,
        plan: Option<&Plan>,
        tx_hash: B256,
        outcome: ReceiptOutcome,
        before: PortfolioSnapshot,
    ) -> ExecutionResult {
        if !outcome.is_confirmed() {
            tracing::warn!(tx_hash = %tx_hash, status = ?outcome.status(), "Transaction not confirmed");
            return ExecutionResult::unsettled(tx_hash, outcome, before);
        }

        if let Some(plan) = plan {
            let effects = ReceiptEffect::from_plan(plan, &self.registry);
            self.portfolio.apply_confirmed(user, tx_hash, &effects).await;
        }
        let after = self.portfolio.snapshot(user).await;
        tracing::info!(tx_hash = %tx_hash, block_number = ?outcome.block_number(), "Transaction confirmed");
        ExecutionResult::confirmed(tx_hash, outcome.block_number(), &before, after)
    }

    /// One receipt read. A failed read reports "pending".
    pub async fn status(&self, tx_hash: B256) -> Result<TransactionStatus> {
        let pipeline = self.pipeline()?;
        let status = match pipeline.confirmer.check(tx_hash).await {
            Ok(Some(outcome)) => TransactionStatus {
                tx_hash,
                receipt_status: outcome.status(),
                block_number: outcome.block_number(),
                error: None,
            },
            Ok(None) => TransactionStatus {
                tx_hash,
                receipt_status: ReceiptStatus::Pending,
                block_number: None,
                error: None,
            },
            Err(e) => {
                tracing::debug!(tx_hash = %tx_hash, error = %e, "Receipt read failed");
                TransactionStatus {
                    tx_hash,
                    receipt_status: ReceiptStatus::Pending,
                    block_number: None,
                    error: Some(e.to_string()),
                }
            }
        };
        Ok(status)
    }

    pub async fn preflight(&self) -> PreflightReport {
        preflight::run(&self.config, self.chain.as_ref(), self.relayer_address()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ReceiptPoll, Scripted, ScriptedChain};
    use crate::clock::ManualClock;
    use crate::codec::abi::ExecutionRouter;
    use crate::config::AdapterAddresses;
    use crate::portfolio::InMemoryPortfolioStore;
    use alloy::primitives::U256;
    use alloy::sol_types::{SolCall, SolValue};

    const NOW: u64 = 1_700_000_000;

    fn user() -> Address {
        Address::repeat_byte(0x11)
    }

    fn config(v1_demo: bool) -> ExecutionConfig {
        let mut config = ExecutionConfig::default();
        config.rpc_url = Some("http://127.0.0.1:8545".into());
        config.router_address = Some(Address::repeat_byte(0x44));
        config.adapters = AdapterAddresses {
            swap: Some(Address::repeat_byte(0x22)),
            wrap: Some(Address::repeat_byte(0x33)),
            pull: Some(Address::repeat_byte(0x55)),
            ..Default::default()
        };
        config.v1_demo = v1_demo;
        config
    }

    fn service(config: ExecutionConfig, chain: Arc<ScriptedChain>) -> ExecutionService {
        chain.on_call(
            ExecutionRouter::noncesCall::SELECTOR,
            Scripted::Return(U256::from(4u64).abi_encode().into()),
        );
        ExecutionService::new(
            Arc::new(config),
            Some(chain),
            Arc::new(InMemoryPortfolioStore::new()),
            AuditLog::disabled(),
            Arc::new(ManualClock::at_unix(NOW)),
        )
    }

    fn swap_request(mode: ExecutionMode, amount: &str) -> PrepareRequest {
        PrepareRequest {
            user_address: user(),
            mode,
            execution_request: ExecutionRequest::Swap {
                token_in: "ETH".into(),
                token_out: "USDC".into(),
                amount_in: Some(amount.into()),
                slippage_bps: None,
            },
        }
    }

    #[tokio::test]
    async fn direct_prepare_returns_sender_call() {
        let service = service(config(false), Arc::new(ScriptedChain::new(11_155_111)));
        let prepared = service
            .prepare(&swap_request(ExecutionMode::Direct, "0.1"))
            .await
            .unwrap();

        assert_eq!(prepared.prepared.plan.nonce, U256::from(4u64));
        assert_eq!(prepared.prepared.plan.deadline, NOW + 600);
        assert_eq!(prepared.signed.plan_hash, PlanSigner::plan_hash(&prepared.prepared.plan));
        let call = prepared.call.unwrap();
        assert_eq!(call.value, U256::from(100_000_000_000_000_000u64));
        let decoded = ExecutionRouter::executeBySenderCall::abi_decode(&call.data).unwrap();
        assert_eq!(decoded.plan.actions.len(), 2);
    }

    #[tokio::test]
    async fn v1_demo_blocks_direct_mode() {
        let service = service(config(true), Arc::new(ScriptedChain::new(11_155_111)));
        let err = service
            .prepare(&swap_request(ExecutionMode::Direct, "0.1"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "V1_DEMO_DIRECT_BLOCKED");

        let session = service
            .prepare(&swap_request(ExecutionMode::Session, "0.1"))
            .await
            .unwrap();
        assert!(session.call.is_none());
    }

    #[tokio::test]
    async fn oversized_swap_fails_guards() {
        let service = service(config(false), Arc::new(ScriptedChain::new(11_155_111)));
        let err = service
            .prepare(&swap_request(ExecutionMode::Session, "2"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_FAILED");
        assert_eq!(err.to_string(), "Swap amountIn exceeds maximum (1 ETH).");
    }

    #[tokio::test]
    async fn missing_router_disables_execution() {
        let mut config = config(false);
        config.router_address = None;
        let service = service(config, Arc::new(ScriptedChain::new(11_155_111)));
        let err = service
            .prepare(&swap_request(ExecutionMode::Session, "0.1"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "EXECUTION_DISABLED");
    }

    #[tokio::test]
    async fn relay_without_relayer_key_is_disabled() {
        let service = service(config(false), Arc::new(ScriptedChain::new(11_155_111)));
        let plan = Plan {
            user: user(),
            nonce: U256::ZERO,
            deadline: NOW + 300,
            actions: Vec::new(),
        };
        let err = service
            .relayed(&RelayRequest {
                session_id: B256::ZERO,
                plan,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "EXECUTION_DISABLED");
    }

    #[tokio::test(start_paused = true)]
    async fn reverted_submit_leaves_portfolio_untouched() {
        let chain = Arc::new(ScriptedChain::new(11_155_111));
        chain.set_receipt_script(vec![ReceiptPoll::Mined(crate::chain::ChainReceipt {
            success: false,
            block_number: Some(12),
        })]);
        let service = service(config(false), chain.clone());

        let prepared = service
            .prepare(&swap_request(ExecutionMode::Direct, "0.1"))
            .await
            .unwrap();
        let tx_hash = chain
            .send_transaction(crate::chain::CallRequest::new(
                Address::repeat_byte(0x44),
                prepared.call.clone().unwrap().data,
            ))
            .await
            .unwrap();

        let result = service
            .submit(&SubmitRequest {
                tx_hash,
                user_address: user(),
                plan: Some(prepared.prepared.plan.clone()),
            })
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.receipt_status, ReceiptStatus::Reverted);
        assert_eq!(result.block_number, Some(12));
        assert!(result.portfolio_delta.unwrap().is_zero());
    }

    fn mined(block: u64) -> Vec<ReceiptPoll> {
        vec![ReceiptPoll::Mined(crate::chain::ChainReceipt {
            success: true,
            block_number: Some(block),
        })]
    }

    async fn send_from_user(chain: &ScriptedChain, to: Address, data: alloy::primitives::Bytes) -> B256 {
        chain
            .send_transaction(crate::chain::CallRequest::new(to, data).from(user()))
            .await
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn confirmed_direct_submit_applies_executed_plan_once() {
        let chain = Arc::new(ScriptedChain::new(11_155_111));
        chain.set_receipt_script(mined(40));
        let service = service(config(false), chain.clone());

        let prepared = service
            .prepare(&swap_request(ExecutionMode::Direct, "0.1"))
            .await
            .unwrap();
        let tx_hash = send_from_user(&chain, Address::repeat_byte(0x44), prepared.call.unwrap().data).await;
        let request = SubmitRequest {
            tx_hash,
            user_address: user(),
            plan: None,
        };

        let first = service.submit(&request).await.unwrap();
        assert!(first.success);
        assert_eq!(first.block_number, Some(40));
        let delta = first.portfolio_delta.unwrap();
        assert!(delta
            .balance_deltas
            .iter()
            .any(|d| d.symbol == "USDC" && d.delta_usd > 0.0));

        let again = service.submit(&request).await.unwrap();
        assert!(again.success);
        assert!(again.portfolio_delta.unwrap().is_zero());
        assert_eq!(again.portfolio, first.portfolio);
    }

    #[tokio::test(start_paused = true)]
    async fn unrelated_transaction_cannot_credit_a_claimed_plan() {
        let chain = Arc::new(ScriptedChain::new(11_155_111));
        chain.set_receipt_script(mined(41));
        let service = service(config(false), chain.clone());
        let tx_hash = send_from_user(
            &chain,
            Address::repeat_byte(0x01),
            alloy::primitives::Bytes::from(vec![0xde, 0xad]),
        )
        .await;

        let forged = Plan {
            user: user(),
            nonce: U256::ZERO,
            deadline: NOW + 300,
            actions: vec![codec::ActionPayload::Swap(codec::SwapParams {
                tokenIn: Address::repeat_byte(0xcc),
                tokenOut: service.registry.stable().address,
                fee: alloy::primitives::aliases::U24::from(3000u32),
                amountIn: U256::from(1u64),
                amountOutMin: U256::from(1_000_000_000_000u64),
                recipient: user(),
            })
            .into_action(Address::repeat_byte(0x22))],
        };
        let result = service
            .submit(&SubmitRequest {
                tx_hash,
                user_address: user(),
                plan: Some(forged),
            })
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.portfolio_delta.unwrap().is_zero());
        assert_eq!(result.portfolio.account_value_usd, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn claimed_plan_must_match_executed_calldata() {
        let chain = Arc::new(ScriptedChain::new(11_155_111));
        chain.set_receipt_script(mined(42));
        let service = service(config(false), chain.clone());

        let prepared = service
            .prepare(&swap_request(ExecutionMode::Direct, "0.1"))
            .await
            .unwrap();
        let tx_hash = send_from_user(&chain, Address::repeat_byte(0x44), prepared.call.unwrap().data).await;

        let mut altered = prepared.prepared.plan.clone();
        altered.deadline += 1;
        let result = service
            .submit(&SubmitRequest {
                tx_hash,
                user_address: user(),
                plan: Some(altered),
            })
            .await
            .unwrap();
        assert!(result.portfolio_delta.unwrap().is_zero());
    }

    #[tokio::test(start_paused = true)]
    async fn router_call_from_another_sender_applies_nothing() {
        let chain = Arc::new(ScriptedChain::new(11_155_111));
        chain.set_receipt_script(mined(43));
        let service = service(config(false), chain.clone());

        let prepared = service
            .prepare(&swap_request(ExecutionMode::Direct, "0.1"))
            .await
            .unwrap();
        let tx_hash = chain
            .send_transaction(
                crate::chain::CallRequest::new(Address::repeat_byte(0x44), prepared.call.unwrap().data)
                    .from(Address::repeat_byte(0x77)),
            )
            .await
            .unwrap();

        let result = service
            .submit(&SubmitRequest {
                tx_hash,
                user_address: user(),
                plan: None,
            })
            .await
            .unwrap();
        assert!(result.portfolio_delta.unwrap().is_zero());
    }

    #[tokio::test]
    async fn status_of_unknown_hash_is_pending() {
        let service = service(config(false), Arc::new(ScriptedChain::new(11_155_111)));
        let status = service.status(B256::repeat_byte(9)).await.unwrap();
        assert_eq!(status.receipt_status, ReceiptStatus::Pending);
        assert!(status.error.is_none());
    }
}
