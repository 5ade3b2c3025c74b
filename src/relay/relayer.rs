//! Session relayer
//!
//! Order of operations for one relayed plan:
//! 1. encode `executeWithSession` and decode it back
//! 2. re-run the guards on the decoded plan
//! 3. check the on-chain session is active for the plan's user
//! 4. reserve the plan hash in the ledger
//! 5. simulate the exact call from the relayer address
//! 6. broadcast once
//!
//! Any failure before step 6 leaves the chain untouched. The broadcast itself
//! is never retried.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use super::{RelayError, RelayErrorKind, SubmissionLedger};
use crate::chain::{CallRequest, ChainClient, ChainError};
use crate::clock::SharedClock;
use crate::codec;
use crate::config::ConfigError;
use crate::guards::GuardValidator;
use crate::plan::{Plan, PlanHash, PlanSigner};
use crate::session::{ConfigReason, SessionManager, SessionState};
use crate::wallet::TransactionSimulator;
use crate::{Error, Result};

/// Relayed execution request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    pub session_id: B256,
    pub plan: Plan,
}

/// A broadcast transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelaySubmission {
    pub plan_hash: PlanHash,
    pub tx_hash: B256,
}

pub struct Relayer {
    chain: Arc<dyn ChainClient>,
    router: Address,
    relayer: Address,
    guards: Arc<GuardValidator>,
    sessions: Arc<SessionManager>,
    ledger: Arc<SubmissionLedger>,
    simulator: TransactionSimulator,
    clock: SharedClock,
}

impl Relayer {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        router: Address,
        relayer: Address,
        guards: Arc<GuardValidator>,
        sessions: Arc<SessionManager>,
        ledger: Arc<SubmissionLedger>,
        clock: SharedClock,
    ) -> Self {
        Self {
            simulator: TransactionSimulator::new(chain.clone()),
            chain,
            router,
            relayer,
            guards,
            sessions,
            ledger,
            clock,
        }
    }

    pub fn relayer_address(&self) -> Address {
        self.relayer
    }

    /// Validate and broadcast a session plan exactly once
    pub async fn submit(&self, request: &RelayRequest) -> Result<RelaySubmission> {
        let calldata = codec::execute_with_session_calldata(request.session_id, &request.plan);

        // Guards run against what will actually be sent
        let decoded = codec::decode_execution_calldata(&calldata).map_err(ChainError::from)?;
        let session_id = decoded.session_id.unwrap_or(request.session_id);
        let plan = decoded.plan;
        self.guards
            .validate(&plan, U256::ZERO, self.clock.now_unix())?;

        self.ensure_session(session_id, plan.user).await?;

        let plan_hash = PlanSigner::plan_hash(&plan);
        self.ledger.reserve(plan_hash, plan.deadline)?;

        match self.broadcast(plan_hash, calldata).await {
            Ok(tx_hash) => {
                self.ledger.record(plan_hash, tx_hash);
                tracing::info!(
                    plan_hash = %plan_hash,
                    tx_hash = %tx_hash,
                    user = %plan.user,
                    session_id = %session_id,
                    "Relayed plan submitted"
                );
                Ok(RelaySubmission { plan_hash, tx_hash })
            }
            Err(e) => {
                self.ledger.release(&plan_hash);
                tracing::warn!(plan_hash = %plan_hash, code = e.kind.code(), error = %e, "Relay rejected");
                Err(e.into())
            }
        }
    }

    async fn ensure_session(&self, session_id: B256, owner: Address) -> Result<()> {
        let record = match self.sessions.read_record(session_id).await {
            Ok(record) => record,
            Err(ConfigReason::NotConfigured { missing }) => {
                return Err(ConfigError::Missing(missing).into())
            }
            Err(ConfigReason::MissingFields { fields }) => {
                return Err(Error::InvalidArgument(format!(
                    "missing {}",
                    fields.join(", ")
                )))
            }
            Err(ConfigReason::RpcError(e)) => return Err(ChainError::Transport(e).into()),
        };

        match SessionState::of(&record, owner, self.relayer, self.clock.now_unix()) {
            SessionState::Active => Ok(()),
            SessionState::Expired => Err(RelayError::new(
                RelayErrorKind::SessionExpired,
                format!("Session {} has expired", session_id),
            )
            .into()),
            SessionState::Revoked | SessionState::NotCreated => Err(RelayError::new(
                RelayErrorKind::SessionNotActive,
                format!("Session {} is not active for {}", session_id, owner),
            )
            .into()),
        }
    }

    async fn broadcast(&self, plan_hash: PlanHash, calldata: Bytes) -> std::result::Result<B256, RelayError> {
        let request = CallRequest::new(self.router, calldata).from(self.relayer);

        let simulation = self
            .simulator
            .simulate(request.clone())
            .await
            .map_err(|e| RelayError::from_chain(&e))?;
        if !simulation.success {
            let kind = simulation
                .revert_data
                .as_deref()
                .map(|d| RelayErrorKind::from_revert(d))
                .unwrap_or(RelayErrorKind::RelayerFailed);
            let reason = simulation
                .revert_reason
                .unwrap_or_else(|| "execution reverted".to_string());
            tracing::info!(plan_hash = %plan_hash, code = kind.code(), %reason, "Simulation rejected plan");
            return Err(RelayError::new(kind, reason));
        }

        self.chain
            .send_transaction(request)
            .await
            .map_err(|e| RelayError::from_chain(&e))
    }
}
