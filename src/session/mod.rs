//! Session delegation
//!
//! A session lets the relayer execute plans for an owner within a time box,
//! a spend cap and the adapter allowlist. Sessions live on chain; this module
//! only reads them and prepares the owner-signed create/revoke calls.
//!
//! Status reads never fail: a missing prerequisite or an unreachable node is
//! a [`ConfigReason`], which the HTTP layer reports as "disabled".

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use alloy::sol_types::SolValue;
use serde::Serialize;

use crate::chain::{with_timeout, CallRequest, ChainClient, ChainError};
use crate::clock::SharedClock;
use crate::codec::{self, SessionRecord};
use crate::config::{prerequisites, ExecutionConfig};

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotCreated,
    Active,
    Expired,
    Revoked,
}

impl SessionState {
    /// Classify an on-chain record for `owner` and our `executor` at `now`.
    /// A session delegated to another executor does not exist for us.
    pub fn of(record: &SessionRecord, owner: Address, executor: Address, now: u64) -> Self {
        if record.owner == Address::ZERO || record.owner != owner || record.executor != executor {
            SessionState::NotCreated
        } else if !record.active {
            SessionState::Revoked
        } else if record.expires_at <= now {
            SessionState::Expired
        } else {
            SessionState::Active
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub session_id: Option<B256>,
    pub status: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executor: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_spend: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spent: Option<U256>,
}

impl SessionStatus {
    fn not_created(session_id: Option<B256>) -> Self {
        Self {
            session_id,
            status: SessionState::NotCreated,
            executor: None,
            expires_at: None,
            max_spend: None,
            spent: None,
        }
    }

    fn from_record(
        session_id: B256,
        record: &SessionRecord,
        owner: Address,
        executor: Address,
        now: u64,
    ) -> Self {
        let status = SessionState::of(record, owner, executor, now);
        if status == SessionState::NotCreated {
            return Self::not_created(Some(session_id));
        }
        Self {
            session_id: Some(session_id),
            status,
            executor: Some(record.executor),
            expires_at: Some(record.expires_at),
            max_spend: Some(record.max_spend),
            spent: Some(record.spent),
        }
    }
}

/// Why sessions are unavailable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigReason {
    NotConfigured { missing: Vec<&'static str> },
    MissingFields { fields: Vec<&'static str> },
    RpcError(String),
}

impl ConfigReason {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigReason::NotConfigured { .. } => "NOT_CONFIGURED",
            ConfigReason::MissingFields { .. } => "MISSING_FIELDS",
            ConfigReason::RpcError(_) => "RPC_ERROR",
        }
    }

    pub fn message(&self) -> String {
        match self {
            ConfigReason::NotConfigured { missing } => {
                format!("Session execution not configured: {}", missing.join(", "))
            }
            ConfigReason::MissingFields { fields } => {
                format!("Missing required fields: {}", fields.join(", "))
            }
            ConfigReason::RpcError(e) => format!("Session lookup failed: {}", e),
        }
    }

    pub fn missing(&self) -> Vec<&'static str> {
        match self {
            ConfigReason::NotConfigured { missing } => missing.clone(),
            ConfigReason::MissingFields { fields } => fields.clone(),
            ConfigReason::RpcError(_) => Vec::new(),
        }
    }
}

impl From<ChainError> for ConfigReason {
    fn from(err: ChainError) -> Self {
        ConfigReason::RpcError(err.to_string())
    }
}

/// Unsigned transaction the owner's wallet sends
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedCall {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedSession {
    pub session_id: B256,
    pub owner: Address,
    pub executor: Address,
    pub expires_at: u64,
    pub max_spend: U256,
    pub allowed_adapters: Vec<Address>,
    pub call: PreparedCall,
}

/// Derive the id of a session created for `owner` expiring at `expires_at`
pub fn session_id(owner: Address, executor: Address, expires_at: u64) -> B256 {
    keccak256((owner, executor, U256::from(expires_at)).abi_encode())
}

pub struct SessionManager {
    config: Arc<ExecutionConfig>,
    chain: Option<Arc<dyn ChainClient>>,
    relayer: Option<Address>,
    clock: SharedClock,
}

impl SessionManager {
    pub fn new(
        config: Arc<ExecutionConfig>,
        chain: Option<Arc<dyn ChainClient>>,
        relayer: Option<Address>,
        clock: SharedClock,
    ) -> Self {
        Self {
            config,
            chain,
            relayer,
            clock,
        }
    }

    fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.config.session.status_timeout_ms)
    }

    fn static_prerequisites(&self) -> Result<(Arc<dyn ChainClient>, Address, Address), ConfigReason> {
        let mut missing = self.config.session_prerequisites().err().map(|e| e.missing()).unwrap_or_default();
        if self.relayer.is_none() && !missing.contains(&prerequisites::RELAYER_KEY) {
            missing.insert(0, prerequisites::RELAYER_KEY);
        }
        if self.chain.is_none() && !missing.contains(&prerequisites::RPC_URL) {
            missing.push(prerequisites::RPC_URL);
        }
        match (&self.chain, self.config.router_address, self.relayer) {
            (Some(chain), Some(router), Some(relayer)) if missing.is_empty() => {
                Ok((chain.clone(), router, relayer))
            }
            _ => Err(ConfigReason::NotConfigured { missing }),
        }
    }

    /// Read the raw on-chain record
    pub async fn read_record(&self, session_id: B256) -> Result<SessionRecord, ConfigReason> {
        let (chain, router, _) = self.static_prerequisites()?;
        let data = with_timeout(
            "session status",
            self.status_timeout(),
            chain.call(CallRequest::new(router, codec::sessions_calldata(session_id))),
        )
        .await?;
        Ok(codec::decode_session_record(&data).map_err(ChainError::from)?)
    }

    /// Current status of `session_id` for `owner`
    pub async fn status(
        &self,
        owner: Address,
        session_id: Option<B256>,
    ) -> Result<SessionStatus, ConfigReason> {
        let (_, _, executor) = self.static_prerequisites()?;
        let Some(session_id) = session_id else {
            return Ok(SessionStatus::not_created(None));
        };

        let record = match self.read_record(session_id).await {
            Ok(record) => record,
            Err(reason) => {
                tracing::warn!(session_id = %session_id, reason = %reason.message(), "Session status unavailable");
                return Err(reason);
            }
        };
        let status = SessionStatus::from_record(session_id, &record, owner, executor, self.clock.now_unix());
        tracing::debug!(session_id = %session_id, status = ?status.status, "Session status");
        Ok(status)
    }

    /// Build the `createSession` call for the owner to send
    pub async fn prepare_create(&self, owner: Address) -> Result<PreparedSession, ConfigReason> {
        if owner == Address::ZERO {
            return Err(ConfigReason::MissingFields {
                fields: vec!["userAddress"],
            });
        }
        let (chain, router, executor) = self.static_prerequisites()?;

        if let Err(e) = with_timeout("rpc reachability", self.status_timeout(), chain.chain_id()).await {
            tracing::warn!(error = %e, "RPC unreachable; sessions disabled");
            return Err(ConfigReason::NotConfigured {
                missing: vec![prerequisites::RPC_REACHABLE],
            });
        }

        let expires_at = self.clock.now_unix() + self.config.session.duration_secs;
        let max_spend = self.config.session.max_spend_wei;
        let allowed_adapters = self.config.allowed_adapters();
        let session_id = session_id(owner, executor, expires_at);

        let data = codec::create_session_calldata(
            session_id,
            executor,
            expires_at,
            max_spend,
            allowed_adapters.clone(),
        );

        tracing::info!(owner = %owner, session_id = %session_id, expires_at, "Prepared session creation");

        Ok(PreparedSession {
            session_id,
            owner,
            executor,
            expires_at,
            max_spend,
            allowed_adapters,
            call: PreparedCall {
                to: router,
                data,
                value: U256::ZERO,
            },
        })
    }

    /// Build the `revokeSession` call for the owner to send
    pub fn prepare_revoke(&self, session_id: Option<B256>) -> Result<PreparedCall, ConfigReason> {
        let Some(session_id) = session_id else {
            return Err(ConfigReason::MissingFields {
                fields: vec!["sessionId"],
            });
        };
        let router = self.config.router_address.ok_or(ConfigReason::NotConfigured {
            missing: vec![prerequisites::ROUTER],
        })?;
        Ok(PreparedCall {
            to: router,
            data: codec::revoke_session_calldata(session_id),
            value: U256::ZERO,
        })
    }
}
