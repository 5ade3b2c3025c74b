//! Configuration for the execution engine
//!
//! A single immutable [`ExecutionConfig`] is resolved at process start (JSON
//! file, then environment overrides) and shared by reference everywhere else.
//! Nothing reads the environment per request.

pub mod rpc;

use std::path::Path;
use std::str::FromStr;

use alloy::primitives::{Address, U256};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::plan::ActionType;
use crate::tokens::{addresses, TokenRegistry};

pub use rpc::{resolve_rpc_url, validate_rpc_url, RpcSource};

/// One native-asset unit in wei
pub const ONE_ETH_WEI: u128 = 1_000_000_000_000_000_000;

/// Environment variable names
pub mod env_vars {
    pub const CHAIN_ID: &str = "EXECUTION_CHAIN_ID";
    pub const ROUTER_ADDRESS: &str = "EXECUTION_ROUTER_ADDRESS";
    pub const RELAYER_PRIVATE_KEY: &str = "RELAYER_PRIVATE_KEY";
    pub const SWAP_ADAPTER: &str = "SWAP_ADAPTER_ADDRESS";
    pub const WRAP_ADAPTER: &str = "WRAP_ADAPTER_ADDRESS";
    pub const PULL_ADAPTER: &str = "PULL_ADAPTER_ADDRESS";
    pub const SUPPLY_ADAPTER: &str = "SUPPLY_ADAPTER_ADDRESS";
    pub const PERP_ADAPTER: &str = "PERP_ADAPTER_ADDRESS";
    pub const EVENT_ADAPTER: &str = "EVENT_ADAPTER_ADDRESS";
    pub const WETH_ADDRESS: &str = "WETH_ADDRESS";
    pub const STABLE_ADDRESS: &str = "STABLE_ADDRESS";
    pub const V1_DEMO: &str = "V1_DEMO";
    pub const BIND_ADDR: &str = "EXECUTION_BIND_ADDR";
    pub const AUDIT_LOG_PATH: &str = "EXECUTION_AUDIT_LOG";
}

/// Names reported when a prerequisite is missing
pub mod prerequisites {
    pub const RPC_URL: &str = "EXECUTION_RPC_URL";
    pub const ROUTER: &str = "EXECUTION_ROUTER_ADDRESS";
    pub const RELAYER_KEY: &str = "RELAYER_PRIVATE_KEY";
    pub const ADAPTERS: &str = "ADAPTER_ADDRESSES";
    pub const RPC_REACHABLE: &str = "RPC_REACHABLE";
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("Invalid configuration for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Failed to load configuration: {0}")]
    Load(String),
}

impl ConfigError {
    /// Prerequisites this error reports as missing
    pub fn missing(&self) -> Vec<&'static str> {
        match self {
            ConfigError::Missing(list) => list.clone(),
            _ => Vec::new(),
        }
    }
}

/// Adapter contract addresses, one per allowed operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdapterAddresses {
    #[serde(default)]
    pub swap: Option<Address>,
    #[serde(default)]
    pub wrap: Option<Address>,
    #[serde(default)]
    pub pull: Option<Address>,
    #[serde(default)]
    pub supply: Option<Address>,
    #[serde(default)]
    pub perp: Option<Address>,
    #[serde(default)]
    pub event: Option<Address>,
}

impl AdapterAddresses {
    /// Configured adapters in a stable order, without duplicates
    pub fn allowlist(&self) -> Vec<Address> {
        let mut out: Vec<Address> = Vec::new();
        for addr in [
            self.swap,
            self.wrap,
            self.pull,
            self.supply,
            self.perp,
            self.event,
        ]
        .into_iter()
        .flatten()
        {
            if !out.contains(&addr) {
                out.push(addr);
            }
        }
        out
    }

    /// The one adapter permitted to carry actions of `action_type`
    pub fn for_action(&self, action_type: ActionType) -> Option<Address> {
        match action_type {
            ActionType::Swap => self.swap,
            ActionType::Wrap => self.wrap,
            ActionType::Pull => self.pull,
            ActionType::Supply => self.supply,
            ActionType::Perp => self.perp,
            ActionType::Event => self.event,
        }
    }
}

/// Token allowlist for swap actions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenAddresses {
    pub wrapped_native: Address,
    pub stable: Address,
}

impl Default for TokenAddresses {
    fn default() -> Self {
        Self {
            wrapped_native: addresses::WETH_SEPOLIA,
            stable: addresses::USDC_SEPOLIA,
        }
    }
}

/// Hard safety limits enforced before any signature exists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardLimits {
    pub max_actions: usize,
    /// Furthest allowed deadline, in seconds from now
    pub max_deadline_secs: u64,
    pub max_swap_amount_wei: U256,
    pub max_value_wei: U256,
    /// Symbol used in cap error messages
    pub native_symbol: String,
}

impl Default for GuardLimits {
    fn default() -> Self {
        Self {
            max_actions: 4,
            max_deadline_secs: 600,
            max_swap_amount_wei: U256::from(ONE_ETH_WEI),
            max_value_wei: U256::from(ONE_ETH_WEI),
            native_symbol: "ETH".to_string(),
        }
    }
}

/// Plan construction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSettings {
    /// Deadline assigned to new plans, in seconds from now
    pub deadline_secs: u64,
    pub default_slippage_bps: u32,
    pub max_slippage_bps: u32,
    /// Pool fee tier passed to the swap adapter
    pub swap_fee_tier: u32,
}

impl Default for PlanSettings {
    fn default() -> Self {
        Self {
            deadline_secs: 600,
            default_slippage_bps: 50,
            max_slippage_bps: 500,
            swap_fee_tier: 3000,
        }
    }
}

/// Session delegation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    pub duration_secs: u64,
    pub max_spend_wei: U256,
    /// Timeout for single status reads
    pub status_timeout_ms: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            duration_secs: 7 * 24 * 60 * 60,
            max_spend_wei: U256::from(ONE_ETH_WEI),
            status_timeout_ms: 2_000,
        }
    }
}

/// Receipt polling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptSettings {
    pub poll_interval_ms: u64,
    pub timeout_ms: u64,
    /// Timeout for single RPC reads outside the poll loop
    pub read_timeout_ms: u64,
}

impl Default for ReceiptSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
            timeout_ms: 60_000,
            read_timeout_ms: 3_000,
        }
    }
}

/// Rate limiting and cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleSettings {
    /// Minimum interval between session prepare/status calls per key
    pub session_cooldown_ms: u64,
    pub preflight_cache_ttl_ms: u64,
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self {
            session_cooldown_ms: 1_500,
            preflight_cache_ttl_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub bind_addr: String,
    pub max_body_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3001".to_string(),
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Main configuration
#[derive(Debug, Serialize, Deserialize)]
pub struct ExecutionConfig {
    pub chain_id: u64,
    #[serde(default)]
    pub rpc_url: Option<String>,
    #[serde(default)]
    pub router_address: Option<Address>,
    #[serde(default)]
    pub adapters: AdapterAddresses,
    #[serde(default)]
    pub tokens: TokenAddresses,
    /// Only ever read from the environment
    #[serde(skip)]
    pub relayer_private_key: Option<SecretString>,
    #[serde(default)]
    pub guard: GuardLimits,
    #[serde(default)]
    pub plan: PlanSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub receipt: ReceiptSettings,
    #[serde(default)]
    pub throttle: ThrottleSettings,
    #[serde(default)]
    pub server: ServerSettings,
    /// Demo mode: only session-relayed execution is allowed
    #[serde(default)]
    pub v1_demo: bool,
    #[serde(default)]
    pub audit_log_path: Option<String>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            chain_id: 11_155_111, // Sepolia
            rpc_url: None,
            router_address: None,
            adapters: AdapterAddresses::default(),
            tokens: TokenAddresses::default(),
            relayer_private_key: None,
            guard: GuardLimits::default(),
            plan: PlanSettings::default(),
            session: SessionSettings::default(),
            receipt: ReceiptSettings::default(),
            throttle: ThrottleSettings::default(),
            server: ServerSettings::default(),
            v1_demo: false,
            audit_log_path: Some("execution-audit.jsonl".to_string()),
        }
    }
}

impl ExecutionConfig {
    /// Load from an optional JSON file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
                serde_json::from_str(&content).map_err(|e| ConfigError::Load(e.to_string()))?
            }
            None => Self::default(),
        };
        base.with_env(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an environment lookup
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some((url, source)) = resolve_rpc_url(&lookup) {
            tracing::debug!(?source, "Resolved RPC URL from environment");
            self.rpc_url = Some(url);
        }
        if let Some(url) = &self.rpc_url {
            validate_rpc_url(url)?;
        }
        if let Some(raw) = get(env_vars::CHAIN_ID) {
            self.chain_id = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                field: "chain_id",
                reason: format!("not a number: {}", raw),
            })?;
        }

        let addr = |name: &'static str| -> Result<Option<Address>, ConfigError> {
            get(name)
                .map(|raw| {
                    Address::from_str(raw.trim()).map_err(|e| ConfigError::Invalid {
                        field: name,
                        reason: e.to_string(),
                    })
                })
                .transpose()
        };

        if let Some(a) = addr(env_vars::ROUTER_ADDRESS)? {
            self.router_address = Some(a);
        }
        if let Some(a) = addr(env_vars::SWAP_ADAPTER)? {
            self.adapters.swap = Some(a);
        }
        if let Some(a) = addr(env_vars::WRAP_ADAPTER)? {
            self.adapters.wrap = Some(a);
        }
        if let Some(a) = addr(env_vars::PULL_ADAPTER)? {
            self.adapters.pull = Some(a);
        }
        if let Some(a) = addr(env_vars::SUPPLY_ADAPTER)? {
            self.adapters.supply = Some(a);
        }
        if let Some(a) = addr(env_vars::PERP_ADAPTER)? {
            self.adapters.perp = Some(a);
        }
        if let Some(a) = addr(env_vars::EVENT_ADAPTER)? {
            self.adapters.event = Some(a);
        }
        if let Some(a) = addr(env_vars::WETH_ADDRESS)? {
            self.tokens.wrapped_native = a;
        }
        if let Some(a) = addr(env_vars::STABLE_ADDRESS)? {
            self.tokens.stable = a;
        }
        if let Some(key) = get(env_vars::RELAYER_PRIVATE_KEY) {
            self.relayer_private_key = Some(SecretString::from(key));
        }
        if let Some(raw) = get(env_vars::V1_DEMO) {
            self.v1_demo = matches!(raw.trim(), "1" | "true" | "TRUE" | "yes");
        }
        if let Some(bind) = get(env_vars::BIND_ADDR) {
            self.server.bind_addr = bind;
        }
        if let Some(path) = get(env_vars::AUDIT_LOG_PATH) {
            self.audit_log_path = Some(path);
        }

        self.validate()?;
        Ok(self)
    }

    /// Reject limits the plan builder cannot honor
    fn validate(&self) -> Result<(), ConfigError> {
        if self.plan.max_slippage_bps > 10_000 {
            return Err(ConfigError::Invalid {
                field: "plan.max_slippage_bps",
                reason: format!("{} exceeds 10000 bps", self.plan.max_slippage_bps),
            });
        }
        if self.plan.default_slippage_bps > self.plan.max_slippage_bps {
            return Err(ConfigError::Invalid {
                field: "plan.default_slippage_bps",
                reason: format!(
                    "{} exceeds max_slippage_bps {}",
                    self.plan.default_slippage_bps, self.plan.max_slippage_bps
                ),
            });
        }
        Ok(())
    }

    /// Adapter allowlist enforced by the guards and granted to sessions
    pub fn allowed_adapters(&self) -> Vec<Address> {
        self.adapters.allowlist()
    }

    /// Token allowlist for swap actions
    pub fn allowed_tokens(&self) -> Vec<Address> {
        vec![self.tokens.wrapped_native, self.tokens.stable]
    }

    pub fn token_registry(&self) -> TokenRegistry {
        TokenRegistry::new(self.tokens.wrapped_native, self.tokens.stable)
    }

    /// RPC URL and router address required for any execution
    pub fn execution_prerequisites(&self) -> Result<(String, Address), ConfigError> {
        let mut missing = Vec::new();
        if self.rpc_url.is_none() {
            missing.push(prerequisites::RPC_URL);
        }
        if self.router_address.is_none() {
            missing.push(prerequisites::ROUTER);
        }
        if self.allowed_adapters().is_empty() {
            missing.push(prerequisites::ADAPTERS);
        }
        match (&self.rpc_url, self.router_address) {
            (Some(url), Some(router)) if missing.is_empty() => Ok((url.clone(), router)),
            _ => Err(ConfigError::Missing(missing)),
        }
    }

    /// Static prerequisites for session creation and relaying
    pub fn session_prerequisites(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.relayer_private_key.is_none() {
            missing.push(prerequisites::RELAYER_KEY);
        }
        if self.router_address.is_none() {
            missing.push(prerequisites::ROUTER);
        }
        if self.rpc_url.is_none() {
            missing.push(prerequisites::RPC_URL);
        }
        if self.allowed_adapters().is_empty() {
            missing.push(prerequisites::ADAPTERS);
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Missing(missing))
        }
    }

    /// JSON view safe to print (no secrets)
    pub fn redacted(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let serde_json::Value::Object(ref mut map) = value {
            map.insert(
                "relayer_private_key".to_string(),
                serde_json::Value::String(
                    if self.relayer_private_key.is_some() {
                        "[REDACTED]"
                    } else {
                        "[NOT SET]"
                    }
                    .to_string(),
                ),
            );
        }
        value
    }
}
