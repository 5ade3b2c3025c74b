//! RPC endpoint resolution
//!
//! The engine talks to exactly one test network. The URL is resolved once at
//! startup, in priority order:
//! 1. `EXECUTION_RPC_URL`
//! 2. `SEPOLIA_RPC_URL`
//! 3. `ALCHEMY_API_KEY` - builds the Sepolia URL
//! 4. `INFURA_API_KEY` - builds the Sepolia URL
//!
//! There is no public fallback. Without a URL execution and sessions report
//! themselves disabled.
//!
//! # Examples
//!
//! ```bash
//! export EXECUTION_RPC_URL="https://eth-sepolia.g.alchemy.com/v2/YOUR_KEY"
//! # or
//! export ALCHEMY_API_KEY="YOUR_KEY"
//! ```

use super::ConfigError;

/// Environment variable names
pub mod env_vars {
    pub const EXECUTION_RPC_URL: &str = "EXECUTION_RPC_URL";
    pub const SEPOLIA_RPC_URL: &str = "SEPOLIA_RPC_URL";
    pub const ALCHEMY_API_KEY: &str = "ALCHEMY_API_KEY";
    pub const INFURA_API_KEY: &str = "INFURA_API_KEY";
}

/// Where the RPC URL came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcSource {
    Explicit,
    Sepolia,
    Alchemy,
    Infura,
}

/// Resolve the RPC URL from an environment lookup
pub fn resolve_rpc_url<F>(lookup: F) -> Option<(String, RpcSource)>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(url) = non_empty(env_vars::EXECUTION_RPC_URL) {
        tracing::debug!("Using EXECUTION_RPC_URL");
        return Some((url, RpcSource::Explicit));
    }
    if let Some(url) = non_empty(env_vars::SEPOLIA_RPC_URL) {
        tracing::debug!("Using SEPOLIA_RPC_URL");
        return Some((url, RpcSource::Sepolia));
    }
    if let Some(key) = non_empty(env_vars::ALCHEMY_API_KEY) {
        tracing::info!("Building RPC URL from ALCHEMY_API_KEY");
        return Some((
            format!("https://eth-sepolia.g.alchemy.com/v2/{}", key),
            RpcSource::Alchemy,
        ));
    }
    if let Some(key) = non_empty(env_vars::INFURA_API_KEY) {
        tracing::info!("Building RPC URL from INFURA_API_KEY");
        return Some((
            format!("https://sepolia.infura.io/v3/{}", key),
            RpcSource::Infura,
        ));
    }

    tracing::warn!("No RPC URL configured; execution and sessions are disabled");
    None
}

/// Check that a configured URL is an http(s) endpoint
pub fn validate_rpc_url(raw: &str) -> Result<url::Url, ConfigError> {
    let url: url::Url = raw.parse().map_err(|e: url::ParseError| ConfigError::Invalid {
        field: "rpc_url",
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::Invalid {
            field: "rpc_url",
            reason: format!("unsupported scheme {}", other),
        }),
    }
}
