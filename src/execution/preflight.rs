//! Deployment health checks
//!
//! Every check is a read. A failed read marks the check as failing and adds
//! a note; it never fails the report.

use std::sync::Arc;

use alloy::primitives::Address;
use futures::future::join_all;
use serde::Serialize;

use crate::chain::{CallRequest, ChainClient};
use crate::codec;
use crate::config::ExecutionConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterCheck {
    pub address: Address,
    pub allowed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreflightReport {
    pub ok: bool,
    pub chain_id: u64,
    pub rpc_ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_chain_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub router_address: Option<Address>,
    pub router_deployed: bool,
    pub adapters: Vec<AdapterCheck>,
    pub nonce_ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relayer_address: Option<Address>,
    pub session_enabled: bool,
    pub missing: Vec<&'static str>,
    pub notes: Vec<String>,
}

/// Run all checks against `chain`
pub async fn run(
    config: &ExecutionConfig,
    chain: Option<&Arc<dyn ChainClient>>,
    relayer: Option<Address>,
) -> PreflightReport {
    let mut missing = config
        .execution_prerequisites()
        .err()
        .map(|e| e.missing())
        .unwrap_or_default();
    let session_missing = config
        .session_prerequisites()
        .err()
        .map(|e| e.missing())
        .unwrap_or_default();
    for item in &session_missing {
        if !missing.contains(item) {
            missing.push(*item);
        }
    }

    let mut report = PreflightReport {
        ok: false,
        chain_id: config.chain_id,
        rpc_ok: false,
        rpc_chain_id: None,
        router_address: config.router_address,
        router_deployed: false,
        adapters: config
            .allowed_adapters()
            .into_iter()
            .map(|address| AdapterCheck {
                address,
                allowed: false,
            })
            .collect(),
        nonce_ok: false,
        relayer_address: relayer,
        session_enabled: session_missing.is_empty() && relayer.is_some(),
        missing,
        notes: Vec::new(),
    };

    let Some(chain) = chain else {
        report.notes.push("No RPC client configured".to_string());
        return report;
    };

    match chain.chain_id().await {
        Ok(id) => {
            report.rpc_ok = true;
            report.rpc_chain_id = Some(id);
            if id != config.chain_id {
                report
                    .notes
                    .push(format!("RPC chain id {} does not match configured {}", id, config.chain_id));
            }
        }
        Err(e) => {
            report.notes.push(format!("RPC unreachable: {}", e));
            return report;
        }
    }

    if let Some(router) = config.router_address {
        match chain.code_at(router).await {
            Ok(code) if !code.is_empty() => report.router_deployed = true,
            Ok(_) => report.notes.push(format!("No contract code at router {}", router)),
            Err(e) => report.notes.push(format!("Router code read failed: {}", e)),
        }

        let checks = report.adapters.iter().map(|check| {
            let request = CallRequest::new(router, codec::is_adapter_allowed_calldata(check.address));
            async move {
                chain
                    .call(request)
                    .await
                    .map_err(|e| e.to_string())
                    .and_then(|data| codec::decode_bool(&data).map_err(|e| e.to_string()))
            }
        });
        let results = join_all(checks).await;
        for (check, result) in report.adapters.iter_mut().zip(results) {
            match result {
                Ok(allowed) => check.allowed = allowed,
                Err(e) => tracing::debug!(adapter = %check.address, error = %e, "Adapter allowlist read failed"),
            }
        }
        let rejected: Vec<String> = report
            .adapters
            .iter()
            .filter(|c| !c.allowed)
            .map(|c| c.address.to_string())
            .collect();
        if !rejected.is_empty() {
            report
                .notes
                .push(format!("Adapters not allowlisted on router: {}", rejected.join(", ")));
        }

        let nonce_probe = CallRequest::new(router, codec::nonces_calldata(Address::ZERO));
        match chain.call(nonce_probe).await {
            Ok(data) => match codec::decode_nonce(&data) {
                Ok(_) => report.nonce_ok = true,
                Err(e) => report.notes.push(format!("Nonce read undecodable: {}", e)),
            },
            Err(e) => report.notes.push(format!("Nonce read failed: {}", e)),
        }
    }

    report.ok = report.rpc_ok
        && report.rpc_chain_id == Some(config.chain_id)
        && report.router_deployed
        && !report.adapters.is_empty()
        && report.adapters.iter().all(|c| c.allowed)
        && report.nonce_ok;

    tracing::info!(ok = report.ok, notes = report.notes.len(), "Preflight complete");
    report
}
