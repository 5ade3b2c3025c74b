//! Endpoint dispatch and the error-to-status policy
//!
//! Session endpoints always answer 200: an unavailable feature is reported
//! in the body as `status: "disabled"`. Execution endpoints map error codes
//! to statuses in [`status_for`].

use alloy::primitives::{Address, B256};
use serde::Deserialize;
use serde_json::{json, Value};

use super::http::{HttpRequest, HttpResponse};
use super::AppState;
use crate::execution::{PrepareRequest, SubmitRequest};
use crate::relay::RelayRequest;
use crate::session::ConfigReason;
use crate::throttle::CooldownDecision;
use crate::Error;

/// HTTP status for a wire error code
pub fn status_for(code: &str) -> u16 {
    match code {
        "EXECUTION_DISABLED" | "V1_DEMO_DIRECT_BLOCKED" => 403,
        "DUPLICATE_SUBMISSION" => 409,
        "RELAYER_FAILED" | "RPC_ERROR" => 502,
        "INTERNAL_ERROR" | "WALLET_ERROR" => 500,
        _ => 400,
    }
}

pub fn error_response(status: u16, code: &str, message: &str) -> HttpResponse {
    HttpResponse::new(
        status,
        json!({
            "ok": false,
            "error": message,
            "errorCode": code,
        }),
    )
}

fn from_error(err: &Error) -> HttpResponse {
    let code = err.code();
    let mut response = error_response(status_for(code), code, &err.to_string());
    match err {
        Error::Validation(v) => response.body["details"] = v.details.clone(),
        Error::Config(c) => response.body["missing"] = json!(c.missing()),
        Error::Relay(r) => {
            if let Some(tx) = r.tx_hash {
                response.body["txHash"] = json!(tx);
            }
            response.body["success"] = json!(false);
            response.body["status"] = json!("failed");
            response.body["receiptStatus"] = json!("failed");
        }
        _ => {}
    }
    response
}

fn bad_request(err: impl std::fmt::Display) -> HttpResponse {
    error_response(400, "INVALID_REQUEST", &err.to_string())
}

fn to_body<T: serde::Serialize>(value: &T) -> HttpResponse {
    match serde_json::to_value(value) {
        Ok(body) => HttpResponse::ok(body),
        Err(e) => error_response(500, "INTERNAL_ERROR", &e.to_string()),
    }
}

/// Serialize `value` and mark it with `ok: true`
fn ok_body<T: serde::Serialize>(value: &T) -> HttpResponse {
    let mut response = to_body(value);
    if response.status == 200 {
        if let Value::Object(map) = &mut response.body {
            map.insert("ok".into(), Value::Bool(true));
        }
    }
    response
}

pub async fn handle(state: &AppState, request: HttpRequest) -> HttpResponse {
    tracing::debug!(method = %request.method, path = %request.path, "Request");
    match (request.method.as_str(), request.path.as_str()) {
        ("POST", "/api/execute/prepare") => execute_prepare(state, &request).await,
        ("POST", "/api/execute/relayed") => execute_relayed(state, &request).await,
        ("POST", "/api/execute/submit") => execute_submit(state, &request).await,
        ("GET", "/api/execute/status") => execute_status(state, &request).await,
        ("GET", "/api/execute/preflight") => preflight(state).await,
        ("POST", "/api/session/prepare") => session_prepare(state, &request).await,
        ("GET" | "POST", "/api/session/status") => session_status(state, &request).await,
        ("POST", "/api/session/revoke/prepare") => session_revoke(state, &request).await,
        _ => error_response(404, "NOT_FOUND", &format!("No route for {} {}", request.method, request.path)),
    }
}

async fn execute_prepare(state: &AppState, request: &HttpRequest) -> HttpResponse {
    let params: PrepareRequest = match request.params() {
        Ok(p) => p,
        Err(e) => return bad_request(e),
    };
    match state.service.prepare(&params).await {
        Ok(prepared) => ok_body(&prepared),
        Err(e) => from_error(&e),
    }
}

async fn execute_relayed(state: &AppState, request: &HttpRequest) -> HttpResponse {
    let params: RelayRequest = match request.params() {
        Ok(p) => p,
        Err(e) => return bad_request(e),
    };
    match state.service.relayed(&params).await {
        Ok(result) => to_body(&result),
        Err(e) => from_error(&e),
    }
}

async fn execute_submit(state: &AppState, request: &HttpRequest) -> HttpResponse {
    let params: SubmitRequest = match request.params() {
        Ok(p) => p,
        Err(e) => return bad_request(e),
    };
    match state.service.submit(&params).await {
        Ok(result) => to_body(&result),
        Err(e) => from_error(&e),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TxQuery {
    tx_hash: B256,
}

async fn execute_status(state: &AppState, request: &HttpRequest) -> HttpResponse {
    let params: TxQuery = match request.params() {
        Ok(p) => p,
        Err(e) => return bad_request(e),
    };
    match state.service.status(params.tx_hash).await {
        Ok(status) => ok_body(&status),
        Err(e) => from_error(&e),
    }
}

async fn preflight(state: &AppState) -> HttpResponse {
    if let Some(cached) = state.preflight.get(&()).await {
        return to_body(&cached);
    }
    let report = state.service.preflight().await;
    state.preflight.insert((), report.clone()).await;
    to_body(&report)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionParams {
    #[serde(default)]
    user_address: Option<Address>,
    #[serde(default)]
    session_id: Option<B256>,
}

fn session_disabled(reason: &ConfigReason) -> HttpResponse {
    HttpResponse::ok(json!({
        "ok": true,
        "status": "disabled",
        "session": {
            "enabled": false,
            "reason": reason.code(),
            "message": reason.message(),
            "missing": reason.missing(),
        },
    }))
}

fn session_enabled<T: serde::Serialize>(status: Value, session: &T) -> HttpResponse {
    let mut session = serde_json::to_value(session).unwrap_or_else(|_| json!({}));
    if let Value::Object(map) = &mut session {
        map.insert("enabled".into(), Value::Bool(true));
    }
    HttpResponse::ok(json!({
        "ok": true,
        "status": status,
        "session": session,
    }))
}

/// Parse session params; malformed input is a disabled answer, not a 400
fn session_params(request: &HttpRequest) -> Result<SessionParams, HttpResponse> {
    request.params().map_err(|e| {
        tracing::debug!(error = %e, "Unparseable session params");
        session_disabled(&ConfigReason::MissingFields {
            fields: vec!["userAddress"],
        })
    })
}

async fn throttled(state: &AppState, endpoint: &'static str, key: String) -> Option<HttpResponse> {
    match state.cooldown.check(&(endpoint, key)).await {
        CooldownDecision::Allow => None,
        CooldownDecision::Throttled { retry_after_ms } => Some(HttpResponse::ok(json!({
            "ok": true,
            "throttled": true,
            "retryAfterMs": retry_after_ms,
        }))),
    }
}

async fn session_prepare(state: &AppState, request: &HttpRequest) -> HttpResponse {
    let params = match session_params(request) {
        Ok(p) => p,
        Err(response) => return response,
    };
    let owner = params.user_address.unwrap_or(Address::ZERO);
    if let Some(response) = throttled(state, "session_prepare", owner.to_string()).await {
        return response;
    }
    match state.service.sessions().prepare_create(owner).await {
        Ok(prepared) => session_enabled(json!("ready"), &prepared),
        Err(reason) => session_disabled(&reason),
    }
}

async fn session_status(state: &AppState, request: &HttpRequest) -> HttpResponse {
    let params = match session_params(request) {
        Ok(p) => p,
        Err(response) => return response,
    };
    let Some(owner) = params.user_address else {
        return session_disabled(&ConfigReason::MissingFields {
            fields: vec!["userAddress"],
        });
    };
    let key = params
        .session_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| owner.to_string());
    if let Some(response) = throttled(state, "session_status", key).await {
        return response;
    }
    match state.service.sessions().status(owner, params.session_id).await {
        Ok(status) => session_enabled(json!(status.status), &status),
        Err(reason) => session_disabled(&reason),
    }
}

async fn session_revoke(state: &AppState, request: &HttpRequest) -> HttpResponse {
    let params = match session_params(request) {
        Ok(p) => p,
        Err(response) => return response,
    };
    match state.service.sessions().prepare_revoke(params.session_id) {
        Ok(call) => HttpResponse::ok(json!({
            "ok": true,
            "status": "ready",
            "call": call,
        })),
        Err(reason) => session_disabled(&reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditLog;
    use crate::chain::{ChainClient, Scripted, ScriptedChain};
    use crate::clock::{ManualClock, SharedClock};
    use crate::codec::abi::ExecutionRouter;
    use crate::config::{AdapterAddresses, ExecutionConfig};
    use crate::execution::ExecutionService;
    use crate::portfolio::InMemoryPortfolioStore;
    use alloy::primitives::U256;
    use alloy::sol_types::{SolCall, SolValue};
    use std::collections::HashMap;
    use std::sync::Arc;

    const NOW: u64 = 1_700_000_000;

    fn config() -> ExecutionConfig {
        let mut config = ExecutionConfig::default();
        config.rpc_url = Some("http://127.0.0.1:8545".into());
        config.router_address = Some(Address::repeat_byte(0x44));
        config.relayer_private_key = Some("0x01".to_string().into());
        config.adapters = AdapterAddresses {
            swap: Some(Address::repeat_byte(0x22)),
            wrap: Some(Address::repeat_byte(0x33)),
            pull: Some(Address::repeat_byte(0x55)),
            ..Default::default()
        };
        config
    }

    fn state_with(config: ExecutionConfig, chain: Option<Arc<ScriptedChain>>) -> (AppState, ManualClock) {
        let clock = ManualClock::at_unix(NOW);
        let shared: SharedClock = Arc::new(clock.clone());
        let service = ExecutionService::new(
            Arc::new(config),
            chain.map(|c| c as Arc<dyn ChainClient>),
            Arc::new(InMemoryPortfolioStore::new()),
            AuditLog::disabled(),
            shared.clone(),
        );
        (AppState::new(Arc::new(service), shared), clock)
    }

    fn relayer_chain() -> Arc<ScriptedChain> {
        let chain = Arc::new(ScriptedChain::new(11_155_111).with_signer(Address::repeat_byte(0x99)));
        chain.on_call(
            ExecutionRouter::noncesCall::SELECTOR,
            Scripted::Return(U256::ZERO.abi_encode().into()),
        );
        chain
    }

    fn post(path: &str, body: Value) -> HttpRequest {
        HttpRequest {
            method: "POST".into(),
            path: path.into(),
            query: HashMap::new(),
            body: serde_json::to_vec(&body).unwrap(),
        }
    }

    fn get(path: &str, query: &[(&str, &str)]) -> HttpRequest {
        HttpRequest {
            method: "GET".into(),
            path: path.into(),
            query: query.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            body: Vec::new(),
        }
    }

    #[test]
    fn error_codes_map_to_statuses() {
        assert_eq!(status_for("VALIDATION_FAILED"), 400);
        assert_eq!(status_for("EXECUTION_DISABLED"), 403);
        assert_eq!(status_for("V1_DEMO_DIRECT_BLOCKED"), 403);
        assert_eq!(status_for("DUPLICATE_SUBMISSION"), 409);
        assert_eq!(status_for("SESSION_EXPIRED"), 400);
        assert_eq!(status_for("SLIPPAGE_FAILURE"), 400);
        assert_eq!(status_for("RELAYER_FAILED"), 502);
        assert_eq!(status_for("INTERNAL_ERROR"), 500);
    }

    #[tokio::test]
    async fn session_prepare_is_200_when_unconfigured() {
        let (state, _) = state_with(ExecutionConfig::default(), None);
        let response = handle(
            &state,
            post("/api/session/prepare", json!({"userAddress": Address::repeat_byte(0x11)})),
        )
        .await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body["ok"], true);
        assert_eq!(response.body["status"], "disabled");
        assert_eq!(response.body["session"]["enabled"], false);
        assert_eq!(response.body["session"]["reason"], "NOT_CONFIGURED");
    }

    #[tokio::test]
    async fn session_status_is_throttled_per_session() {
        let chain = relayer_chain();
        chain.on_call(
            ExecutionRouter::sessionsCall::SELECTOR,
            Scripted::Return(
                (Address::ZERO, Address::ZERO, 0u64, U256::ZERO, U256::ZERO, false)
                    .abi_encode_params()
                    .into(),
            ),
        );
        let (state, clock) = state_with(config(), Some(chain));
        let query = [
            ("userAddress", "0x1111111111111111111111111111111111111111"),
            ("sessionId", "0x5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e"),
        ];

        let first = handle(&state, get("/api/session/status", &query)).await;
        assert_eq!(first.status, 200);
        assert_eq!(first.body["status"], "not_created");
        assert_eq!(first.body["session"]["enabled"], true);

        let second = handle(&state, get("/api/session/status", &query)).await;
        assert_eq!(second.status, 200);
        assert_eq!(second.body["throttled"], true);
        assert_eq!(second.body["retryAfterMs"], 1500);

        clock.advance_millis(1_500);
        let third = handle(&state, get("/api/session/status", &query)).await;
        assert!(third.body.get("throttled").is_none());
    }

    #[tokio::test]
    async fn guard_failure_is_400_with_details() {
        let (state, _) = state_with(config(), Some(relayer_chain()));
        let response = handle(
            &state,
            post(
                "/api/execute/prepare",
                json!({
                    "userAddress": Address::repeat_byte(0x11),
                    "mode": "session",
                    "executionRequest": {"kind": "swap", "tokenIn": "ETH", "tokenOut": "USDC", "amountIn": "2"},
                }),
            ),
        )
        .await;
        assert_eq!(response.status, 400);
        assert_eq!(response.body["errorCode"], "VALIDATION_FAILED");
        assert_eq!(response.body["details"]["guard"], "swap_amount_cap");
    }

    #[tokio::test]
    async fn prepare_without_router_is_403() {
        let mut config = config();
        config.router_address = None;
        let (state, _) = state_with(config, Some(relayer_chain()));
        let response = handle(
            &state,
            post(
                "/api/execute/prepare",
                json!({
                    "userAddress": Address::repeat_byte(0x11),
                    "executionRequest": {"kind": "swap", "tokenIn": "ETH", "tokenOut": "USDC", "amountIn": "0.1"},
                }),
            ),
        )
        .await;
        assert_eq!(response.status, 403);
        assert_eq!(response.body["errorCode"], "EXECUTION_DISABLED");
        assert_eq!(response.body["missing"], json!(["EXECUTION_ROUTER_ADDRESS"]));
    }

    #[tokio::test]
    async fn malformed_body_is_400_and_unknown_route_404() {
        let (state, _) = state_with(config(), Some(relayer_chain()));
        let mut request = post("/api/execute/relayed", json!({}));
        request.body = b"{not json".to_vec();
        assert_eq!(handle(&state, request).await.status, 400);

        let missing = handle(&state, get("/api/nope", &[])).await;
        assert_eq!(missing.status, 404);
    }

    #[tokio::test]
    async fn preflight_is_cached() {
        let chain = relayer_chain();
        let (state, clock) = state_with(config(), Some(chain.clone()));

        let first = handle(&state, get("/api/execute/preflight", &[])).await;
        assert_eq!(first.status, 200);
        let calls = chain.calls().len();

        handle(&state, get("/api/execute/preflight", &[])).await;
        assert_eq!(chain.calls().len(), calls);

        clock.advance_millis(5_000);
        handle(&state, get("/api/execute/preflight", &[])).await;
        assert!(chain.calls().len() > calls);
    }
}
