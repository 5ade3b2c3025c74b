//! HTTP boundary
//!
//! Plain HTTP/1.1 over `tokio::net::TcpListener`, one task per connection.
//! All shared state is built once in [`AppState`] and handed to handlers.

mod http;
mod routes;

pub use http::{read_request, write_response, HttpError, HttpRequest, HttpResponse};
pub use routes::{handle, status_for};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};

use crate::clock::SharedClock;
use crate::execution::{ExecutionService, PreflightReport};
use crate::throttle::{CooldownLimiter, TtlCache};

const READ_TIMEOUT: Duration = Duration::from_secs(10);

pub struct AppState {
    pub service: Arc<ExecutionService>,
    /// Keyed by `(endpoint, address-or-session)`
    pub cooldown: CooldownLimiter<(&'static str, String)>,
    pub preflight: TtlCache<(), PreflightReport>,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(service: Arc<ExecutionService>, clock: SharedClock) -> Self {
        let throttle = service.config().throttle.clone();
        let max_body_bytes = service.config().server.max_body_bytes;
        Self {
            cooldown: CooldownLimiter::new(throttle.session_cooldown_ms, clock.clone()),
            preflight: TtlCache::new(throttle.preflight_cache_ttl_ms, clock),
            max_body_bytes,
            service,
        }
    }
}

/// Bind and serve until the listener fails
pub async fn serve(addr: &str, state: Arc<AppState>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "Execution API listening");
    run(listener, state).await;
    Ok(())
}

/// Serve on a bound listener in the background
pub async fn spawn(addr: &str, state: Arc<AppState>) -> std::io::Result<SocketAddr> {
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    tokio::spawn(run(listener, state));
    Ok(local)
}

async fn run(listener: TcpListener, state: Arc<AppState>) {
    loop {
        match listener.accept().await {
            Ok((socket, peer)) => {
                let state = state.clone();
                tokio::spawn(async move {
                    handle_connection(socket, peer, state).await;
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Accept failed");
                continue;
            }
        }
    }
}

async fn handle_connection(mut socket: TcpStream, peer: SocketAddr, state: Arc<AppState>) {
    let response = match tokio::time::timeout(
        READ_TIMEOUT,
        read_request(&mut socket, state.max_body_bytes),
    )
    .await
    {
        Ok(Ok(request)) => handle(&state, request).await,
        Ok(Err(HttpError::BodyTooLarge { limit })) => routes::error_response(
            413,
            "PAYLOAD_TOO_LARGE",
            &format!("Request body exceeds {} bytes", limit),
        ),
        Ok(Err(e)) => routes::error_response(400, "INVALID_REQUEST", &e.to_string()),
        Err(_) => routes::error_response(408, "REQUEST_TIMEOUT", "Request not received in time"),
    };

    if response.status >= 500 {
        tracing::error!(%peer, status = response.status, "Request failed");
    }
    if let Err(e) = write_response(&mut socket, &response).await {
        tracing::debug!(%peer, error = %e, "Failed to write response");
    }
}
