//! Execution audit trail
//!
//! One JSON line per prepare, relay and submit outcome. Write failures are
//! logged and never fail the request.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    Prepare,
    Relay,
    Submit,
}

#[derive(Debug, Serialize)]
struct AuditEntry<'a> {
    id: String,
    timestamp: DateTime<Utc>,
    kind: AuditKind,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<&'a str>,
    details: &'a Value,
}

struct AuditWriter {
    path: PathBuf,
}

impl AuditWriter {
    fn write(&self, entry: &AuditEntry<'_>) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}

/// Append-only JSONL audit log
#[derive(Clone)]
pub struct AuditLog {
    writer: Option<Arc<Mutex<AuditWriter>>>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            writer: Some(Arc::new(Mutex::new(AuditWriter { path: path.into() }))),
        }
    }

    /// Audit log that drops every entry
    pub fn disabled() -> Self {
        Self { writer: None }
    }

    pub async fn success(&self, kind: AuditKind, details: Value) {
        self.record(kind, "success", None, &details).await;
    }

    pub async fn failure(&self, kind: AuditKind, error_code: &str, details: Value) {
        self.record(kind, "failed", Some(error_code), &details).await;
    }

    async fn record(&self, kind: AuditKind, status: &'static str, error_code: Option<&str>, details: &Value) {
        let Some(writer) = &self.writer else {
            return;
        };
        let entry = AuditEntry {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
            status,
            error_code,
            details,
        };

        let writer = writer.lock().await;
        if let Err(e) = writer.write(&entry) {
            tracing::warn!(error = %e, path = %writer.path.display(), "Failed to write audit log entry");
        }
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("enabled", &self.writer.is_some())
            .finish()
    }
}
