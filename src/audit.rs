//! Audit trail for registry operations.
//!
//! Writes structured JSON entries, one per line, to an append-only sink.
//! Published values are never logged, only their names.

use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

/// Audit event type discriminator.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// A module received its capability token.
    ModuleRegistered,
    /// A module published private API names.
    ApiPublished,
    /// A module's private API was read.
    ApiRead,
    /// A registry operation was refused.
    AccessDenied,
}

/// A single structured audit log entry.
#[derive(Debug, Serialize)]
struct AuditEntry {
    timestamp: String,
    event_id: Uuid,
    event_type: AuditEventType,
    details: serde_json::Value,
}

/// Audit logger writing structured JSON to an append-only sink.
pub struct AuditLogger {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl AuditLogger {
    /// Create an audit logger that appends to the given file path.
    pub fn new(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self {
            writer: Mutex::new(Box::new(file)),
        })
    }

    /// Create an audit logger from an arbitrary writer (for testing).
    pub fn from_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Log a successful registration.
    pub fn log_module_registered(&self, module: &str) -> anyhow::Result<()> {
        self.write_entry(
            AuditEventType::ModuleRegistered,
            serde_json::json!({ "module": module }),
        )
    }

    /// Log a publish. Only key names are recorded.
    pub fn log_api_published(&self, module: &str, keys: &[String]) -> anyhow::Result<()> {
        self.write_entry(
            AuditEventType::ApiPublished,
            serde_json::json!({
                "module": module,
                "keys": keys,
            }),
        )
    }

    /// Log a read of `target` by the module owning the presented token.
    pub fn log_api_read(&self, reader: &str, target: &str) -> anyhow::Result<()> {
        self.write_entry(
            AuditEventType::ApiRead,
            serde_json::json!({
                "reader": reader,
                "target": target,
            }),
        )
    }

    /// Log a refused operation.
    pub fn log_access_denied(
        &self,
        operation: &str,
        kind: &str,
        module: Option<&str>,
    ) -> anyhow::Result<()> {
        self.write_entry(
            AuditEventType::AccessDenied,
            serde_json::json!({
                "operation": operation,
                "kind": kind,
                "module": module,
            }),
        )
    }

    /// Write a single JSON line to the audit log.
    fn write_entry(
        &self,
        event_type: AuditEventType,
        details: serde_json::Value,
    ) -> anyhow::Result<()> {
        let entry = AuditEntry {
            timestamp: Utc::now().to_rfc3339(),
            event_id: Uuid::new_v4(),
            event_type,
            details,
        };
        let line = serde_json::to_string(&entry)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("audit lock poisoned: {e}"))?;
        writeln!(writer, "{line}")?;
        writer.flush()?;
        Ok(())
    }
}
