//! Fallback activity log.
//!
//! Every time the channel falls back to its built-in sender or inert
//! listener it writes a structured JSON record. Records always go through
//! `tracing`; they are also appended to a file when one is configured.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::types::FEISHU_CHANNEL_ID;

/// What the fallback did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum FallbackAction {
    /// A message was "sent" without any sender wired in.
    Send {
        to: String,
        text: String,
        message_id: String,
    },
    /// An inert listener was started for an account.
    GatewayStart,
}

/// One fallback record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackEntry {
    pub ts: DateTime<Utc>,
    pub channel: String,
    pub account_id: Option<String>,
    #[serde(flatten)]
    pub action: FallbackAction,
}

impl FallbackEntry {
    pub fn send(account_id: Option<&str>, to: &str, text: &str, message_id: &str) -> Self {
        Self {
            ts: Utc::now(),
            channel: FEISHU_CHANNEL_ID.to_string(),
            account_id: account_id.map(str::to_string),
            action: FallbackAction::Send {
                to: to.to_string(),
                text: text.to_string(),
                message_id: message_id.to_string(),
            },
        }
    }

    pub fn gateway_start(account_id: &str) -> Self {
        Self {
            ts: Utc::now(),
            channel: FEISHU_CHANNEL_ID.to_string(),
            account_id: Some(account_id.to_string()),
            action: FallbackAction::GatewayStart,
        }
    }
}

/// Structured fallback logger that writes JSON lines to tracing and,
/// optionally, a file.
pub struct FallbackLogger {
    log_path: Option<PathBuf>,
    count: RwLock<u64>,
}

impl FallbackLogger {
    /// Create a logger that writes to the given file path.
    /// If `None`, logs to tracing output only.
    pub fn new(log_path: Option<PathBuf>) -> Self {
        Self {
            log_path,
            count: RwLock::new(0),
        }
    }

    pub async fn log(&self, entry: &FallbackEntry) {
        let json = serde_json::to_string(entry).unwrap_or_else(|e| {
            format!(
                r#"{{"error":"serialization failed: {}","ts":"{}"}}"#,
                e,
                Utc::now().to_rfc3339()
            )
        });

        tracing::info!(target: "feishu_channel", "{}", json);

        if let Some(ref path) = self.log_path {
            if let Err(e) = append_log_line(path, &json).await {
                tracing::warn!("Failed to write fallback log: {}", e);
            }
        }

        *self.count.write().await += 1;
    }

    /// Number of records written so far.
    pub async fn entry_count(&self) -> u64 {
        *self.count.read().await
    }
}

impl Default for FallbackLogger {
    fn default() -> Self {
        Self::new(None)
    }
}

async fn append_log_line(path: &std::path::Path, line: &str) -> Result<(), std::io::Error> {
    use tokio::io::AsyncWriteExt;

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.write_all(b"\n").await?;
    Ok(())
}
