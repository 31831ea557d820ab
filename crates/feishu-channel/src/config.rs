use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ChannelAdapterError;
use crate::types::FEISHU_CHANNEL_ID;

/// Account id used whenever no explicit account is specified.
pub const DEFAULT_ACCOUNT_ID: &str = "default";

/// Events API webhook path used when an account does not set `webhookPath`.
pub const DEFAULT_WEBHOOK_PATH: &str = "/feishu/events";

/// Host configuration document.
///
/// Owned by the host and read-only from the channel's point of view. Only the
/// `channels` object is interpreted; every other top-level key is carried
/// through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Channel name → channel-specific block.
    #[serde(default)]
    pub channels: Map<String, Value>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl HostConfig {
    /// Parse a configuration document from an already-decoded JSON value.
    pub fn from_value(value: Value) -> Result<Self, ChannelAdapterError> {
        if !value.is_object() {
            return Err(ChannelAdapterError::validation(
                "$",
                "configuration document must be an object",
            ));
        }
        serde_json::from_value(value)
            .map_err(|e| ChannelAdapterError::validation("channels", e.to_string()))
    }

    pub fn from_json_str(json: &str) -> Result<Self, ChannelAdapterError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| ChannelAdapterError::Config(format!("invalid JSON: {}", e)))?;
        Self::from_value(value)
    }

    /// Read and parse a JSON configuration file.
    pub async fn load(path: &Path) -> Result<Self, ChannelAdapterError> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            ChannelAdapterError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let cfg = Self::from_json_str(&raw)?;
        tracing::debug!(
            path = %path.display(),
            channels = cfg.channels.len(),
            "Loaded host configuration"
        );
        Ok(cfg)
    }

    /// Raw block for the given channel, if present.
    pub fn channel(&self, channel_id: &str) -> Option<&Value> {
        self.channels.get(channel_id)
    }

    /// Raw `channels.feishu` block, if present.
    pub fn feishu_block(&self) -> Option<&Value> {
        self.channel(FEISHU_CHANNEL_ID)
    }
}

/// Group chat handling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupPolicy {
    Open,
    Disabled,
    Allowlist,
}

/// Reply threading mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyToMode {
    Off,
    First,
    All,
}

/// How markdown tables are rendered on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkdownTableMode {
    Off,
    Bullets,
    Code,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkdownConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<MarkdownTableMode>,
}

/// Which heartbeat outcomes are surfaced in the chat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatVisibility {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_ok: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_alerts: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_indicator: Option<bool>,
}

/// Per-counterpart direct message overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<u32>,
}

/// Settings for one Feishu account.
///
/// Optional fields stay `None` when absent so that a resolved account is
/// value-equal to what was written in the configuration document. Use the
/// accessor methods for effective values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeishuAccountConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    pub app_id: String,
    pub app_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypt_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_policy: Option<GroupPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_mention: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dm_history_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_chunk_limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_max_mb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_mode: Option<ReplyToMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<MarkdownConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat: Option<HeartbeatVisibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dms: Option<BTreeMap<String, DmConfig>>,
}

impl FeishuAccountConfig {
    /// Parse and validate an account block found at `path`.
    ///
    /// Unknown keys are ignored, so a whole channel block (which also carries
    /// `accounts`) parses as a single account.
    pub fn from_value(value: &Value, path: &str) -> Result<Self, ChannelAdapterError> {
        let account: Self = serde_json::from_value(value.clone())
            .map_err(|e| ChannelAdapterError::validation(path, e.to_string()))?;
        account.validate(path)?;
        Ok(account)
    }

    pub fn validate(&self, path: &str) -> Result<(), ChannelAdapterError> {
        if self.app_id.trim().is_empty() {
            return Err(ChannelAdapterError::validation(
                format!("{}.appId", path),
                "must not be empty",
            ));
        }
        if self.app_secret.trim().is_empty() {
            return Err(ChannelAdapterError::validation(
                format!("{}.appSecret", path),
                "must not be empty",
            ));
        }
        if let Some(ref webhook_path) = self.webhook_path {
            if !webhook_path.starts_with('/') {
                return Err(ChannelAdapterError::validation(
                    format!("{}.webhookPath", path),
                    "must start with '/'",
                ));
            }
        }
        if let Some(mb) = self.media_max_mb {
            if !mb.is_finite() || mb <= 0.0 {
                return Err(ChannelAdapterError::validation(
                    format!("{}.mediaMaxMb", path),
                    "must be a positive number",
                ));
            }
        }
        if self.text_chunk_limit == Some(0) {
            return Err(ChannelAdapterError::validation(
                format!("{}.textChunkLimit", path),
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Accounts are enabled unless explicitly disabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn webhook_path(&self) -> &str {
        self.webhook_path.as_deref().unwrap_or(DEFAULT_WEBHOOK_PATH)
    }

    /// History limit for a direct conversation with `counterpart`.
    ///
    /// A per-counterpart entry in `dms` wins over `dmHistoryLimit`.
    pub fn dm_history_limit_for(&self, counterpart: &str) -> Option<u32> {
        self.dms
            .as_ref()
            .and_then(|dms| dms.get(counterpart))
            .and_then(|dm| dm.history_limit)
            .or(self.dm_history_limit)
    }
}

/// Fully parsed `channels.feishu` block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeishuConfig {
    /// Named accounts, when an `accounts` map is present.
    pub accounts: Option<BTreeMap<String, FeishuAccountConfig>>,
    /// The block itself read as a single account, when it carries any
    /// settings besides `accounts`.
    pub base: Option<FeishuAccountConfig>,
}

impl FeishuConfig {
    /// Parse every account in the block, failing on the first invalid one.
    pub fn from_value(block: &Value) -> Result<Self, ChannelAdapterError> {
        let prefix = format!("channels.{}", FEISHU_CHANNEL_ID);
        let obj = block
            .as_object()
            .ok_or_else(|| ChannelAdapterError::validation(&prefix, "must be an object"))?;

        let accounts = match obj.get("accounts") {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => {
                let mut parsed = BTreeMap::new();
                for (id, value) in map {
                    let path = format!("{}.accounts.{}", prefix, id);
                    parsed.insert(id.clone(), FeishuAccountConfig::from_value(value, &path)?);
                }
                Some(parsed)
            }
            Some(_) => {
                return Err(ChannelAdapterError::validation(
                    format!("{}.accounts", prefix),
                    "must be an object",
                ))
            }
        };

        let base = if has_direct_account_fields(block) {
            Some(FeishuAccountConfig::from_value(block, &prefix)?)
        } else {
            None
        };

        Ok(Self { accounts, base })
    }
}

/// Whether a channel block carries account settings at its top level, i.e.
/// any key besides `accounts`.
pub(crate) fn has_direct_account_fields(block: &Value) -> bool {
    block
        .as_object()
        .map(|obj| obj.keys().any(|key| key != "accounts"))
        .unwrap_or(false)
}
