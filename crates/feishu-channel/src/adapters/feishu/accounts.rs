//! Feishu account resolution.
//!
//! Accounts are optional: a deployment with a single bot puts its settings
//! straight into `channels.feishu`, multi-bot deployments use an `accounts`
//! map. Resolution tries the named account, then the whole block when it holds
//! anything besides `accounts`, then gives up with `Ok(None)`.

use serde::Serialize;
use serde_json::Value;

use crate::config::{
    has_direct_account_fields, FeishuAccountConfig, FeishuConfig, HostConfig, DEFAULT_ACCOUNT_ID,
};
use crate::error::ChannelAdapterError;
use crate::traits::ChannelAccounts;
use crate::types::FEISHU_CHANNEL_ID;

/// Summary of one account for status listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    pub account_id: String,
    pub name: Option<String>,
    pub enabled: bool,
    pub configured: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AccountResolver;

impl AccountResolver {
    pub fn new() -> Self {
        Self
    }

    /// Parse the whole `channels.feishu` block up front.
    ///
    /// Hosts call this at startup to surface every configuration problem at
    /// once instead of on first use. A missing block is `Ok(None)`.
    pub fn validate(&self, cfg: &HostConfig) -> Result<Option<FeishuConfig>, ChannelAdapterError> {
        cfg.feishu_block().map(FeishuConfig::from_value).transpose()
    }

    /// Status summary for an account. Never fails: a malformed account is
    /// reported as not configured.
    pub fn describe_account(&self, cfg: &HostConfig, account_id: Option<&str>) -> AccountSnapshot {
        let id = normalize_account_id(account_id);
        match self.resolve(cfg, id) {
            Ok(Some(account)) => AccountSnapshot {
                account_id: id.to_string(),
                name: account.name.clone(),
                enabled: account.is_enabled(),
                configured: true,
            },
            Ok(None) => AccountSnapshot {
                account_id: id.to_string(),
                name: None,
                enabled: true,
                configured: false,
            },
            Err(e) => {
                tracing::warn!(account = %id, error = %e, "Feishu account is misconfigured");
                AccountSnapshot {
                    account_id: id.to_string(),
                    name: None,
                    enabled: raw_enabled(cfg, id).unwrap_or(true),
                    configured: false,
                }
            }
        }
    }

    fn resolve(
        &self,
        cfg: &HostConfig,
        id: &str,
    ) -> Result<Option<FeishuAccountConfig>, ChannelAdapterError> {
        let Some(block) = cfg.feishu_block() else {
            return Ok(None);
        };

        if let Some(account) = accounts_map(block).and_then(|accounts| accounts.get(id)) {
            let path = format!("channels.{}.accounts.{}", FEISHU_CHANNEL_ID, id);
            return FeishuAccountConfig::from_value(account, &path).map(Some);
        }

        if has_direct_account_fields(block) {
            tracing::debug!(account = %id, "Using channel block as Feishu account settings");
            let path = format!("channels.{}", FEISHU_CHANNEL_ID);
            return FeishuAccountConfig::from_value(block, &path).map(Some);
        }

        Ok(None)
    }
}

impl ChannelAccounts for AccountResolver {
    type Account = FeishuAccountConfig;

    fn list_account_ids(&self, cfg: &HostConfig) -> Vec<String> {
        match cfg.feishu_block().and_then(accounts_map) {
            Some(accounts) => {
                let mut ids: Vec<String> = accounts.keys().cloned().collect();
                ids.sort();
                ids
            }
            None => vec![DEFAULT_ACCOUNT_ID.to_string()],
        }
    }

    fn resolve_account(
        &self,
        cfg: &HostConfig,
        account_id: Option<&str>,
    ) -> Result<Option<FeishuAccountConfig>, ChannelAdapterError> {
        self.resolve(cfg, normalize_account_id(account_id))
    }

    fn default_account_id(&self) -> &str {
        DEFAULT_ACCOUNT_ID
    }

    fn set_account_enabled(
        &self,
        cfg: HostConfig,
        account_id: &str,
        enabled: bool,
    ) -> HostConfig {
        tracing::debug!(
            account = %account_id,
            enabled,
            "Feishu does not persist account toggles; configuration unchanged"
        );
        cfg
    }
}

fn normalize_account_id(account_id: Option<&str>) -> &str {
    match account_id {
        Some(id) if !id.is_empty() => id,
        _ => DEFAULT_ACCOUNT_ID,
    }
}

/// The `accounts` object, when the block has one.
fn accounts_map(block: &Value) -> Option<&serde_json::Map<String, Value>> {
    block.get("accounts").and_then(Value::as_object)
}

fn raw_enabled(cfg: &HostConfig, id: &str) -> Option<bool> {
    let block = cfg.feishu_block()?;
    accounts_map(block)
        .and_then(|accounts| accounts.get(id))
        .unwrap_or(block)
        .get("enabled")
        .and_then(Value::as_bool)
}
