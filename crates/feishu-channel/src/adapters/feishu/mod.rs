//! Feishu/Lark channel plugin.
//!
//! Bundles account resolution, outbound delivery and gateway lifecycle into
//! the [`ChannelPlugin`] shape the host registers. Production sender and
//! monitor implementations are injected through [`FeishuRuntime`]; without
//! them the plugin degrades to logged no-ops so a half-wired deployment
//! never takes the host down.

pub mod accounts;
pub mod gateway;
pub mod outbound;

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::ChannelAdapterError;
use crate::logging::FallbackLogger;
use crate::traits::{
    ChannelAccounts, ChannelGateway, ChannelOutbound, ChannelPlugin, ChannelRegistration,
    FeishuMonitor, FeishuSender, PluginApi,
};
use crate::types::{
    ChannelCapabilities, ChannelMeta, ChatType, PluginDefinition, PluginKind, FEISHU_CHANNEL_ID,
};

use accounts::AccountResolver;
use gateway::FeishuGateway;
use outbound::FeishuOutbound;

/// Production implementations supplied by the host runtime.
#[derive(Clone, Default)]
pub struct FeishuRuntime {
    pub sender: Option<Arc<dyn FeishuSender>>,
    pub monitor: Option<Arc<dyn FeishuMonitor>>,
}

/// The Feishu channel plugin descriptor.
pub struct FeishuPlugin {
    meta: ChannelMeta,
    capabilities: ChannelCapabilities,
    accounts: AccountResolver,
    outbound: FeishuOutbound,
    gateway: FeishuGateway,
    fallback_log: Arc<FallbackLogger>,
}

impl FeishuPlugin {
    pub fn builder() -> FeishuPluginBuilder {
        FeishuPluginBuilder::default()
    }

    /// Plugin with the given runtime and a tracing-only fallback log.
    pub fn new(runtime: FeishuRuntime) -> Self {
        Self::builder().runtime(runtime).build()
    }

    /// Typed account resolver, for callers that want more than the
    /// [`ChannelAccounts`] surface.
    pub fn accounts(&self) -> &AccountResolver {
        &self.accounts
    }

    pub fn fallback_log(&self) -> &Arc<FallbackLogger> {
        &self.fallback_log
    }
}

impl Default for FeishuPlugin {
    fn default() -> Self {
        Self::new(FeishuRuntime::default())
    }
}

impl ChannelPlugin for FeishuPlugin {
    type Account = crate::config::FeishuAccountConfig;

    fn id(&self) -> &str {
        FEISHU_CHANNEL_ID
    }

    fn meta(&self) -> &ChannelMeta {
        &self.meta
    }

    fn capabilities(&self) -> &ChannelCapabilities {
        &self.capabilities
    }

    fn config(&self) -> &dyn ChannelAccounts<Account = Self::Account> {
        &self.accounts
    }

    fn outbound(&self) -> &dyn ChannelOutbound {
        &self.outbound
    }

    fn gateway(&self) -> &dyn ChannelGateway {
        &self.gateway
    }
}

#[derive(Default)]
pub struct FeishuPluginBuilder {
    runtime: FeishuRuntime,
    fallback_log: Option<Arc<FallbackLogger>>,
}

impl FeishuPluginBuilder {
    pub fn runtime(mut self, runtime: FeishuRuntime) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn sender(mut self, sender: Arc<dyn FeishuSender>) -> Self {
        self.runtime.sender = Some(sender);
        self
    }

    pub fn monitor(mut self, monitor: Arc<dyn FeishuMonitor>) -> Self {
        self.runtime.monitor = Some(monitor);
        self
    }

    pub fn fallback_log(mut self, logger: Arc<FallbackLogger>) -> Self {
        self.fallback_log = Some(logger);
        self
    }

    /// Append fallback records to `path` in addition to tracing.
    pub fn fallback_log_path(self, path: impl Into<PathBuf>) -> Self {
        self.fallback_log(Arc::new(FallbackLogger::new(Some(path.into()))))
    }

    pub fn build(self) -> FeishuPlugin {
        let fallback_log = self.fallback_log.unwrap_or_default();
        let accounts = AccountResolver::new();

        if self.runtime.sender.is_none() {
            tracing::warn!("No Feishu sender configured; outbound messages will only be logged");
        }
        if self.runtime.monitor.is_none() {
            tracing::warn!("No Feishu monitor configured; inbound listeners will be inert");
        }

        FeishuPlugin {
            meta: feishu_meta(),
            capabilities: feishu_capabilities(),
            accounts,
            outbound: FeishuOutbound::new(self.runtime.sender, fallback_log.clone()),
            gateway: FeishuGateway::new(self.runtime.monitor, accounts, fallback_log.clone()),
            fallback_log,
        }
    }
}

/// Capability manifest for Feishu.
pub fn feishu_capabilities() -> ChannelCapabilities {
    ChannelCapabilities {
        chat_types: vec![ChatType::Direct, ChatType::Group],
        reactions: false,
        threads: false,
        media: true,
        native_commands: false,
    }
}

pub fn feishu_meta() -> ChannelMeta {
    ChannelMeta {
        id: FEISHU_CHANNEL_ID.to_string(),
        label: "Feishu".to_string(),
        selection_label: "Feishu/Lark (Bot API)".to_string(),
        docs_path: "/channels/feishu".to_string(),
        blurb: "Feishu/Lark bot over the Open Platform events API.".to_string(),
    }
}

pub fn definition() -> PluginDefinition {
    PluginDefinition {
        id: FEISHU_CHANNEL_ID.to_string(),
        name: "Feishu".to_string(),
        description: "Feishu/Lark channel plugin".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        kind: PluginKind::Channel,
    }
}

/// Register the Feishu channel with the host.
pub fn register<A: PluginApi>(
    api: &mut A,
    runtime: FeishuRuntime,
) -> Result<(), ChannelAdapterError> {
    let plugin = Arc::new(FeishuPlugin::new(runtime));
    api.register_channel(ChannelRegistration { plugin })?;
    tracing::info!(channel = FEISHU_CHANNEL_ID, "Feishu channel registered");
    Ok(())
}
