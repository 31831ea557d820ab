use std::sync::Arc;

use async_trait::async_trait;

use crate::adapters::feishu::gateway::{GatewayContext, MonitorContext};
use crate::adapters::feishu::outbound::SendTextRequest;
use crate::config::HostConfig;
use crate::error::ChannelAdapterError;
use crate::types::{ChannelCapabilities, ChannelMeta, DeliveryMode, DeliveryResult};

/// Production sender for Feishu text messages.
///
/// Implementations own the network I/O. Their errors are handed back to the
/// caller of `send_text` untouched.
#[async_trait]
pub trait FeishuSender: Send + Sync {
    async fn send_text(&self, to: &str, text: &str) -> Result<DeliveryResult, ChannelAdapterError>;
}

/// Inbound listener for one Feishu account.
///
/// The monitor must observe `ctx.abort_signal` and end its receive loop when
/// it fires. Reconnection, if any, is the monitor's business.
#[async_trait]
pub trait FeishuMonitor: Send + Sync {
    async fn monitor(
        &self,
        ctx: MonitorContext,
    ) -> Result<Box<dyn GatewayHandle>, ChannelAdapterError>;
}

/// A running listener.
///
/// `stop` releases everything the listener holds. Calling it again, or after
/// the cancellation token already fired, must succeed.
#[async_trait]
pub trait GatewayHandle: Send + Sync {
    async fn stop(&self) -> Result<(), ChannelAdapterError>;
}

/// Splits oversized text into deliverable chunks.
pub type TextChunker = fn(&str, usize) -> Vec<String>;

/// Per-account configuration access, uniform across channels.
pub trait ChannelAccounts: Send + Sync {
    type Account;

    fn list_account_ids(&self, cfg: &HostConfig) -> Vec<String>;

    /// `Ok(None)` means nothing is configured for the account.
    fn resolve_account(
        &self,
        cfg: &HostConfig,
        account_id: Option<&str>,
    ) -> Result<Option<Self::Account>, ChannelAdapterError>;

    fn default_account_id(&self) -> &str;

    /// Toggle an account and return the updated configuration.
    fn set_account_enabled(&self, cfg: HostConfig, account_id: &str, enabled: bool)
        -> HostConfig;
}

/// Outbound delivery.
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    fn delivery_mode(&self) -> DeliveryMode;

    /// `None` when the channel never splits text itself.
    fn chunker(&self) -> Option<TextChunker>;

    fn text_chunk_limit(&self) -> usize;

    async fn send_text(
        &self,
        request: SendTextRequest,
    ) -> Result<DeliveryResult, ChannelAdapterError>;
}

/// Inbound listener lifecycle.
#[async_trait]
pub trait ChannelGateway: Send + Sync {
    async fn start_account(
        &self,
        ctx: GatewayContext,
    ) -> Result<Box<dyn GatewayHandle>, ChannelAdapterError>;
}

/// The shape the host expects from every channel plugin.
pub trait ChannelPlugin: Send + Sync {
    type Account;

    fn id(&self) -> &str;
    fn meta(&self) -> &ChannelMeta;
    fn capabilities(&self) -> &ChannelCapabilities;
    fn config(&self) -> &dyn ChannelAccounts<Account = Self::Account>;
    fn outbound(&self) -> &dyn ChannelOutbound;
    fn gateway(&self) -> &dyn ChannelGateway;
}

/// Payload handed to [`PluginApi::register_channel`].
pub struct ChannelRegistration<P> {
    pub plugin: Arc<P>,
}

/// Registration surface exposed by the host.
pub trait PluginApi {
    fn register_channel<P>(
        &mut self,
        registration: ChannelRegistration<P>,
    ) -> Result<(), ChannelAdapterError>
    where
        P: ChannelPlugin + 'static;
}
