//! Feishu/Lark channel plugin for the Symbi platform.
//!
//! Implements the host's channel plugin contract for Feishu:
//! - Account resolution over the `channels.feishu` configuration block, with
//!   an implicit `default` account for single-bot deployments
//! - Outbound text delivery through an ordered sender chain (call-scoped,
//!   injected, logging fallback)
//! - Per-account gateway lifecycle driven by a `CancellationToken`
//! - A static capability manifest and `register` entry point
//!
//! The Feishu wire protocol is not implemented here. Hosts inject a
//! [`FeishuSender`] and a [`FeishuMonitor`] through [`FeishuRuntime`].

pub mod chain;
pub mod config;
pub mod error;
pub mod logging;
pub mod traits;
pub mod types;

pub mod adapters;

// Re-export core types
pub use adapters::feishu::accounts::{AccountResolver, AccountSnapshot};
pub use adapters::feishu::gateway::{
    FeishuGateway, GatewayContext, InertGatewayHandle, MonitorContext, TaskGatewayHandle,
};
pub use adapters::feishu::outbound::{
    FeishuOutbound, LoggingSender, OutboundDeps, SendTextRequest, TEXT_CHUNK_LIMIT,
};
pub use adapters::feishu::{
    definition, feishu_capabilities, register, FeishuPlugin, FeishuPluginBuilder, FeishuRuntime,
};
pub use chain::{ProviderChain, ProviderSource};
pub use config::{
    DmConfig, FeishuAccountConfig, FeishuConfig, GroupPolicy, HeartbeatVisibility, HostConfig,
    MarkdownConfig, MarkdownTableMode, ReplyToMode, DEFAULT_ACCOUNT_ID, DEFAULT_WEBHOOK_PATH,
};
pub use error::ChannelAdapterError;
pub use logging::{FallbackAction, FallbackEntry, FallbackLogger};
pub use traits::{
    ChannelAccounts, ChannelGateway, ChannelOutbound, ChannelPlugin, ChannelRegistration,
    FeishuMonitor, FeishuSender, GatewayHandle, PluginApi, TextChunker,
};
pub use types::{
    ChannelCapabilities, ChannelMeta, ChatType, DeliveryMode, DeliveryResult, PluginDefinition,
    PluginKind, FEISHU_CHANNEL_ID,
};

// CancellationToken is part of the gateway contract.
pub use tokio_util::sync::CancellationToken;
