//! Outbound delivery for Feishu.
//!
//! Picks a sender from a provider chain: the call's own `deps`, then the
//! sender injected when the plugin was built, then [`LoggingSender`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::chain::{ProviderChain, ProviderSource};
use crate::error::ChannelAdapterError;
use crate::logging::{FallbackEntry, FallbackLogger};
use crate::traits::{ChannelOutbound, FeishuSender, TextChunker};
use crate::types::{DeliveryMode, DeliveryResult, FEISHU_CHANNEL_ID};

/// Largest text, in characters, the channel accepts in one message.
pub const TEXT_CHUNK_LIMIT: usize = 4000;

/// Prefix of message ids minted by the logging fallback.
pub const FALLBACK_MESSAGE_ID_PREFIX: &str = "fs_";

/// Call-scoped dependency overrides.
#[derive(Clone, Default)]
pub struct OutboundDeps {
    pub send_feishu: Option<Arc<dyn FeishuSender>>,
}

impl OutboundDeps {
    pub fn with_sender(sender: Arc<dyn FeishuSender>) -> Self {
        Self {
            send_feishu: Some(sender),
        }
    }
}

/// A single text send.
#[derive(Clone, Default)]
pub struct SendTextRequest {
    pub to: String,
    pub text: String,
    pub account_id: Option<String>,
    pub deps: Option<OutboundDeps>,
}

impl SendTextRequest {
    pub fn new(to: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn deps(mut self, deps: OutboundDeps) -> Self {
        self.deps = Some(deps);
        self
    }

    fn validate(&self, limit: usize) -> Result<(), ChannelAdapterError> {
        if self.to.trim().is_empty() {
            return Err(ChannelAdapterError::validation(
                "to",
                "destination must not be empty",
            ));
        }
        // UTF-16 code units, the unit the host measures text in.
        let len = self.text.encode_utf16().count();
        if len > limit {
            return Err(ChannelAdapterError::TextTooLong { len, limit });
        }
        Ok(())
    }
}

/// Sender used when nothing else is wired in.
///
/// Records the intended send and reports success with a time-derived id.
pub struct LoggingSender {
    logger: Arc<FallbackLogger>,
    account_id: Option<String>,
}

impl LoggingSender {
    pub fn new(logger: Arc<FallbackLogger>, account_id: Option<String>) -> Self {
        Self { logger, account_id }
    }
}

#[async_trait]
impl FeishuSender for LoggingSender {
    async fn send_text(&self, to: &str, text: &str) -> Result<DeliveryResult, ChannelAdapterError> {
        let message_id = fallback_message_id();
        tracing::info!(to = %to, "[Feishu] Fallback sending to {}: {}", to, text);
        self.logger
            .log(&FallbackEntry::send(
                self.account_id.as_deref(),
                to,
                text,
                &message_id,
            ))
            .await;
        DeliveryResult::delivered(FEISHU_CHANNEL_ID, message_id).ok_or_else(|| {
            ChannelAdapterError::Internal("fallback produced an empty message id".to_string())
        })
    }
}

fn fallback_message_id() -> String {
    format!(
        "{}{}",
        FALLBACK_MESSAGE_ID_PREFIX,
        chrono::Utc::now().timestamp_millis()
    )
}

/// Outbound half of the Feishu plugin.
pub struct FeishuOutbound {
    sender: Option<Arc<dyn FeishuSender>>,
    fallback_log: Arc<FallbackLogger>,
}

impl FeishuOutbound {
    pub fn new(sender: Option<Arc<dyn FeishuSender>>, fallback_log: Arc<FallbackLogger>) -> Self {
        Self {
            sender,
            fallback_log,
        }
    }

    fn select_sender(&self, request: &SendTextRequest) -> (ProviderSource, Arc<dyn FeishuSender>) {
        let call_scoped = request.deps.as_ref().and_then(|d| d.send_feishu.clone());
        ProviderChain::new()
            .then(ProviderSource::CallScoped, call_scoped)
            .then(ProviderSource::Injected, self.sender.clone())
            .select()
            .unwrap_or_else(|| {
                let fallback: Arc<dyn FeishuSender> = Arc::new(LoggingSender::new(
                    self.fallback_log.clone(),
                    request.account_id.clone(),
                ));
                (ProviderSource::Fallback, fallback)
            })
    }
}

#[async_trait]
impl ChannelOutbound for FeishuOutbound {
    fn delivery_mode(&self) -> DeliveryMode {
        DeliveryMode::Direct
    }

    fn chunker(&self) -> Option<TextChunker> {
        None
    }

    fn text_chunk_limit(&self) -> usize {
        TEXT_CHUNK_LIMIT
    }

    async fn send_text(
        &self,
        request: SendTextRequest,
    ) -> Result<DeliveryResult, ChannelAdapterError> {
        request.validate(self.text_chunk_limit())?;

        let (source, sender) = self.select_sender(&request);
        tracing::debug!(
            to = %request.to,
            account = request.account_id.as_deref().unwrap_or("default"),
            source = %source,
            "Sending Feishu text"
        );

        sender.send_text(&request.to, &request.text).await
    }
}
