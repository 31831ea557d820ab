use serde::{Deserialize, Serialize};

/// Channel identifier under which the plugin registers and reads config.
pub const FEISHU_CHANNEL_ID: &str = "feishu";

/// Conversation kinds a channel can take part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatType {
    Direct,
    Group,
}

impl std::fmt::Display for ChatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatType::Direct => write!(f, "direct"),
            ChatType::Group => write!(f, "group"),
        }
    }
}

/// Static capability manifest the host uses to decide which features to
/// offer for a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelCapabilities {
    pub chat_types: Vec<ChatType>,
    pub reactions: bool,
    pub threads: bool,
    pub media: bool,
    pub native_commands: bool,
}

impl ChannelCapabilities {
    pub fn supports(&self, chat_type: ChatType) -> bool {
        self.chat_types.contains(&chat_type)
    }
}

/// Display metadata for a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMeta {
    pub id: String,
    pub label: String,
    pub selection_label: String,
    pub docs_path: String,
    pub blurb: String,
}

/// How outbound messages reach the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// The plugin talks to the platform itself.
    Direct,
    /// Delivery is relayed through the host gateway.
    Gateway,
}

/// Outcome of one outbound send.
///
/// A successful result always carries a non-empty message id; build values
/// through [`DeliveryResult::delivered`] or [`DeliveryResult::failed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResult {
    pub channel: String,
    pub success: bool,
    #[serde(default)]
    pub message_id: String,
}

impl DeliveryResult {
    /// Successful delivery. Returns `None` when `message_id` is empty.
    pub fn delivered(channel: impl Into<String>, message_id: impl Into<String>) -> Option<Self> {
        let message_id = message_id.into();
        if message_id.is_empty() {
            return None;
        }
        Some(Self {
            channel: channel.into(),
            success: true,
            message_id,
        })
    }

    pub fn failed(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            success: false,
            message_id: String::new(),
        }
    }

    /// Whether the success/message-id invariant holds.
    pub fn is_consistent(&self) -> bool {
        !self.success || !self.message_id.is_empty()
    }
}

/// Kind of plugin, as declared to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginKind {
    Channel,
}

/// Static plugin definition shown by the host's plugin listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub version: String,
    pub kind: PluginKind,
}
