use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelAdapterError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid configuration at '{path}': {message}")]
    Validation { path: String, message: String },

    #[error("no account configured for id '{0}'")]
    AccountNotFound(String),

    #[error("text length {len} exceeds channel limit of {limit}")]
    TextTooLong { len: usize, limit: usize },

    #[error("message send failed: {0}")]
    SendFailed(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("channel registration failed: {0}")]
    Registration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ChannelAdapterError {
    pub(crate) fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            message: message.into(),
        }
    }
}
