// Error types for Bot API calls

/// Errors that can occur while talking to the Telegram Bot API
#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("HTTP error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Telegram API error {code}: {description}")]
    Api {
        code: i32,
        description: String,
        retry_after: Option<u64>,
    },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TelegramError {
    /// Builds a transport error with the request URL stripped, since it embeds the bot token
    pub fn transport(err: reqwest::Error) -> Self {
        Self::Transport(err.without_url())
    }

    /// Another poller or an active webhook holds the update stream
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Api { code: 409, .. })
    }

    /// Seconds Telegram asked us to wait before retrying, if any
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}
