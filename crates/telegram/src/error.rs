use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("Telegram API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Telegram API returned an error: {0}")]
    ApiError(String),

    #[error("Telegram bot is not configured. Missing token.")]
    NotConfigured,
}
