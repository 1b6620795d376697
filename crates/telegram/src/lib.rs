//! Telegram transport for the trade engine.
//!
//! Long-polls the Bot API for text messages, passes each to
//! `engine::TradeEngine`, and renders suggested replies as one-time reply
//! keyboards.

pub mod api;
pub mod error;
pub mod service;

pub use api::{ReplyMarkup, TelegramClient};
pub use error::TelegramError;
pub use service::run_bot_service;
