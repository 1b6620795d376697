use crate::error::TelegramError;
use configuration::TelegramConfig;
use engine::messages::OutputMessage;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_BASE: &str = "https://api.telegram.org";
/// Replies with more choices than this get one button per row.
const MAX_BUTTONS_PER_ROW: usize = 3;

/// Every Bot API response is wrapped in this.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

impl Update {
    /// The chat and text of a text message; `None` for anything else.
    pub fn into_text(self) -> Option<(i64, String)> {
        let message = self.message?;
        Some((message.chat.id, message.text?))
    }
}

#[derive(Debug, Serialize)]
struct GetUpdatesPayload<'a> {
    offset: i64,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Debug, Serialize)]
struct SendMessagePayload<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<ReplyMarkup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyboardButton {
    pub text: String,
}

/// How suggested replies are shown in the chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Keyboard {
        keyboard: Vec<Vec<KeyboardButton>>,
        one_time_keyboard: bool,
        resize_keyboard: bool,
    },
    Remove {
        remove_keyboard: bool,
    },
}

impl ReplyMarkup {
    /// A one-time keyboard for the suggested replies, a keyboard removal when
    /// the conversation ended, nothing otherwise.
    pub fn for_message(message: &OutputMessage) -> Option<Self> {
        if !message.suggested_replies.is_empty() {
            let buttons: Vec<KeyboardButton> = message
                .suggested_replies
                .iter()
                .map(|text| KeyboardButton { text: text.clone() })
                .collect();
            let keyboard = if buttons.len() <= MAX_BUTTONS_PER_ROW {
                vec![buttons]
            } else {
                buttons.into_iter().map(|button| vec![button]).collect()
            };
            return Some(ReplyMarkup::Keyboard {
                keyboard,
                one_time_keyboard: true,
                resize_keyboard: true,
            });
        }
        message
            .conversation_ended
            .then_some(ReplyMarkup::Remove { remove_keyboard: true })
    }
}

/// A minimal Telegram Bot API client.
pub struct TelegramClient {
    client: Client,
    token: String,
    long_poll_timeout: u64,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Result<Self, TelegramError> {
        if config.token.is_empty() {
            return Err(TelegramError::NotConfigured);
        }
        // The HTTP timeout must outlast the long poll.
        let client = Client::builder()
            .timeout(Duration::from_secs(config.long_poll_timeout_secs + 10))
            .build()?;
        Ok(Self {
            client,
            token: config.token.clone(),
            long_poll_timeout: config.long_poll_timeout_secs,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", API_BASE, self.token, method)
    }

    async fn call<P: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        payload: &P,
    ) -> Result<T, TelegramError> {
        let response: ApiResponse<T> = self
            .client
            .post(self.method_url(method))
            .json(payload)
            .send()
            .await?
            .json()
            .await?;
        if !response.ok {
            return Err(TelegramError::ApiError(
                response.description.unwrap_or_else(|| format!("{} failed", method)),
            ));
        }
        response
            .result
            .ok_or_else(|| TelegramError::ApiError(format!("{} returned no result", method)))
    }

    /// Long-polls for updates after `offset`.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TelegramError> {
        let payload = GetUpdatesPayload {
            offset,
            timeout: self.long_poll_timeout,
            allowed_updates: &["message"],
        };
        self.call("getUpdates", &payload).await
    }

    /// Sends an engine reply, rendering its suggested replies as a keyboard.
    pub async fn send_reply(&self, chat_id: i64, message: &OutputMessage) -> Result<(), TelegramError> {
        let payload = SendMessagePayload {
            chat_id,
            text: &message.text,
            reply_markup: ReplyMarkup::for_message(message),
        };
        let _sent: serde_json::Value = self.call("sendMessage", &payload).await?;
        Ok(())
    }
}
