use crate::api::TelegramClient;
use configuration::TelegramConfig;
use engine::commands::Command;
use engine::{ConversationId, TradeEngine};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const RETRY_DELAY: Duration = Duration::from_secs(5);

/// `true` when the chat may use the bot. An empty list allows every chat.
pub fn is_allowed(allowed_chat_ids: &[i64], chat_id: i64) -> bool {
    allowed_chat_ids.is_empty() || allowed_chat_ids.contains(&chat_id)
}

/// Cancel commands skip the chat's queue so they can interrupt a running turn.
pub fn bypasses_queue(text: &str) -> bool {
    matches!(Command::parse(text), Some(Command::Cancel))
}

async fn reply(bot: &TelegramClient, engine: &TradeEngine, chat_id: ConversationId, text: &str) {
    let message = engine.handle(chat_id, text).await;
    if let Err(e) = bot.send_reply(chat_id, &message).await {
        tracing::error!(chat_id, error = ?e, "Failed to send Telegram reply.");
    }
}

/// Starts the task that processes one chat's messages in arrival order.
fn spawn_chat_worker(
    chat_id: ConversationId,
    bot: Arc<TelegramClient>,
    engine: Arc<TradeEngine>,
) -> mpsc::UnboundedSender<String> {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            reply(&bot, &engine, chat_id, &text).await;
        }
    });
    tx
}

/// A long-running service that polls Telegram for messages and answers them
/// through the trade engine.
///
/// Chats are served concurrently, each by its own worker; messages within a
/// chat are handled one after the other.
pub async fn run_bot_service(bot: TelegramClient, engine: Arc<TradeEngine>, config: TelegramConfig) {
    tracing::info!(
        allowed_chats = config.allowed_chat_ids.len(),
        "Telegram bot service started. Waiting for messages."
    );
    let bot = Arc::new(bot);
    let mut workers: HashMap<ConversationId, mpsc::UnboundedSender<String>> = HashMap::new();
    let mut offset = 0;

    loop {
        let updates = match bot.get_updates(offset).await {
            Ok(updates) => updates,
            Err(e) => {
                tracing::error!(error = ?e, "Failed to fetch Telegram updates. Retrying.");
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            let Some((chat_id, text)) = update.into_text() else {
                continue;
            };
            if !is_allowed(&config.allowed_chat_ids, chat_id) {
                tracing::warn!(chat_id, "Ignoring message from a chat that is not allowed.");
                continue;
            }

            if bypasses_queue(&text) {
                let (bot, engine) = (bot.clone(), engine.clone());
                tokio::spawn(async move { reply(&bot, &engine, chat_id, &text).await });
                continue;
            }

            let worker = workers
                .entry(chat_id)
                .or_insert_with(|| spawn_chat_worker(chat_id, bot.clone(), engine.clone()));
            if let Err(mpsc::error::SendError(text)) = worker.send(text) {
                tracing::warn!(chat_id, "Chat worker stopped. Restarting it.");
                let fresh = spawn_chat_worker(chat_id, bot.clone(), engine.clone());
                if fresh.send(text).is_ok() {
                    workers.insert(chat_id, fresh);
                }
            }
        }
    }
}
