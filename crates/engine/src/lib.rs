//! # Trade Engine
//!
//! The conversation core of the trader. `TradeEngine` keeps one
//! `ConversationContext` per conversation and turns each line of user input
//! into an `OutputMessage`, walking the guided trade flow (space, instrument
//! type, search, instrument, side, quantity, confirmation) or the single-line
//! quick trade. Orders are handed to `executor::OrderController`.
//!
//! Turns of one conversation are processed one at a time; different
//! conversations never share state. A cancel request interrupts a pending
//! order wait without queueing behind it.

use crate::commands::Command;
use crate::context::ConversationState;
use crate::messages::OutputMessage;
use crate::workflow::Workflow;
use api_client::ApiClient;
use configuration::{Config, WorkflowConfig};
use executor::{cancel_pair, CancelHandle};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub mod commands;
pub mod context;
pub mod error;
pub mod messages;
pub mod portfolio;
pub mod quick_trade;
mod workflow;

pub use context::ConversationContext;
pub use error::{EngineError, QuickTradeError};
pub use quick_trade::{parse_quick_trade, QuickTrade};

/// Identifies one conversation, e.g. a Telegram chat id.
pub type ConversationId = i64;

struct ConversationSlot {
    context: Arc<Mutex<ConversationContext>>,
    cancel: CancelHandle,
}

impl ConversationSlot {
    fn new() -> Self {
        let (cancel, _) = cancel_pair();
        Self {
            context: Arc::new(Mutex::new(ConversationContext::new())),
            cancel,
        }
    }
}

/// The entry point used by transports.
///
/// A conversation's slot lives only while the conversation is active. It is
/// removed by the turn that leaves it inactive, while that turn still holds
/// the context lock.
pub struct TradeEngine {
    workflow: Workflow,
    conversations: Mutex<HashMap<ConversationId, Arc<ConversationSlot>>>,
}

impl TradeEngine {
    pub fn new(api_client: Arc<dyn ApiClient>, venue: impl Into<String>, settings: WorkflowConfig) -> Self {
        Self {
            workflow: Workflow::new(api_client, venue.into(), settings),
            conversations: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(api_client: Arc<dyn ApiClient>, config: &Config) -> Self {
        Self::new(api_client, config.gateway.venue.clone(), config.workflow.clone())
    }

    async fn slot(&self, id: ConversationId) -> Arc<ConversationSlot> {
        let mut conversations = self.conversations.lock().await;
        conversations
            .entry(id)
            .or_insert_with(|| Arc::new(ConversationSlot::new()))
            .clone()
    }

    /// Locks the registered slot of a conversation. A slot released while
    /// waiting for its lock is skipped in favour of a fresh one.
    async fn acquire(
        &self,
        id: ConversationId,
    ) -> (Arc<ConversationSlot>, OwnedMutexGuard<ConversationContext>) {
        loop {
            let slot = self.slot(id).await;
            let context = slot.context.clone().lock_owned().await;
            let registered = self
                .conversations
                .lock()
                .await
                .get(&id)
                .is_some_and(|current| Arc::ptr_eq(current, &slot));
            if registered {
                return (slot, context);
            }
        }
    }

    /// Drops the slot once its conversation is over. Call with the context lock held.
    async fn release_if_inactive(
        &self,
        id: ConversationId,
        slot: &Arc<ConversationSlot>,
        context: &ConversationContext,
    ) {
        if context.state.is_active() {
            return;
        }
        let mut conversations = self.conversations.lock().await;
        if conversations
            .get(&id)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
        {
            conversations.remove(&id);
            tracing::debug!(conversation = id, "Conversation released.");
        }
    }

    /// Processes one line of user input.
    ///
    /// Waits for any turn still running in the same conversation, except for
    /// `/cancel` and `/end`, which interrupt it.
    pub async fn handle(&self, id: ConversationId, text: &str) -> OutputMessage {
        let text = text.trim();
        let command = Command::parse(text);
        tracing::debug!(conversation = id, ?command, "Handling input.");

        match &command {
            Some(Command::Cancel) => return self.cancel(id).await,
            Some(Command::Start) => return self.restart(id).await,
            Some(Command::Positions) => return self.workflow.positions().await,
            Some(Command::Moon) => return self.workflow.to_the_moon().await,
            Some(Command::Help) => return OutputMessage::text(messages::help()),
            Some(Command::Unknown(name)) => {
                return OutputMessage::text(messages::unknown_command(name));
            }
            Some(Command::QuickTrade(_)) | None => {}
        }

        let (slot, mut context) = self.acquire(id).await;
        slot.cancel.reset();
        let mut cancel = slot.cancel.subscribe();

        let result = match command {
            Some(Command::QuickTrade(None)) => {
                context.clear();
                context.state = ConversationState::QuickTradeEntry;
                Ok(OutputMessage::text(messages::QUICK_TRADE_PROMPT))
            }
            Some(Command::QuickTrade(Some(args))) => {
                context.clear();
                self.workflow.quick_trade(&mut context, &args).await
            }
            _ => self.workflow.on_input(&mut context, text, &mut cancel).await,
        };
        let reply = Self::finish(id, &mut context, result);
        self.release_if_inactive(id, &slot, &context).await;
        reply
    }

    /// Ends a conversation: stops any order wait and clears its context.
    ///
    /// A pending order is not cancelled at the broker.
    pub async fn cancel(&self, id: ConversationId) -> OutputMessage {
        self.slot(id).await.cancel.cancel();
        let (slot, mut context) = self.acquire(id).await;
        context.clear();
        self.release_if_inactive(id, &slot, &context).await;
        tracing::info!(conversation = id, "Conversation cancelled.");
        OutputMessage::ended(messages::GOODBYE)
    }

    /// Starts the conversation over from START.
    pub async fn restart(&self, id: ConversationId) -> OutputMessage {
        self.slot(id).await.cancel.cancel();
        let (slot, mut context) = self.acquire(id).await;
        slot.cancel.reset();
        context.clear();
        tracing::info!(conversation = id, "Conversation started.");
        let result = self.workflow.start(&mut context).await;
        let reply = Self::finish(id, &mut context, result);
        self.release_if_inactive(id, &slot, &context).await;
        reply
    }

    /// A copy of the context of an active conversation, `None` when the
    /// conversation has ended or never started.
    pub async fn context(&self, id: ConversationId) -> Option<ConversationContext> {
        let slot = self.conversations.lock().await.get(&id).cloned()?;
        let context = slot.context.lock().await;
        Some(context.clone())
    }

    fn finish(
        id: ConversationId,
        context: &mut ConversationContext,
        result: Result<OutputMessage, EngineError>,
    ) -> OutputMessage {
        match result {
            Ok(message) => {
                if message.conversation_ended {
                    context.clear();
                }
                tracing::debug!(conversation = id, state = ?context.state, "Turn handled.");
                message
            }
            Err(e) => {
                tracing::error!(conversation = id, state = ?context.state, error = ?e, "Ending conversation after error.");
                context.clear();
                OutputMessage::ended(messages::GENERIC_FAILURE)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_client::mock::{MockApiClient, MockState};
    use core_types::{Holding, InstrumentSummary, InstrumentType, MinorUnits, OrderSide};
    use std::time::Duration;

    const CHAT: ConversationId = 42;
    const APPLE: &str = "US0378331005";

    fn engine_with(state: MockState) -> (TradeEngine, Arc<MockApiClient>) {
        let mock = Arc::new(MockApiClient::with_state(state));
        let engine = TradeEngine::new(mock.clone(), "XMUN", WorkflowConfig::default());
        (engine, mock)
    }

    fn apple_holding(quantity: u64) -> HashMap<String, Holding> {
        HashMap::from([(
            APPLE.to_string(),
            Holding {
                isin: APPLE.to_string(),
                title: "APPLE INC.".to_string(),
                quantity,
                average_buy_price: MinorUnits(1_505_000),
            },
        )])
    }

    /// Walks the guided flow up to the quantity prompt.
    async fn reach_quantity(engine: &TradeEngine, side: &str) {
        engine.handle(CHAT, "/start").await;
        engine.handle(CHAT, "Long term").await;
        engine.handle(CHAT, "Stock").await;
        engine.handle(CHAT, "apple").await;
        engine.handle(CHAT, "APPLE INC.").await;
        engine.handle(CHAT, side).await;
        assert_eq!(engine.context(CHAT).await.unwrap().state, ConversationState::QuantityEntry);
    }

    #[tokio::test(start_paused = true)]
    async fn guided_buy_reports_execution_price() {
        let (engine, mock) = engine_with(MockState::default());

        let reply = engine.handle(CHAT, "/start").await;
        assert_eq!(reply.suggested_replies, vec!["Long term"]);

        let reply = engine.handle(CHAT, "Long term").await;
        assert_eq!(reply.suggested_replies, vec!["Stock", "ETF", "Bond", "Fund", "Warrant"]);

        let reply = engine.handle(CHAT, "Stock").await;
        assert_eq!(reply.text, "What is the name of the stock you would like to trade?");

        let reply = engine.handle(CHAT, "apple").await;
        assert_eq!(reply.suggested_replies, vec!["APPLE INC.", "Other"]);

        let reply = engine.handle(CHAT, "APPLE INC.").await;
        assert_eq!(reply.suggested_replies, vec!["Buy", "Sell"]);

        let reply = engine.handle(CHAT, "Buy").await;
        assert!(reply.text.contains("€0.50"), "{}", reply.text);

        let reply = engine.handle(CHAT, "10").await;
        assert!(reply.text.contains("buy 10 share(s) of APPLE INC. at a total of €5.00"));
        assert_eq!(reply.suggested_replies, vec!["Confirm", "Cancel"]);

        let reply = engine.handle(CHAT, "Confirm").await;
        assert_eq!(
            reply.text,
            "Your order was executed at €0.52 per share. Would you like to make another trade?"
        );
        assert_eq!(
            engine.context(CHAT).await.unwrap().average_execution_price,
            Some(MinorUnits(5_200))
        );

        let reply = engine.handle(CHAT, "No").await;
        assert!(reply.conversation_ended);
        assert_eq!(reply.text, messages::GOODBYE);

        let orders = mock.created_orders().await;
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].quantity, 10);
        assert_eq!(orders[0].side, OrderSide::Buy);
        assert_eq!(orders[0].space_id, "sp_1");
        assert_eq!(mock.call_count("activate_order").await, 1);
        assert_eq!(mock.call_count("get_order").await, 1);
    }

    #[tokio::test]
    async fn closed_venue_ends_before_listing_spaces() {
        let mut state = MockState::default();
        state.venue.is_open = false;
        let (engine, mock) = engine_with(state);

        let reply = engine.handle(CHAT, "/start").await;
        assert!(reply.conversation_ended);
        assert_eq!(
            reply.text,
            "This exchange is closed at the moment. Please try again on 29/11/2021 at 08:00."
        );
        assert_eq!(mock.call_count("list_spaces").await, 0);
        assert!(engine.context(CHAT).await.is_none());
    }

    #[tokio::test]
    async fn unaffordable_buy_asks_again_without_ordering() {
        let (engine, mock) = engine_with(MockState {
            balance: MinorUnits(1_000),
            ..MockState::default()
        });
        reach_quantity(&engine, "Buy").await;

        let reply = engine.handle(CHAT, "1").await;
        assert_eq!(
            reply.text,
            "You do not have enough money, 1 share(s) of APPLE INC. cost €0.50 and your balance is €0.10. \
             Please enter a new amount."
        );
        assert!(!reply.conversation_ended);
        let context = engine.context(CHAT).await.unwrap();
        assert_eq!(context.state, ConversationState::QuantityEntry);
        assert_eq!(context.side, Some(OrderSide::Buy));
        assert_eq!(mock.call_count("create_order").await, 0);
    }

    #[tokio::test]
    async fn zero_quantity_asks_again() {
        let (engine, mock) = engine_with(MockState::default());
        reach_quantity(&engine, "Buy").await;

        let reply = engine.handle(CHAT, "0").await;
        assert_eq!(reply.text, messages::no_trade(OrderSide::Buy));
        assert_eq!(engine.context(CHAT).await.unwrap().state, ConversationState::QuantityEntry);
        assert_eq!(mock.call_count("create_order").await, 0);
    }

    #[tokio::test]
    async fn fractional_and_non_numeric_quantities_ask_again() {
        let (engine, mock) = engine_with(MockState::default());
        reach_quantity(&engine, "Buy").await;

        let reply = engine.handle(CHAT, "2.5").await;
        assert_eq!(reply.text, "Only whole shares can be traded. Please enter a new amount.");

        let reply = engine.handle(CHAT, "lots").await;
        assert_eq!(reply.text, messages::INVALID_AMOUNT);

        assert_eq!(engine.context(CHAT).await.unwrap().state, ConversationState::QuantityEntry);
        assert_eq!(mock.call_count("create_order").await, 0);
    }

    #[tokio::test]
    async fn sell_is_limited_by_holdings_and_valued_at_bid() {
        let (engine, mock) = engine_with(MockState {
            positions: apple_holding(4),
            ..MockState::default()
        });
        reach_quantity(&engine, "Sell").await;

        let reply = engine.handle(CHAT, "5").await;
        assert!(reply.text.contains("you currently own 4 share(s)"), "{}", reply.text);
        assert_eq!(mock.call_count("create_order").await, 0);

        let reply = engine.handle(CHAT, "4").await;
        assert!(reply.text.contains("sell 4 share(s) of APPLE INC. at a total of €1.96"));
        let context = engine.context(CHAT).await.unwrap();
        assert_eq!(context.state, ConversationState::OrderPlaced);
        assert_eq!(context.total_cost, Some(MinorUnits(19_600)));
        assert_eq!(context.pending_order.map(|ticket| ticket.id).as_deref(), Some("ord_1"));
    }

    #[tokio::test]
    async fn other_returns_to_the_search_prompt() {
        let (engine, mock) = engine_with(MockState::default());
        engine.handle(CHAT, "/start").await;
        engine.handle(CHAT, "Long term").await;
        engine.handle(CHAT, "Stock").await;
        engine.handle(CHAT, "apple").await;

        let reply = engine.handle(CHAT, "Other").await;
        assert_eq!(reply.text, messages::MORE_SPECIFIC);
        assert_eq!(engine.context(CHAT).await.unwrap().state, ConversationState::SearchQuery);

        let reply = engine.handle(CHAT, "apple inc").await;
        assert_eq!(reply.suggested_replies, vec!["APPLE INC.", "Other"]);
        assert_eq!(mock.call_count("search_instruments").await, 2);
    }

    #[tokio::test]
    async fn search_lists_at_most_four_results() {
        let instruments = (1..=6)
            .map(|n| InstrumentSummary {
                title: format!("FUND {}", n),
                isin: format!("DE000000000{}", n),
                instrument_type: InstrumentType::Fund,
            })
            .collect();
        let (engine, _mock) = engine_with(MockState {
            instruments,
            ..MockState::default()
        });
        engine.handle(CHAT, "/start").await;
        engine.handle(CHAT, "Long term").await;
        engine.handle(CHAT, "fund").await;

        let reply = engine.handle(CHAT, "fund").await;
        assert_eq!(
            reply.suggested_replies,
            vec!["FUND 1", "FUND 2", "FUND 3", "FUND 4", "Other"]
        );
    }

    #[tokio::test]
    async fn empty_search_asks_for_another_name() {
        let (engine, _mock) = engine_with(MockState::default());
        engine.handle(CHAT, "/start").await;
        engine.handle(CHAT, "Long term").await;
        engine.handle(CHAT, "ETF").await;

        let reply = engine.handle(CHAT, "apple").await;
        assert_eq!(reply.text, "I couldn't find any ETF matching 'apple'. Please try a different name.");
        assert_eq!(engine.context(CHAT).await.unwrap().state, ConversationState::SearchQuery);
    }

    #[tokio::test]
    async fn gateway_failure_ends_and_clears_the_conversation() {
        let (engine, mock) = engine_with(MockState::default());
        engine.handle(CHAT, "/start").await;
        engine.handle(CHAT, "Long term").await;
        engine.handle(CHAT, "Stock").await;
        engine.handle(CHAT, "apple").await;
        mock.update(|state| state.failing_operations.push("get_latest_quote")).await;

        let reply = engine.handle(CHAT, "APPLE INC.").await;
        assert!(reply.conversation_ended);
        assert_eq!(reply.text, messages::GENERIC_FAILURE);
        assert!(engine.context(CHAT).await.is_none());
    }

    #[tokio::test]
    async fn cancel_command_clears_the_context_from_any_state() {
        let (engine, _mock) = engine_with(MockState::default());
        reach_quantity(&engine, "Buy").await;

        let reply = engine.handle(CHAT, "/cancel").await;
        assert!(reply.conversation_ended);
        assert_eq!(reply.text, messages::GOODBYE);
        assert!(engine.context(CHAT).await.is_none());

        let reply = engine.handle(CHAT, "10").await;
        assert_eq!(reply.text, messages::NOT_STARTED);
    }

    #[tokio::test]
    async fn conversations_do_not_share_context() {
        let (engine, _mock) = engine_with(MockState::default());
        reach_quantity(&engine, "Buy").await;

        let reply = engine.handle(7, "10").await;
        assert_eq!(reply.text, messages::NOT_STARTED);
        assert!(engine.context(7).await.is_none());
        assert_eq!(engine.context(CHAT).await.unwrap().state, ConversationState::QuantityEntry);
    }

    #[tokio::test]
    async fn cancelling_a_placed_order_removes_it_and_offers_another_trade() {
        let (engine, mock) = engine_with(MockState::default());
        reach_quantity(&engine, "Buy").await;
        engine.handle(CHAT, "2").await;

        let reply = engine.handle(CHAT, "Cancel").await;
        assert_eq!(reply.suggested_replies, vec!["Yes", "No"]);
        assert_eq!(mock.call_count("cancel_order").await, 1);
        assert_eq!(mock.call_count("activate_order").await, 0);

        let reply = engine.handle(CHAT, "Yes").await;
        assert_eq!(reply.text, messages::choose_type());
        let context = engine.context(CHAT).await.unwrap();
        assert_eq!(context.state, ConversationState::TypeSelect);
        assert_eq!(context.selected_space_id.as_deref(), Some("sp_1"));
        assert_eq!(context.instrument_isin, None);
    }

    #[tokio::test]
    async fn rejection_at_submission_ends_without_activation() {
        let (engine, mock) = engine_with(MockState {
            create_status: core_types::OrderStatus::Rejected,
            positions: apple_holding(4),
            ..MockState::default()
        });
        reach_quantity(&engine, "Sell").await;

        let reply = engine.handle(CHAT, "4").await;
        assert!(reply.conversation_ended);
        assert_eq!(reply.text, messages::ORDER_REJECTED);
        assert_eq!(mock.call_count("activate_order").await, 0);
        assert_eq!(mock.call_count("get_order").await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unexecuted_order_reports_delay_after_timeout() {
        let (engine, mock) = engine_with(MockState {
            executed_on_poll: None,
            ..MockState::default()
        });
        reach_quantity(&engine, "Buy").await;
        engine.handle(CHAT, "1").await;

        let reply = engine.handle(CHAT, "Confirm").await;
        assert!(reply.conversation_ended);
        assert_eq!(reply.text, messages::ORDER_DELAYED);
        assert_eq!(mock.call_count("cancel_order").await, 1);
        assert!(engine.context(CHAT).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn failing_status_lookups_cancel_and_warn_of_a_late_fill() {
        let (engine, mock) = engine_with(MockState {
            failing_polls: 10,
            ..MockState::default()
        });
        reach_quantity(&engine, "Buy").await;
        engine.handle(CHAT, "1").await;

        let reply = engine.handle(CHAT, "Confirm").await;
        assert!(reply.conversation_ended);
        assert_eq!(reply.text, messages::ORDER_STATUS_UNKNOWN);
        assert_eq!(mock.call_count("activate_order").await, 1);
        assert_eq!(mock.call_count("get_order").await, 3);
        assert_eq!(mock.call_count("cancel_order").await, 1);
        assert!(engine.context(CHAT).await.is_none());
    }

    #[tokio::test]
    async fn finished_conversations_release_their_slot() {
        let (engine, _mock) = engine_with(MockState::default());

        engine.handle(CHAT, "/start").await;
        engine.handle(7, "hello").await;
        assert_eq!(engine.conversations.lock().await.len(), 1);

        engine.handle(CHAT, "/cancel").await;
        assert!(engine.conversations.lock().await.is_empty());

        let reply = engine.handle(CHAT, "/start").await;
        assert_eq!(reply.suggested_replies, vec!["Long term"]);
        assert_eq!(engine.context(CHAT).await.unwrap().state, ConversationState::SpaceSelect);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_a_pending_order_wait() {
        let (engine, mock) = engine_with(MockState {
            executed_on_poll: None,
            ..MockState::default()
        });
        let engine = Arc::new(engine);
        reach_quantity(&engine, "Buy").await;
        engine.handle(CHAT, "1").await;

        let waiting = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.handle(CHAT, "Confirm").await })
        };
        tokio::time::sleep(Duration::from_secs(5)).await;

        let cancelled = engine.handle(CHAT, "/cancel").await;
        assert_eq!(cancelled.text, messages::GOODBYE);

        let reply = waiting.await.unwrap();
        assert!(reply.conversation_ended);
        assert_eq!(reply.text, messages::STOPPED_WAITING);
        assert_eq!(mock.call_count("cancel_order").await, 0);
        assert!(engine.context(CHAT).await.is_none());
    }

    #[tokio::test]
    async fn malformed_quick_trade_makes_no_gateway_call() {
        let (engine, mock) = engine_with(MockState::default());

        let reply = engine.handle(CHAT, "/quicktrade buy 5 apple").await;
        assert!(reply.conversation_ended);
        assert_eq!(reply.text, messages::QUICK_TRADE_USAGE);
        assert!(mock.calls().await.is_empty());
    }

    #[tokio::test]
    async fn bare_quicktrade_prompts_for_the_trade() {
        let (engine, mock) = engine_with(MockState::default());

        let reply = engine.handle(CHAT, "/quicktrade").await;
        assert_eq!(reply.text, messages::QUICK_TRADE_PROMPT);
        assert_eq!(engine.context(CHAT).await.unwrap().state, ConversationState::QuickTradeEntry);

        let reply = engine.handle(CHAT, "buy 5 apple").await;
        assert!(reply.conversation_ended);
        assert!(mock.calls().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn quick_trade_joins_the_confirmation_pipeline() {
        let (engine, mock) = engine_with(MockState::default());

        let reply = engine.handle(CHAT, "/quicktrade buy 5 apple shares").await;
        assert!(reply.text.contains("buy 5 share(s) of APPLE INC. at a total of €2.50"));
        assert_eq!(reply.suggested_replies, vec!["Confirm", "Cancel"]);

        let reply = engine.handle(CHAT, "Confirm").await;
        assert!(reply.text.starts_with("Your order was executed at €0.52"));
        assert_eq!(mock.created_orders().await[0].quantity, 5);
    }

    #[tokio::test]
    async fn quick_trade_without_funds_ends_without_ordering() {
        let (engine, mock) = engine_with(MockState {
            balance: MinorUnits(1_000),
            ..MockState::default()
        });

        let reply = engine.handle(CHAT, "/quicktrade buy 1 apple stock").await;
        assert!(reply.conversation_ended);
        assert!(reply.text.starts_with("You do not have enough money"));
        assert_eq!(mock.call_count("create_order").await, 0);
    }

    #[tokio::test]
    async fn quick_trade_for_unknown_instrument_ends() {
        let (engine, mock) = engine_with(MockState::default());

        let reply = engine.handle(CHAT, "/quicktrade buy 1 banana stock").await;
        assert!(reply.conversation_ended);
        assert_eq!(reply.text, messages::INSTRUMENT_NOT_FOUND);
        assert_eq!(mock.call_count("get_latest_quote").await, 0);
    }

    #[tokio::test]
    async fn positions_do_not_touch_the_conversation() {
        let (engine, _mock) = engine_with(MockState {
            positions: apple_holding(10),
            ..MockState::default()
        });
        reach_quantity(&engine, "Buy").await;

        let reply = engine.handle(CHAT, "/positions").await;
        assert_eq!(
            reply.text,
            "Name: APPLE INC.\nQuantity: 10\nAverage Price: €150.50"
        );
        assert_eq!(engine.context(CHAT).await.unwrap().state, ConversationState::QuantityEntry);
    }

    #[tokio::test]
    async fn moon_names_a_meme_stock() {
        let instruments = portfolio::MEME_ISINS
            .iter()
            .map(|isin| InstrumentSummary {
                title: format!("MEME {}", isin),
                isin: isin.to_string(),
                instrument_type: InstrumentType::Stock,
            })
            .collect();
        let (engine, _mock) = engine_with(MockState {
            instruments,
            ..MockState::default()
        });

        let reply = engine.handle(CHAT, "/moon").await;
        assert!(reply.text.starts_with("MEME "), "{}", reply.text);
        assert!(reply.text.ends_with("to the moon 🚀"));
    }
}
