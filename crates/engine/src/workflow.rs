use crate::context::{ConversationContext, ConversationState};
use crate::error::EngineError;
use crate::messages::{self, OutputMessage};
use crate::quick_trade::parse_quick_trade;
use api_client::ApiClient;
use configuration::WorkflowConfig;
use core_types::{InstrumentSummary, InstrumentType, MinorUnits, OrderSide};
use executor::{CancelSignal, ExecutorError, OrderController, PollOutcome, PollSettings};
use risk::QuantityDecision;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

/// The trade conversation state machine.
///
/// Each method handles one user turn for the state it is named after and
/// leaves `ConversationContext::state` at the input expected next. Gateway
/// failures are returned as errors; the caller turns them into the generic
/// failure message and clears the context.
pub(crate) struct Workflow {
    pub(crate) api_client: Arc<dyn ApiClient>,
    venue: String,
    orders: OrderController,
    settings: WorkflowConfig,
}

impl Workflow {
    pub(crate) fn new(api_client: Arc<dyn ApiClient>, venue: String, settings: WorkflowConfig) -> Self {
        let orders = OrderController::new(
            api_client.clone(),
            venue.clone(),
            PollSettings::from_config(&settings),
        );
        Self {
            api_client,
            venue,
            orders,
            settings,
        }
    }

    /// START: greets and offers the spaces, unless the venue is closed.
    pub(crate) async fn start(&self, context: &mut ConversationContext) -> Result<OutputMessage, EngineError> {
        if let Some(closed) = self.venue_closed_message().await? {
            context.clear();
            return Ok(OutputMessage::ended(closed));
        }
        let names = self.space_names().await?;
        context.state = ConversationState::SpaceSelect;
        Ok(OutputMessage::with_replies(messages::choose_space(), names))
    }

    /// Dispatches a non-command turn on the current state.
    pub(crate) async fn on_input(
        &self,
        context: &mut ConversationContext,
        text: &str,
        cancel: &mut CancelSignal,
    ) -> Result<OutputMessage, EngineError> {
        match context.state {
            ConversationState::Start | ConversationState::End => {
                Ok(OutputMessage::text(messages::NOT_STARTED))
            }
            ConversationState::SpaceSelect => self.select_space(context, text).await,
            ConversationState::TypeSelect => Ok(self.select_type(context, text)),
            ConversationState::SearchQuery => self.search(context, text).await,
            ConversationState::InstrumentSelect => self.select_instrument(context, text).await,
            ConversationState::SideSelect => self.select_side(context, text),
            ConversationState::QuantityEntry => self.enter_quantity(context, text).await,
            ConversationState::OrderPlaced => self.decide_order(context, text, cancel).await,
            ConversationState::Confirmation => Ok(self.another_trade(context, text)),
            ConversationState::QuickTradeEntry => self.quick_trade(context, text).await,
        }
    }

    async fn venue_closed_message(&self) -> Result<Option<String>, EngineError> {
        if self.api_client.is_venue_open(&self.venue).await? {
            return Ok(None);
        }
        let day = self.api_client.next_opening_day(&self.venue).await?;
        let time = self.api_client.next_opening_time(&self.venue).await?;
        tracing::info!(venue = %self.venue, next_opening_day = %day, "Venue closed.");
        Ok(Some(messages::venue_closed(day, time)))
    }

    async fn space_names(&self) -> Result<Vec<String>, EngineError> {
        let spaces = self.api_client.list_spaces().await?;
        if spaces.is_empty() {
            return Err(EngineError::NoSpace);
        }
        Ok(spaces.into_iter().map(|space| space.name).collect())
    }

    /// The configured default space, else the first listed one.
    pub(crate) async fn default_space(&self) -> Result<String, EngineError> {
        if let Some(id) = &self.settings.default_space_id {
            return Ok(id.clone());
        }
        self.api_client
            .list_spaces()
            .await?
            .into_iter()
            .next()
            .map(|space| space.id)
            .ok_or(EngineError::NoSpace)
    }

    async fn select_space(
        &self,
        context: &mut ConversationContext,
        text: &str,
    ) -> Result<OutputMessage, EngineError> {
        let spaces = self.api_client.list_spaces().await?;
        let chosen = spaces
            .iter()
            .find(|space| space.name.eq_ignore_ascii_case(text) || space.id == text);

        match chosen {
            Some(space) => {
                tracing::debug!(space_id = %space.id, "Space selected.");
                context.selected_space_id = Some(space.id.clone());
                context.state = ConversationState::TypeSelect;
                Ok(OutputMessage::with_replies(messages::choose_type(), messages::type_labels()))
            }
            None => Ok(OutputMessage::with_replies(
                "Please choose one of your spaces.",
                spaces.into_iter().map(|space| space.name),
            )),
        }
    }

    fn select_type(&self, context: &mut ConversationContext, text: &str) -> OutputMessage {
        match InstrumentType::from_str(text) {
            Ok(instrument_type) => {
                context.instrument_type = Some(instrument_type);
                context.state = ConversationState::SearchQuery;
                OutputMessage::text(messages::ask_search_query(instrument_type))
            }
            Err(_) => OutputMessage::with_replies(
                "Please choose one of the offered instrument types.",
                messages::type_labels(),
            ),
        }
    }

    async fn search_results(
        &self,
        query: &str,
        instrument_type: InstrumentType,
    ) -> Result<Vec<InstrumentSummary>, EngineError> {
        let mut results = self.api_client.search_instruments(query, instrument_type).await?;
        results.truncate(self.settings.max_search_results);
        Ok(results)
    }

    fn instrument_choices(results: &[InstrumentSummary]) -> OutputMessage {
        let mut replies: Vec<String> = results.iter().map(|i| i.title.clone()).collect();
        replies.push(messages::OTHER.to_string());
        OutputMessage::with_replies(messages::choose_instrument(), replies)
    }

    /// SEARCH_QUERY → INSTRUMENT_SELECT: runs the search and lists the hits.
    async fn search(
        &self,
        context: &mut ConversationContext,
        text: &str,
    ) -> Result<OutputMessage, EngineError> {
        let instrument_type = context
            .instrument_type
            .ok_or(EngineError::MissingContext("instrument type"))?;
        if text.is_empty() {
            return Ok(OutputMessage::text(messages::ask_search_query(instrument_type)));
        }

        let query = text.to_lowercase();
        let results = self.search_results(&query, instrument_type).await?;
        if results.is_empty() {
            return Ok(OutputMessage::text(messages::no_search_results(text, instrument_type)));
        }

        context.search_query = Some(query);
        context.state = ConversationState::InstrumentSelect;
        Ok(Self::instrument_choices(&results))
    }

    /// INSTRUMENT_SELECT → SIDE_SELECT. The search is re-run so the ISIN is
    /// taken from current data rather than from the previous turn.
    async fn select_instrument(
        &self,
        context: &mut ConversationContext,
        text: &str,
    ) -> Result<OutputMessage, EngineError> {
        if text.eq_ignore_ascii_case(messages::OTHER) {
            context.search_query = None;
            context.state = ConversationState::SearchQuery;
            return Ok(OutputMessage::text(messages::MORE_SPECIFIC));
        }

        let instrument_type = context
            .instrument_type
            .ok_or(EngineError::MissingContext("instrument type"))?;
        let query = context
            .search_query
            .clone()
            .ok_or(EngineError::MissingContext("search query"))?;
        let results = self.search_results(&query, instrument_type).await?;

        let Some(instrument) = results.iter().find(|i| i.title.eq_ignore_ascii_case(text)) else {
            return Ok(Self::instrument_choices(&results));
        };

        tracing::debug!(isin = %instrument.isin, title = %instrument.title, "Instrument selected.");
        context.instrument_isin = Some(instrument.isin.clone());
        context.instrument_title = Some(instrument.title.clone());
        self.refresh_market(context).await?;
        context.state = ConversationState::SideSelect;
        Ok(OutputMessage::with_replies(
            messages::choose_side(&instrument.title),
            [messages::BUY, messages::SELL],
        ))
    }

    /// Fetches the quote, the space's balance and the shares held.
    async fn refresh_market(&self, context: &mut ConversationContext) -> Result<(), EngineError> {
        let isin = context
            .instrument_isin
            .clone()
            .ok_or(EngineError::MissingContext("instrument"))?;
        let space_id = context
            .selected_space_id
            .clone()
            .ok_or(EngineError::MissingContext("space"))?;

        let (quote, balance, positions) = tokio::try_join!(
            self.api_client.get_latest_quote(&isin),
            self.api_client.get_account_balance(&space_id),
            self.api_client.get_positions(&space_id),
        )?;

        context.bid_price = Some(quote.bid);
        context.ask_price = Some(quote.ask);
        context.balance = Some(balance);
        context.shares_owned = positions.get(&isin).map_or(0, |holding| holding.quantity);
        Ok(())
    }

    fn select_side(&self, context: &mut ConversationContext, text: &str) -> Result<OutputMessage, EngineError> {
        let title = context
            .instrument_title
            .clone()
            .ok_or(EngineError::MissingContext("instrument"))?;
        let Ok(side) = OrderSide::from_str(text) else {
            return Ok(OutputMessage::with_replies(
                messages::choose_side(&title),
                [messages::BUY, messages::SELL],
            ));
        };

        context.side = Some(side);
        let price = context.trade_price().ok_or(EngineError::MissingContext("quote"))?;
        let balance = context.balance.ok_or(EngineError::MissingContext("balance"))?;
        context.state = ConversationState::QuantityEntry;
        Ok(OutputMessage::text(messages::ask_quantity(
            side,
            price,
            balance,
            context.shares_owned,
        )))
    }

    /// QUANTITY_ENTRY: validates against fresh market data. Every failed check
    /// asks again with the side kept.
    async fn enter_quantity(
        &self,
        context: &mut ConversationContext,
        text: &str,
    ) -> Result<OutputMessage, EngineError> {
        let side = context.side.ok_or(EngineError::MissingContext("side"))?;
        let Ok(requested) = risk::parse_quantity(text) else {
            return Ok(OutputMessage::text(messages::INVALID_AMOUNT));
        };
        if requested.is_zero() {
            return Ok(OutputMessage::text(messages::no_trade(side)));
        }

        self.refresh_market(context).await?;
        let price = context.trade_price().ok_or(EngineError::MissingContext("quote"))?;
        let balance = context.balance.ok_or(EngineError::MissingContext("balance"))?;
        let title = context.instrument_title.clone().unwrap_or_default();

        match risk::evaluate_quantity(requested, side, price, balance, context.shares_owned) {
            QuantityDecision::NoTrade => Ok(OutputMessage::text(messages::no_trade(side))),
            QuantityDecision::Rejected(rejection) => {
                tracing::debug!(?rejection, "Quantity rejected.");
                Ok(OutputMessage::text(messages::rejection(&rejection, &title)))
            }
            QuantityDecision::Approved { quantity, total_cost } => {
                self.place_order(context, quantity, total_cost).await
            }
        }
    }

    /// Creates the inactive order and asks for confirmation.
    async fn place_order(
        &self,
        context: &mut ConversationContext,
        quantity: u64,
        total_cost: MinorUnits,
    ) -> Result<OutputMessage, EngineError> {
        let side = context.side.ok_or(EngineError::MissingContext("side"))?;
        let isin = context
            .instrument_isin
            .clone()
            .ok_or(EngineError::MissingContext("instrument"))?;
        let space_id = context
            .selected_space_id
            .clone()
            .ok_or(EngineError::MissingContext("space"))?;
        let title = context.instrument_title.clone().unwrap_or_default();

        let ticket = match self.orders.place(&isin, side, quantity, &space_id).await {
            Ok(ticket) => ticket,
            Err(ExecutorError::Rejected { .. }) => {
                context.clear();
                return Ok(OutputMessage::ended(messages::ORDER_REJECTED));
            }
            Err(e) => return Err(e.into()),
        };

        context.quantity = Some(quantity);
        context.total_cost = Some(total_cost);
        context.pending_order = Some(ticket);
        context.state = ConversationState::OrderPlaced;
        Ok(OutputMessage::with_replies(
            messages::order_summary(side, quantity, &title, total_cost),
            [messages::CONFIRM, messages::CANCEL],
        ))
    }

    /// ORDER_PLACED → CONFIRMATION: activates and waits, or drops the order.
    async fn decide_order(
        &self,
        context: &mut ConversationContext,
        text: &str,
        cancel: &mut CancelSignal,
    ) -> Result<OutputMessage, EngineError> {
        if text.eq_ignore_ascii_case(messages::CONFIRM) {
            return self.execute_order(context, cancel).await;
        }
        if !text.eq_ignore_ascii_case(messages::CANCEL) {
            return Ok(OutputMessage::with_replies(
                messages::confirm_or_cancel(),
                [messages::CONFIRM, messages::CANCEL],
            ));
        }

        if let Some(mut ticket) = context.pending_order.take() {
            self.orders.cancel_best_effort(&mut ticket).await;
        }
        context.state = ConversationState::Confirmation;
        Ok(OutputMessage::with_replies(messages::order_cancelled(), [messages::YES, messages::NO]))
    }

    async fn execute_order(
        &self,
        context: &mut ConversationContext,
        cancel: &mut CancelSignal,
    ) -> Result<OutputMessage, EngineError> {
        let mut ticket = context
            .pending_order
            .take()
            .ok_or(EngineError::MissingContext("order"))?;

        match self.orders.activate(&mut ticket).await {
            Ok(_) => {}
            Err(ExecutorError::Rejected { .. }) => {
                context.clear();
                return Ok(OutputMessage::ended(messages::ORDER_REJECTED));
            }
            Err(e) => return Err(e.into()),
        }

        let outcome = self
            .orders
            .poll_until_terminal(&mut ticket, self.settings.poll_timeout(), cancel)
            .await?;

        let ending = match outcome {
            PollOutcome::Executed { price, .. } => {
                context.average_execution_price = price;
                context.state = ConversationState::Confirmation;
                return Ok(OutputMessage::with_replies(
                    messages::order_executed(price),
                    [messages::YES, messages::NO],
                ));
            }
            PollOutcome::TimedOut => messages::ORDER_DELAYED,
            PollOutcome::StatusUnknown { .. } => messages::ORDER_STATUS_UNKNOWN,
            PollOutcome::Rejected => messages::ORDER_REJECTED,
            PollOutcome::CancelledAtBroker => messages::ORDER_CANCELLED_BY_BROKER,
            PollOutcome::Cancelled => messages::STOPPED_WAITING,
        };
        context.clear();
        Ok(OutputMessage::ended(ending))
    }

    /// CONFIRMATION: Yes starts another trade in the same space, No ends.
    fn another_trade(&self, context: &mut ConversationContext, text: &str) -> OutputMessage {
        if text.eq_ignore_ascii_case(messages::YES) {
            context.reset_trade();
            OutputMessage::with_replies(messages::choose_type(), messages::type_labels())
        } else if text.eq_ignore_ascii_case(messages::NO) {
            context.clear();
            OutputMessage::ended(messages::GOODBYE)
        } else {
            OutputMessage::with_replies(messages::another_trade(), [messages::YES, messages::NO])
        }
    }

    /// Runs a whole quick trade up to ORDER_PLACED. Any malformed command or
    /// failed check ends the conversation.
    pub(crate) async fn quick_trade(
        &self,
        context: &mut ConversationContext,
        text: &str,
    ) -> Result<OutputMessage, EngineError> {
        let trade = match parse_quick_trade(text) {
            Ok(trade) => trade,
            Err(e) => {
                tracing::info!(error = %e, "Malformed quick trade.");
                context.clear();
                return Ok(OutputMessage::ended(messages::QUICK_TRADE_USAGE));
            }
        };

        if let Some(closed) = self.venue_closed_message().await? {
            context.clear();
            return Ok(OutputMessage::ended(closed));
        }

        let space_id = self.default_space().await?;
        let results = self.search_results(&trade.search, trade.instrument_type).await?;
        let Some(instrument) = results.into_iter().next() else {
            context.clear();
            return Ok(OutputMessage::ended(messages::INSTRUMENT_NOT_FOUND));
        };
        tracing::info!(isin = %instrument.isin, side = %trade.side, quantity = trade.quantity, "Quick trade parsed.");

        context.selected_space_id = Some(space_id);
        context.instrument_type = Some(trade.instrument_type);
        context.search_query = Some(trade.search);
        context.instrument_isin = Some(instrument.isin);
        context.instrument_title = Some(instrument.title.clone());
        context.side = Some(trade.side);
        self.refresh_market(context).await?;

        let price = context.trade_price().ok_or(EngineError::MissingContext("quote"))?;
        let balance = context.balance.ok_or(EngineError::MissingContext("balance"))?;
        match risk::evaluate_quantity(
            Decimal::from(trade.quantity),
            trade.side,
            price,
            balance,
            context.shares_owned,
        ) {
            QuantityDecision::Approved { quantity, total_cost } => {
                self.place_order(context, quantity, total_cost).await
            }
            QuantityDecision::Rejected(rejection) => {
                context.clear();
                Ok(OutputMessage::ended(messages::quick_trade_rejection(
                    &rejection,
                    &instrument.title,
                )))
            }
            QuantityDecision::NoTrade => {
                context.clear();
                Ok(OutputMessage::ended(messages::QUICK_TRADE_USAGE))
            }
        }
    }
}
