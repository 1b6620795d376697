use core_types::{InstrumentType, MinorUnits, OrderSide, OrderTicket};

/// The input a conversation is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversationState {
    /// Never started.
    #[default]
    Start,
    SpaceSelect,
    TypeSelect,
    SearchQuery,
    InstrumentSelect,
    SideSelect,
    QuantityEntry,
    /// An inactive order exists; waiting for Confirm or Cancel.
    OrderPlaced,
    /// Waiting for "another trade?" Yes or No.
    Confirmation,
    /// Waiting for the four quick-trade tokens.
    QuickTradeEntry,
    End,
}

impl ConversationState {
    /// `true` while a trade conversation is in progress.
    pub fn is_active(&self) -> bool {
        !matches!(self, ConversationState::Start | ConversationState::End)
    }
}

/// Everything collected during one conversation.
///
/// Market figures (`bid_price`, `ask_price`, `balance`, `shares_owned`) are
/// refreshed from the gateway on every turn that uses them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationContext {
    pub state: ConversationState,
    pub selected_space_id: Option<String>,
    pub instrument_type: Option<InstrumentType>,
    pub search_query: Option<String>,
    pub instrument_isin: Option<String>,
    pub instrument_title: Option<String>,
    pub side: Option<OrderSide>,
    pub quantity: Option<u64>,
    pub bid_price: Option<MinorUnits>,
    pub ask_price: Option<MinorUnits>,
    pub balance: Option<MinorUnits>,
    pub shares_owned: u64,
    /// Always `quantity * price` where price is the ask for buys and the bid for sells.
    pub total_cost: Option<MinorUnits>,
    /// The created, not yet settled order.
    pub pending_order: Option<OrderTicket>,
    pub average_execution_price: Option<MinorUnits>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The price a trade on the current side is valued at.
    pub fn trade_price(&self) -> Option<MinorUnits> {
        match self.side? {
            OrderSide::Buy => self.ask_price,
            OrderSide::Sell => self.bid_price,
        }
    }

    /// Drops every collected value and ends the conversation.
    pub fn clear(&mut self) {
        *self = Self {
            state: ConversationState::End,
            ..Self::default()
        };
    }

    /// Forgets the finished trade but keeps the selected space, ready for
    /// another trade in the same conversation.
    pub fn reset_trade(&mut self) {
        let selected_space_id = self.selected_space_id.take();
        *self = Self {
            state: ConversationState::TypeSelect,
            selected_space_id,
            ..Self::default()
        };
    }
}
