use chrono::{NaiveDate, NaiveTime};
use core_types::{InstrumentType, MinorUnits, OrderSide};
use risk::Rejection;

/// What the engine says back for one user turn.
///
/// `suggested_replies` are semantic choices; rendering them is left to the
/// transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputMessage {
    pub text: String,
    pub suggested_replies: Vec<String>,
    /// The conversation reached its end with this message.
    pub conversation_ended: bool,
}

impl OutputMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            suggested_replies: Vec::new(),
            conversation_ended: false,
        }
    }

    pub fn with_replies<I, S>(text: impl Into<String>, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            text: text.into(),
            suggested_replies: replies.into_iter().map(Into::into).collect(),
            conversation_ended: false,
        }
    }

    pub fn ended(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            suggested_replies: Vec::new(),
            conversation_ended: true,
        }
    }
}

pub const CONFIRM: &str = "Confirm";
pub const CANCEL: &str = "Cancel";
pub const YES: &str = "Yes";
pub const NO: &str = "No";
pub const OTHER: &str = "Other";
pub const BUY: &str = "Buy";
pub const SELL: &str = "Sell";

pub const GENERIC_FAILURE: &str =
    "There was an error, ending the conversation. If you'd like to try again, send /start.";
pub const GOODBYE: &str = "Bye! Come back and send /start if you would like to make any other trades.";
pub const NOT_STARTED: &str = "Send /start or /trade to place a trade, or /help to see what I can do.";
pub const QUICK_TRADE_PROMPT: &str =
    "Please specify your quick trade in the following format: 'buy 5 apple stock'";
pub const QUICK_TRADE_USAGE: &str =
    "A quick trade must be placed in the following format: '/quicktrade buy 5 apple stock'";
pub const INSTRUMENT_NOT_FOUND: &str =
    "Instrument not found, please be more specific. Use /start to try again.";
pub const MORE_SPECIFIC: &str = "Please be more specific in your search query.";
pub const INVALID_AMOUNT: &str = "You've entered an invalid amount. Please try again.";
pub const ORDER_REJECTED: &str =
    "Your order was rejected, you may not have sufficient holdings. Ending the conversation.";
pub const ORDER_DELAYED: &str = "We're currently experiencing some delays. Your order was not executed. \
     Please try again later.";
pub const ORDER_CANCELLED_BY_BROKER: &str =
    "Your order was cancelled by the exchange. Ending the conversation.";
pub const ORDER_STATUS_UNKNOWN: &str = "We could not confirm the status of your order. It may still be \
     executed by the exchange, please check your positions later.";
pub const STOPPED_WAITING: &str = "Stopped waiting for your order. It may still be executed by the exchange.";
pub const NO_POSITIONS: &str = "You don't have any open positions.";
pub const POSITIONS_FAILED: &str = "Your positions could not be loaded. Please try again later.";
pub const MOON_FAILED: &str = "The moon is out of reach right now. Please try again later.";

pub fn help() -> String {
    "I'm the Lemon Trader Bot! I can place trades for you using the lemon.markets API. \
     You can control me by sending these commands:\n\n\
     /trade - place trade\n\
     /quicktrade - place shortform trade\n\
     /positions - list your positions\n\
     /moon - meme stock generator\n\
     /cancel - stop the current conversation"
        .to_string()
}

pub fn unknown_command(command: &str) -> String {
    format!("I don't know the command {}.\n\n{}", command, help())
}

pub fn venue_closed(opening_day: NaiveDate, opening_time: NaiveTime) -> String {
    format!(
        "This exchange is closed at the moment. Please try again on {} at {}.",
        opening_day.format("%d/%m/%Y"),
        opening_time.format("%H:%M")
    )
}

pub fn choose_space() -> String {
    format!("{}\n\nWhich space would you like to trade with?", help())
}

pub fn choose_type() -> String {
    "What type of instrument do you want to trade?".to_string()
}

pub fn type_labels() -> Vec<String> {
    InstrumentType::ALL.iter().map(|t| t.label().to_string()).collect()
}

fn noun(instrument_type: InstrumentType) -> &'static str {
    match instrument_type {
        InstrumentType::Etf => "ETF",
        other => other.as_str(),
    }
}

pub fn ask_search_query(instrument_type: InstrumentType) -> String {
    format!(
        "What is the name of the {} you would like to trade?",
        noun(instrument_type)
    )
}

pub fn no_search_results(query: &str, instrument_type: InstrumentType) -> String {
    format!(
        "I couldn't find any {} matching '{}'. Please try a different name.",
        noun(instrument_type),
        query
    )
}

pub fn choose_instrument() -> String {
    "Please choose the instrument you wish to trade. If you do not see the desired instrument, press \"Other\"."
        .to_string()
}

pub fn choose_side(title: &str) -> String {
    format!("Would you like to buy or sell {}?", title)
}

pub fn ask_quantity(side: OrderSide, price: MinorUnits, balance: MinorUnits, shares_owned: u64) -> String {
    match side {
        OrderSide::Buy => format!(
            "This instrument is currently trading for €{}, your total balance is €{}. \
             How many shares do you wish to buy?",
            price, balance
        ),
        OrderSide::Sell => format!(
            "This instrument can be sold for €{}, you currently own {} share(s). \
             How many shares do you wish to sell?",
            price, shares_owned
        ),
    }
}

pub fn no_trade(side: OrderSide) -> String {
    format!(
        "You have indicated you do not wish to {} any shares, type /cancel to abort this process \
         or enter a new amount.",
        side
    )
}

fn rejection_reason(rejection: &Rejection, title: &str) -> String {
    match rejection {
        Rejection::NotPositive(_) => "You've entered an invalid amount.".to_string(),
        Rejection::Fractional(_) => "Only whole shares can be traded.".to_string(),
        Rejection::Unaffordable {
            quantity,
            required: Some(required),
            available,
        } => format!(
            "You do not have enough money, {} share(s) of {} cost €{} and your balance is €{}.",
            quantity, title, required, available
        ),
        Rejection::Unaffordable {
            quantity,
            required: None,
            available,
        } => format!(
            "You do not have enough money to buy {} share(s) of {}, your balance is €{}.",
            quantity, title, available
        ),
        Rejection::InsufficientHoldings { owned, .. } => format!(
            "You do not have enough shares of {}, you currently own {} share(s).",
            title, owned
        ),
    }
}

/// A failed quantity check in the guided flow, which asks again.
pub fn rejection(rejection: &Rejection, title: &str) -> String {
    format!("{} Please enter a new amount.", rejection_reason(rejection, title))
}

/// A failed quantity check in a quick trade, which ends the conversation.
pub fn quick_trade_rejection(rejection: &Rejection, title: &str) -> String {
    format!("{} Use /quicktrade to try again.", rejection_reason(rejection, title))
}

pub fn order_summary(side: OrderSide, quantity: u64, title: &str, total_cost: MinorUnits) -> String {
    format!(
        "You've indicated that you wish to {} {} share(s) of {} at a total of €{}. \
         Please confirm or cancel your order to continue.",
        side, quantity, title, total_cost
    )
}

pub fn order_cancelled() -> String {
    "You've cancelled your order. Would you like to make another trade?".to_string()
}

pub fn order_executed(price: Option<MinorUnits>) -> String {
    match price {
        Some(price) => format!(
            "Your order was executed at €{} per share. Would you like to make another trade?",
            price
        ),
        None => "Your order was executed. Would you like to make another trade?".to_string(),
    }
}

pub fn confirm_or_cancel() -> String {
    "Please confirm or cancel your order to continue.".to_string()
}

pub fn another_trade() -> String {
    "Would you like to make another trade?".to_string()
}
