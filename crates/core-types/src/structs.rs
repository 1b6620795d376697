use crate::enums::{InstrumentType, OrderExpiry, OrderSide, OrderStatus};
use crate::money::MinorUnits;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// A search hit. Never cached beyond the turn that fetched it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentSummary {
    pub title: String,
    pub isin: String,
    pub instrument_type: InstrumentType,
}

/// Latest top-of-book for one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub isin: String,
    pub bid: MinorUnits,
    pub ask: MinorUnits,
}

/// A position held in one space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub isin: String,
    pub title: String,
    pub quantity: u64,
    pub average_buy_price: MinorUnits,
}

/// A tradeable sub-account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceSummary {
    pub id: String,
    pub name: String,
}

/// Opening state of a trading venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueStatus {
    pub mic: String,
    pub is_open: bool,
    pub next_opening_day: NaiveDate,
    pub opening_time: NaiveTime,
}

/// Everything the broker needs to create an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub isin: String,
    pub side: OrderSide,
    pub quantity: u64,
    pub venue: String,
    pub expiry: OrderExpiry,
    pub space_id: String,
}

/// The broker's acknowledgement of a created order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAck {
    pub id: String,
    pub status: OrderStatus,
}

/// A status lookup result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub id: String,
    pub status: OrderStatus,
    pub executed_price: Option<MinorUnits>,
}

/// One submitted order, owned by the order controller for its whole lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTicket {
    pub id: String,
    pub isin: String,
    pub side: OrderSide,
    pub quantity: u64,
    pub venue: String,
    pub expiry: OrderExpiry,
    pub status: OrderStatus,
    pub executed_price: Option<MinorUnits>,
}

impl OrderTicket {
    pub fn from_ack(request: &OrderRequest, ack: OrderAck) -> Self {
        Self {
            id: ack.id,
            isin: request.isin.clone(),
            side: request.side,
            quantity: request.quantity,
            venue: request.venue.clone(),
            expiry: request.expiry,
            status: ack.status,
            executed_price: None,
        }
    }
}
