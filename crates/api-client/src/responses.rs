use crate::error::ApiError;
use chrono::{NaiveDate, NaiveTime};
use core_types::{
    Holding, InstrumentSummary, InstrumentType, MinorUnits, OrderAck, OrderSnapshot, OrderStatus,
    Quote, SpaceSummary, VenueStatus,
};
use serde::Deserialize;
use std::str::FromStr;

// All monetary fields are requested with `decimals=false`, so they arrive as
// integers in 1/10,000 of the currency unit and map straight onto `MinorUnits`.

/// The envelope every successful response is wrapped in.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub results: T,
}

/// A single venue from `GET venues/?mic=...`.
#[derive(Debug, Clone, Deserialize)]
pub struct VenueResponse {
    pub mic: String,
    pub is_open: bool,
    pub opening_hours: OpeningHours,
    pub opening_days: Vec<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpeningHours {
    /// Local opening time, "HH:MM".
    pub start: String,
    pub end: String,
    pub timezone: String,
}

impl TryFrom<VenueResponse> for VenueStatus {
    type Error = ApiError;

    fn try_from(venue: VenueResponse) -> Result<Self, Self::Error> {
        let next_opening_day = venue.opening_days.first().copied().ok_or_else(|| {
            ApiError::InvalidData(format!("venue {} lists no opening days", venue.mic))
        })?;
        let opening_time = NaiveTime::parse_from_str(&venue.opening_hours.start, "%H:%M")
            .map_err(|e| {
                ApiError::InvalidData(format!(
                    "invalid opening time '{}': {}",
                    venue.opening_hours.start, e
                ))
            })?;
        Ok(VenueStatus {
            mic: venue.mic,
            is_open: venue.is_open,
            next_opening_day,
            opening_time,
        })
    }
}

/// A single hit from `GET instruments/`.
#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentResponse {
    pub isin: String,
    pub title: String,
    #[serde(rename = "type")]
    pub instrument_type: String,
}

impl TryFrom<InstrumentResponse> for InstrumentSummary {
    type Error = ApiError;

    fn try_from(raw: InstrumentResponse) -> Result<Self, Self::Error> {
        let instrument_type = InstrumentType::from_str(&raw.instrument_type)
            .map_err(|e| ApiError::InvalidData(e.to_string()))?;
        Ok(InstrumentSummary {
            title: raw.title,
            isin: raw.isin,
            instrument_type,
        })
    }
}

/// The latest quote from `GET quotes/latest`.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteResponse {
    pub isin: String,
    #[serde(rename = "b")]
    pub bid: i64,
    #[serde(rename = "a")]
    pub ask: i64,
}

impl From<QuoteResponse> for Quote {
    fn from(raw: QuoteResponse) -> Self {
        Quote {
            isin: raw.isin,
            bid: MinorUnits(raw.bid),
            ask: MinorUnits(raw.ask),
        }
    }
}

/// A space from `GET spaces/` or `GET spaces/{id}/`.
#[derive(Debug, Clone, Deserialize)]
pub struct SpaceResponse {
    pub id: String,
    pub name: String,
    /// Cash available for new buy orders.
    #[serde(alias = "cash_to_invest")]
    pub buying_power: i64,
}

impl From<SpaceResponse> for SpaceSummary {
    fn from(raw: SpaceResponse) -> Self {
        SpaceSummary {
            id: raw.id,
            name: raw.name,
        }
    }
}

/// A single position from `GET positions/`.
#[derive(Debug, Clone, Deserialize)]
pub struct PositionResponse {
    pub isin: String,
    pub isin_title: String,
    pub quantity: i64,
    pub buy_price_avg: i64,
}

impl TryFrom<PositionResponse> for Holding {
    type Error = ApiError;

    fn try_from(raw: PositionResponse) -> Result<Self, Self::Error> {
        let quantity = u64::try_from(raw.quantity).map_err(|_| {
            ApiError::InvalidData(format!("negative position quantity for {}", raw.isin))
        })?;
        Ok(Holding {
            isin: raw.isin,
            title: raw.isin_title,
            quantity,
            average_buy_price: MinorUnits(raw.buy_price_avg),
        })
    }
}

/// The response from `POST orders/` and `GET orders/{id}/`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderResponse {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub executed_price: Option<i64>,
}

impl TryFrom<OrderResponse> for OrderAck {
    type Error = ApiError;

    fn try_from(raw: OrderResponse) -> Result<Self, Self::Error> {
        Ok(OrderAck {
            status: parse_order_status(&raw.status)?,
            id: raw.id,
        })
    }
}

impl TryFrom<OrderResponse> for OrderSnapshot {
    type Error = ApiError;

    fn try_from(raw: OrderResponse) -> Result<Self, Self::Error> {
        let status = parse_order_status(&raw.status)?;
        // The broker reports 0 until something was filled.
        let executed_price = raw.executed_price.filter(|p| *p > 0).map(MinorUnits);
        Ok(OrderSnapshot {
            id: raw.id,
            status,
            executed_price,
        })
    }
}

/// A bare `{"status": "..."}` acknowledgement, as returned by activate and cancel.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Represents an error response from the brokerage API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error_code: String,
    pub error_message: String,
}

/// Maps the broker's order status vocabulary onto `OrderStatus`.
pub fn parse_order_status(raw: &str) -> Result<OrderStatus, ApiError> {
    match raw {
        "inactive" | "created" => Ok(OrderStatus::Created),
        "activated" | "open" | "in_progress" | "canceling" => Ok(OrderStatus::Activated),
        "executed" => Ok(OrderStatus::Executed),
        "rejected" | "error" => Ok(OrderStatus::Rejected),
        "canceled" | "cancelled" | "expired" => Ok(OrderStatus::Cancelled),
        other => Err(ApiError::InvalidData(format!("unknown order status '{}'", other))),
    }
}
