use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderSide {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(OrderSide::Buy),
            "sell" => Ok(OrderSide::Sell),
            other => Err(CoreError::InvalidInput("side".to_string(), other.to_string())),
        }
    }
}

/// The instrument classes the broker lets us search in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentType {
    Stock,
    Etf,
    Bond,
    Fund,
    Warrant,
}

impl InstrumentType {
    pub const ALL: [InstrumentType; 5] = [
        InstrumentType::Stock,
        InstrumentType::Etf,
        InstrumentType::Bond,
        InstrumentType::Fund,
        InstrumentType::Warrant,
    ];

    /// The lowercase code used in broker queries.
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentType::Stock => "stock",
            InstrumentType::Etf => "etf",
            InstrumentType::Bond => "bond",
            InstrumentType::Fund => "fund",
            InstrumentType::Warrant => "warrant",
        }
    }

    /// The label shown to a user when offering the choice.
    pub fn label(&self) -> &'static str {
        match self {
            InstrumentType::Stock => "Stock",
            InstrumentType::Etf => "ETF",
            InstrumentType::Bond => "Bond",
            InstrumentType::Fund => "Fund",
            InstrumentType::Warrant => "Warrant",
        }
    }
}

impl fmt::Display for InstrumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstrumentType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        InstrumentType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| CoreError::InvalidInput("instrument type".to_string(), normalized))
    }
}

/// Lifecycle status of a single order as seen by this system.
///
/// `TimedOut` is never reported by the broker; the order controller assigns it
/// when it gives up waiting for an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    Activated,
    Executed,
    Rejected,
    Cancelled,
    TimedOut,
}

impl OrderStatus {
    /// `true` once the order can no longer change on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Executed | OrderStatus::Rejected | OrderStatus::Cancelled | OrderStatus::TimedOut
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Created => "created",
            OrderStatus::Activated => "activated",
            OrderStatus::Executed => "executed",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::TimedOut => "timed_out",
        };
        f.write_str(s)
    }
}

/// How long a submitted order stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderExpiry {
    /// Expires at the end of the current trading session.
    #[default]
    SameSession,
}

impl OrderExpiry {
    /// The broker's relative expiry code.
    pub fn as_code(&self) -> &'static str {
        match self {
            OrderExpiry::SameSession => "p0d",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_parsing_is_case_insensitive() {
        assert_eq!("Buy".parse::<OrderSide>().unwrap(), OrderSide::Buy);
        assert_eq!(" SELL ".parse::<OrderSide>().unwrap(), OrderSide::Sell);
        assert!("hold".parse::<OrderSide>().is_err());
    }

    #[test]
    fn instrument_type_accepts_every_offered_label() {
        for t in InstrumentType::ALL {
            assert_eq!(t.label().parse::<InstrumentType>().unwrap(), t);
        }
        assert!("crypto".parse::<InstrumentType>().is_err());
    }

    #[test]
    fn only_final_statuses_are_terminal() {
        assert!(!OrderStatus::Created.is_terminal());
        assert!(!OrderStatus::Activated.is_terminal());
        assert!(OrderStatus::Executed.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::TimedOut.is_terminal());
    }

    #[test]
    fn side_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&OrderSide::Sell).unwrap(), "\"sell\"");
    }
}
