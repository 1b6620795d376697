use crate::error::QuickTradeError;
use core_types::{InstrumentType, OrderSide};
use rust_decimal::Decimal;
use std::str::FromStr;

/// A parsed `{side} {quantity} {search-term} {type}` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickTrade {
    pub side: OrderSide,
    pub quantity: u64,
    pub search: String,
    pub instrument_type: InstrumentType,
}

/// Parses a quick trade such as `buy 5 apple stock`.
///
/// A type token starting with "share" (`share`, `shares`) means stocks. Any
/// other type token is used as the search filter only if it names one of the
/// broker's instrument types (`etf`, `bond`, `fund`, `warrant`, `stock`); an
/// unknown type such as `crypto` is rejected before any gateway call. The
/// quantity must be a positive whole number; `5.0` is accepted as 5.
pub fn parse_quick_trade(input: &str) -> Result<QuickTrade, QuickTradeError> {
    let tokens: Vec<&str> = input.split_whitespace().collect();
    let [side, quantity, search, kind] = tokens.as_slice() else {
        return Err(QuickTradeError::TokenCount(tokens.len()));
    };

    let side = OrderSide::from_str(side).map_err(|_| QuickTradeError::Side(side.to_string()))?;
    let quantity = parse_share_count(quantity)?;

    let kind = kind.to_lowercase();
    let instrument_type = if kind.starts_with("share") {
        InstrumentType::Stock
    } else {
        InstrumentType::from_str(&kind).map_err(|_| QuickTradeError::InstrumentType(kind.clone()))?
    };

    Ok(QuickTrade {
        side,
        quantity,
        search: search.to_lowercase(),
        instrument_type,
    })
}

fn parse_share_count(token: &str) -> Result<u64, QuickTradeError> {
    let invalid = || QuickTradeError::Quantity(token.to_string());
    let amount = risk::parse_quantity(token).map_err(|_| invalid())?;
    if amount <= Decimal::ZERO || !risk::is_whole_share_quantity(amount) {
        return Err(invalid());
    }
    u64::try_from(amount).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_documented_example() {
        assert_eq!(
            parse_quick_trade("buy 5 apple stock").unwrap(),
            QuickTrade {
                side: OrderSide::Buy,
                quantity: 5,
                search: "apple".to_string(),
                instrument_type: InstrumentType::Stock,
            }
        );
    }

    #[test]
    fn share_tokens_normalise_to_stock() {
        for token in ["share", "shares", "Shares"] {
            let trade = parse_quick_trade(&format!("sell 2 tesla {}", token)).unwrap();
            assert_eq!(trade.instrument_type, InstrumentType::Stock);
        }
    }

    #[test]
    fn other_type_tokens_pass_through() {
        let trade = parse_quick_trade("BUY 1 msci ETF").unwrap();
        assert_eq!(trade.side, OrderSide::Buy);
        assert_eq!(trade.instrument_type, InstrumentType::Etf);
    }

    #[test]
    fn wrong_token_count_is_rejected() {
        assert_eq!(parse_quick_trade("buy 5 apple"), Err(QuickTradeError::TokenCount(3)));
        assert_eq!(
            parse_quick_trade("buy 5 apple inc stock"),
            Err(QuickTradeError::TokenCount(5))
        );
        assert_eq!(parse_quick_trade(""), Err(QuickTradeError::TokenCount(0)));
    }

    #[test]
    fn quantity_must_be_a_positive_whole_number() {
        for bad in ["0", "-1", "2.5", "five"] {
            assert_eq!(
                parse_quick_trade(&format!("buy {} apple stock", bad)),
                Err(QuickTradeError::Quantity(bad.to_string()))
            );
        }
        assert_eq!(parse_quick_trade("buy 5.0 apple stock").unwrap().quantity, 5);
    }

    #[test]
    fn unknown_side_and_type_are_rejected() {
        assert_eq!(
            parse_quick_trade("hold 5 apple stock"),
            Err(QuickTradeError::Side("hold".to_string()))
        );
        assert_eq!(
            parse_quick_trade("buy 5 bitcoin crypto"),
            Err(QuickTradeError::InstrumentType("crypto".to_string()))
        );
    }
}
