use crate::error::RiskError;
use core_types::{MinorUnits, OrderSide};
use rust_decimal::Decimal;
use std::str::FromStr;

/// `true` when buying `quantity` shares at `ask` fits in `balance`.
///
/// Exactly spending the whole balance is affordable. A cost that overflows
/// the minor-unit range is never affordable.
pub fn can_afford(quantity: u64, ask: MinorUnits, balance: MinorUnits) -> bool {
    match ask.checked_mul(quantity) {
        Some(total) => total <= balance,
        None => false,
    }
}

/// `true` when at least `quantity` shares are owned.
pub fn has_sufficient_holdings(quantity: u64, shares_owned: u64) -> bool {
    shares_owned >= quantity
}

/// `true` when the quantity is a whole number of shares.
pub fn is_whole_share_quantity(quantity: Decimal) -> bool {
    quantity == quantity.floor()
}

/// Parses a user-entered quantity exactly. Accepts "10", "10.0" and "2.5".
pub fn parse_quantity(text: &str) -> Result<Decimal, RiskError> {
    let trimmed = text.trim();
    Decimal::from_str(trimmed).map_err(|_| RiskError::InvalidQuantity(trimmed.to_string()))
}

/// Why a requested quantity cannot be traded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NotPositive(Decimal),
    Fractional(Decimal),
    Unaffordable {
        quantity: u64,
        /// `None` when the total does not fit in the minor-unit range.
        required: Option<MinorUnits>,
        available: MinorUnits,
    },
    InsufficientHoldings { requested: u64, owned: u64 },
}

/// Outcome of validating a quantity against the current market and account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuantityDecision {
    /// Zero shares: nothing to trade, ask again.
    NoTrade,
    Rejected(Rejection),
    Approved { quantity: u64, total_cost: MinorUnits },
}

/// Applies every rule to a requested quantity.
///
/// `price` is the ask for buys and the bid for sells; `total_cost` of an
/// approved trade is always `quantity * price`. Zero short-circuits before any
/// other rule so it is never reported as a failure.
pub fn evaluate_quantity(
    requested: Decimal,
    side: OrderSide,
    price: MinorUnits,
    balance: MinorUnits,
    shares_owned: u64,
) -> QuantityDecision {
    if requested.is_zero() {
        return QuantityDecision::NoTrade;
    }
    if requested.is_sign_negative() {
        return QuantityDecision::Rejected(Rejection::NotPositive(requested));
    }
    if !is_whole_share_quantity(requested) {
        return QuantityDecision::Rejected(Rejection::Fractional(requested));
    }

    let Ok(quantity) = u64::try_from(requested) else {
        // Whole but beyond u64: no account can cover or hold that.
        return QuantityDecision::Rejected(match side {
            OrderSide::Buy => Rejection::Unaffordable {
                quantity: u64::MAX,
                required: None,
                available: balance,
            },
            OrderSide::Sell => Rejection::InsufficientHoldings {
                requested: u64::MAX,
                owned: shares_owned,
            },
        });
    };

    let total_cost = price.checked_mul(quantity);
    match side {
        OrderSide::Buy if !can_afford(quantity, price, balance) => {
            QuantityDecision::Rejected(Rejection::Unaffordable {
                quantity,
                required: total_cost,
                available: balance,
            })
        }
        OrderSide::Sell if !has_sufficient_holdings(quantity, shares_owned) => {
            QuantityDecision::Rejected(Rejection::InsufficientHoldings {
                requested: quantity,
                owned: shares_owned,
            })
        }
        _ => match total_cost {
            Some(total_cost) => QuantityDecision::Approved { quantity, total_cost },
            None => QuantityDecision::Rejected(Rejection::Unaffordable {
                quantity,
                required: None,
                available: balance,
            }),
        },
    }
}
