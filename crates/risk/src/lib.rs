//! # Trade Validation Rules
//!
//! Pure, deterministic checks deciding whether a requested trade may be
//! placed: affordability for buys, sufficient holdings for sells, and
//! whole-share quantities. No I/O happens here; callers fetch quotes and
//! balances and pass them in as `MinorUnits`.
//!
//! ## Public API
//!
//! - `can_afford`, `has_sufficient_holdings`, `is_whole_share_quantity`: the individual rules.
//! - `parse_quantity`: turns user text into an exact decimal.
//! - `evaluate_quantity`: applies all rules in order and returns a `QuantityDecision`.

pub mod error;
pub mod rules;

pub use error::RiskError;
pub use rules::{
    can_afford, evaluate_quantity, has_sufficient_holdings, is_whole_share_quantity,
    parse_quantity, QuantityDecision, Rejection,
};
