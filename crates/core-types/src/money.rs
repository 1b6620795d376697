use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A currency amount in minor units, 1/10,000 of the major unit.
///
/// This is the only money representation used above the API boundary. The
/// broker reports prices, balances and fills as integers on this scale when
/// asked for non-decimal values, so no conversion happens in the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinorUnits(pub i64);

impl MinorUnits {
    /// Decimal places of one minor unit: 10,000 per major unit.
    pub const SCALE_DIGITS: u32 = 4;

    /// Total for `quantity` units at this price, `None` on overflow.
    pub fn checked_mul(&self, quantity: u64) -> Option<MinorUnits> {
        let quantity = i64::try_from(quantity).ok()?;
        self.0.checked_mul(quantity).map(MinorUnits)
    }

    /// The exact amount in major units.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, Self::SCALE_DIGITS)
    }
}

/// Formats in major units with two decimals, e.g. `5200` -> `0.52`.
impl fmt::Display for MinorUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self
            .to_decimal()
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        write!(f, "{:.2}", rounded)
    }
}
