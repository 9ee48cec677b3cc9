use serde::{Deserialize, Serialize};

use crate::EngineError;

/// ISO currency code of an account and of every amount posted against it.
///
/// The engine never converts between currencies: a transfer is only accepted
/// between two accounts holding the same currency.
///
/// ## Minor units
///
/// Balances and amounts are stored as an `i64` number of **minor units** (see
/// `Money`). `minor_units()` returns how many decimal digits separate major
/// and minor units.
///
/// Example: EUR has 2 minor units, so `10.50 EUR` ⇄ `1050`; JPY has none.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Eur,
    Usd,
    Gbp,
    Chf,
    Jpy,
}

impl Currency {
    /// Canonical currency code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
            Currency::Gbp => "GBP",
            Currency::Chf => "CHF",
            Currency::Jpy => "JPY",
        }
    }

    /// Number of fraction digits used when formatting/parsing amounts.
    #[must_use]
    pub const fn minor_units(self) -> u8 {
        match self {
            Currency::Jpy => 0,
            Currency::Eur | Currency::Usd | Currency::Gbp | Currency::Chf => 2,
        }
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Currency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "EUR" => Ok(Currency::Eur),
            "USD" => Ok(Currency::Usd),
            "GBP" => Ok(Currency::Gbp),
            "CHF" => Ok(Currency::Chf),
            "JPY" => Ok(Currency::Jpy),
            other => Err(EngineError::invalid(
                "currency",
                format!("unsupported currency: {other}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Currency::try_from(" usd ").unwrap(), Currency::Usd);
        assert_eq!(Currency::try_from("JPY").unwrap().minor_units(), 0);
        assert!(Currency::try_from("XXX").is_err());
    }
}
