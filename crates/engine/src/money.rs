use std::fmt;

use crate::{Currency, EngineError, ResultEngine};

/// Signed amount of minor units in a given currency.
///
/// Balances are signed (a credit card can go below zero) while transaction
/// amounts are always positive; both are rendered through this type.
///
/// # Examples
///
/// ```rust
/// use engine::{Currency, Money};
///
/// let balance = Money::new(-1050, Currency::Eur);
/// assert_eq!(balance.to_string(), "-10.50 EUR");
///
/// let parsed = Money::parse("10,5", Currency::Eur).unwrap();
/// assert_eq!(parsed.minor(), 1050);
/// assert!(Money::parse("12.345", Currency::Eur).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Money {
    minor: i64,
    currency: Currency,
}

impl Money {
    #[must_use]
    pub const fn new(minor: i64, currency: Currency) -> Self {
        Self { minor, currency }
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.minor
    }

    #[must_use]
    pub const fn currency(self) -> Currency {
        self.currency
    }

    /// Parses a decimal string in major units.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading `+`/`-`.
    /// Rejects more fraction digits than the currency has minor units.
    pub fn parse(input: &str, currency: Currency) -> ResultEngine<Self> {
        let invalid = |reason: &str| EngineError::invalid("amount", reason);

        let trimmed = input.trim();
        let (negative, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
            (true, stripped.trim())
        } else if let Some(stripped) = trimmed.strip_prefix('+') {
            (false, stripped.trim())
        } else {
            (false, trimmed)
        };
        if rest.is_empty() {
            return Err(invalid("empty amount"));
        }

        let rest = rest.replace(',', ".");
        let (major_str, frac_str) = match rest.split_once('.') {
            Some((major, frac)) => (major, frac),
            None => (rest.as_str(), ""),
        };
        let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if major_str.is_empty() || !all_digits(major_str) || !all_digits(frac_str) {
            return Err(invalid("not a decimal number"));
        }

        let scale = u32::from(currency.minor_units());
        if frac_str.len() > scale as usize {
            return Err(invalid("too many decimals"));
        }

        let overflow = || invalid("amount too large");
        let major: i64 = major_str.parse().map_err(|_| overflow())?;
        let mut frac: i64 = if frac_str.is_empty() {
            0
        } else {
            frac_str.parse().map_err(|_| overflow())?
        };
        for _ in frac_str.len()..scale as usize {
            frac *= 10;
        }

        let total = major
            .checked_mul(10_i64.pow(scale))
            .and_then(|v| v.checked_add(frac))
            .ok_or_else(overflow)?;

        Ok(Self::new(if negative { -total } else { total }, currency))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.minor < 0 { "-" } else { "" };
        let abs = self.minor.unsigned_abs();
        let scale = u32::from(self.currency.minor_units());
        if scale == 0 {
            return write!(f, "{sign}{abs} {}", self.currency);
        }
        let divisor = 10_u64.pow(scale);
        write!(
            f,
            "{sign}{}.{:0width$} {}",
            abs / divisor,
            abs % divisor,
            self.currency,
            width = scale as usize
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_currency_scale() {
        assert_eq!(Money::new(0, Currency::Eur).to_string(), "0.00 EUR");
        assert_eq!(Money::new(7, Currency::Usd).to_string(), "0.07 USD");
        assert_eq!(Money::new(-1050, Currency::Eur).to_string(), "-10.50 EUR");
        assert_eq!(Money::new(1500, Currency::Jpy).to_string(), "1500 JPY");
    }

    #[test]
    fn parse_accepts_dot_or_comma() {
        assert_eq!(Money::parse("10", Currency::Eur).unwrap().minor(), 1000);
        assert_eq!(Money::parse("10,5", Currency::Eur).unwrap().minor(), 1050);
        assert_eq!(Money::parse("-0.01", Currency::Eur).unwrap().minor(), -1);
        assert_eq!(Money::parse(" +2.30 ", Currency::Eur).unwrap().minor(), 230);
        assert_eq!(Money::parse("300", Currency::Jpy).unwrap().minor(), 300);
    }

    #[test]
    fn parse_rejects_garbage_and_extra_decimals() {
        assert!(Money::parse("", Currency::Eur).is_err());
        assert!(Money::parse("1.2.3", Currency::Eur).is_err());
        assert!(Money::parse("12.345", Currency::Eur).is_err());
        assert!(Money::parse("1.5", Currency::Jpy).is_err());
        assert!(Money::parse("abc", Currency::Eur).is_err());
    }
}
