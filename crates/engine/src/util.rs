//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use chrono::{DateTime, Utc};
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::{Currency, EngineError, ResultEngine};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &'static str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::invalid(label, format!("invalid id {value}")))
}

/// Parse a currency code stored in the DB into a strongly typed `Currency`.
pub(crate) fn model_currency(value: &str) -> ResultEngine<Currency> {
    Currency::try_from(value)
}

/// Timestamps are persisted as epoch seconds.
pub(crate) fn to_epoch(value: DateTime<Utc>) -> i64 {
    value.timestamp()
}

pub(crate) fn from_epoch(secs: i64, label: &'static str) -> ResultEngine<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| EngineError::invalid(label, format!("timestamp out of range: {secs}")))
}

pub(crate) fn normalize_required_name(value: &str, label: &'static str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::invalid(label, "name must not be empty"));
    }
    Ok(trimmed.to_string())
}

/// Case-folded key used to detect duplicate names: NFKC, lowercased, inner
/// whitespace collapsed.
pub(crate) fn name_key(name: &str) -> String {
    let folded: String = name.nfkc().collect::<String>().to_lowercase();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Upper bound for a single amount, keeping balance sums far from `i64`
/// overflow.
pub(crate) const MAX_AMOUNT_MINOR: i64 = 1_000_000_000_000_000;

pub(crate) fn ensure_positive_amount(amount_minor: i64) -> ResultEngine<()> {
    if amount_minor <= 0 {
        return Err(EngineError::invalid("amount_minor", "must be > 0"));
    }
    if amount_minor > MAX_AMOUNT_MINOR {
        return Err(EngineError::invalid("amount_minor", "exceeds the maximum amount"));
    }
    Ok(())
}
