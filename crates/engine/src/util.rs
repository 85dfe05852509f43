//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so every operation normalizes input the same
//! way.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::Validation(format!("invalid {label} id")))
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// User ids are opaque, but never blank.
pub(crate) fn normalize_user_id(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!("{label} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Folds a free-form category into its enum-like key: accents stripped,
/// lowercase, words joined by `_` (`"Vendite Dirette"` -> `"vendite_dirette"`).
pub(crate) fn normalize_category(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    let mut out = String::new();
    let mut pending_sep = false;
    for ch in trimmed.nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    if out.is_empty() { None } else { Some(out) }
}

pub(crate) fn require_positive(amount: Money, label: &str) -> ResultEngine<()> {
    if !amount.is_positive() {
        return Err(EngineError::Validation(format!("{label} must be > 0")));
    }
    require_within_max(amount, label)
}

pub(crate) fn require_non_negative(amount: Money, label: &str) -> ResultEngine<()> {
    if amount.is_negative() {
        return Err(EngineError::Validation(format!("{label} must be >= 0")));
    }
    require_within_max(amount, label)
}

pub(crate) fn require_within_max(amount: Money, label: &str) -> ResultEngine<()> {
    if amount > Money::MAX_AMOUNT {
        return Err(EngineError::Validation(format!(
            "{label} must be <= {}",
            Money::MAX_AMOUNT
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_is_folded_to_key() {
        assert_eq!(
            normalize_category(Some("  Vendite  Dirette ")).as_deref(),
            Some("vendite_dirette")
        );
        assert_eq!(normalize_category(Some("Café-Sales")).as_deref(), Some("cafe_sales"));
        assert_eq!(normalize_category(Some(" -- ")), None);
        assert_eq!(normalize_category(None), None);
    }

    #[test]
    fn amounts_above_the_ceiling_are_rejected() {
        assert!(require_non_negative(Money::MAX_AMOUNT, "amount").is_ok());
        let over = Money::MAX_AMOUNT + Money::new(1);
        assert!(matches!(
            require_non_negative(over, "amount"),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            require_positive(over, "amount"),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn blank_user_id_is_rejected() {
        assert!(normalize_user_id("   ", "user_id").is_err());
        assert_eq!(normalize_user_id(" alice ", "user_id").unwrap(), "alice");
    }
}
