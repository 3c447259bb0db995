//! Localized formatting helpers: placeholder masks and pattern access.
//!
//! Consumers of the active locale's merged `formats` resource. Masks use
//! `#` as a digit placeholder (`###-##-####`); date and time helpers
//! only select the locale's pattern string, they do no calendar math.

use serde_json::Value;

use crate::error::{I18nError, Result};
use crate::registry::LocaleRegistry;

/// Fetch a string format pattern from the active locale, else the
/// caller's fallback.
pub fn pattern(registry: &LocaleRegistry, key: &str, fallback: Option<&str>) -> Result<String> {
    let from_locale = match registry.active() {
        Some(locale) => locale
            .format_pattern(key)?
            .and_then(Value::as_str)
            .map(str::to_string),
        None => None,
    };

    from_locale
        .or_else(|| fallback.map(str::to_string))
        .ok_or_else(|| I18nError::MissingPattern(key.to_string()))
}

/// Fill a `#`-placeholder mask with the digits of `value`, in order.
/// Non-digit characters in `value` are ignored; the mask is cut short
/// when the digits run out.
pub fn apply_mask(mask: &str, value: &str) -> String {
    let mut digits = value.chars().filter(char::is_ascii_digit);
    let mut out = String::with_capacity(mask.len());

    for c in mask.chars() {
        if c == '#' {
            match digits.next() {
                Some(digit) => out.push(digit),
                None => break,
            }
        } else {
            out.push(c);
        }
    }

    out
}

/// Format a phone number using the locale's length-keyed mask table.
///
/// The `phone` pattern is an object keyed by digit count, so numbers
/// with and without area or country codes each get their own mask.
pub fn phone(registry: &LocaleRegistry, value: &str, fallback: Option<&str>) -> Result<String> {
    let digits: String = value.chars().filter(char::is_ascii_digit).collect();

    let mask = match registry.active() {
        Some(locale) => locale
            .format_pattern("phone")?
            .and_then(Value::as_object)
            .and_then(|table| table.get(&digits.len().to_string()))
            .and_then(Value::as_str)
            .map(str::to_string),
        None => None,
    };

    let mask = mask
        .or_else(|| fallback.map(str::to_string))
        .ok_or_else(|| I18nError::MissingPattern("phone".to_string()))?;

    Ok(apply_mask(&mask, &digits))
}

/// Format a social security number with the locale's `ssn` mask.
pub fn ssn(registry: &LocaleRegistry, value: &str, fallback: Option<&str>) -> Result<String> {
    let mask = pattern(registry, "ssn", fallback)?;
    Ok(apply_mask(&mask, value))
}

/// The locale's date pattern (e.g. `%m/%d/%Y`).
pub fn date_pattern(registry: &LocaleRegistry, fallback: Option<&str>) -> Result<String> {
    pattern(registry, "date", fallback)
}

/// The locale's time pattern (e.g. `%I:%M%p`).
pub fn time_pattern(registry: &LocaleRegistry, fallback: Option<&str>) -> Result<String> {
    pattern(registry, "time", fallback)
}

/// The locale's combined date-time pattern.
pub fn datetime_pattern(registry: &LocaleRegistry, fallback: Option<&str>) -> Result<String> {
    pattern(registry, "datetime", fallback)
}
