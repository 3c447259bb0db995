//! Localized validation rules and common input matchers.
//!
//! Thin consumers of the active locale's merged `validations` resource:
//! each entry is a regular expression keyed by rule name. Callers may
//! pass their own fallback pattern; a rule with neither a locale value
//! nor a fallback is an error.

use regex::Regex;

use crate::error::{I18nError, Result};
use crate::registry::LocaleRegistry;

/// Fetch a validation rule from the active locale, else the fallback.
pub fn rule(registry: &LocaleRegistry, key: &str, fallback: Option<&str>) -> Result<String> {
    let from_locale = match registry.active() {
        Some(locale) => locale
            .validation_rule(key)?
            .and_then(|value| value.as_str())
            .map(str::to_string),
        None => None,
    };

    from_locale
        .or_else(|| fallback.map(str::to_string))
        .ok_or_else(|| I18nError::MissingValidationRule(key.to_string()))
}

fn matches(registry: &LocaleRegistry, key: &str, fallback: Option<&str>, input: &str) -> Result<bool> {
    let pattern = rule(registry, key, fallback)?;
    let regex = Regex::new(&pattern).map_err(|error| I18nError::InvalidRule {
        rule: pattern.clone(),
        reason: error.to_string(),
    })?;

    Ok(regex.is_match(input))
}

/// Validate input against the locale's phone number rule.
pub fn phone(registry: &LocaleRegistry, input: &str, fallback: Option<&str>) -> Result<bool> {
    matches(registry, "phone", fallback, input)
}

/// Validate input against the locale's postal/zip code rule.
pub fn postal_code(registry: &LocaleRegistry, input: &str, fallback: Option<&str>) -> Result<bool> {
    matches(registry, "postal_code", fallback, input)
}

/// Validate input against the locale's social security number rule.
pub fn ssn(registry: &LocaleRegistry, input: &str, fallback: Option<&str>) -> Result<bool> {
    matches(registry, "ssn", fallback, input)
}

/// Validate input against the locale's currency rule.
pub fn currency(registry: &LocaleRegistry, input: &str, fallback: Option<&str>) -> Result<bool> {
    matches(registry, "currency", fallback, input)
}
