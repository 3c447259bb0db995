//! Localized inflection helpers driven by each locale's rule tables.
//!
//! All helpers read the active locale's merged `inflections` resource.
//! When no locale is active (or the registry has no locales at all) the
//! input is returned unchanged, so a single-locale application can call
//! these unconditionally.
//!
//! Expected table shape:
//!
//! ```text
//! uninflected:     ["deer", "sheep", ...]
//! irregular:       {"person": "people", ...}        (singular -> plural)
//! plural:          {"(quiz)$": "${1}zes", ...}      (pattern -> replacement)
//! singular:        {"(n)ews$": "${1}ews", ...}
//! ordinal:         {"1": "#st", "2": "#nd", "default": "#th"}
//! transliteration: {"[àáâã]": "a", ...}
//! ```

use regex::Regex;
use serde_json::Value;

use crate::error::{I18nError, Result};
use crate::registry::LocaleRegistry;

/// Pluralize a word using the active locale's inflection rules.
pub fn pluralize(registry: &LocaleRegistry, word: &str) -> Result<String> {
    let Some(locale) = registry.active() else {
        return Ok(word.to_string());
    };
    let word = word.to_lowercase();
    let rules = locale.inflection_rules()?;

    if list_contains(rules.get("uninflected"), &word) {
        return Ok(word);
    }
    if let Some(plural) = map_lookup(rules.get("irregular"), &word) {
        return Ok(plural);
    }
    if map_contains_value(rules.get("irregular"), &word) {
        // Already a plural form.
        return Ok(word);
    }
    if let Some(result) = apply_patterns(rules.get("plural"), &word)? {
        return Ok(result);
    }

    Ok(word)
}

/// Singularize a word using the active locale's inflection rules.
pub fn singularize(registry: &LocaleRegistry, word: &str) -> Result<String> {
    let Some(locale) = registry.active() else {
        return Ok(word.to_string());
    };
    let word = word.to_lowercase();
    let rules = locale.inflection_rules()?;

    if list_contains(rules.get("uninflected"), &word) {
        return Ok(word);
    }
    if let Some(singular) = map_key_for_value(rules.get("irregular"), &word) {
        return Ok(singular);
    }
    if map_lookup(rules.get("irregular"), &word).is_some() {
        // Already a singular form.
        return Ok(word);
    }
    if let Some(result) = apply_patterns(rules.get("singular"), &word)? {
        return Ok(result);
    }

    Ok(word)
}

/// Render a number with its locale ordinal suffix (`1st`, `2nd`, ...).
///
/// The `ordinal` table maps last digits to formats with a `#`
/// placeholder; teens (11-13) always take the `default` format.
pub fn ordinal(registry: &LocaleRegistry, number: i64) -> Result<String> {
    let Some(locale) = registry.active() else {
        return Ok(number.to_string());
    };
    let rules = locale.inflection_rules()?;
    let Some(table) = rules.get("ordinal").and_then(Value::as_object) else {
        return Ok(number.to_string());
    };

    let fill = |format: &str| format.replace('#', &number.to_string());
    let default = table.get("default").and_then(Value::as_str);

    if (11..=13).contains(&number.rem_euclid(100)) {
        if let Some(format) = default {
            return Ok(fill(format));
        }
    }

    let last_digit = number.rem_euclid(10).to_string();
    if let Some(format) = table.get(last_digit.as_str()).and_then(Value::as_str) {
        return Ok(fill(format));
    }
    if let Some(format) = default {
        return Ok(fill(format));
    }

    Ok(number.to_string())
}

/// Replace accented characters with their ASCII equivalents using the
/// locale's transliteration table, then drop anything left outside
/// printable ASCII.
pub fn transliterate(registry: &LocaleRegistry, input: &str) -> Result<String> {
    let Some(locale) = registry.active() else {
        return Ok(input.to_string());
    };
    let rules = locale.inflection_rules()?;
    let Some(table) = rules.get("transliteration").and_then(Value::as_object) else {
        return Ok(input.to_string());
    };

    let mut result = input.to_string();
    for (pattern, replacement) in table {
        let Some(replacement) = replacement.as_str() else {
            continue;
        };
        let regex = compile(pattern)?;
        result = regex.replace_all(&result, replacement).into_owned();
    }

    result.retain(|c| c == '\t' || c == '\n' || c == '\r' || (' '..='~').contains(&c));
    Ok(result)
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|error| I18nError::InvalidRule {
        rule: pattern.to_string(),
        reason: error.to_string(),
    })
}

fn list_contains(value: Option<&Value>, needle: &str) -> bool {
    value
        .and_then(Value::as_array)
        .map(|list| list.iter().any(|entry| entry.as_str() == Some(needle)))
        .unwrap_or(false)
}

fn map_lookup(value: Option<&Value>, key: &str) -> Option<String> {
    value
        .and_then(Value::as_object)
        .and_then(|map| map.get(key))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn map_contains_value(value: Option<&Value>, needle: &str) -> bool {
    value
        .and_then(Value::as_object)
        .map(|map| map.values().any(|entry| entry.as_str() == Some(needle)))
        .unwrap_or(false)
}

fn map_key_for_value(value: Option<&Value>, needle: &str) -> Option<String> {
    value.and_then(Value::as_object).and_then(|map| {
        map.iter()
            .find(|(_, entry)| entry.as_str() == Some(needle))
            .map(|(key, _)| key.clone())
    })
}

/// Apply the first matching pattern rule; `None` when nothing matched.
fn apply_patterns(value: Option<&Value>, word: &str) -> Result<Option<String>> {
    let Some(rules) = value.and_then(Value::as_object) else {
        return Ok(None);
    };

    for (pattern, replacement) in rules {
        let Some(replacement) = replacement.as_str() else {
            continue;
        };
        let regex = compile(pattern)?;
        if regex.is_match(word) {
            return Ok(Some(regex.replace(word, replacement).into_owned()));
        }
    }

    Ok(None)
}
