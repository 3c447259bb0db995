//! Cascading message lookup and parameter formatting.
//!
//! A [`Translator`] parses dotted message keys into (domain, catalog, id)
//! triples, walks the registry's locale cascade per lookup and returns
//! the first match. Catalogs resolved from the loader are written through
//! to the shared [`Cache`]; fully-resolved keys are memoized per
//! translator instance.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use regex::Regex;
use tracing::{debug, warn};

use crate::error::{I18nError, Result};
use crate::metrics::LookupMetrics;
use crate::registry::LocaleRegistry;
use crate::resource::{Cache, MessageMap};

/// Domain used when a key carries only `catalog.id`.
pub const DEFAULT_DOMAIN: &str = "core";

/// A translation key parsed into its namespace parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageKey {
    pub domain: String,
    pub catalog: String,
    pub id: String,
}

fn key_sanitizer() -> &'static Regex {
    static SANITIZER: OnceLock<Regex> = OnceLock::new();
    SANITIZER.get_or_init(|| Regex::new(r"[^A-Za-z0-9.\-]+").expect("static pattern"))
}

/// Substitution parameters for [`Translator::translate`].
///
/// Parameters are named; positional parameters use their index as the
/// name (`{0}`, `{1}`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageParams {
    values: Vec<(String, String)>,
}

impl MessageParams {
    pub fn none() -> Self {
        Self::default()
    }

    /// Positional parameters, addressed as `{0}`, `{1}`, ...
    pub fn positional<S: ToString>(values: &[S]) -> Self {
        MessageParams {
            values: values
                .iter()
                .enumerate()
                .map(|(index, value)| (index.to_string(), value.to_string()))
                .collect(),
        }
    }

    /// Add a named parameter, addressed as `{name}`.
    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.values.push((name.into(), value.to_string()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Locale-aware message formatting facility.
///
/// The default [`BraceFormat`] covers plain substitution; an
/// ICU-MessageFormat implementation can be plugged in through
/// [`Translator::with_format`].
pub trait MessageFormat: Send + Sync {
    /// Render `template` for `locale` with the given parameters.
    fn format(&self, locale: &str, template: &str, params: &MessageParams) -> Result<String>;
}

/// Brace-token formatter: replaces `{name}` with the matching parameter
/// and leaves unmatched tokens untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct BraceFormat;

impl MessageFormat for BraceFormat {
    fn format(&self, _locale: &str, template: &str, params: &MessageParams) -> Result<String> {
        let mut message = template.to_string();
        for (name, value) in params.iter() {
            message = message.replace(&format!("{{{}}}", name), value);
        }
        Ok(message)
    }
}

/// Message resolver walking the registry's locale cascade.
pub struct Translator {
    cache: Option<Arc<dyn Cache>>,
    format: Box<dyn MessageFormat>,

    // Per-instance memos. Parsed keys are pure functions of their input;
    // resolved messages stay valid for the life of the request context.
    keys: RwLock<HashMap<String, MessageKey>>,
    messages: RwLock<HashMap<String, String>>,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator {
    pub fn new() -> Self {
        Translator {
            cache: None,
            format: Box::new(BraceFormat),
            keys: RwLock::new(HashMap::new()),
            messages: RwLock::new(HashMap::new()),
        }
    }

    /// Attach a shared catalog cache.
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replace the default brace formatter.
    pub fn with_format(mut self, format: impl MessageFormat + 'static) -> Self {
        self.format = Box::new(format);
        self
    }

    /// Parse a dotted key into (domain, catalog, id).
    ///
    /// Characters outside `[A-Za-z0-9.-]` are stripped first. Two
    /// segments resolve against the default domain; three or more use
    /// the first as domain and the second as catalog, with the rest
    /// rejoined as the id. Fewer than two segments is an error.
    pub fn parse_key(&self, key: &str) -> Result<MessageKey> {
        if let Some(parsed) = self.keys.read().expect("key memo poisoned").get(key) {
            return Ok(parsed.clone());
        }

        let cleaned = key_sanitizer().replace_all(key, "");
        let parts: Vec<&str> = cleaned.split('.').collect();

        let parsed = match parts.len() {
            0 | 1 => return Err(I18nError::InvalidKey(key.to_string())),
            2 => MessageKey {
                domain: DEFAULT_DOMAIN.to_string(),
                catalog: parts[0].to_string(),
                id: parts[1].to_string(),
            },
            _ => MessageKey {
                domain: parts[0].to_string(),
                catalog: parts[1].to_string(),
                id: parts[2..].join("."),
            },
        };

        self.keys
            .write()
            .expect("key memo poisoned")
            .insert(key.to_string(), parsed.clone());

        Ok(parsed)
    }

    /// Resolve a message key through the cascade.
    ///
    /// Per locale: consult the shared cache, then the loader, writing
    /// loaded catalogs back to the cache. A missing catalog or missing
    /// id just moves on to the next locale; only exhausting the whole
    /// cascade is an error.
    pub fn get_message(&self, registry: &LocaleRegistry, key: &str) -> Result<String> {
        if let Some(message) = self.messages.read().expect("message memo poisoned").get(key) {
            return Ok(message.clone());
        }

        let parsed = self.parse_key(key)?;
        let cascade: Vec<String> = registry.cascade()?.to_vec();
        let metrics = LookupMetrics::global();

        for locale in &cascade {
            let cache_key = format!("g11n.{}.{}.{}", parsed.domain, parsed.catalog, locale);
            let mut candidate: Option<MessageMap> = None;

            if let Some(cache) = &self.cache {
                match cache.get(&cache_key) {
                    Some(messages) if !messages.is_empty() => {
                        metrics.record_cache_hit();
                        candidate = Some(messages);
                    }
                    _ => metrics.record_cache_miss(),
                }
            }

            if candidate.is_none() {
                match registry
                    .loader()
                    .load_catalog(&parsed.domain, locale, &parsed.catalog)?
                {
                    Some(messages) => {
                        metrics.record_catalog_load();
                        if let Some(cache) = &self.cache {
                            cache.set(&cache_key, messages.clone());
                        }
                        candidate = Some(messages);
                    }
                    None => {
                        debug!(
                            "no {} catalog for locale {} in domain {}",
                            parsed.catalog, locale, parsed.domain
                        );
                        continue;
                    }
                }
            }

            if let Some(message) = candidate.as_ref().and_then(|messages| messages.get(&parsed.id))
            {
                self.messages
                    .write()
                    .expect("message memo poisoned")
                    .insert(key.to_string(), message.clone());

                return Ok(message.clone());
            }
        }

        metrics.record_cascade_miss();
        warn!("message key {} not found in cascade {:?}", key, cascade);

        Err(I18nError::MissingMessage {
            key: key.to_string(),
            locales: cascade,
        })
    }

    /// Resolve a message and substitute parameters, formatting for the
    /// cascade's most specific locale. Formatting failures propagate.
    pub fn translate(
        &self,
        registry: &LocaleRegistry,
        key: &str,
        params: &MessageParams,
    ) -> Result<String> {
        let message = self.get_message(registry, key)?;
        let cascade = registry.cascade()?;
        let locale = cascade.first().map(String::as_str).unwrap_or_default();

        self.format.format(locale, &message, params)
    }
}

/// Shorthand for [`LocaleRegistry::translate`].
pub fn msg(registry: &LocaleRegistry, key: &str, params: &MessageParams) -> Result<String> {
    registry.translate(key, params)
}

/// Shorthand assembling a key from its parts; `domain` defaults to
/// [`DEFAULT_DOMAIN`].
pub fn __(
    registry: &LocaleRegistry,
    id: &str,
    catalog: &str,
    domain: Option<&str>,
    params: &MessageParams,
) -> Result<String> {
    let key = format!("{}.{}.{}", domain.unwrap_or(DEFAULT_DOMAIN), catalog, id);
    registry.translate(&key, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::Locale;
    use crate::resource::{MemoryCache, MemoryLoader, ResourceLoader, ResourceMap};
    use serde_json::json;

    fn object(value: serde_json::Value) -> ResourceMap {
        value.as_object().expect("object literal").clone()
    }

    fn catalog(pairs: &[(&str, &str)]) -> MessageMap {
        pairs
            .iter()
            .map(|(id, message)| (id.to_string(), message.to_string()))
            .collect()
    }

    fn loader() -> Arc<dyn ResourceLoader> {
        Arc::new(
            MemoryLoader::new()
                .with_locale_resource("en", "locale", object(json!({"code": "en"})))
                .with_locale_resource(
                    "en_US",
                    "locale",
                    object(json!({"code": "en_US", "parent": "en"})),
                )
                .with_locale_resource("fr", "locale", object(json!({"code": "fr"})))
                .with_catalog(
                    "core",
                    "en",
                    "default",
                    catalog(&[("greeting", "Hello"), ("welcome", "Welcome, {0}!")]),
                )
                .with_catalog("core", "fr", "default", catalog(&[("greeting", "Bonjour")]))
                .with_catalog(
                    "admin",
                    "en",
                    "errors",
                    catalog(&[("denied", "Access denied")]),
                ),
        )
    }

    fn registry() -> LocaleRegistry {
        let mut registry = LocaleRegistry::new(loader());
        registry.add_locale(Locale::new("en_US")).expect("add");
        registry.add_locale(Locale::new("fr")).expect("add");
        registry.set_fallback("en").expect("set fallback");
        registry
    }

    // ==================== parse_key Tests ====================

    #[test]
    fn test_parse_key_two_segments_uses_default_domain() {
        let translator = Translator::new();
        let parsed = translator.parse_key("default.greeting").expect("parse");

        assert_eq!(
            parsed,
            MessageKey {
                domain: "core".to_string(),
                catalog: "default".to_string(),
                id: "greeting".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_key_three_plus_segments() {
        let translator = Translator::new();
        let parsed = translator
            .parse_key("domain.catalog.id.with.dots")
            .expect("parse");

        assert_eq!(parsed.domain, "domain");
        assert_eq!(parsed.catalog, "catalog");
        assert_eq!(parsed.id, "id.with.dots");
    }

    #[test]
    fn test_parse_key_single_segment_fails() {
        let translator = Translator::new();
        let result = translator.parse_key("nodots");

        assert!(matches!(result, Err(I18nError::InvalidKey(key)) if key == "nodots"));
    }

    #[test]
    fn test_parse_key_strips_invalid_characters() {
        let translator = Translator::new();
        let parsed = translator.parse_key("ad min.err ors!.den/ied").expect("parse");

        assert_eq!(parsed.domain, "admin");
        assert_eq!(parsed.catalog, "errors");
        assert_eq!(parsed.id, "denied");
    }

    #[test]
    fn test_parse_key_is_memoized() {
        let translator = Translator::new();
        translator.parse_key("default.greeting").expect("parse");

        assert!(translator
            .keys
            .read()
            .expect("memo")
            .contains_key("default.greeting"));
    }

    // ==================== get_message Tests ====================

    #[test]
    fn test_get_message_hit() {
        let mut registry = registry();
        registry.use_locale("en").expect("use");
        let translator = Translator::new();

        let message = translator
            .get_message(&registry, "default.greeting")
            .expect("message");
        assert_eq!(message, "Hello");
    }

    #[test]
    fn test_get_message_falls_through_cascade() {
        let mut registry = registry();
        registry.use_locale("en_US").expect("use");
        let translator = Translator::new();

        // en_US has no `default` catalog at all; `en` supplies the hit.
        let message = translator
            .get_message(&registry, "default.greeting")
            .expect("message");
        assert_eq!(message, "Hello");
    }

    #[test]
    fn test_get_message_prefers_most_specific_locale() {
        let mut registry = registry();
        registry.set_fallback("en").expect("set fallback");
        registry.use_locale("fr").expect("use");
        let translator = Translator::new();

        let message = translator
            .get_message(&registry, "default.greeting")
            .expect("message");
        assert_eq!(message, "Bonjour");
    }

    #[test]
    fn test_get_message_exhaustion_names_cascade() {
        let mut registry = registry();
        registry.use_locale("en_US").expect("use");
        let translator = Translator::new();

        let result = translator.get_message(&registry, "default.missing");
        match result {
            Err(I18nError::MissingMessage { key, locales }) => {
                assert_eq!(key, "default.missing");
                assert_eq!(locales, ["en_US", "en"]);
            }
            other => panic!("expected MissingMessage, got {:?}", other),
        }
    }

    #[test]
    fn test_get_message_explicit_domain() {
        let mut registry = registry();
        registry.use_locale("en").expect("use");
        let translator = Translator::new();

        let message = translator
            .get_message(&registry, "admin.errors.denied")
            .expect("message");
        assert_eq!(message, "Access denied");
    }

    #[test]
    fn test_get_message_writes_through_cache() {
        let cache = Arc::new(MemoryCache::new());
        let mut registry = registry();
        registry.use_locale("en").expect("use");
        let translator = Translator::new().with_cache(cache.clone());

        translator
            .get_message(&registry, "default.greeting")
            .expect("message");

        let cached = cache.get("g11n.core.default.en").expect("cached");
        assert_eq!(cached.get("greeting"), Some(&"Hello".to_string()));
    }

    #[test]
    fn test_get_message_reads_cache_before_loader() {
        let cache = Arc::new(MemoryCache::new());
        cache.set(
            "g11n.core.default.en",
            catalog(&[("greeting", "Cached hello")]),
        );

        let mut registry = registry();
        registry.use_locale("en").expect("use");
        let translator = Translator::new().with_cache(cache);

        let message = translator
            .get_message(&registry, "default.greeting")
            .expect("message");
        assert_eq!(message, "Cached hello");
    }

    #[test]
    fn test_get_message_memoizes_resolved_keys() {
        let mut registry = registry();
        registry.use_locale("en").expect("use");
        let translator = Translator::new();

        translator
            .get_message(&registry, "default.greeting")
            .expect("message");

        assert_eq!(
            translator
                .messages
                .read()
                .expect("memo")
                .get("default.greeting"),
            Some(&"Hello".to_string())
        );
    }

    // ==================== translate Tests ====================

    #[test]
    fn test_translate_substitutes_positional_params() {
        let mut registry = registry();
        registry.use_locale("en").expect("use");
        let translator = Translator::new();

        let message = translator
            .translate(
                &registry,
                "default.welcome",
                &MessageParams::positional(&["Miles"]),
            )
            .expect("translate");
        assert_eq!(message, "Welcome, Miles!");
    }

    #[test]
    fn test_translate_leaves_unmatched_tokens() {
        let mut registry = registry();
        registry.use_locale("en").expect("use");
        let translator = Translator::new();

        let message = translator
            .translate(&registry, "default.welcome", &MessageParams::none())
            .expect("translate");
        assert_eq!(message, "Welcome, {0}!");
    }

    #[test]
    fn test_brace_format_named_params() {
        let format = BraceFormat;
        let params = MessageParams::none().with("name", "Ada").with("count", 3);

        let message = format
            .format("en", "{name} has {count} items", &params)
            .expect("format");
        assert_eq!(message, "Ada has 3 items");
    }

    // ==================== Shorthand Tests ====================

    #[test]
    fn test_shorthand_helpers() {
        let mut registry = registry();
        registry.set_translator(Translator::new());
        registry.use_locale("en").expect("use");

        let direct = msg(&registry, "default.greeting", &MessageParams::none()).expect("msg");
        assert_eq!(direct, "Hello");

        let assembled = __(
            &registry,
            "denied",
            "errors",
            Some("admin"),
            &MessageParams::none(),
        )
        .expect("assembled");
        assert_eq!(assembled, "Access denied");

        let defaulted =
            __(&registry, "greeting", "default", None, &MessageParams::none()).expect("defaulted");
        assert_eq!(defaulted, "Hello");
    }
}
