//! Locale registry: registration, detection and cascade computation.
//!
//! The registry is an explicitly constructed, per-request context object.
//! It owns the set of registered [`Locale`] nodes, the fallback, the
//! currently active locale and the memoized lookup cascade. Nothing here
//! is global: callers create one registry per logical request or session
//! and pass it where it is needed.

use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::error::{I18nError, Result};
use crate::key::{canonicalize, KeyFormat};
use crate::locale::Locale;
use crate::resource::ResourceLoader;
use crate::translator::{MessageParams, Translator};

/// Notification payload handed to locale-change listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleChange {
    /// Code of the previously active locale, if any.
    pub previous: Option<String>,

    /// Code of the locale that just became active.
    pub current: String,
}

type ChangeListener = Box<dyn Fn(&LocaleChange) + Send + Sync>;

/// Ordered locale preferences assembled by the HTTP layer.
///
/// Tokens are lowercase locale codes in client-preference order, e.g.
/// parsed from an `Accept-Language` header. An optional sticky token
/// (e.g. a cookie value) takes precedence over the ordered list.
#[derive(Debug, Clone, Default)]
pub struct ClientPreferences {
    tokens: Vec<String>,
    sticky: Option<String>,
}

impl ClientPreferences {
    pub fn new(tokens: Vec<String>) -> Self {
        ClientPreferences {
            tokens,
            sticky: None,
        }
    }

    /// Parse an `Accept-Language`-style header: lowercase it, truncate
    /// at the first `;` and split the remainder on `,`.
    pub fn from_accept_language(header: &str) -> Self {
        let header = header.to_lowercase();
        let header = match header.find(';') {
            Some(index) => &header[..index],
            None => header.as_str(),
        };

        let tokens = header
            .split(',')
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .collect();

        ClientPreferences {
            tokens,
            sticky: None,
        }
    }

    /// Attach a sticky preference that wins over the ordered tokens.
    pub fn with_sticky(mut self, token: &str) -> Self {
        self.sticky = Some(token.to_lowercase());
        self
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn sticky(&self) -> Option<&str> {
        self.sticky.as_deref()
    }
}

/// Coordinator for locale registration, selection and lookup.
pub struct LocaleRegistry {
    loader: Arc<dyn ResourceLoader>,

    /// Registered nodes keyed by URL-form code, in insertion order.
    locales: Vec<(String, Arc<Locale>)>,

    /// URL-form key of the fallback; always present in `locales`.
    fallback: Option<String>,

    current: Option<Arc<Locale>>,

    /// Memoized cascade; cleared whenever `current` or the fallback
    /// changes.
    cascade: OnceLock<Vec<String>>,

    translator: Option<Translator>,

    listeners: Vec<ChangeListener>,
}

impl LocaleRegistry {
    pub fn new(loader: Arc<dyn ResourceLoader>) -> Self {
        LocaleRegistry {
            loader,
            locales: Vec::new(),
            fallback: None,
            current: None,
            cascade: OnceLock::new(),
            translator: None,
            listeners: Vec::new(),
        }
    }

    /// Register a locale, initializing it and its whole parent chain.
    ///
    /// Registration is idempotent by canonicalized code: adding an
    /// already-known locale returns the existing node untouched. The
    /// first locale whose registration completes becomes the fallback
    /// unless one was set explicitly.
    pub fn add_locale(&mut self, locale: Locale) -> Result<Arc<Locale>> {
        let mut visiting = Vec::new();
        self.register(locale, &mut visiting)
    }

    fn register(&mut self, mut locale: Locale, visiting: &mut Vec<String>) -> Result<Arc<Locale>> {
        let key = canonicalize(locale.code(), KeyFormat::Url);

        if let Some(existing) = self.get(&key) {
            return Ok(existing.clone());
        }

        locale.load_own_config(&self.loader)?;

        // Resolve the parent chain first so the effective configuration
        // is complete when the node is registered. A code already on the
        // in-flight chain ends the walk: parent chains must stay acyclic.
        let parent = match locale.own_config().parent.clone() {
            Some(parent_code) => {
                let parent_key = canonicalize(&parent_code, KeyFormat::Url);

                if parent_key == key || visiting.contains(&parent_key) {
                    None
                } else {
                    visiting.push(key.clone());
                    let parent = self.register(Locale::new(&parent_code), visiting)?;
                    visiting.pop();
                    Some(parent)
                }
            }
            None => None,
        };

        locale.finalize(parent);
        let node = Arc::new(locale);
        self.locales.push((key.clone(), node.clone()));

        debug!("registered locale {} as {}", node.code(), key);

        if self.fallback.is_none() {
            self.fallback = Some(key);
        }

        Ok(node)
    }

    /// Define the fallback locale consulted last in every cascade.
    pub fn set_fallback(&mut self, key: &str) -> Result<()> {
        let key = canonicalize(key, KeyFormat::Url);

        if self.get(&key).is_none() {
            return Err(I18nError::MissingLocale(key));
        }

        self.fallback = Some(key);
        self.cascade.take();

        Ok(())
    }

    pub fn fallback(&self) -> Option<&Arc<Locale>> {
        self.fallback.as_deref().and_then(|key| self.get(key))
    }

    pub fn current(&self) -> Option<&Arc<Locale>> {
        self.current.as_ref()
    }

    /// The active locale for lookups: `current`, else the fallback.
    pub fn active(&self) -> Option<&Arc<Locale>> {
        self.current().or_else(|| self.fallback())
    }

    /// All registered locales in insertion order.
    pub fn locales(&self) -> Vec<&Arc<Locale>> {
        self.locales.iter().map(|(_, locale)| locale).collect()
    }

    /// Look up a registered locale by any spelling of its code.
    pub fn get_locale(&self, key: &str) -> Option<&Arc<Locale>> {
        self.get(&canonicalize(key, KeyFormat::Url))
    }

    fn get(&self, url_key: &str) -> Option<&Arc<Locale>> {
        self.locales
            .iter()
            .find(|(key, _)| key == url_key)
            .map(|(_, locale)| locale)
    }

    /// True once at least one locale is registered. Detection and the
    /// helper utilities are no-ops while disabled, so a single-locale
    /// application pays nothing for this subsystem.
    pub fn is_enabled(&self) -> bool {
        !self.locales.is_empty()
    }

    /// Make a registered locale the active one.
    ///
    /// Invalidates the memoized cascade and notifies change listeners.
    pub fn use_locale(&mut self, key: &str) -> Result<Arc<Locale>> {
        let key = canonicalize(key, KeyFormat::Url);
        let locale = self
            .get(&key)
            .cloned()
            .ok_or_else(|| I18nError::MissingLocale(key.clone()))?;

        let previous = self.current.as_ref().map(|prev| prev.code().to_string());
        self.current = Some(locale.clone());
        self.cascade.take();

        let change = LocaleChange {
            previous,
            current: locale.code().to_string(),
        };
        debug!("switched locale to {}", change.current);

        for listener in &self.listeners {
            listener(&change);
        }

        Ok(locale)
    }

    /// Subscribe to locale changes.
    pub fn on_locale_change(&mut self, listener: impl Fn(&LocaleChange) + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// The ordered, deduplicated list of POSIX codes consulted during
    /// lookup: the current locale's ancestor chain, then the fallback's,
    /// keeping the first occurrence of any duplicate. Memoized until the
    /// current locale or the fallback changes.
    pub fn cascade(&self) -> Result<&[String]> {
        if self.fallback.is_none() {
            return Err(I18nError::MissingFallback);
        }

        if let Some(cycle) = self.cascade.get() {
            return Ok(cycle);
        }

        let mut cycle: Vec<String> = Vec::new();
        for start in [self.current.as_ref(), self.fallback()] {
            let mut node = start.cloned();
            while let Some(locale) = node {
                let code = locale.code().to_string();
                if !cycle.contains(&code) {
                    cycle.push(code);
                }
                node = locale.parent().cloned();
            }
        }

        debug!("computed locale cascade {:?}", cycle);

        Ok(self.cascade.get_or_init(|| cycle))
    }

    /// Does the active locale match the given key, either verbatim or
    /// after canonicalization?
    pub fn is(&self, key: &str) -> bool {
        match &self.current {
            Some(locale) => {
                locale.code() == key || locale.code() == canonicalize(key, KeyFormat::Posix)
            }
            None => false,
        }
    }

    /// Select the active locale from client preferences.
    ///
    /// The sticky token is consulted first, then the ordered preference
    /// tokens; the first one matching a registered locale wins, and the
    /// fallback's code is used when nothing matches. Completing detection
    /// without an attached translator is a configuration error.
    pub fn detect(&mut self, preferences: &ClientPreferences) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        let fallback_code = self
            .fallback()
            .map(|locale| locale.code().to_string())
            .ok_or(I18nError::MissingFallback)?;

        let winner = preferences
            .sticky()
            .into_iter()
            .chain(preferences.tokens().iter().map(String::as_str))
            .find(|token| self.get(&canonicalize(token, KeyFormat::Url)).is_some())
            .map(str::to_string)
            .unwrap_or(fallback_code);

        self.use_locale(&winner)?;

        if self.translator.is_none() {
            return Err(I18nError::MissingTranslator);
        }

        Ok(())
    }

    pub fn set_translator(&mut self, translator: Translator) {
        self.translator = Some(translator);
    }

    pub fn translator(&self) -> Option<&Translator> {
        self.translator.as_ref()
    }

    /// Resolve a message key through the attached translator.
    pub fn get_message(&self, key: &str) -> Result<String> {
        self.translator
            .as_ref()
            .ok_or(I18nError::MissingTranslator)?
            .get_message(self, key)
    }

    /// Resolve and format a message through the attached translator.
    pub fn translate(&self, key: &str, params: &MessageParams) -> Result<String> {
        self.translator
            .as_ref()
            .ok_or(I18nError::MissingTranslator)?
            .translate(self, key, params)
    }

    pub(crate) fn loader(&self) -> &Arc<dyn ResourceLoader> {
        &self.loader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{MemoryLoader, ResourceMap};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn object(value: serde_json::Value) -> ResourceMap {
        value.as_object().expect("object literal").clone()
    }

    fn loader() -> Arc<dyn ResourceLoader> {
        Arc::new(
            MemoryLoader::new()
                .with_locale_resource(
                    "en",
                    "locale",
                    object(json!({"code": "en", "title": "English"})),
                )
                .with_locale_resource(
                    "en_US",
                    "locale",
                    object(json!({"code": "en_US", "parent": "en"})),
                )
                .with_locale_resource("fr", "locale", object(json!({"code": "fr"})))
                .with_locale_resource(
                    "fr_CA",
                    "locale",
                    object(json!({"code": "fr_CA", "parent": "fr"})),
                ),
        )
    }

    fn registry() -> LocaleRegistry {
        LocaleRegistry::new(loader())
    }

    // ==================== Registration Tests ====================

    #[test]
    fn test_is_enabled_transitions() {
        let mut registry = registry();
        assert!(!registry.is_enabled());

        registry.add_locale(Locale::new("fr")).expect("add");
        assert!(registry.is_enabled());
    }

    #[test]
    fn test_add_locale_registers_parent_chain() {
        let mut registry = registry();
        let en_us = registry.add_locale(Locale::new("en_US")).expect("add");

        assert_eq!(en_us.code(), "en_US");
        assert_eq!(en_us.parent().expect("parent").code(), "en");
        assert!(registry.get_locale("en").is_some());
        assert_eq!(registry.locales().len(), 2);
    }

    #[test]
    fn test_add_locale_is_idempotent() {
        let mut registry = registry();
        let first = registry.add_locale(Locale::new("en_US")).expect("add");
        let count = registry.locales().len();

        let second = registry.add_locale(Locale::new("en-US")).expect("add");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.locales().len(), count);
    }

    #[test]
    fn test_children_share_parent_node() {
        let mut registry = registry();
        registry.add_locale(Locale::new("en")).expect("add");
        let en_us = registry.add_locale(Locale::new("en_US")).expect("add");

        let registered = registry.get_locale("en").expect("registered").clone();
        assert!(Arc::ptr_eq(en_us.parent().expect("parent"), &registered));
    }

    #[test]
    fn test_self_parent_ends_chain() {
        let loader: Arc<dyn ResourceLoader> = Arc::new(MemoryLoader::new().with_locale_resource(
            "xx",
            "locale",
            object(json!({"code": "xx", "parent": "xx"})),
        ));
        let mut registry = LocaleRegistry::new(loader);

        let xx = registry.add_locale(Locale::new("xx")).expect("add");
        assert!(xx.parent().is_none());
    }

    #[test]
    fn test_parent_cycle_ends_chain() {
        let loader: Arc<dyn ResourceLoader> = Arc::new(
            MemoryLoader::new()
                .with_locale_resource("aa", "locale", object(json!({"parent": "bb"})))
                .with_locale_resource("bb", "locale", object(json!({"parent": "aa"}))),
        );
        let mut registry = LocaleRegistry::new(loader);

        let aa = registry.add_locale(Locale::new("aa")).expect("add");
        let bb = aa.parent().expect("parent");
        assert_eq!(bb.code(), "bb");
        assert!(bb.parent().is_none());
    }

    // ==================== Fallback Tests ====================

    #[test]
    fn test_first_completed_registration_becomes_fallback() {
        let mut registry = registry();
        registry.add_locale(Locale::new("en_US")).expect("add");

        // The parent chain resolves root-first, so `en` completes before
        // `en_US` and takes the default fallback slot.
        assert_eq!(registry.fallback().expect("fallback").code(), "en");
    }

    #[test]
    fn test_set_fallback_overrides_default() {
        let mut registry = registry();
        registry.add_locale(Locale::new("en")).expect("add");
        registry.add_locale(Locale::new("fr")).expect("add");

        registry.set_fallback("FR").expect("set fallback");
        assert_eq!(registry.fallback().expect("fallback").code(), "fr");
    }

    #[test]
    fn test_set_fallback_unregistered_fails() {
        let mut registry = registry();
        registry.add_locale(Locale::new("en")).expect("add");

        let result = registry.set_fallback("de");
        assert!(matches!(result, Err(I18nError::MissingLocale(code)) if code == "de"));
    }

    // ==================== use_locale Tests ====================

    #[test]
    fn test_use_locale_sets_current() {
        let mut registry = registry();
        registry.add_locale(Locale::new("en_US")).expect("add");

        registry.use_locale("en-us").expect("use");
        assert_eq!(registry.current().expect("current").code(), "en_US");
    }

    #[test]
    fn test_use_locale_unregistered_fails() {
        let mut registry = registry();
        registry.add_locale(Locale::new("en")).expect("add");

        let result = registry.use_locale("de");
        assert!(matches!(result, Err(I18nError::MissingLocale(code)) if code == "de"));
    }

    #[test]
    fn test_use_locale_notifies_listeners() {
        let mut registry = registry();
        registry.add_locale(Locale::new("en")).expect("add");
        registry.add_locale(Locale::new("fr")).expect("add");

        let changes = Arc::new(AtomicUsize::new(0));
        let seen = changes.clone();
        registry.on_locale_change(move |change| {
            seen.fetch_add(1, Ordering::SeqCst);
            assert!(change.current == "en" || change.current == "fr");
        });

        registry.use_locale("en").expect("use");
        registry.use_locale("fr").expect("use");
        assert_eq!(changes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_is_matches_raw_and_canonical() {
        let mut registry = registry();
        registry.add_locale(Locale::new("en_US")).expect("add");
        registry.use_locale("en_US").expect("use");

        assert!(registry.is("en_US"));
        assert!(registry.is("en-us"));
        assert!(registry.is("EN-us"));
        assert!(!registry.is("en"));
    }

    // ==================== Cascade Tests ====================

    #[test]
    fn test_cascade_walks_current_then_fallback() {
        let mut registry = registry();
        registry.add_locale(Locale::new("en_US")).expect("add");
        registry.add_locale(Locale::new("fr")).expect("add");
        registry.set_fallback("fr").expect("set fallback");
        registry.use_locale("en_US").expect("use");

        assert_eq!(registry.cascade().expect("cascade"), ["en_US", "en", "fr"]);
    }

    #[test]
    fn test_cascade_includes_fallback_ancestors() {
        let mut registry = registry();
        registry.add_locale(Locale::new("en_US")).expect("add");
        registry.add_locale(Locale::new("fr_CA")).expect("add");
        registry.set_fallback("fr_CA").expect("set fallback");
        registry.use_locale("en_US").expect("use");

        assert_eq!(
            registry.cascade().expect("cascade"),
            ["en_US", "en", "fr_CA", "fr"]
        );
    }

    #[test]
    fn test_cascade_deduplicates_keeping_first() {
        let mut registry = registry();
        registry.add_locale(Locale::new("en_US")).expect("add");
        registry.set_fallback("en").expect("set fallback");
        registry.use_locale("en_US").expect("use");

        assert_eq!(registry.cascade().expect("cascade"), ["en_US", "en"]);
    }

    #[test]
    fn test_cascade_without_current_uses_fallback_chain() {
        let mut registry = registry();
        registry.add_locale(Locale::new("en_US")).expect("add");
        registry.set_fallback("en_US").expect("set fallback");

        assert_eq!(registry.cascade().expect("cascade"), ["en_US", "en"]);
    }

    #[test]
    fn test_cascade_without_fallback_fails() {
        let registry = registry();
        assert!(matches!(
            registry.cascade(),
            Err(I18nError::MissingFallback)
        ));
    }

    #[test]
    fn test_cascade_invalidated_by_locale_switch() {
        let mut registry = registry();
        registry.add_locale(Locale::new("en_US")).expect("add");
        registry.add_locale(Locale::new("fr")).expect("add");
        registry.set_fallback("en").expect("set fallback");

        registry.use_locale("en_US").expect("use");
        assert_eq!(registry.cascade().expect("cascade"), ["en_US", "en"]);

        registry.use_locale("fr").expect("use");
        assert_eq!(registry.cascade().expect("cascade"), ["fr", "en"]);
    }

    // ==================== Detection Tests ====================

    fn detecting_registry() -> LocaleRegistry {
        let mut registry = registry();
        registry.add_locale(Locale::new("en_US")).expect("add");
        registry.add_locale(Locale::new("fr")).expect("add");
        registry.set_fallback("en").expect("set fallback");
        registry.set_translator(Translator::new());
        registry
    }

    #[test]
    fn test_detect_first_matching_token_wins() {
        let mut registry = detecting_registry();
        let preferences =
            ClientPreferences::from_accept_language("de-DE,fr,en-us;q=0.8,en;q=0.7");

        registry.detect(&preferences).expect("detect");
        assert_eq!(registry.current().expect("current").code(), "fr");
    }

    #[test]
    fn test_detect_sticky_overrides_tokens() {
        let mut registry = detecting_registry();
        let preferences = ClientPreferences::from_accept_language("fr").with_sticky("en_US");

        registry.detect(&preferences).expect("detect");
        assert_eq!(registry.current().expect("current").code(), "en_US");
    }

    #[test]
    fn test_detect_falls_back_when_nothing_matches() {
        let mut registry = detecting_registry();
        let preferences = ClientPreferences::from_accept_language("de,ja,zh-cn");

        registry.detect(&preferences).expect("detect");
        assert_eq!(registry.current().expect("current").code(), "en");
    }

    #[test]
    fn test_detect_without_translator_fails() {
        let mut registry = registry();
        registry.add_locale(Locale::new("en")).expect("add");

        let result = registry.detect(&ClientPreferences::from_accept_language("en"));
        assert!(matches!(result, Err(I18nError::MissingTranslator)));
        // The locale itself was still applied before the check.
        assert_eq!(registry.current().expect("current").code(), "en");
    }

    #[test]
    fn test_detect_is_noop_when_disabled() {
        let mut registry = registry();
        registry
            .detect(&ClientPreferences::from_accept_language("en"))
            .expect("detect");

        assert!(registry.current().is_none());
    }

    #[test]
    fn test_accept_language_parsing() {
        let preferences = ClientPreferences::from_accept_language("EN-us, fr ;q=0.8,de");
        // Everything after the first `;` is discarded.
        assert_eq!(preferences.tokens(), ["en-us", "fr"]);
    }

    // ==================== Delegation Tests ====================

    #[test]
    fn test_translate_without_translator_fails() {
        let mut registry = registry();
        registry.add_locale(Locale::new("en")).expect("add");

        let result = registry.translate("default.greeting", &MessageParams::none());
        assert!(matches!(result, Err(I18nError::MissingTranslator)));
    }
}
