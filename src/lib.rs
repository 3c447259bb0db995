//! Locale resolution and cascading message lookup.
//!
//! This crate is the internationalization layer of a web application:
//! it normalizes locale codes, builds parent chains with configuration
//! inheritance, picks the active locale from client signals and resolves
//! translation keys through an ordered cascade of locales and catalogs
//! with caching and graceful fallback.
//!
//! # Architecture
//!
//! - `key`: canonical locale code forms and normalization
//! - `locale`: a single locale's identity, config and rule tables
//! - `registry`: per-request coordinator driving detection and cascades
//! - `translator`: cascading message lookup and parameter formatting
//! - `resource`: loader and cache seams with JSON and in-memory impls
//! - `config`: environment-driven bootstrap
//! - `metrics`: lookup observability counters
//! - `inflect`, `validate`, `format`: locale-aware helper utilities
//!
//! # Example
//!
//! ```rust,ignore
//! use locale_cascade::{ClientPreferences, Locale, LocaleRegistry, MessageParams};
//!
//! let mut registry = LocaleRegistry::new(loader);
//! registry.add_locale(Locale::new("en_US"))?;
//! registry.add_locale(Locale::new("fr"))?;
//! registry.set_fallback("en")?;
//! registry.set_translator(Translator::new().with_cache(cache));
//!
//! registry.detect(&ClientPreferences::from_accept_language("fr,en;q=0.8"))?;
//! let greeting = registry.translate("default.greeting", &MessageParams::none())?;
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod inflect;
pub mod key;
pub mod locale;
pub mod metrics;
pub mod registry;
pub mod resource;
pub mod translator;
pub mod validate;

pub use config::Settings;
pub use error::{I18nError, Result};
pub use key::{canonicalize, KeyFormat};
pub use locale::{Locale, LocaleConfig};
pub use metrics::{LookupMetrics, MetricsReport};
pub use registry::{ClientPreferences, LocaleChange, LocaleRegistry};
pub use resource::{
    Cache, JsonFileLoader, MemoryCache, MemoryLoader, MessageMap, ResourceLoader, ResourceMap,
};
pub use translator::{
    __, msg, BraceFormat, MessageFormat, MessageKey, MessageParams, Translator, DEFAULT_DOMAIN,
};
