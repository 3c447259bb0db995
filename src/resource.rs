//! Resource loading and catalog caching seams.
//!
//! The core never parses files itself; it goes through [`ResourceLoader`]
//! for locale metadata, rule tables and message catalogs, and through
//! [`Cache`] for resolved catalogs. Both traits ship with working default
//! implementations: a JSON-file loader for production resource trees and
//! an in-memory pair for tests and embedded defaults.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde_json::Value;
use tracing::debug;

use crate::error::{I18nError, Result};

/// Open-ended key/value table parsed from a locale resource file.
pub type ResourceMap = serde_json::Map<String, Value>;

/// Flat id-to-message table for one (domain, locale, catalog) triple.
pub type MessageMap = HashMap<String, String>;

/// Source of locale metadata, rule tables and message catalogs.
///
/// Both methods return `Ok(None)` when the underlying resource does not
/// exist. That absence is normal control flow: the cascade relies on it
/// to fall through to the next locale.
pub trait ResourceLoader: Send + Sync {
    /// Load a named locale resource (`locale`, `formats`, `inflections`,
    /// `validations`) for the given locale code.
    fn load_locale_resource(&self, code: &str, name: &str) -> Result<Option<ResourceMap>>;

    /// Load one message catalog for a (domain, locale) pair.
    fn load_catalog(&self, domain: &str, code: &str, catalog: &str) -> Result<Option<MessageMap>>;
}

/// Shared store for resolved catalogs.
///
/// The cache is the only structure meant to be shared across requests.
/// Racing writers are benign: both compute the same value from the same
/// immutable source file.
pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> Option<MessageMap>;
    fn set(&self, key: &str, value: MessageMap);
}

/// Loader reading JSON resources from one or more root directories.
///
/// Layout under each root, with locale directories named in POSIX form:
///
/// ```text
/// locales/<code>/<name>.json
/// messages/<domain>/<code>/<catalog>.json
/// ```
///
/// Roots are searched in order; the first file found wins.
pub struct JsonFileLoader {
    paths: Vec<PathBuf>,
}

impl JsonFileLoader {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        JsonFileLoader { paths }
    }

    pub fn add_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.push(path.into());
        self
    }

    fn read_json(path: &Path) -> Result<Option<Value>> {
        if !path.is_file() {
            return Ok(None);
        }

        let raw = fs::read_to_string(path).map_err(|error| I18nError::Resource {
            resource: path.display().to_string(),
            reason: error.to_string(),
        })?;

        let value = serde_json::from_str(&raw).map_err(|error| I18nError::Resource {
            resource: path.display().to_string(),
            reason: error.to_string(),
        })?;

        Ok(Some(value))
    }
}

impl ResourceLoader for JsonFileLoader {
    fn load_locale_resource(&self, code: &str, name: &str) -> Result<Option<ResourceMap>> {
        for base in &self.paths {
            let path = base
                .join("locales")
                .join(code)
                .join(format!("{}.json", name));

            if let Some(value) = Self::read_json(&path)? {
                debug!("loaded locale resource {} for {}", name, code);

                return match value {
                    Value::Object(map) => Ok(Some(map)),
                    _ => Err(I18nError::Resource {
                        resource: path.display().to_string(),
                        reason: "expected a JSON object".to_string(),
                    }),
                };
            }
        }

        Ok(None)
    }

    fn load_catalog(&self, domain: &str, code: &str, catalog: &str) -> Result<Option<MessageMap>> {
        for base in &self.paths {
            let path = base
                .join("messages")
                .join(domain)
                .join(code)
                .join(format!("{}.json", catalog));

            if let Some(value) = Self::read_json(&path)? {
                debug!("loaded {} catalog {} for {}", domain, catalog, code);

                let messages =
                    serde_json::from_value(value).map_err(|error| I18nError::Resource {
                        resource: path.display().to_string(),
                        reason: error.to_string(),
                    })?;

                return Ok(Some(messages));
            }
        }

        Ok(None)
    }
}

/// In-memory loader for tests and embedded defaults.
#[derive(Default)]
pub struct MemoryLoader {
    locales: HashMap<(String, String), ResourceMap>,
    catalogs: HashMap<(String, String, String), MessageMap>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locale_resource(mut self, code: &str, name: &str, map: ResourceMap) -> Self {
        self.locales.insert((code.to_string(), name.to_string()), map);
        self
    }

    pub fn with_catalog(
        mut self,
        domain: &str,
        code: &str,
        catalog: &str,
        messages: MessageMap,
    ) -> Self {
        self.catalogs.insert(
            (domain.to_string(), code.to_string(), catalog.to_string()),
            messages,
        );
        self
    }
}

impl ResourceLoader for MemoryLoader {
    fn load_locale_resource(&self, code: &str, name: &str) -> Result<Option<ResourceMap>> {
        Ok(self
            .locales
            .get(&(code.to_string(), name.to_string()))
            .cloned())
    }

    fn load_catalog(&self, domain: &str, code: &str, catalog: &str) -> Result<Option<MessageMap>> {
        Ok(self
            .catalogs
            .get(&(domain.to_string(), code.to_string(), catalog.to_string()))
            .cloned())
    }
}

/// Thread-safe in-memory catalog cache.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, MessageMap>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<MessageMap> {
        self.entries
            .read()
            .expect("cache lock poisoned")
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: MessageMap) {
        self.entries
            .write()
            .expect("cache lock poisoned")
            .insert(key.to_string(), value);
    }
}
