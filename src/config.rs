use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::locale::Locale;
use crate::registry::LocaleRegistry;
use crate::resource::{JsonFileLoader, MemoryCache};
use crate::translator::Translator;

#[derive(Debug, Clone)]
pub struct Settings {
    // Resource roots searched in order (comma-separated in the env)
    pub resource_paths: Vec<PathBuf>,

    // Locale codes to register at startup
    pub locales: Vec<String>,

    // Fallback code; first registered locale when unset
    pub fallback_locale: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            resource_paths: std::env::var("I18N_RESOURCE_PATHS")
                .context("I18N_RESOURCE_PATHS not set")?
                .split(',')
                .map(|path| PathBuf::from(path.trim()))
                .filter(|path| !path.as_os_str().is_empty())
                .collect(),

            locales: std::env::var("I18N_LOCALES")
                .context("I18N_LOCALES not set")?
                .split(',')
                .map(|code| code.trim().to_string())
                .filter(|code| !code.is_empty())
                .collect(),

            fallback_locale: std::env::var("I18N_FALLBACK_LOCALE").ok(),
        })
    }

    /// Build a ready-to-use registry: JSON loader over the configured
    /// paths, every configured locale registered, fallback applied and
    /// a default translator attached.
    pub fn bootstrap(&self) -> Result<LocaleRegistry> {
        let loader = Arc::new(JsonFileLoader::new(self.resource_paths.clone()));
        let mut registry = LocaleRegistry::new(loader);

        for code in &self.locales {
            registry
                .add_locale(Locale::new(code))
                .with_context(|| format!("failed to register locale {}", code))?;
        }

        if let Some(fallback) = &self.fallback_locale {
            registry
                .set_fallback(fallback)
                .context("failed to set fallback locale")?;
        }

        registry.set_translator(Translator::new().with_cache(Arc::new(MemoryCache::new())));

        Ok(registry)
    }
}
