//! Locale node: identity, typed configuration and inherited rule tables.
//!
//! A [`Locale`] starts as a bare code plus optional seed configuration.
//! Registration through the registry loads its `locale` metadata
//! resource, links the parent node and computes the effective (inherited)
//! configuration exactly once. After that the node is immutable and safe
//! to share read-only across concurrent resolvers.

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{I18nError, Result};
use crate::key::{canonicalize, KeyFormat};
use crate::resource::{ResourceLoader, ResourceMap};

/// Typed metadata for one locale, read from its `locale` resource.
///
/// Unknown fields in the resource are ignored; the open-ended rule
/// tables (formats, inflections, validations) live in their own
/// resources, not here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocaleConfig {
    /// Code of the parent locale this one inherits from.
    pub parent: Option<String>,

    /// ISO 639-1 two-letter language code.
    pub iso2: Option<String>,

    /// ISO 639-2 three-letter codes. Resources may supply a single
    /// string or a list.
    #[serde(deserialize_with = "string_or_list")]
    pub iso3: Vec<String>,

    /// Default timezone identifier (e.g. `America/New_York`).
    pub timezone: Option<String>,

    /// Human-readable locale title.
    pub title: Option<String>,
}

impl LocaleConfig {
    /// Overlay this configuration on a base: set fields win, unset
    /// fields inherit the base's value.
    pub fn merged_over(&self, base: &LocaleConfig) -> LocaleConfig {
        LocaleConfig {
            parent: self.parent.clone().or_else(|| base.parent.clone()),
            iso2: self.iso2.clone().or_else(|| base.iso2.clone()),
            iso3: if self.iso3.is_empty() {
                base.iso3.clone()
            } else {
                self.iso3.clone()
            },
            timezone: self.timezone.clone().or_else(|| base.timezone.clone()),
            title: self.title.clone().or_else(|| base.title.clone()),
        }
    }
}

fn string_or_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(code)) => vec![code],
        Some(OneOrMany::Many(codes)) => codes,
    })
}

/// The three lazily-loaded rule tables a locale carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleKind {
    Formats,
    Inflections,
    Validations,
}

impl RuleKind {
    fn resource_name(self) -> &'static str {
        match self {
            RuleKind::Formats => "formats",
            RuleKind::Inflections => "inflections",
            RuleKind::Validations => "validations",
        }
    }
}

/// A single locale: canonical code, configuration and rule tables.
pub struct Locale {
    /// Canonical code in POSIX form (`en`, `en_US`).
    code: String,

    /// Configuration from this locale's own resource merged with any
    /// construction seed (seed wins).
    own_config: LocaleConfig,

    /// `own_config` merged over the parent's effective configuration.
    /// Valid only after registration; never changes afterwards.
    effective_config: LocaleConfig,

    /// Parent node, shared with every other child of the same parent.
    parent: Option<Arc<Locale>>,

    loader: Option<Arc<dyn ResourceLoader>>,

    // Per-instance caches, filled on first access.
    format_patterns: OnceLock<ResourceMap>,
    inflection_rules: OnceLock<ResourceMap>,
    validation_rules: OnceLock<ResourceMap>,
}

impl Locale {
    /// Create an unregistered locale node for the given code.
    pub fn new(code: &str) -> Self {
        Self::with_config(code, LocaleConfig::default())
    }

    /// Create an unregistered locale node with seed configuration.
    /// Seed values win over anything loaded from the `locale` resource.
    pub fn with_config(code: &str, seed: LocaleConfig) -> Self {
        Locale {
            code: canonicalize(code, KeyFormat::Posix),
            own_config: seed,
            effective_config: LocaleConfig::default(),
            parent: None,
            loader: None,
            format_patterns: OnceLock::new(),
            inflection_rules: OnceLock::new(),
            validation_rules: OnceLock::new(),
        }
    }

    /// The canonical POSIX code (`en_US`).
    pub fn code(&self) -> &str {
        &self.code
    }

    /// This locale's own configuration, before inheritance.
    pub fn own_config(&self) -> &LocaleConfig {
        &self.own_config
    }

    /// Own configuration merged over the whole ancestor chain.
    pub fn effective_config(&self) -> &LocaleConfig {
        &self.effective_config
    }

    pub fn parent(&self) -> Option<&Arc<Locale>> {
        self.parent.as_ref()
    }

    /// Attach the loader and merge loaded metadata under the seed.
    /// Runs before parent resolution so the registry can read `parent`.
    pub(crate) fn load_own_config(&mut self, loader: &Arc<dyn ResourceLoader>) -> Result<()> {
        self.loader = Some(loader.clone());

        if let Some(map) = loader.load_locale_resource(&self.code, "locale")? {
            let loaded: LocaleConfig =
                serde_json::from_value(Value::Object(map)).map_err(|error| {
                    I18nError::Resource {
                        resource: format!("{}/locale", self.code),
                        reason: error.to_string(),
                    }
                })?;

            self.own_config = self.own_config.merged_over(&loaded);
        }

        Ok(())
    }

    /// Link the parent and compute the effective configuration bottom-up.
    /// The node is immutable after this returns.
    pub(crate) fn finalize(&mut self, parent: Option<Arc<Locale>>) {
        self.effective_config = match &parent {
            Some(parent) => self.own_config.merged_over(parent.effective_config()),
            None => self.own_config.clone(),
        };
        self.parent = parent;

        debug!("locale {} initialized", self.code);
    }

    /// The merged format patterns for this locale.
    pub fn format_patterns(&self) -> Result<&ResourceMap> {
        self.merged_rules(RuleKind::Formats)
    }

    /// A single format pattern, or `None` when the locale chain has no
    /// entry for the key. Absence is normal; callers supply fallbacks.
    pub fn format_pattern(&self, key: &str) -> Result<Option<&Value>> {
        Ok(self.format_patterns()?.get(key))
    }

    /// The merged inflection rules for this locale.
    pub fn inflection_rules(&self) -> Result<&ResourceMap> {
        self.merged_rules(RuleKind::Inflections)
    }

    pub fn inflection_rule(&self, key: &str) -> Result<Option<&Value>> {
        Ok(self.inflection_rules()?.get(key))
    }

    /// The merged validation rules for this locale.
    pub fn validation_rules(&self) -> Result<&ResourceMap> {
        self.merged_rules(RuleKind::Validations)
    }

    pub fn validation_rule(&self, key: &str) -> Result<Option<&Value>> {
        Ok(self.validation_rules()?.get(key))
    }

    fn rule_slot(&self, kind: RuleKind) -> &OnceLock<ResourceMap> {
        match kind {
            RuleKind::Formats => &self.format_patterns,
            RuleKind::Inflections => &self.inflection_rules,
            RuleKind::Validations => &self.validation_rules,
        }
    }

    /// Load a rule table merged own-over-parent and cache it.
    ///
    /// The merge is a top-level override: a child's key fully replaces
    /// the parent's same-named key, nested values are never unioned.
    /// Two threads racing on a cold slot may both load; both compute the
    /// same value, so the loser's copy is simply dropped.
    fn merged_rules(&self, kind: RuleKind) -> Result<&ResourceMap> {
        let slot = self.rule_slot(kind);
        if let Some(map) = slot.get() {
            return Ok(map);
        }

        let loader = self
            .loader
            .as_ref()
            .ok_or_else(|| I18nError::MissingResource(self.code.clone()))?;

        let mut merged = match &self.parent {
            Some(parent) => parent.merged_rules(kind)?.clone(),
            None => ResourceMap::new(),
        };

        if let Some(own) = loader.load_locale_resource(&self.code, kind.resource_name())? {
            for (key, value) in own {
                merged.insert(key, value);
            }
        }

        Ok(slot.get_or_init(|| merged))
    }
}

impl fmt::Debug for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Locale")
            .field("code", &self.code)
            .field("parent", &self.parent.as_ref().map(|parent| parent.code()))
            .finish_non_exhaustive()
    }
}
