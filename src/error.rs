//! Error taxonomy for locale resolution and message lookup.
//!
//! Every failure here is synchronous and local. None of them are retried:
//! a missing locale or message cannot succeed on a second attempt without
//! external state changing first. A catalog missing for one locale in the
//! middle of a cascade is *not* an error; only exhausting the whole
//! cascade surfaces [`I18nError::MissingMessage`].

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, I18nError>;

#[derive(Debug, Error)]
pub enum I18nError {
    /// A translation key had fewer than two dot-separated segments.
    #[error("no catalog present for key '{0}'")]
    InvalidKey(String),

    /// A locale code was referenced before being registered.
    #[error("locale {0} has not been set up")]
    MissingLocale(String),

    /// A cascade or lookup ran before any fallback locale was configured.
    #[error("a fallback locale is required before lookups can run")]
    MissingFallback,

    /// Locale detection finished but no translator was attached.
    #[error("a translator is required for message parsing")]
    MissingTranslator,

    /// The whole cascade was walked without finding the message.
    #[error("message key {key} does not exist in {}", .locales.join(", "))]
    MissingMessage { key: String, locales: Vec<String> },

    /// A rule table was requested from a locale with no loader attached.
    #[error("locale {0} has no resource loader attached")]
    MissingResource(String),

    /// A format pattern had neither a locale value nor a caller fallback.
    #[error("format pattern {0} does not exist")]
    MissingPattern(String),

    /// A validation rule had neither a locale value nor a caller fallback.
    #[error("validation rule {0} does not exist")]
    MissingValidationRule(String),

    /// A resource file existed but could not be read or parsed.
    #[error("failed to load resource {resource}: {reason}")]
    Resource { resource: String, reason: String },

    /// A locale-supplied rule contained an unusable regular expression.
    #[error("invalid rule pattern '{rule}': {reason}")]
    InvalidRule { rule: String, reason: String },

    /// Message formatting failed after a successful lookup.
    #[error("failed to format message {key}: {reason}")]
    Format { key: String, reason: String },
}
