//! Locale code canonicalization.
//!
//! Locale identifiers arrive from headers, cookies and configuration in
//! mixed case with either `-` or `_` separators. Every comparison in the
//! crate happens after normalizing through [`canonicalize`], so `en_US`,
//! `EN-us` and `en-US` all refer to the same locale.

/// Output conventions for a canonicalized locale code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyFormat {
    /// `en-us`: all lowercase with a dash. Used for URLs and as the
    /// registry's internal map key.
    Url,

    /// `en-US`: dash separator with an uppercase region.
    Iso,

    /// `en_US`: underscore separator with an uppercase region. The
    /// preferred form; locale nodes store their code this way.
    Posix,
}

/// Normalize a locale string into the requested format.
///
/// The language part is always lowercased. Region casing and the
/// separator depend on the format:
///
/// | input   | `Url`   | `Iso`   | `Posix` |
/// |---------|---------|---------|---------|
/// | `EN_us` | `en-us` | `en-US` | `en_US` |
///
/// A single-segment input (no region) returns just the lowercased
/// language. Segments past the second are dropped.
pub fn canonicalize(key: &str, format: KeyFormat) -> String {
    let lowered = key.to_lowercase().replace('_', "-");
    let mut parts = lowered.split('-');
    let language = parts.next().unwrap_or_default().to_string();
    let region = parts.next().filter(|region| !region.is_empty());

    match region {
        None => language,
        Some(region) => match format {
            KeyFormat::Url => format!("{}-{}", language, region),
            KeyFormat::Iso => format!("{}-{}", language, region.to_uppercase()),
            KeyFormat::Posix => format!("{}_{}", language, region.to_uppercase()),
        },
    }
}
