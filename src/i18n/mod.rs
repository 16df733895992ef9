//! Internationalization (i18n): supported languages, static phrases and key
//! resolution.
//!
//! # Architecture
//!
//! - `registry`: Closed, ordered list of supported languages and their metadata
//! - `language`: Validated `Language` handle
//! - `dictionary`: Pre-authored `key -> phrase` tables per language
//! - `resolver`: Fallback chain (active language, English, raw key)
//! - `validator`: Sanity checks on remote translations
//! - `metrics`: Cache and provider counters
//!
//! # Example
//!
//! ```rust
//! use civic_localization::i18n::{interpolate, KeyResolver, Language};
//!
//! let resolver = KeyResolver::builtin();
//! let phrase = resolver.resolve("requests.new", Language::HINDI);
//! assert_eq!(interpolate(phrase, &[("service", "पानी")]), "नया पानी अनुरोध");
//! ```

mod dictionary;
mod language;
mod metrics;
mod registry;
mod resolver;
mod validator;

pub use dictionary::StaticDictionary;
pub use language::Language;
pub use metrics::{MetricsReport, TranslationMetrics};
pub use registry::{LanguageConfig, LanguageRegistry};
pub use resolver::{is_namespaced_key, KeyResolver};
pub use validator::{TranslationValidator, ValidationReport};

/// Replace each `{name}` in `template` with its value by literal substring
/// replacement. Unknown placeholders are left in place.
pub fn interpolate(template: &str, params: &[(&str, &str)]) -> String {
    params
        .iter()
        .fold(template.to_string(), |text, (name, value)| {
            text.replace(&format!("{{{}}}", name), value)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_replaces_all_occurrences() {
        assert_eq!(
            interpolate("{a} and {a} and {b}", &[("a", "x"), ("b", "y")]),
            "x and x and y"
        );
    }

    #[test]
    fn test_interpolate_leaves_unknown_placeholders() {
        assert_eq!(interpolate("Hi {name}", &[]), "Hi {name}");
    }
}
