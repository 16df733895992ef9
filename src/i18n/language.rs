//! Language type: a validated handle onto a registry entry.

use crate::error::LocalizationError;
use crate::i18n::{LanguageConfig, LanguageRegistry};
use std::fmt;

/// A validated language.
///
/// Only codes present in the registry can be turned into a `Language`, so
/// holding one means the code is known. Disabled languages can be looked up
/// with [`Language::from_code_any`] but not selected with [`Language::from_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Language {
    /// ISO 639-1 language code (e.g., "en", "hi")
    code: &'static str,
}

impl Language {
    pub const ENGLISH: Language = Language { code: "en" };
    pub const HINDI: Language = Language { code: "hi" };
    pub const TELUGU: Language = Language { code: "te" };

    /// Create a Language from a code, requiring it to be enabled.
    ///
    /// # Example
    /// ```
    /// use civic_localization::i18n::Language;
    ///
    /// let hindi = Language::from_code("hi").unwrap();
    /// assert_eq!(hindi.name(), "Hindi");
    /// ```
    pub fn from_code(code: &str) -> Result<Language, LocalizationError> {
        match LanguageRegistry::get().get_by_code(code) {
            Some(config) if config.enabled => Ok(Language { code: config.code }),
            Some(_) => Err(LocalizationError::LanguageDisabled(code.to_string())),
            None => Err(LocalizationError::UnsupportedLanguage(code.to_string())),
        }
    }

    /// Look up any registered language, enabled or not.
    pub fn from_code_any(code: &str) -> Option<Language> {
        LanguageRegistry::get()
            .get_by_code(code)
            .map(|config| Language { code: config.code })
    }

    /// The fallback language every lookup degrades to.
    pub fn canonical() -> Language {
        let config = LanguageRegistry::get().canonical();
        Language { code: config.code }
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Get the full language configuration from the registry.
    ///
    /// # Panics
    /// Panics if the code is not in the registry, which cannot happen for a
    /// `Language` built through this module.
    pub fn config(&self) -> &'static LanguageConfig {
        LanguageRegistry::get()
            .get_by_code(self.code)
            .expect("Language code should always be valid")
    }

    pub fn name(&self) -> &'static str {
        self.config().name
    }

    pub fn native_name(&self) -> &'static str {
        self.config().native_name
    }

    pub fn is_canonical(&self) -> bool {
        self.config().is_canonical
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::canonical()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(Language::ENGLISH.code(), "en");
        assert_eq!(Language::HINDI.code(), "hi");
        assert_eq!(Language::TELUGU.code(), "te");
        assert!(Language::ENGLISH.is_canonical());
        assert!(!Language::HINDI.is_canonical());
    }

    #[test]
    fn test_from_code_enabled() {
        let language = Language::from_code("te").expect("Should succeed");
        assert_eq!(language, Language::TELUGU);
        assert_eq!(language.native_name(), "తెలుగు");
    }

    #[test]
    fn test_from_code_unknown() {
        let result = Language::from_code("fr");
        assert!(matches!(
            result,
            Err(LocalizationError::UnsupportedLanguage(code)) if code == "fr"
        ));
    }

    #[test]
    fn test_from_code_empty() {
        assert!(Language::from_code("").is_err());
    }

    #[test]
    fn test_from_code_disabled() {
        let result = Language::from_code("ta");
        assert!(matches!(result, Err(LocalizationError::LanguageDisabled(_))));
    }

    #[test]
    fn test_from_code_any_accepts_disabled() {
        let tamil = Language::from_code_any("ta").expect("Tamil is registered");
        assert_eq!(tamil.name(), "Tamil");
        assert!(Language::from_code_any("xx").is_none());
    }

    #[test]
    fn test_from_code_is_case_sensitive() {
        assert!(Language::from_code("EN").is_err());
    }

    #[test]
    fn test_canonical_is_default() {
        assert_eq!(Language::canonical(), Language::ENGLISH);
        assert_eq!(Language::default(), Language::ENGLISH);
    }

    #[test]
    fn test_display_is_code() {
        assert_eq!(Language::HINDI.to_string(), "hi");
    }
}
