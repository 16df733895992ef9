//! The closed set of languages the client knows about.
//!
//! Table order is the order language pickers show. Tamil, Kannada and
//! Marathi are listed so a stored preference for them is still recognised,
//! but stay disabled until their dictionaries are authored.

use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageConfig {
    /// ISO 639-1 code
    pub code: &'static str,
    pub name: &'static str,
    pub native_name: &'static str,
    /// The fallback language; exactly one entry has this set
    pub is_canonical: bool,
    /// Whether users may switch to this language
    pub enabled: bool,
}

const fn language(
    code: &'static str,
    name: &'static str,
    native_name: &'static str,
    enabled: bool,
) -> LanguageConfig {
    LanguageConfig {
        code,
        name,
        native_name,
        is_canonical: false,
        enabled,
    }
}

static LANGUAGES: [LanguageConfig; 6] = [
    LanguageConfig {
        code: "en",
        name: "English",
        native_name: "English",
        is_canonical: true,
        enabled: true,
    },
    language("hi", "Hindi", "हिन्दी", true),
    language("te", "Telugu", "తెలుగు", true),
    language("ta", "Tamil", "தமிழ்", false),
    language("kn", "Kannada", "ಕನ್ನಡ", false),
    language("mr", "Marathi", "मराठी", false),
];

pub struct LanguageRegistry {
    languages: &'static [LanguageConfig],
    canonical: usize,
}

static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    /// The process-wide registry.
    ///
    /// # Panics
    /// On first use, if the table does not mark exactly one language
    /// canonical.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| Self::from_table(&LANGUAGES))
    }

    fn from_table(languages: &'static [LanguageConfig]) -> Self {
        let mut canonical = languages
            .iter()
            .enumerate()
            .filter(|(_, lang)| lang.is_canonical)
            .map(|(index, _)| index);

        match (canonical.next(), canonical.next()) {
            (Some(index), None) => Self {
                languages,
                canonical: index,
            },
            (None, _) => panic!("No canonical language found in registry"),
            (Some(_), Some(_)) => panic!("Multiple canonical languages found in registry"),
        }
    }

    pub fn get_by_code(&self, code: &str) -> Option<&LanguageConfig> {
        self.languages.iter().find(|lang| lang.code == code)
    }

    /// Languages users may pick, in display order.
    pub fn list_enabled(&self) -> Vec<&LanguageConfig> {
        self.languages.iter().filter(|lang| lang.enabled).collect()
    }

    pub fn list_all(&self) -> Vec<&LanguageConfig> {
        self.languages.iter().collect()
    }

    pub fn canonical(&self) -> &LanguageConfig {
        &self.languages[self.canonical]
    }

    /// Known and enabled.
    pub fn is_enabled(&self, code: &str) -> bool {
        self.get_by_code(code).is_some_and(|lang| lang.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_shared() {
        assert!(std::ptr::eq(LanguageRegistry::get(), LanguageRegistry::get()));
    }

    #[test]
    fn test_lookup_by_code() {
        let telugu = LanguageRegistry::get().get_by_code("te").expect("registered");
        assert_eq!(telugu.name, "Telugu");
        assert_eq!(telugu.native_name, "తెలుగు");
        assert!(!telugu.is_canonical);

        assert!(LanguageRegistry::get().get_by_code("fr").is_none());
        assert!(LanguageRegistry::get().get_by_code("EN").is_none());
    }

    #[test]
    fn test_enabled_languages_in_display_order() {
        let codes: Vec<_> = LanguageRegistry::get()
            .list_enabled()
            .iter()
            .map(|lang| lang.code)
            .collect();
        assert_eq!(codes, vec!["en", "hi", "te"]);
    }

    #[test]
    fn test_disabled_languages_are_still_listed() {
        let all = LanguageRegistry::get().list_all();
        assert_eq!(all.len(), 6);
        let disabled: Vec<_> = all.iter().filter(|l| !l.enabled).map(|l| l.code).collect();
        assert_eq!(disabled, vec!["ta", "kn", "mr"]);
    }

    #[test]
    fn test_canonical_is_english() {
        let canonical = LanguageRegistry::get().canonical();
        assert_eq!(canonical.code, "en");
        assert!(canonical.enabled);
    }

    #[test]
    fn test_is_enabled() {
        let registry = LanguageRegistry::get();
        assert!(registry.is_enabled("hi"));
        assert!(!registry.is_enabled("mr"));
        assert!(!registry.is_enabled("xx"));
    }

    static NO_CANONICAL: [LanguageConfig; 1] = [language("hi", "Hindi", "हिन्दी", true)];

    #[test]
    #[should_panic(expected = "No canonical language")]
    fn test_table_without_canonical_panics() {
        LanguageRegistry::from_table(&NO_CANONICAL);
    }

    static TWO_CANONICAL: [LanguageConfig; 2] = [
        LanguageConfig {
            code: "en",
            name: "English",
            native_name: "English",
            is_canonical: true,
            enabled: true,
        },
        LanguageConfig {
            code: "hi",
            name: "Hindi",
            native_name: "हिन्दी",
            is_canonical: true,
            enabled: true,
        },
    ];

    #[test]
    #[should_panic(expected = "Multiple canonical languages")]
    fn test_table_with_two_canonical_panics() {
        LanguageRegistry::from_table(&TWO_CANONICAL);
    }
}
