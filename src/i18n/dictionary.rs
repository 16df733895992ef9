//! Static, pre-authored phrases keyed by namespaced translation keys.
//!
//! Keys use dot notation (`dashboard.title`). Every key SHOULD exist in
//! English; [`StaticDictionary::missing_keys`] reports where another language
//! falls short, and lookups degrade to English (then the raw key) at runtime.
//!
//! Phrases may carry `{name}` placeholders. They are returned verbatim; see
//! [`crate::i18n::interpolate`] for substitution.

use crate::i18n::Language;
use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

/// Immutable `language -> key -> phrase` table.
#[derive(Debug, Clone, Default)]
pub struct StaticDictionary {
    tables: HashMap<&'static str, HashMap<String, String>>,
}

static BUILTIN: OnceLock<StaticDictionary> = OnceLock::new();

impl StaticDictionary {
    /// Build a dictionary from `(language, key, phrase)` triples.
    ///
    /// A later triple for the same language and key replaces an earlier one.
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Language, &'a str, &'a str)>,
    {
        let mut tables: HashMap<&'static str, HashMap<String, String>> = HashMap::new();
        for (language, key, phrase) in entries {
            tables
                .entry(language.code())
                .or_default()
                .insert(key.to_string(), phrase.to_string());
        }
        Self { tables }
    }

    /// The phrases shipped with the application.
    pub fn builtin() -> &'static StaticDictionary {
        BUILTIN.get_or_init(|| {
            let entries = ENGLISH_PHRASES
                .iter()
                .map(|(k, v)| (Language::ENGLISH, *k, *v))
                .chain(HINDI_PHRASES.iter().map(|(k, v)| (Language::HINDI, *k, *v)))
                .chain(TELUGU_PHRASES.iter().map(|(k, v)| (Language::TELUGU, *k, *v)));
            StaticDictionary::from_entries(entries)
        })
    }

    /// Exact lookup with no fallback.
    pub fn get(&self, language: Language, key: &str) -> Option<&str> {
        self.tables
            .get(language.code())
            .and_then(|table| table.get(key))
            .map(String::as_str)
    }

    /// All keys defined for a language, sorted.
    pub fn keys(&self, language: Language) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .tables
            .get(language.code())
            .map(|table| table.keys().map(String::as_str).collect())
            .unwrap_or_default();
        keys.sort_unstable();
        keys
    }

    /// Keys present in the fallback language but absent (or empty) in `language`.
    pub fn missing_keys(&self, language: Language) -> Vec<&str> {
        let canonical = Language::canonical();
        let present: BTreeSet<&str> = self
            .tables
            .get(language.code())
            .map(|table| {
                table
                    .iter()
                    .filter(|(_, phrase)| !phrase.is_empty())
                    .map(|(key, _)| key.as_str())
                    .collect()
            })
            .unwrap_or_default();

        self.keys(canonical)
            .into_iter()
            .filter(|key| !present.contains(key))
            .collect()
    }

    /// Whether any phrases exist for `language`.
    pub fn has_language(&self, language: Language) -> bool {
        self.tables
            .get(language.code())
            .is_some_and(|table| !table.is_empty())
    }
}

// ==================== English Phrases ====================

const ENGLISH_PHRASES: &[(&str, &str)] = &[
    ("app.name", "Civic Connect"),
    ("common.cancel", "Cancel"),
    ("common.retry", "Retry"),
    ("common.save", "Save"),
    ("common.submit", "Submit"),
    ("dashboard.title", "Dashboard"),
    ("dashboard.greeting", "Welcome back, {name}"),
    ("dashboard.report_issue", "Report an issue"),
    ("dashboard.my_requests", "My requests"),
    ("issues.title", "Issues"),
    ("issues.status.open", "Open"),
    ("issues.status.in_progress", "In progress"),
    ("issues.status.resolved", "Resolved"),
    ("issues.empty", "No issues reported yet"),
    ("requests.new", "New {service} request"),
    ("requests.submitted", "Your request has been submitted"),
    ("notifications.title", "Notifications"),
    ("notifications.empty", "You're all caught up"),
    ("settings.title", "Settings"),
    ("settings.language", "Language"),
    ("settings.build_info", "Build information"),
    ("voice.record", "Tap to record"),
    ("errors.network", "Network unavailable. Please try again."),
];

// ==================== Hindi Phrases ====================

const HINDI_PHRASES: &[(&str, &str)] = &[
    ("app.name", "सिविक कनेक्ट"),
    ("common.cancel", "रद्द करें"),
    ("common.retry", "फिर से कोशिश करें"),
    ("common.save", "सहेजें"),
    ("common.submit", "जमा करें"),
    ("dashboard.title", "डैशबोर्ड"),
    ("dashboard.greeting", "वापसी पर स्वागत है, {name}"),
    ("dashboard.report_issue", "समस्या दर्ज करें"),
    ("dashboard.my_requests", "मेरे अनुरोध"),
    ("issues.title", "समस्याएँ"),
    ("issues.status.open", "खुला"),
    ("issues.status.in_progress", "प्रगति पर"),
    ("issues.status.resolved", "हल हो गया"),
    ("issues.empty", "अभी तक कोई समस्या दर्ज नहीं की गई"),
    ("requests.new", "नया {service} अनुरोध"),
    ("requests.submitted", "आपका अनुरोध जमा हो गया है"),
    ("notifications.title", "सूचनाएँ"),
    ("notifications.empty", ""),
    ("settings.title", "सेटिंग्स"),
    ("settings.language", "भाषा"),
    ("voice.record", "रिकॉर्ड करने के लिए टैप करें"),
    ("errors.network", "नेटवर्क उपलब्ध नहीं है। कृपया फिर से कोशिश करें।"),
];

// ==================== Telugu Phrases ====================

const TELUGU_PHRASES: &[(&str, &str)] = &[
    ("app.name", "సివిక్ కనెక్ట్"),
    ("common.cancel", "రద్దు చేయి"),
    ("common.retry", "మళ్ళీ ప్రయత్నించండి"),
    ("common.save", "సేవ్ చేయి"),
    ("common.submit", "సమర్పించు"),
    ("dashboard.title", "డాష్‌బోర్డ్"),
    ("dashboard.greeting", "తిరిగి స్వాగతం, {name}"),
    ("dashboard.report_issue", "సమస్యను నివేదించండి"),
    ("dashboard.my_requests", "నా అభ్యర్థనలు"),
    ("issues.title", "సమస్యలు"),
    ("issues.status.open", "తెరిచి ఉంది"),
    ("issues.status.in_progress", "పురోగతిలో ఉంది"),
    ("issues.status.resolved", "పరిష్కరించబడింది"),
    ("requests.new", "కొత్త {service} అభ్యర్థన"),
    ("notifications.title", "నోటిఫికేషన్లు"),
    ("settings.title", "సెట్టింగ్‌లు"),
    ("settings.language", "భాష"),
    ("errors.network", "నెట్‌వర్క్ అందుబాటులో లేదు. దయచేసి మళ్ళీ ప్రయత్నించండి."),
];
