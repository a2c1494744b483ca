//! Translation loader and i18n management
//!
//! Translations are nested JSON objects looked up by dotted keys. Plural
//! entries are objects keyed by plural category (`one`, `few`, `many`, `other`).

use std::collections::HashMap;
use std::path::Path;
use serde_json::{Value, Map};
use tokio::fs;
use tracing::{info, warn, debug};
use crate::utils::errors::{TaskMindError, Result};
use crate::config::I18nConfig;

/// Shipped translation files, compiled into the binary
const EMBEDDED: [(&str, &str); 2] = [
    ("en", include_str!("../../translations/en.json")),
    ("ru", include_str!("../../translations/ru.json")),
];

/// Main internationalization manager
#[derive(Debug, Clone)]
pub struct I18n {
    /// Loaded translations by language code
    translations: HashMap<String, Map<String, Value>>,
    default_language: String,
    supported_languages: Vec<String>,
    translations_dir: String,
}

/// Translation parameters for message formatting
pub type TranslationParams = HashMap<String, String>;

/// Build translation parameters from key/value pairs
pub fn params<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> TranslationParams
where
    K: Into<String>,
    V: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

impl I18n {
    /// Create a new I18n instance with no translations loaded
    pub fn new(config: &I18nConfig) -> Self {
        Self {
            translations: HashMap::new(),
            default_language: config.default_language.clone(),
            supported_languages: config.supported_languages.clone(),
            translations_dir: config.translations_dir.clone(),
        }
    }

    /// English and Russian from the copies compiled into the binary
    pub fn embedded() -> Self {
        let mut i18n = Self {
            translations: HashMap::new(),
            default_language: "en".to_string(),
            supported_languages: EMBEDDED.iter().map(|(lang, _)| lang.to_string()).collect(),
            translations_dir: "translations".to_string(),
        };
        for (lang, content) in EMBEDDED {
            if let Err(e) = i18n.load_from_str(lang, content) {
                warn!("Embedded translations for {} are invalid: {}", lang, e);
            }
        }
        i18n
    }

    /// Load translation files for all supported languages.
    ///
    /// A missing directory or file falls back to the embedded copy of that
    /// language when one exists.
    pub async fn load_translations(&mut self) -> Result<()> {
        let translations_dir = Path::new(&self.translations_dir).to_path_buf();

        let supported_languages = self.supported_languages.clone();
        for lang_code in &supported_languages {
            let file_path = translations_dir.join(format!("{}.json", lang_code));

            let loaded = if file_path.exists() {
                let content = fs::read_to_string(&file_path).await?;
                self.load_from_str(lang_code, &content).map(|_| true)?
            } else if let Some((_, content)) = EMBEDDED.iter().find(|(lang, _)| *lang == lang_code.as_str()) {
                warn!("Translation file not found: {}, using embedded copy", file_path.display());
                self.load_from_str(lang_code, content).map(|_| true)?
            } else {
                warn!("Translation file not found: {}", file_path.display());
                false
            };

            if loaded {
                info!("Loaded translations for language: {}", lang_code);
            } else if lang_code == &self.default_language {
                return Err(TaskMindError::Config(
                    format!("Default language translation file not found: {}", file_path.display())
                ));
            }
        }

        Ok(())
    }

    /// Parse one language from JSON text
    pub fn load_from_str(&mut self, lang_code: &str, content: &str) -> Result<()> {
        let translations: Value = serde_json::from_str(content)?;

        match translations {
            Value::Object(map) => {
                debug!("Loaded {} top-level translation keys for {}", map.len(), lang_code);
                self.translations.insert(lang_code.to_string(), map);
                Ok(())
            }
            _ => Err(TaskMindError::Config(
                format!("Invalid translation file format for {}", lang_code)
            )),
        }
    }

    /// Get a translated message
    pub fn t(&self, key: &str, lang: &str, params: Option<&TranslationParams>) -> String {
        let effective_lang = self.get_effective_language(lang);

        let value = self.get_translation_value(key, effective_lang)
            .or_else(|| self.get_translation_value(key, &self.default_language));

        match value {
            Some(translation) => self.format_message(&self.extract_text_from_value(translation), params),
            None => {
                warn!("Translation key '{}' not found", key);
                key.to_string()
            }
        }
    }

    /// Get a translated message with pluralization support; `{count}` is always set
    pub fn tp(&self, key: &str, lang: &str, count: i64, params: Option<&TranslationParams>) -> String {
        let effective_lang = self.get_effective_language(lang);
        let plural_key = format!("{}.{}", key, self.get_plural_form(count, effective_lang));

        let mut final_params = params.cloned().unwrap_or_default();
        final_params.insert("count".to_string(), count.to_string());

        if self.get_translation_value(&plural_key, effective_lang).is_some() {
            self.t(&plural_key, effective_lang, Some(&final_params))
        } else {
            self.t(&format!("{}.other", key), effective_lang, Some(&final_params))
        }
    }

    pub fn is_language_supported(&self, lang: &str) -> bool {
        self.supported_languages.iter().any(|l| l == lang)
    }

    /// The requested language if loaded, otherwise the default
    fn get_effective_language<'a>(&'a self, lang: &'a str) -> &'a str {
        if self.is_language_supported(lang) && self.translations.contains_key(lang) {
            lang
        } else {
            &self.default_language
        }
    }

    /// Walk a dotted key like "commands.start.welcome"
    fn get_translation_value(&self, key: &str, lang: &str) -> Option<&Value> {
        let mut parts = key.split('.');
        let mut current = self.translations.get(lang)?.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Strings as-is; plural objects default to "other"
    fn extract_text_from_value(&self, value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Object(obj) => {
                if let Some(other) = obj.get("other") {
                    self.extract_text_from_value(other)
                } else if let Some((_, first_value)) = obj.iter().next() {
                    self.extract_text_from_value(first_value)
                } else {
                    String::new()
                }
            }
            _ => value.to_string(),
        }
    }

    fn format_message(&self, template: &str, params: Option<&TranslationParams>) -> String {
        match params {
            Some(params) => params.iter().fold(template.to_string(), |text, (key, value)| {
                text.replace(&format!("{{{}}}", key), value)
            }),
            None => template.to_string(),
        }
    }

    /// Plural category for a count under the language's rules
    pub fn get_plural_form(&self, count: i64, lang: &str) -> &'static str {
        match lang {
            "ru" => {
                let abs_count = count.abs();
                let last_digit = abs_count % 10;
                let last_two_digits = abs_count % 100;

                if last_digit == 1 && last_two_digits != 11 {
                    "one"
                } else if (2..=4).contains(&last_digit) && !(12..=14).contains(&last_two_digits) {
                    "few"
                } else {
                    "many"
                }
            }
            _ => {
                if count == 1 { "one" } else { "other" }
            }
        }
    }

    pub fn supported_languages(&self) -> &[String] {
        &self.supported_languages
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Detect user language from Telegram language code ("en-US" -> "en")
    pub fn detect_user_language(&self, telegram_lang: Option<&str>) -> String {
        if let Some(lang) = telegram_lang {
            let lang_code = lang.split('-').next().unwrap_or(lang);

            if self.is_language_supported(lang_code) {
                return lang_code.to_string();
            }
        }

        self.default_language.clone()
    }
}
