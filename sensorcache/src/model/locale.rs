//! Language tags.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A language tag such as `en` or `de-AT`.
///
/// Tags are normalized on construction: the primary language subtag is
/// lower-cased, a two-letter region subtag upper-cased, and `_` separators
/// are accepted as `-`.
///
/// ```
/// use sensorcache::model::Locale;
///
/// assert_eq!(Locale::new("DE_at").as_str(), "de-AT");
/// assert_eq!(Locale::new(" en ").as_str(), "en");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Locale(String);

impl Locale {
    pub fn new(tag: impl AsRef<str>) -> Self {
        let tag = tag.as_ref().trim().replace('_', "-");
        let mut parts = tag.split('-');
        let mut normalized = parts.next().unwrap_or_default().to_ascii_lowercase();
        for part in parts {
            normalized.push('-');
            if part.len() == 2 {
                normalized.push_str(&part.to_ascii_uppercase());
            } else {
                normalized.push_str(part);
            }
        }
        Self(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Primary language subtag (`de` for `de-AT`).
    pub fn language(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }
}

impl From<String> for Locale {
    fn from(value: String) -> Self {
        Locale::new(value)
    }
}

impl From<&str> for Locale {
    fn from(value: &str) -> Self {
        Locale::new(value)
    }
}

impl From<Locale> for String {
    fn from(value: Locale) -> Self {
        value.0
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_subtag() {
        assert_eq!(Locale::new("pt-BR").language(), "pt");
        assert_eq!(Locale::new("fr").language(), "fr");
    }

    #[test]
    fn test_equal_after_normalization() {
        assert_eq!(Locale::new("en_GB"), Locale::new("EN-gb"));
    }

    #[test]
    fn test_serde_as_plain_string() {
        let json = serde_json::to_string(&Locale::new("de")).unwrap();
        assert_eq!(json, "\"de\"");
        let back: Locale = serde_json::from_str("\"en_us\"").unwrap();
        assert_eq!(back.as_str(), "en-US");
    }
}
