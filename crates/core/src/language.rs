//! Script and keyword based language detection.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Ar,
    Darija,
    En,
    Fr,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Ar => "ar",
            Language::Darija => "darija",
            Language::En => "en",
            Language::Fr => "fr",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "ar" => Some(Language::Ar),
            "darija" => Some(Language::Darija),
            "en" => Some(Language::En),
            "fr" => Some(Language::Fr),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-priority detector: Arabic script, then Tunisian transliteration
/// markers, then English function words, else French.
#[derive(Debug, Clone)]
pub struct LanguageDetector {
    arabic: Regex,
    darija: Regex,
    english: Regex,
}

impl LanguageDetector {
    pub fn builtin() -> Self {
        LanguageDetector {
            arabic: Regex::new(r"[\x{0600}-\x{06FF}]").expect("arabic block pattern"),
            darija: Regex::new(
                r"(?i)\b(y7el|5alas|ma5dem|matet3ada|7alit|wesh|bech|chnou|kifech|3lech|ya5i)\b",
            )
            .expect("darija marker pattern"),
            english: Regex::new(
                r"(?i)\b(the|is|are|have|this|that|with|from|what|where|when|how|please|help)\b",
            )
            .expect("english marker pattern"),
        }
    }

    pub fn detect(&self, text: &str) -> Language {
        let text = text.trim();
        if self.arabic.is_match(text) {
            Language::Ar
        } else if self.darija.is_match(text) {
            Language::Darija
        } else if self.english.is_match(text) {
            Language::En
        } else {
            Language::Fr
        }
    }
}

impl Default for LanguageDetector {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arabic_script_dominates_english_words() {
        let d = LanguageDetector::builtin();
        assert_eq!(d.detect("please help مشكل في الموقع"), Language::Ar);
    }

    #[test]
    fn darija_markers_beat_english() {
        let d = LanguageDetector::builtin();
        assert_eq!(d.detect("the site ma5dem 5alas"), Language::Darija);
    }

    #[test]
    fn english_function_words() {
        let d = LanguageDetector::builtin();
        assert_eq!(d.detect("How do I change the logo?"), Language::En);
    }

    #[test]
    fn french_is_the_default() {
        let d = LanguageDetector::builtin();
        assert_eq!(d.detect("Ma commande est bloquée"), Language::Fr);
        assert_eq!(d.detect(""), Language::Fr);
    }

    #[test]
    fn english_words_need_word_boundaries() {
        // "this" inside "thisbe" and "is" inside "mais" do not count.
        let d = LanguageDetector::builtin();
        assert_eq!(d.detect("mais thisbe"), Language::Fr);
    }
}
