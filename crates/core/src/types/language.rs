//! Storefront languages and per-language text.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::status::StatusParseError;

/// Languages the catalogue is published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Bn,
}

impl Language {
    /// The code used in query strings (`lang=bn`).
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Bn => "bn",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Language {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "bn" => Ok(Self::Bn),
            _ => Err(StatusParseError::new("language", s)),
        }
    }
}

/// Text that the backend stores once per language (`{ "en": .., "bn": .. }`).
///
/// Older products only carry a plain string; those deserialize into the
/// English slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "LocalizedRepr")]
pub struct Localized {
    pub en: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bn: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LocalizedRepr {
    Plain(String),
    PerLanguage {
        #[serde(default)]
        en: String,
        #[serde(default)]
        bn: Option<String>,
    },
}

impl From<LocalizedRepr> for Localized {
    fn from(repr: LocalizedRepr) -> Self {
        match repr {
            LocalizedRepr::Plain(en) => Self { en, bn: None },
            LocalizedRepr::PerLanguage { en, bn } => Self { en, bn },
        }
    }
}

impl Localized {
    /// Create English-only text.
    #[must_use]
    pub fn english(text: impl Into<String>) -> Self {
        Self {
            en: text.into(),
            bn: None,
        }
    }

    /// Create text in both languages.
    #[must_use]
    pub fn both(en: impl Into<String>, bn: impl Into<String>) -> Self {
        Self {
            en: en.into(),
            bn: Some(bn.into()),
        }
    }

    /// Text in `language`, falling back to English when missing or blank.
    #[must_use]
    pub fn get(&self, language: Language) -> &str {
        match (language, self.bn.as_deref()) {
            (Language::Bn, Some(bn)) if !bn.trim().is_empty() => bn,
            _ => &self.en,
        }
    }
}
