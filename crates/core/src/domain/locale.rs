// Search Locale

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::error::DomainError;

/// Search locale (country + language of the postings).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Locale {
    #[default]
    CanadaEnglish,
    CanadaFrench,
    UsaEnglish,
    UkEnglish,
    FranceFrench,
    GermanyGerman,
}

/// Language used for text processing (stop words).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    French,
    German,
}

impl Locale {
    pub fn language(self) -> Language {
        match self {
            Locale::CanadaEnglish | Locale::UsaEnglish | Locale::UkEnglish => Language::English,
            Locale::CanadaFrench | Locale::FranceFrench => Language::French,
            Locale::GermanyGerman => Language::German,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Locale::CanadaEnglish => "CANADA_ENGLISH",
            Locale::CanadaFrench => "CANADA_FRENCH",
            Locale::UsaEnglish => "USA_ENGLISH",
            Locale::UkEnglish => "UK_ENGLISH",
            Locale::FranceFrench => "FRANCE_FRENCH",
            Locale::GermanyGerman => "GERMANY_GERMAN",
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let locale = match s.trim().to_ascii_uppercase().as_str() {
            "CANADA_ENGLISH" => Locale::CanadaEnglish,
            "CANADA_FRENCH" => Locale::CanadaFrench,
            "USA_ENGLISH" => Locale::UsaEnglish,
            "UK_ENGLISH" => Locale::UkEnglish,
            "FRANCE_FRENCH" => Locale::FranceFrench,
            "GERMANY_GERMAN" => Locale::GermanyGerman,
            _ => return Err(DomainError::UnknownLocale(s.to_string())),
        };
        Ok(locale)
    }
}
