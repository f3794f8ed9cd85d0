//! User preferences: display settings and UI language.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::persistence::PersistenceGateway;

/// Settings toggles, stored under `userSettings`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    #[serde(default = "default_true")]
    pub use_metric: bool,
    #[serde(default)]
    pub dark_map_style: bool,
    #[serde(default = "default_true")]
    pub enable_notifications: bool,
}

fn default_true() -> bool {
    true
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            use_metric: true,
            dark_map_style: false,
            enable_notifications: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    Norwegian,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Norwegian => "no",
        }
    }

    /// Map a device locale such as `nb-NO` or `en_US` to a supported language.
    pub fn from_locale(locale: &str) -> Self {
        let lowered = locale.trim().to_ascii_lowercase();
        if ["no", "nb", "nn"].iter().any(|p| lowered.starts_with(p)) {
            Language::Norwegian
        } else {
            Language::English
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "en" => Ok(Language::English),
            "no" => Ok(Language::Norwegian),
            other => Err(format!("unsupported language {other:?} (expected en or no)")),
        }
    }
}

/// Loads and saves preferences; every failure degrades to defaults.
#[derive(Clone)]
pub struct Preferences {
    persistence: PersistenceGateway,
}

impl Preferences {
    pub fn new(persistence: PersistenceGateway) -> Self {
        Self { persistence }
    }

    pub async fn settings(&self) -> UserSettings {
        self.persistence.load_settings().await.unwrap_or_default()
    }

    pub async fn update_settings(&self, settings: UserSettings) {
        self.persistence.save_settings(&settings).await;
    }

    /// Saved language, or the one matching `device_locale` if none is saved.
    pub async fn language(&self, device_locale: &str) -> Language {
        let saved = self.persistence.load_language().await;
        match saved.as_deref().map(str::parse::<Language>) {
            Some(Ok(lang)) => lang,
            Some(Err(e)) => {
                debug!("Ignoring saved language: {}", e);
                Language::from_locale(device_locale)
            }
            None => Language::from_locale(device_locale),
        }
    }

    pub async fn set_language(&self, language: Language) {
        self.persistence.save_language(language.code()).await;
    }
}
