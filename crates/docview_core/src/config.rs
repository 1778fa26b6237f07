use std::{collections::HashMap, fs, path::Path};

/// Placeholder base used when no API base is configured. It is not a valid
/// absolute URL, so every request fails instead of startup failing.
pub const MISSING_API_BASE: &str = "MISSING_ENV";

pub const SETTINGS_FILE: &str = "docview.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_base: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base: MISSING_API_BASE.into(),
        }
    }
}

impl ClientSettings {
    pub fn is_configured(&self) -> bool {
        self.api_base != MISSING_API_BASE
    }

    pub fn with_api_base_override(mut self, api_base: Option<String>) -> Self {
        if let Some(v) = api_base.filter(|v| !v.trim().is_empty()) {
            self.api_base = v.trim().to_string();
        }
        self
    }
}

pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

pub fn load_settings_from(
    file: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(file) {
        match toml::from_str::<HashMap<String, String>>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.get("api_base") {
                    settings = settings.with_api_base_override(Some(v.clone()));
                }
            }
            Err(err) => {
                tracing::warn!(file = %file.display(), "ignoring unreadable settings file: {err}");
            }
        }
    }

    settings = settings.with_api_base_override(env("DOCVIEW_API_BASE"));
    settings = settings.with_api_base_override(env("APP__API_BASE"));

    settings
}
