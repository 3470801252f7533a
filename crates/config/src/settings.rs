// Assistant connection settings
// Loaded from ~/.config/bridgesheet/settings.json

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment fallback for the API key, for CI/headless use. The settings
/// file wins when both are present.
pub const API_KEY_ENV: &str = "BRIDGESHEET_API_KEY";

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    MissingEndpoint,
    MissingApiKey,
    Io(String),
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingEndpoint => {
                write!(f, "no endpoint configured (set \"endpoint\" in settings.json)")
            }
            ConfigError::MissingApiKey => {
                write!(
                    f,
                    "no API key configured (set \"apiKey\" in settings.json or {})",
                    API_KEY_ENV
                )
            }
            ConfigError::Io(e) => write!(f, "settings I/O error: {}", e),
            ConfigError::Parse(e) => write!(f, "settings parse error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Reasoning effort requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    #[default]
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }
}

/// Response verbosity requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Low,
    #[default]
    Medium,
    High,
}

impl Verbosity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Low => "low",
            Verbosity::Medium => "medium",
            Verbosity::High => "high",
        }
    }
}

/// Settings file shape. Keys are camelCase to match the deployed settings
/// files this tool reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Azure OpenAI resource base URL, without the `/chat/completions` path.
    pub endpoint: String,

    /// API key. Left empty when the key comes from the environment.
    pub api_key: String,

    pub model: String,

    pub reasoning_effort: ReasoningEffort,

    pub verbosity: Verbosity,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            model: "gpt-5".to_string(),
            reasoning_effort: ReasoningEffort::Medium,
            verbosity: Verbosity::Medium,
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bridgesheet")
            .join("settings.json")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("error parsing {}: {}; using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("error reading {}: {}; using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save current settings to disk
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        fs::write(path, json).map_err(|e| ConfigError::Io(e.to_string()))
    }

    /// API key from the settings file, or the environment fallback.
    pub fn effective_api_key(&self) -> String {
        if !self.api_key.is_empty() {
            return self.api_key.clone();
        }
        env::var(API_KEY_ENV).unwrap_or_default()
    }

    /// Check that the assistant can actually be called. Both the endpoint
    /// and a key are required; everything else has workable defaults.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::MissingEndpoint);
        }
        if self.effective_api_key().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(())
    }

    /// Get the config file path for display/opening
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.model, "gpt-5");
        assert_eq!(settings.reasoning_effort, ReasoningEffort::Medium);
        assert_eq!(settings.verbosity, Verbosity::Medium);
        assert!(settings.endpoint.is_empty());
    }

    #[test]
    fn test_camel_case_keys_round_trip() {
        let json = r#"{
            "endpoint": "https://example.openai.azure.com/openai/v1",
            "apiKey": "k",
            "model": "gpt-5",
            "reasoningEffort": "high",
            "verbosity": "low"
        }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.api_key, "k");
        assert_eq!(settings.reasoning_effort, ReasoningEffort::High);
        assert_eq!(settings.verbosity, Verbosity::Low);

        let out = serde_json::to_value(&settings).unwrap();
        assert_eq!(out["apiKey"], "k");
        assert_eq!(out["reasoningEffort"], "high");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"endpoint": "https://e.example"}"#).unwrap();
        assert_eq!(settings.model, "gpt-5");
        assert!(settings.api_key.is_empty());
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("settings.json"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut settings = Settings::default();
        settings.endpoint = "https://e.example".into();
        settings.api_key = "secret".into();
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), settings);
    }

    #[test]
    fn test_validate_requires_endpoint_and_key() {
        let mut settings = Settings::default();
        assert_eq!(settings.validate(), Err(ConfigError::MissingEndpoint));
        settings.endpoint = "https://e.example".into();
        // Key may still come from the environment; only assert the happy
        // path once a key is set explicitly.
        settings.api_key = "k".into();
        assert_eq!(settings.validate(), Ok(()));
    }
}
