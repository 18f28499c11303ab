//! JSON configuration: API key, named prompts and the per-platform shortcut
//! table. A missing or unreadable file is regenerated with defaults and the
//! caller is expected to stop and ask the operator to edit it.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use snaptex_capture::CaptureRegion;
use snaptex_hotkeys::{ShortcutSpec, ShortcutTable};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "config.json";

const PLACEHOLDER_API_KEY: &str = "YOUR_API_KEY_HERE";

const DEFAULT_LATEX_PROMPT: &str = "Convert the mathematical content in this image to raw \
LaTeX math code. Use \\text{} for plain text within equations. For one equation, return \
only its code. For multiple equations, use \\begin{array}{l}...\\end{array} with \\\\ \
between equations, matching the image's visual structure. Never use standalone \
environments like equation or align, and never wrap output in code block markers \
(e.g., ```). Return NA if no math is present.";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("wrote a default config to {path}; edit it with a valid API key and restart")]
    Regenerated { path: PathBuf },

    #[error("missing or placeholder API key in {path}; edit it and restart")]
    ApiKeyMissing { path: PathBuf },

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api_key: String,
    /// Action name -> prompt sent with the captured image.
    #[serde(default = "default_prompts")]
    pub prompts: HashMap<String, String>,
    /// Platform name -> shortcut specs, consumed by the hotkey manager.
    #[serde(default = "default_shortcuts")]
    pub shortcuts: ShortcutTable,
    /// Fixed capture region; the primary screen is captured when unset.
    #[serde(default)]
    pub capture: Option<CaptureRegion>,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default = "default_screenshots_dir")]
    pub screenshots_dir: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            screenshots_dir: default_screenshots_dir(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: PLACEHOLDER_API_KEY.to_string(),
            prompts: default_prompts(),
            shortcuts: default_shortcuts(),
            capture: None,
            history: HistoryConfig::default(),
        }
    }
}

impl Config {
    /// Read the config file. Missing or syntactically invalid files are
    /// replaced with pretty-printed defaults and reported as `Regenerated`;
    /// a parseable file with a blank or placeholder key is `ApiKeyMissing`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Self::regenerate(path),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let config: Config = match serde_json::from_str(&raw) {
            Ok(config) => config,
            Err(_) => return Self::regenerate(path),
        };
        if config.api_key.trim().is_empty() || config.api_key == PLACEHOLDER_API_KEY {
            return Err(ConfigError::ApiKeyMissing {
                path: path.to_path_buf(),
            });
        }
        Ok(config)
    }

    fn regenerate(path: &Path) -> Result<Self, ConfigError> {
        let body = serde_json::to_string_pretty(&Config::default()).map_err(|e| {
            ConfigError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(ErrorKind::InvalidData, e),
            }
        })?;
        fs::write(path, body).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Err(ConfigError::Regenerated {
            path: path.to_path_buf(),
        })
    }

    /// Prompt configured for `action`, if any.
    pub fn prompt_for(&self, action: &str) -> Option<&str> {
        self.prompts.get(action).map(String::as_str)
    }
}

fn default_prompts() -> HashMap<String, String> {
    HashMap::from([("math2latex".to_string(), DEFAULT_LATEX_PROMPT.to_string())])
}

fn default_shortcuts() -> ShortcutTable {
    HashMap::from([(
        "default".to_string(),
        vec![ShortcutSpec {
            shortcut: "ctrl+alt+z".to_string(),
            action: "math2latex".to_string(),
        }],
    )])
}

fn default_db_path() -> PathBuf {
    PathBuf::from("history.db")
}

fn default_screenshots_dir() -> PathBuf {
    PathBuf::from("screenshots")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_regenerated_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Regenerated { .. }));

        // The written file parses back to the defaults, placeholder key
        // included, so a second load asks for the key instead.
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ApiKeyMissing { .. }));
    }

    #[test]
    fn invalid_json_is_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Regenerated { .. }));
    }

    #[test]
    fn valid_config_loads_with_partial_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"api_key": "k-123"}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api_key, "k-123");
        assert!(config.prompt_for("math2latex").is_some());
        assert!(config.shortcuts.contains_key("default"));
    }

    #[test]
    fn blank_key_is_rejected_without_rewriting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let body = r#"{"api_key": "  ", "prompts": {"math2latex": "p"}}"#;
        fs::write(&path, body).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ApiKeyMissing { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), body);
    }
}
