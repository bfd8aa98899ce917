//! Configuration loading and config file resolution
//!
//! Bootstrap configuration is read from a TOML file. The file itself is
//! located in this priority order:
//! 1. Explicit path (command-line argument)
//! 2. `EDUGAME_CONFIG` environment variable
//! 3. `<config dir>/edugame/<module>.toml` (e.g. `~/.config/edugame/ai-services.toml`)
//! 4. Built-in defaults (no file)
//!
//! A missing file never prevents startup: the service logs a warning and
//! continues with built-in defaults. A file that exists but fails to parse
//! is a configuration error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "EDUGAME_CONFIG";

/// Default HTTP port of the AI services module
pub const DEFAULT_PORT: u16 = 8001;

/// Maximum accepted audio upload (25 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 25 * 1024 * 1024;

/// Default window length for long-audio transcription
pub const DEFAULT_CHUNK_LENGTH_SECS: u32 = 30;

/// Bootstrap configuration loaded from TOML
///
/// Every field has a built-in default so partial files are valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Bind address
    pub host: String,

    /// HTTP server port
    pub port: u16,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Directory for uploaded audio temp files (system temp dir if unset)
    pub temp_dir: Option<PathBuf>,

    /// Maximum accepted audio upload in bytes
    pub max_upload_bytes: u64,

    /// Speech transcription settings
    pub transcription: TranscriptionConfig,

    /// Pedagogical recommendation table settings
    pub recommendations: RecommendationConfig,

    /// Model backend endpoints
    pub models: ModelsConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            logging: LoggingConfig::default(),
            temp_dir: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            transcription: TranscriptionConfig::default(),
            recommendations: RecommendationConfig::default(),
            models: ModelsConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Transcription configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Window length in seconds for long inputs
    pub chunk_length_secs: u32,

    /// Split inputs longer than `chunk_length_secs` into windows
    pub chunking_enabled: bool,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            chunk_length_secs: DEFAULT_CHUNK_LENGTH_SECS,
            chunking_enabled: true,
        }
    }
}

/// Recommendation table configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    /// Replacement table file; the built-in table is used when unset
    pub table_path: Option<PathBuf>,
}

/// Which implementation serves a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Remote inference server over HTTP
    #[default]
    Http,
    /// Canned in-process responses for local development
    Stub,
}

/// Endpoint configuration for one model
///
/// Unset fields fall back to per-model defaults chosen by the service, so a
/// partial `[models.<name>]` table only overrides what it names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelEndpoint {
    /// Backend implementation
    pub backend: BackendKind,

    /// Base URL of the inference server
    pub endpoint: Option<String>,

    /// Model identifier
    pub model: Option<String>,

    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,

    /// Request timeout
    pub timeout_secs: u64,
}

impl Default for ModelEndpoint {
    fn default() -> Self {
        Self {
            backend: BackendKind::Http,
            endpoint: None,
            model: None,
            api_key_env: None,
            timeout_secs: 60,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

impl ModelEndpoint {
    /// Configured base URL, or `default` when unset or blank
    pub fn endpoint_or<'a>(&'a self, default: &'a str) -> &'a str {
        non_blank(self.endpoint.as_deref()).unwrap_or(default)
    }

    /// Configured model id, or `default` when unset or blank
    pub fn model_or<'a>(&'a self, default: &'a str) -> &'a str {
        non_blank(self.model.as_deref()).unwrap_or(default)
    }

    /// API key read from the configured environment variable
    ///
    /// `default_env` names the variable when none is configured. Blank
    /// values are treated as absent.
    pub fn api_key(&self, default_env: &str) -> Option<String> {
        let var = non_blank(self.api_key_env.as_deref()).unwrap_or(default_env);
        std::env::var(var).ok().filter(|key| !key.trim().is_empty())
    }
}

/// Endpoints for every model the service wraps
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub audio_emotion: ModelEndpoint,
    pub text_emotion: ModelEndpoint,
    pub speech: ModelEndpoint,
    pub llm: ModelEndpoint,
}

/// Locates the TOML config file for a module
pub struct ConfigResolver {
    module_name: String,
}

impl ConfigResolver {
    /// Create a resolver for the given module (e.g. "ai-services")
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
        }
    }

    /// Resolve the config file path without checking that it exists
    ///
    /// Returns `None` only when no explicit path was given and the platform
    /// has no config directory.
    pub fn resolve_path(&self, cli_arg: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = cli_arg {
            return Some(path.to_path_buf());
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        dirs::config_dir().map(|dir| {
            dir.join("edugame")
                .join(format!("{}.toml", self.module_name))
        })
    }

    /// Load the configuration, falling back to defaults when no file exists
    pub fn load(&self, cli_arg: Option<&Path>) -> Result<TomlConfig> {
        let explicit = cli_arg.is_some() || std::env::var(CONFIG_ENV_VAR).is_ok();

        let Some(path) = self.resolve_path(cli_arg) else {
            debug!("No config directory for this platform, using built-in defaults");
            return Ok(TomlConfig::default());
        };

        if !path.exists() {
            if explicit {
                warn!(
                    "Config file {} not found, using built-in defaults",
                    path.display()
                );
            } else {
                debug!("No config file at {}, using built-in defaults", path.display());
            }
            return Ok(TomlConfig::default());
        }

        let config = load_toml_config(&path)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    parse_toml_config(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Parse TOML config text
pub fn parse_toml_config(content: &str) -> std::result::Result<TomlConfig, toml::de::Error> {
    toml::from_str(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = parse_toml_config("").unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.max_upload_bytes, 26_214_400);
        assert_eq!(config.transcription.chunk_length_secs, 30);
        assert!(config.transcription.chunking_enabled);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn partial_model_table_keeps_other_defaults() {
        let config = parse_toml_config(
            r#"
            port = 9000

            [models.speech]
            endpoint = "http://localhost:9100/v1"
            model = "whisper-small"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(
            config.models.speech.endpoint_or("https://api.openai.com/v1"),
            "http://localhost:9100/v1"
        );
        assert_eq!(config.models.speech.model_or("whisper-large-v3"), "whisper-small");
        assert_eq!(config.models.speech.timeout_secs, 60);
        // Untouched sections fall through to the caller's defaults
        assert_eq!(
            config.models.llm.endpoint_or("https://api.openai.com/v1"),
            "https://api.openai.com/v1"
        );
    }

    #[test]
    fn stub_backend_parses() {
        let config = parse_toml_config(
            r#"
            [models.audio_emotion]
            backend = "stub"
            "#,
        )
        .unwrap();
        assert_eq!(config.models.audio_emotion.backend, BackendKind::Stub);
    }

    #[test]
    fn blank_model_uses_default() {
        let endpoint = ModelEndpoint {
            model: Some("  ".to_string()),
            ..ModelEndpoint::default()
        };
        assert_eq!(endpoint.model_or("gpt-4o-mini"), "gpt-4o-mini");
    }
}
