//! Runtime configuration for edugame-ai
//!
//! Resolved once at startup from two tiers:
//! 1. Command line (with environment fallbacks handled by clap)
//! 2. TOML bootstrap file, then built-in defaults (see [`edugame_common::config`])
//!
//! A value given on the command line always wins over the file.

use crate::services::TranscriberSettings;
use edugame_common::config::{ModelsConfig, TomlConfig, TranscriptionConfig};
use edugame_common::{Error, Result};
use std::path::PathBuf;
use tracing::{info, warn};

/// Slack above the audio limit for multipart framing and text fields
const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub table_path: Option<PathBuf>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub temp_dir: Option<PathBuf>,
    pub max_upload_bytes: u64,
    pub transcription: TranscriptionConfig,
    pub table_path: Option<PathBuf>,
    pub models: ModelsConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default())
    }
}

impl ServiceConfig {
    /// Configuration from the TOML tier alone
    pub fn from_toml(toml: TomlConfig) -> Self {
        Self {
            host: toml.host,
            port: toml.port,
            log_level: toml.logging.level,
            temp_dir: toml.temp_dir,
            max_upload_bytes: toml.max_upload_bytes,
            transcription: toml.transcription,
            table_path: toml.recommendations.table_path,
            models: toml.models,
        }
    }

    /// Apply command-line values on top of the file values
    pub fn with_overrides(mut self, overrides: &CliOverrides) -> Self {
        if let Some(host) = &overrides.host {
            self.host = host.clone();
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(level) = &overrides.log_level {
            self.log_level = level.clone();
        }
        if let Some(path) = &overrides.table_path {
            self.table_path = Some(path.clone());
        }
        self
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_upload_bytes == 0 {
            return Err(Error::Config("max_upload_bytes must be greater than 0".to_string()));
        }
        if self.transcription.chunking_enabled && self.transcription.chunk_length_secs == 0 {
            return Err(Error::Config(
                "transcription.chunk_length_secs must be greater than 0 when chunking is enabled"
                    .to_string(),
            ));
        }
        if let Some(dir) = &self.temp_dir {
            if !dir.is_dir() {
                return Err(Error::Config(format!(
                    "temp_dir {} is not a directory",
                    dir.display()
                )));
            }
        }
        Ok(())
    }

    /// Address the listener binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Request body limit for upload routes
    pub fn body_limit(&self) -> usize {
        usize::try_from(self.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES))
            .unwrap_or(usize::MAX)
    }

    pub fn transcriber_settings(&self) -> TranscriberSettings {
        TranscriberSettings {
            max_upload_bytes: self.max_upload_bytes,
            chunk_length_secs: self.transcription.chunk_length_secs,
            chunking_enabled: self.transcription.chunking_enabled,
            temp_dir: self.temp_dir.clone(),
        }
    }

    /// Log the effective settings (never API keys)
    pub fn log_summary(&self) {
        info!(
            bind = %self.bind_addr(),
            max_upload_bytes = self.max_upload_bytes,
            chunk_length_secs = self.transcription.chunk_length_secs,
            chunking = self.transcription.chunking_enabled,
            "Service configuration"
        );
        match &self.temp_dir {
            Some(dir) => info!("Temp directory: {}", dir.display()),
            None => info!("Temp directory: system default"),
        }
        match &self.table_path {
            Some(path) => info!("Recommendation table: {}", path.display()),
            None => info!("Recommendation table: built-in"),
        }
        for (name, endpoint) in [
            ("audio_emotion", &self.models.audio_emotion),
            ("text_emotion", &self.models.text_emotion),
            ("speech", &self.models.speech),
            ("llm", &self.models.llm),
        ] {
            info!(
                model = name,
                backend = ?endpoint.backend,
                endpoint = endpoint.endpoint.as_deref().unwrap_or("default"),
                "Model backend"
            );
        }
        if self.host == "0.0.0.0" {
            warn!("Listening on all interfaces; no authentication is enforced");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edugame_common::config::parse_toml_config;

    #[test]
    fn cli_values_override_file() {
        let toml = parse_toml_config(
            r#"
            host = "127.0.0.1"
            port = 9000

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        let config = ServiceConfig::from_toml(toml).with_overrides(&CliOverrides {
            port: Some(8100),
            ..Default::default()
        });

        assert_eq!(config.port, 8100);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.bind_addr(), "127.0.0.1:8100");
    }

    #[test]
    fn body_limit_leaves_room_for_multipart() {
        let config = ServiceConfig::default();
        assert_eq!(config.max_upload_bytes, 26_214_400);
        assert_eq!(config.body_limit(), 26_214_400 + 1_048_576);
    }

    #[test]
    fn transcriber_settings_follow_config() {
        let mut config = ServiceConfig::default();
        config.transcription.chunk_length_secs = 10;
        config.transcription.chunking_enabled = false;

        let settings = config.transcriber_settings();
        assert_eq!(settings.chunk_length_secs, 10);
        assert!(!settings.chunking_enabled);
        assert_eq!(settings.max_upload_bytes, config.max_upload_bytes);
    }

    #[test]
    fn invalid_settings_rejected() {
        let mut config = ServiceConfig::default();
        config.max_upload_bytes = 0;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.transcription.chunk_length_secs = 0;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.temp_dir = Some(PathBuf::from("/definitely/not/a/dir"));
        assert!(config.validate().is_err());

        assert!(ServiceConfig::default().validate().is_ok());
    }
}
