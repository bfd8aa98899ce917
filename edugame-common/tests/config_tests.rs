//! Config file resolution and graceful fallback to defaults
//!
//! Tests that touch EDUGAME_CONFIG are marked #[serial] so they never see
//! each other's environment.

use edugame_common::config::{ConfigResolver, CONFIG_ENV_VAR, DEFAULT_PORT};
use edugame_common::Error;
use serial_test::serial;
use std::env;
use std::path::PathBuf;

fn write_config(dir: &tempfile::TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("ai-services.toml");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
#[serial]
fn test_cli_path_wins_over_env() {
    let dir = tempfile::tempdir().unwrap();
    let cli = write_config(&dir, "port = 9100\n");
    env::set_var(CONFIG_ENV_VAR, "/nonexistent/env.toml");

    let resolver = ConfigResolver::new("ai-services");
    assert_eq!(resolver.resolve_path(Some(&cli)), Some(cli.clone()));

    let config = resolver.load(Some(&cli)).unwrap();
    assert_eq!(config.port, 9100);

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_used_without_cli_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
        host = "127.0.0.1"

        [transcription]
        chunk_length_secs = 20
        "#,
    );
    env::set_var(CONFIG_ENV_VAR, &path);

    let config = ConfigResolver::new("ai-services").load(None).unwrap();
    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.transcription.chunk_length_secs, 20);

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_blank_env_var_falls_through_to_config_dir() {
    env::set_var(CONFIG_ENV_VAR, "   ");

    let resolved = ConfigResolver::new("ai-services").resolve_path(None);
    if let Some(path) = resolved {
        assert!(path.ends_with("edugame/ai-services.toml"), "{}", path.display());
    }

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_file_yields_defaults() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");

    let config = ConfigResolver::new("ai-services").load(Some(&missing)).unwrap();
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.max_upload_bytes, 25 * 1024 * 1024);
}

#[test]
#[serial]
fn test_malformed_file_is_config_error() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "port = \"not a number\"\n");

    let result = ConfigResolver::new("ai-services").load(Some(&path));
    match result {
        Err(Error::Config(message)) => assert!(message.contains("Parse"), "{}", message),
        other => panic!("expected Config error, got {:?}", other),
    }
}
