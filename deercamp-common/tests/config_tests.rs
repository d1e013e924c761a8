//! Integration tests for configuration resolution and graceful degradation
//!
//! Tests:
//! - Missing TOML files do not cause failure (warning + defaults)
//! - Priority order: CLI argument > environment variable > platform file
//! - Malformed files are reported, not silently ignored
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate DEERCAMP_CONFIG are marked with #[serial].

use deercamp_common::config::{load_config, resolve_config_path, VoiceConfig, CONFIG_ENV_VAR};
use deercamp_common::Error;
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

#[test]
#[serial]
fn test_env_var_used_when_no_cli_argument() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("env.toml");
    fs::write(&path, "progress_interval_ms = 125\n").unwrap();

    env::set_var(CONFIG_ENV_VAR, &path);
    let resolved = resolve_config_path(None, CONFIG_ENV_VAR);
    let config = load_config(None);
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(resolved, Some(path));
    assert_eq!(config.unwrap().progress_interval_ms, 125);
}

#[test]
#[serial]
fn test_cli_argument_overrides_env_var() {
    let dir = TempDir::new().unwrap();
    let env_path = dir.path().join("env.toml");
    let cli_path = dir.path().join("cli.toml");
    fs::write(&env_path, "progress_interval_ms = 125\n").unwrap();
    fs::write(&cli_path, "progress_interval_ms = 500\n").unwrap();

    env::set_var(CONFIG_ENV_VAR, &env_path);
    let config = load_config(Some(&cli_path));
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(config.unwrap().progress_interval_ms, 500);
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("does-not-exist.toml");

    env::remove_var(CONFIG_ENV_VAR);
    let config = load_config(Some(&missing)).unwrap();

    assert_eq!(config, VoiceConfig::default());
}

#[test]
#[serial]
fn test_malformed_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[audio_mode\nduck_others = maybe").unwrap();

    env::remove_var(CONFIG_ENV_VAR);
    let err = load_config(Some(&path)).unwrap_err();

    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().contains("broken.toml"));
}

#[test]
fn test_full_file_round_trips_audio_mode() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("voice.toml");
    fs::write(
        &path,
        r#"
progress_interval_ms = 100
http_timeout_secs = 5
log_level = "debug"

[audio_mode]
plays_in_silent_mode = false
duck_others = false
stays_active_in_background = true
"#,
    )
    .unwrap();

    let config = VoiceConfig::load_file(&path).unwrap();

    assert!(!config.audio_mode.plays_in_silent_mode);
    assert!(!config.audio_mode.duck_others);
    assert!(config.audio_mode.stays_active_in_background);
    assert_eq!(config.http_timeout_secs, 5);
    assert_eq!(config.log_level, "debug");
}
