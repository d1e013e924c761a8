//! Configuration loading and config file resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "DEERCAMP_CONFIG";

/// Session-wide audio settings applied before the first clip is loaded.
///
/// Mirrors the platform audio-session switches a mobile host exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioMode {
    /// Keep playing when the device ringer is muted
    pub plays_in_silent_mode: bool,
    /// Lower other apps' audio while a clip plays
    pub duck_others: bool,
    /// Keep the session alive when the host goes to the background
    pub stays_active_in_background: bool,
}

impl Default for AudioMode {
    fn default() -> Self {
        Self {
            plays_in_silent_mode: true,
            duck_others: true,
            stays_active_in_background: false,
        }
    }
}

/// Voice playback configuration (`voice.toml`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub audio_mode: AudioMode,
    /// How often the renderer reports playback position
    pub progress_interval_ms: u64,
    /// Timeout for fetching remote clips
    pub http_timeout_secs: u64,
    /// Default tracing filter when RUST_LOG is unset
    pub log_level: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            audio_mode: AudioMode::default(),
            progress_interval_ms: 250,
            http_timeout_secs: 30,
            log_level: "info".to_string(),
        }
    }
}

impl VoiceConfig {
    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: VoiceConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file from disk
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.progress_interval_ms == 0 {
            return Err(Error::Config(
                "progress_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.http_timeout_secs == 0 {
            return Err(Error::Config(
                "http_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Config file resolution in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. Platform config file, if it exists
///
/// Returns `None` when nothing applies and compiled defaults should be used.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config file
    default_config_file().filter(|path| path.exists())
}

/// Resolve and load the voice configuration.
///
/// A missing file is not fatal: it logs a warning and falls back to defaults.
/// A file that exists but does not parse is an error.
pub fn load_config(cli_arg: Option<&Path>) -> Result<VoiceConfig> {
    let Some(path) = resolve_config_path(cli_arg, CONFIG_ENV_VAR) else {
        debug!("No config file found, using compiled defaults");
        return Ok(VoiceConfig::default());
    };

    if !path.exists() {
        warn!(
            "Config file {} not found, using compiled defaults",
            path.display()
        );
        return Ok(VoiceConfig::default());
    }

    let config = VoiceConfig::load_file(&path)?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Platform config file location: `<config_dir>/deercamp/voice.toml`
///
/// ~/.config on Linux, ~/Library/Application Support on macOS, %APPDATA% on Windows.
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("deercamp").join("voice.toml"))
}
