//! Configuration management for vodplay
//!
//! Handles config file loading/saving and credential overrides.
//! Config is stored at ~/.config/vodplay/config.toml

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::client::DEFAULT_BASE_URL;
use crate::session::SessionConfig;
use crate::stream::PlayerType;
use crate::tracks::REFERENCE_AUDIO_LOCALE;

pub const ACCESS_TOKEN_ENV: &str = "VODPLAY_ACCESS_TOKEN";
pub const ACCOUNT_ID_ENV: &str = "VODPLAY_ACCOUNT_ID";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub account_id: Option<String>,
    pub access_token: Option<String>,
    pub preferred_audio_locale: String,
    pub preferred_subtitle_locale: String,
    /// "mpv" or "vlc"
    pub player: String,
    pub playhead_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            account_id: None,
            access_token: None,
            preferred_audio_locale: REFERENCE_AUDIO_LOCALE.to_string(),
            preferred_subtitle_locale: "en-US".to_string(),
            player: "mpv".to_string(),
            playhead_interval_secs: 15,
        }
    }
}

impl Config {
    /// Get config file path (~/.config/vodplay/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("vodplay").join("config.toml"))
    }

    /// Load config from the default path, or return default if not found
    pub fn load() -> Self {
        Self::path()
            .map(|p| Self::load_from(&p))
            .unwrap_or_default()
            .with_env_overrides()
    }

    /// Load config from `path`; a missing or malformed file gives defaults
    pub fn load_from(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| match toml::from_str(&s) {
                Ok(config) => Some(config),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config");
                    None
                }
            })
            .unwrap_or_default()
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::path().ok_or_else(|| anyhow::anyhow!("Could not determine config path"))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Credentials from the environment win over the file
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            self.access_token = Some(token);
        }
        if let Ok(account) = std::env::var(ACCOUNT_ID_ENV) {
            self.account_id = Some(account);
        }
        self
    }

    /// Configured player, falling back to mpv
    pub fn player_type(&self) -> PlayerType {
        self.player.parse().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to mpv");
            PlayerType::default()
        })
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            preferred_audio_locale: self.preferred_audio_locale.clone(),
            preferred_subtitle_locale: self.preferred_subtitle_locale.clone(),
            persist_interval: Duration::from_secs(self.playhead_interval_secs.max(1)),
        }
    }
}
