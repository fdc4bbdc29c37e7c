//! Configuration management

use anyhow::{Context, Result};
use codeforge_types::Settings;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Overrides `server_url` for one process without being persisted
pub const SERVER_URL_ENV: &str = "CODEFORGE_SERVER_URL";
pub const HOME_ENV: &str = "CODEFORGE_HOME";

pub struct SettingsManager {
    home: PathBuf,
}

impl SettingsManager {
    /// Manager rooted at `$CODEFORGE_HOME`, or `~/.codeforge`
    pub fn from_env() -> Result<Self> {
        Ok(Self::at(Self::codeforge_home()?))
    }

    pub fn at(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// Get the codeforge home directory (~/.codeforge)
    pub fn codeforge_home() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(HOME_ENV) {
            return Ok(PathBuf::from(path));
        }
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".codeforge"))
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Get the settings file path
    pub fn settings_path(&self) -> PathBuf {
        self.home.join("settings.json")
    }

    /// Load settings from disk, writing defaults on first use
    pub fn load(&self) -> Result<Settings> {
        let mut settings = self.load_stored()?;
        apply_overrides(&mut settings, std::env::var(SERVER_URL_ENV).ok());
        Ok(settings)
    }

    /// Settings exactly as persisted, without environment overrides
    pub fn load_stored(&self) -> Result<Settings> {
        let path = self.settings_path();

        if !path.exists() {
            debug!("No settings at {:?}, writing defaults", path);
            let settings = Settings::default();
            self.save(&settings)?;
            return Ok(settings);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings from {:?}", path))
    }

    /// Save settings to disk
    pub fn save(&self, settings: &Settings) -> Result<()> {
        let path = self.settings_path();

        std::fs::create_dir_all(&self.home)
            .with_context(|| format!("Failed to create directory {:?}", self.home))?;

        let content =
            serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;

        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write settings to {:?}", path))?;

        // Restrict to owner only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }

    /// Load, change and persist in one step
    pub fn update(&self, change: impl FnOnce(&mut Settings)) -> Result<Settings> {
        let mut settings = self.load_stored()?;
        change(&mut settings);
        self.save(&settings)?;
        Ok(settings)
    }
}

fn apply_overrides(settings: &mut Settings, server_url: Option<String>) {
    if let Some(url) = server_url.filter(|url| !url.trim().is_empty()) {
        debug!("Server URL overridden by {}: {}", SERVER_URL_ENV, url);
        settings.server_url = url.trim().to_string();
    }
}

/// Normalize a user-supplied backend origin
pub fn normalize_server_url(url: &str) -> Result<String> {
    let url = url.trim().trim_end_matches('/');
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!(
            "Invalid URL: {}. URL must start with http:// or https://",
            url
        );
    }
    Ok(url.to_string())
}
