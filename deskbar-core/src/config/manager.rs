//! Loading and saving `config.toml`

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};
use crate::tracing::{field_names, span_names};

use super::settings::AppSettings;

/// File name of the settings document
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Locates and reads/writes the settings file
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Uses `$XDG_CONFIG_HOME/deskbar`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the platform has no config directory.
    pub fn new() -> ConfigResult<Self> {
        let base = dirs::config_dir().ok_or_else(|| ConfigError::NotFound(PathBuf::from("~/.config")))?;
        Ok(Self {
            config_dir: base.join("deskbar"),
        })
    }

    /// Uses an explicit directory (CLI `--config`, tests)
    #[must_use]
    pub const fn with_config_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Directory holding `config.toml`
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Path of `config.toml`
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    /// Loads settings, returning defaults when the file does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed, or
    /// fails validation.
    pub fn load_settings(&self) -> ConfigResult<AppSettings> {
        let path = self.config_path();
        if !path.exists() {
            tracing::debug!({ field_names::PATH } = %path.display(), "No config file, using defaults");
            return Ok(AppSettings::default());
        }

        let _span = crate::trace_operation!(span_names::CONFIG_LOAD, { field_names::PATH } = %path.display()).entered();
        let content = fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
        let settings: AppSettings =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Writes settings, creating the directory if needed
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save_settings(&self, settings: &AppSettings) -> ConfigResult<()> {
        settings.validate()?;
        let content = toml::to_string_pretty(settings)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        fs::create_dir_all(&self.config_dir).map_err(|e| ConfigError::Write(e.to_string()))?;
        fs::write(self.config_path(), content).map_err(|e| ConfigError::Write(e.to_string()))?;
        tracing::info!({ field_names::PATH } = %self.config_path().display(), "Settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_config_dir(temp.path().to_path_buf());
        assert_eq!(manager.load_settings().unwrap(), AppSettings::default());
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_config_dir(temp.path().join("nested"));
        let mut settings = AppSettings::default();
        settings.weather.enabled = true;
        settings.weather.url = "https://example.invalid/w".to_string();
        settings.storage.directory = Some("/tmp/deskbar-test".to_string());

        manager.save_settings(&settings).unwrap();
        assert_eq!(manager.load_settings().unwrap(), settings);
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_config_dir(temp.path().to_path_buf());
        fs::write(manager.config_path(), "[reminders\nlead_minutes = ").unwrap();
        assert!(matches!(
            manager.load_settings(),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_validation_runs_on_load() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_config_dir(temp.path().to_path_buf());
        fs::write(manager.config_path(), "[polling]\nsystem_secs = 0\n").unwrap();
        assert!(matches!(
            manager.load_settings(),
            Err(ConfigError::Validation { .. })
        ));
    }
}
