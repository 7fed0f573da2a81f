//! Configuration management for naturecrib.
//!
//! Loads configuration from ${NATURECRIB_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::provider::ProviderConfig;

/// Google sign-in configuration.
///
/// Client IDs are the public identifiers registered with the identity
/// provider; the scope set is fixed by the auth flow and not configurable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub ios_client_id: String,
    pub android_client_id: String,
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sign-in endpoint of the account service.
    pub signin_url: String,

    /// Google sign-in configuration.
    #[serde(default)]
    pub google: GoogleConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            signin_url: Config::DEFAULT_SIGNIN_URL.to_string(),
            google: GoogleConfig::default(),
        }
    }
}

impl Config {
    const DEFAULT_SIGNIN_URL: &str = "http://localhost:8081/user/signin";

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// NATURECRIB_SIGNIN_URL overrides the configured endpoint when set.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))?
        } else {
            Config::default()
        };

        if let Ok(url) = std::env::var("NATURECRIB_SIGNIN_URL") {
            config.signin_url = url;
        }

        Ok(config)
    }

    /// Writes the default config template to a specific path.
    /// Fails if a config already exists there.
    pub fn init_at(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config already exists at {}", path.display());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        fs::write(path, default_config_template())
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// Builds the identity-provider configuration from the Google section.
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig::new(&self.google.ios_client_id, &self.google.android_client_id)
    }
}

/// Returns the default config file contents.
fn default_config_template() -> &'static str {
    r#"# naturecrib configuration

# Sign-in endpoint of the account service
signin_url = "http://localhost:8081/user/signin"

[google]
# Public OAuth client IDs for Google sign-in
# ios_client_id = ""
# android_client_id = ""
"#
}

pub mod paths {
    //! Path resolution for naturecrib configuration and data files.
    //!
    //! NATURECRIB_HOME resolution order:
    //! 1. NATURECRIB_HOME environment variable (if set)
    //! 2. ~/.config/naturecrib (default)

    use std::path::PathBuf;

    /// Returns the naturecrib home directory.
    ///
    /// Checks NATURECRIB_HOME env var first, falls back to ~/.config/naturecrib
    pub fn naturecrib_home() -> PathBuf {
        if let Ok(home) = std::env::var("NATURECRIB_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("naturecrib"))
            .expect("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        naturecrib_home().join("config.toml")
    }

    /// Returns the path to the session store file.
    pub fn session_path() -> PathBuf {
        naturecrib_home().join("session.json")
    }

    /// Returns the directory for log files.
    pub fn logs_dir() -> PathBuf {
        naturecrib_home().join("logs")
    }
}
