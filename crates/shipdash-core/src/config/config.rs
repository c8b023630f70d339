//! Configuration management for the shipdash CLI
//!
//! Configuration is stored in TOML format with support for multiple named
//! profiles:
//!
//! ```toml
//! default_profile = "prod"
//!
//! [profiles.prod]
//! url = "https://dashboard.example.com"
//! api_token = "${SHIPDASH_API_TOKEN}"
//! interval_ms = 2000
//! max_attempts = 150
//! ```
//!
//! `${VAR}` and `${VAR:-default}` references in `url` and `api_token` are kept
//! as written and expanded only when the profile is used, so saving the
//! config never writes resolved secrets back to disk.

#[cfg(target_os = "macos")]
use directories::BaseDirs;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::credential::{CredentialStore, TOKEN_ENV_VAR};
use super::error::{ConfigError, Result};
use crate::poller::{DEFAULT_INTERVAL, PollOptions};

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Profile used when none is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
    /// Map of profile name -> profile configuration
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

/// Individual profile configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Profile {
    /// Base URL of the dashboard backend
    pub url: String,
    /// API token, or a `keyring:<key>` reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    /// Time between status checks in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
    /// Maximum number of status checks before giving up
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

impl Profile {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_token: None,
            interval_ms: None,
            max_attempts: None,
        }
    }

    /// Backend URL with `${VAR}` references expanded
    pub fn resolved_url(&self) -> Result<String> {
        expand_env_vars(&self.url)
    }

    /// Resolve the API token
    ///
    /// `SHIPDASH_API_TOKEN` wins; otherwise the configured value is expanded
    /// and then looked up in the keyring if it is a `keyring:` reference.
    pub fn resolve_api_token(&self) -> Result<Option<String>> {
        if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
            return Ok(Some(token));
        }
        let Some(value) = &self.api_token else {
            return Ok(None);
        };
        let expanded = expand_env_vars(value)?;
        CredentialStore::new().resolve(&expanded, None).map(Some)
    }

    /// Polling options from this profile, falling back to defaults
    pub fn poll_options(&self) -> PollOptions {
        let interval = self
            .interval_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_INTERVAL);
        PollOptions::new(interval, self.max_attempts)
    }

    /// Reject profiles that cannot be used to build a client
    pub fn validate(&self, name: &str) -> Result<()> {
        let invalid = |reason: &str| ConfigError::InvalidProfile {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        let url = self.resolved_url()?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(invalid("url must start with http:// or https://"));
        }
        if self.interval_ms == Some(0) {
            return Err(invalid("interval_ms must be greater than 0"));
        }
        if self.max_attempts == Some(0) {
            return Err(invalid("max_attempts must be greater than 0"));
        }
        Ok(())
    }
}

impl Config {
    /// Resolve the profile to use
    ///
    /// Explicit name first, then `default_profile`, then the alphabetically
    /// first profile.
    pub fn resolve_profile(&self, explicit_profile: Option<&str>) -> Result<String> {
        if let Some(profile_name) = explicit_profile {
            return Ok(profile_name.to_string());
        }

        if let Some(ref default) = self.default_profile {
            return Ok(default.clone());
        }

        self.list_profiles()
            .first()
            .map(|(name, _)| name.to_string())
            .ok_or_else(|| ConfigError::NoProfiles {
                suggestion: "Use 'shipdash profile set <name> --url <url>' to create a profile."
                    .to_string(),
            })
    }

    /// Look up a profile by name
    pub fn profile(&self, name: &str) -> Result<&Profile> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.to_string(),
            })
    }

    /// Load configuration from the standard location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path; a missing file is an empty config
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::LoadError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content)?;

        Ok(config)
    }

    /// Save configuration to the standard location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to_path(&config_path)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::SaveError {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self)?;

        fs::write(config_path, content).map_err(|e| ConfigError::SaveError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        Ok(())
    }

    /// Set or update a profile
    pub fn set_profile(&mut self, name: String, profile: Profile) {
        self.profiles.insert(name, profile);
    }

    /// Remove a profile by name, clearing the default if it pointed there
    pub fn remove_profile(&mut self, name: &str) -> Option<Profile> {
        if self.default_profile.as_deref() == Some(name) {
            self.default_profile = None;
        }
        self.profiles.remove(name)
    }

    /// List all profiles sorted by name
    pub fn list_profiles(&self) -> Vec<(&String, &Profile)> {
        let mut profiles: Vec<_> = self.profiles.iter().collect();
        profiles.sort_by_key(|(name, _)| *name);
        profiles
    }

    /// Get the path to the configuration file
    ///
    /// On macOS, `~/.config/shipdash/config.toml` is preferred when it (or its
    /// directory) exists, falling back to the platform location.
    ///
    /// On Linux: ~/.config/shipdash/config.toml
    /// On Windows: %APPDATA%\shipdash\shipdash\config\config.toml
    pub fn config_path() -> Result<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            if let Some(base_dirs) = BaseDirs::new() {
                let linux_style_path = base_dirs
                    .home_dir()
                    .join(".config")
                    .join("shipdash")
                    .join("config.toml");

                if linux_style_path.exists()
                    || linux_style_path
                        .parent()
                        .map(|p| p.exists())
                        .unwrap_or(false)
                {
                    return Ok(linux_style_path);
                }
            }
        }

        let proj_dirs =
            ProjectDirs::from("com", "shipdash", "shipdash").ok_or(ConfigError::ConfigDirError)?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }
}

/// Expand `${VAR}` and `${VAR:-default}` references in one value
///
/// An unset variable without a default is an error rather than literal text.
fn expand_env_vars(value: &str) -> Result<String> {
    shellexpand::env(value)
        .map(|expanded| expanded.into_owned())
        .map_err(|e| ConfigError::UnsetVariable { var: e.var_name })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn profile(url: &str) -> Profile {
        Profile::new(url)
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.set_profile(
            "prod".to_string(),
            Profile {
                url: "https://dashboard.example.com".to_string(),
                api_token: Some("secret".to_string()),
                interval_ms: Some(1500),
                max_attempts: Some(40),
            },
        );
        config.default_profile = Some("prod".to_string());

        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_profile_resolution_order() {
        let mut config = Config::default();
        config.set_profile("staging".to_string(), profile("http://staging"));
        config.set_profile("alpha".to_string(), profile("http://alpha"));

        assert_eq!(config.resolve_profile(Some("staging")).unwrap(), "staging");
        assert_eq!(config.resolve_profile(None).unwrap(), "alpha");

        config.default_profile = Some("staging".to_string());
        assert_eq!(config.resolve_profile(None).unwrap(), "staging");
    }

    #[test]
    fn test_no_profiles_error() {
        let config = Config::default();
        let err = config.resolve_profile(None).unwrap_err();
        assert!(matches!(err, ConfigError::NoProfiles { .. }));
        assert!(err.to_string().contains("shipdash profile set"));
    }

    #[test]
    fn test_missing_profile_lookup() {
        let config = Config::default();
        assert!(matches!(
            config.profile("nope"),
            Err(ConfigError::ProfileNotFound { .. })
        ));
    }

    #[test]
    fn test_remove_profile_clears_default() {
        let mut config = Config::default();
        config.set_profile("prod".to_string(), profile("http://prod"));
        config.default_profile = Some("prod".to_string());

        assert!(config.remove_profile("prod").is_some());
        assert!(config.default_profile.is_none());
        assert!(config.remove_profile("prod").is_none());
    }

    #[test]
    fn test_poll_options_from_profile() {
        let options = profile("http://x").poll_options();
        assert_eq!(options.interval, DEFAULT_INTERVAL);
        assert!(options.max_attempts.is_none());

        let custom = Profile {
            interval_ms: Some(500),
            max_attempts: Some(10),
            ..profile("http://x")
        };
        let options = custom.poll_options();
        assert_eq!(options.interval, Duration::from_millis(500));
        assert_eq!(options.max_attempts.map(|n| n.get()), Some(10));
    }

    #[test]
    fn test_profile_validation() {
        assert!(profile("https://ok").validate("p").is_ok());
        assert!(profile("ftp://nope").validate("p").is_err());

        let zero_interval = Profile {
            interval_ms: Some(0),
            ..profile("http://x")
        };
        let err = zero_interval.validate("p").unwrap_err();
        assert!(err.to_string().contains("interval_ms"));
    }

    #[test]
    #[serial]
    fn test_env_var_expansion_at_use() {
        unsafe {
            std::env::set_var("SHIPDASH_TEST_URL", "https://from-env.example.com");
            std::env::remove_var(TOKEN_ENV_VAR);
        }

        let content = r#"
[profiles.prod]
url = "${SHIPDASH_TEST_URL}"
api_token = "${SHIPDASH_TEST_UNSET_TOKEN:-fallback-token}"
"#;
        let config: Config = toml::from_str(content).unwrap();
        let prod = config.profile("prod").unwrap();
        assert_eq!(prod.url, "${SHIPDASH_TEST_URL}");
        assert_eq!(prod.resolved_url().unwrap(), "https://from-env.example.com");
        assert_eq!(
            prod.resolve_api_token().unwrap().as_deref(),
            Some("fallback-token")
        );
        assert!(prod.validate("prod").is_ok());

        unsafe {
            std::env::remove_var("SHIPDASH_TEST_URL");
        }
    }

    #[test]
    #[serial]
    fn test_unset_variable_is_an_error() {
        unsafe {
            std::env::remove_var("SHIPDASH_TEST_MISSING_TOKEN");
            std::env::remove_var(TOKEN_ENV_VAR);
        }

        let prod = Profile {
            api_token: Some("${SHIPDASH_TEST_MISSING_TOKEN}".to_string()),
            ..profile("${SHIPDASH_TEST_MISSING_URL}")
        };

        let err = prod.resolve_api_token().unwrap_err();
        assert!(
            matches!(err, ConfigError::UnsetVariable { ref var } if var == "SHIPDASH_TEST_MISSING_TOKEN")
        );
        assert!(matches!(
            prod.validate("prod"),
            Err(ConfigError::UnsetVariable { .. })
        ));
    }

    #[test]
    #[serial]
    fn test_token_env_override() {
        unsafe {
            std::env::set_var(TOKEN_ENV_VAR, "env-token");
        }

        let stored = Profile {
            api_token: Some("stored".to_string()),
            ..profile("http://x")
        };
        assert_eq!(stored.resolve_api_token().unwrap().as_deref(), Some("env-token"));
        assert_eq!(
            profile("http://x").resolve_api_token().unwrap().as_deref(),
            Some("env-token")
        );

        unsafe {
            std::env::remove_var(TOKEN_ENV_VAR);
        }

        assert_eq!(stored.resolve_api_token().unwrap().as_deref(), Some("stored"));
        assert_eq!(profile("http://x").resolve_api_token().unwrap(), None);
    }
}
