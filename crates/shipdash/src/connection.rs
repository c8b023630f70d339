//! Connection management for the dashboard backend

use std::path::PathBuf;
use std::time::Duration;

use shipdash_core::config::TOKEN_ENV_VAR;
use shipdash_core::{BackendClient, Config, PollOptions, Profile};
use tracing::{debug, info, trace};

use crate::cli::PollingArgs;
use crate::error::{Result as CliResult, ShipdashError};

/// A ready-to-use client plus the polling settings that go with it
pub struct Connection {
    pub client: BackendClient,
    pub options: PollOptions,
    pub profile: Option<String>,
}

impl Connection {
    /// Apply command-line polling flags on top of the profile settings
    pub fn poll_options(&self, overrides: &PollingArgs) -> PollOptions {
        let interval = overrides
            .interval_ms
            .map(Duration::from_millis)
            .unwrap_or(self.options.interval);
        let max_attempts = overrides
            .max_attempts
            .or(self.options.max_attempts.map(|n| n.get()));
        PollOptions::new(interval, max_attempts)
    }
}

/// Connection manager for creating authenticated clients
#[derive(Clone)]
pub struct ConnectionManager {
    pub config: Config,
    pub config_path: Option<PathBuf>,
}

impl ConnectionManager {
    pub fn with_config_path(config: Config, config_path: Option<PathBuf>) -> Self {
        Self {
            config,
            config_path,
        }
    }

    /// Save an updated configuration to the file this one was loaded from
    pub fn save_config(&self, config: &Config) -> CliResult<()> {
        match self.config_path {
            Some(ref path) => config.save_to_path(path)?,
            None => config.save()?,
        }
        Ok(())
    }

    /// Display form of the config file location
    pub fn config_location(&self) -> CliResult<String> {
        let path = match self.config_path {
            Some(ref path) => path.clone(),
            None => Config::config_path()?,
        };
        Ok(path.display().to_string())
    }

    /// Build a backend client from a profile, optionally pointed at another URL
    ///
    /// An explicit profile must exist. With `url_override` and no explicit
    /// profile, the default profile still supplies the token and polling
    /// settings when there is one.
    pub fn connect(
        &self,
        profile_name: Option<&str>,
        url_override: Option<&str>,
    ) -> CliResult<Connection> {
        trace!("Profile name: {:?}, url override: {:?}", profile_name, url_override);

        let profile = self.select_profile(profile_name, url_override)?;

        let url = match (url_override, &profile) {
            (Some(url), _) => url.to_string(),
            (None, Some((_, profile))) => profile.resolved_url()?,
            (None, None) => return Err(ShipdashError::NoProfileConfigured),
        };

        let token = match &profile {
            Some((_, profile)) => profile.resolve_api_token()?,
            None => std::env::var(TOKEN_ENV_VAR).ok(),
        };

        let options = profile
            .as_ref()
            .map(|(_, profile)| profile.poll_options())
            .unwrap_or_default();

        info!("Connecting to dashboard backend: {}", url);
        let mut client = BackendClient::new(&url)?;
        if let Some(token) = token {
            debug!("Using bearer token");
            client = client.with_token(token);
        }

        Ok(Connection {
            client,
            options,
            profile: profile.map(|(name, _)| name),
        })
    }

    fn select_profile(
        &self,
        profile_name: Option<&str>,
        url_override: Option<&str>,
    ) -> CliResult<Option<(String, Profile)>> {
        if url_override.is_some() && profile_name.is_none() {
            let Ok(name) = self.config.resolve_profile(None) else {
                debug!("No profile configured, using --url alone");
                return Ok(None);
            };
            let Ok(profile) = self.config.profile(&name) else {
                return Ok(None);
            };
            profile.validate(&name)?;
            return Ok(Some((name, profile.clone())));
        }

        let name = self.config.resolve_profile(profile_name)?;
        let profile = self.config.profile(&name)?;
        profile.validate(&name)?;
        info!("Using profile: {}", name);
        Ok(Some((name, profile.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_with(profiles: &[(&str, Profile)]) -> ConnectionManager {
        let mut config = Config::default();
        for (name, profile) in profiles {
            config.set_profile(name.to_string(), profile.clone());
        }
        ConnectionManager::with_config_path(config, None)
    }

    #[test]
    fn test_connect_uses_profile_url_and_polling() {
        let mgr = manager_with(&[(
            "prod",
            Profile {
                interval_ms: Some(250),
                max_attempts: Some(8),
                ..Profile::new("https://dashboard.example.com")
            },
        )]);

        let conn = mgr.connect(Some("prod"), None).unwrap();
        assert_eq!(conn.client.base_url(), "https://dashboard.example.com");
        assert_eq!(conn.options.interval, Duration::from_millis(250));
        assert_eq!(conn.profile.as_deref(), Some("prod"));
    }

    #[test]
    fn test_profile_url_expanded_at_connect() {
        let mgr = manager_with(&[(
            "prod",
            Profile::new("${SHIPDASH_CONN_TEST_UNSET_URL:-http://fallback:8000}"),
        )]);

        let conn = mgr.connect(Some("prod"), None).unwrap();
        assert_eq!(conn.client.base_url(), "http://fallback:8000");
        assert_eq!(
            mgr.config.profile("prod").unwrap().url,
            "${SHIPDASH_CONN_TEST_UNSET_URL:-http://fallback:8000}"
        );
    }

    #[test]
    fn test_url_override_without_profiles() {
        let mgr = manager_with(&[]);
        let conn = mgr.connect(None, Some("http://localhost:8000")).unwrap();
        assert_eq!(conn.client.base_url(), "http://localhost:8000");
        assert!(conn.profile.is_none());
    }

    #[test]
    fn test_url_override_keeps_default_profile_settings() {
        let mgr = manager_with(&[(
            "dev",
            Profile {
                interval_ms: Some(100),
                ..Profile::new("http://dev")
            },
        )]);
        let conn = mgr.connect(None, Some("http://other")).unwrap();
        assert_eq!(conn.client.base_url(), "http://other");
        assert_eq!(conn.options.interval, Duration::from_millis(100));
    }

    #[test]
    fn test_missing_profile_errors() {
        let mgr = manager_with(&[]);
        assert!(matches!(
            mgr.connect(None, None),
            Err(ShipdashError::NoProfileConfigured)
        ));
        assert!(matches!(
            mgr.connect(Some("prod"), None),
            Err(ShipdashError::ProfileNotFound { .. })
        ));
    }

    #[test]
    fn test_invalid_profile_is_rejected() {
        let mgr = manager_with(&[("bad", Profile::new("localhost:8000"))]);
        let err = mgr.connect(Some("bad"), None).err().unwrap();
        assert!(err.to_string().contains("http://"));
    }

    #[test]
    fn test_polling_flags_override_profile() {
        let mgr = manager_with(&[(
            "prod",
            Profile {
                interval_ms: Some(250),
                max_attempts: Some(8),
                ..Profile::new("https://x")
            },
        )]);
        let conn = mgr.connect(Some("prod"), None).unwrap();

        let options = conn.poll_options(&PollingArgs {
            interval_ms: None,
            max_attempts: Some(3),
        });
        assert_eq!(options.interval, Duration::from_millis(250));
        assert_eq!(options.max_attempts.map(|n| n.get()), Some(3));

        let options = conn.poll_options(&PollingArgs::default());
        assert_eq!(options.max_attempts.map(|n| n.get()), Some(8));
    }
}
