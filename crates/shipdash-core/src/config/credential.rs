//! API token storage with optional keyring support
//!
//! A profile's `api_token` is either the token itself or a `keyring:<key>`
//! reference resolved through the OS keyring (with the `secure-storage`
//! feature). `SHIPDASH_API_TOKEN` overrides both.

use super::error::{ConfigError, Result};
use std::env;

/// Prefix that indicates a value should be retrieved from the keyring
const KEYRING_PREFIX: &str = "keyring:";

/// Environment variable overriding any stored token
pub const TOKEN_ENV_VAR: &str = "SHIPDASH_API_TOKEN";

#[cfg(feature = "secure-storage")]
const SERVICE_NAME: &str = "shipdash";

/// Resolves and stores profile credentials
#[derive(Debug, Default, Clone, Copy)]
pub struct CredentialStore;

impl CredentialStore {
    pub fn new() -> Self {
        Self
    }

    /// True when tokens can be written to the OS keyring
    pub fn keyring_available(&self) -> bool {
        cfg!(feature = "secure-storage")
    }

    /// Store a token and return the value to write into the config file
    ///
    /// With the keyring available this is a `keyring:<key>` reference,
    /// otherwise the token itself.
    pub fn store(&self, key: &str, token: &str) -> Result<String> {
        #[cfg(feature = "secure-storage")]
        {
            let entry = keyring::Entry::new(SERVICE_NAME, key)
                .map_err(|e| ConfigError::KeyringError(e.to_string()))?;
            entry.set_password(token).map_err(|e| {
                ConfigError::KeyringError(format!("Failed to store token in keyring: {}", e))
            })?;
            Ok(format!("{}{}", KEYRING_PREFIX, key))
        }
        #[cfg(not(feature = "secure-storage"))]
        {
            let _ = key;
            Ok(token.to_string())
        }
    }

    /// Resolve a configured value to the actual token
    ///
    /// Resolution order:
    /// 1. Environment variable (if `env_var` is given and set)
    /// 2. Keyring, for `keyring:` references
    /// 3. The value itself
    pub fn resolve(&self, value: &str, env_var: Option<&str>) -> Result<String> {
        if let Some(var) = env_var
            && let Ok(env_value) = env::var(var)
        {
            return Ok(env_value);
        }

        let Some(key) = value.strip_prefix(KEYRING_PREFIX) else {
            return Ok(value.to_string());
        };

        #[cfg(feature = "secure-storage")]
        {
            let entry = keyring::Entry::new(SERVICE_NAME, key)
                .map_err(|e| ConfigError::KeyringError(e.to_string()))?;
            entry.get_password().map_err(|e| {
                ConfigError::KeyringError(format!(
                    "Failed to retrieve token '{}' from keyring: {}",
                    key, e
                ))
            })
        }
        #[cfg(not(feature = "secure-storage"))]
        {
            Err(ConfigError::CredentialError(format!(
                "token '{}' references the keyring but secure-storage is not enabled",
                key
            )))
        }
    }

    /// Remove a keyring entry; plain values need no cleanup
    pub fn delete(&self, value: &str) -> Result<()> {
        let Some(key) = value.strip_prefix(KEYRING_PREFIX) else {
            return Ok(());
        };

        #[cfg(feature = "secure-storage")]
        {
            let entry = keyring::Entry::new(SERVICE_NAME, key)
                .map_err(|e| ConfigError::KeyringError(e.to_string()))?;
            match entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(ConfigError::KeyringError(format!(
                    "Failed to delete token from keyring: {}",
                    e
                ))),
            }
        }
        #[cfg(not(feature = "secure-storage"))]
        {
            let _ = key;
            Ok(())
        }
    }

    pub fn is_keyring_reference(value: &str) -> bool {
        value.starts_with(KEYRING_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_plain_value_returned_as_is() {
        let store = CredentialStore::new();
        assert_eq!(store.resolve("secret-token", None).unwrap(), "secret-token");
    }

    #[test]
    #[serial]
    fn test_env_var_override() {
        unsafe {
            env::set_var("SHIPDASH_TEST_TOKEN", "from-env");
        }

        let store = CredentialStore::new();
        let result = store
            .resolve("from-config", Some("SHIPDASH_TEST_TOKEN"))
            .unwrap();
        assert_eq!(result, "from-env");

        unsafe {
            env::remove_var("SHIPDASH_TEST_TOKEN");
        }
    }

    #[test]
    fn test_keyring_reference_detection() {
        assert!(CredentialStore::is_keyring_reference("keyring:prod"));
        assert!(!CredentialStore::is_keyring_reference("prod"));
        assert!(!CredentialStore::is_keyring_reference(""));
    }

    #[cfg(not(feature = "secure-storage"))]
    #[test]
    fn test_keyring_reference_without_feature_fails() {
        let store = CredentialStore::new();
        let err = store.resolve("keyring:prod", None).unwrap_err();
        assert!(err.to_string().contains("secure-storage"));
        assert_eq!(store.store("prod", "abc").unwrap(), "abc");
        assert!(store.delete("keyring:prod").is_ok());
    }

    #[cfg(feature = "secure-storage")]
    #[test]
    #[ignore = "Requires keyring service to be available"]
    fn test_keyring_round_trip() {
        let store = CredentialStore::new();
        let reference = store.store("shipdash-test", "value").unwrap();
        assert!(reference.starts_with(KEYRING_PREFIX));
        assert_eq!(store.resolve(&reference, None).unwrap(), "value");
        store.delete(&reference).unwrap();
    }
}
