//! Profile management command implementations

use colored::Colorize;
use serde::Serialize;
use shipdash_core::config::CredentialStore;
use shipdash_core::{DEFAULT_INTERVAL, Profile};
use tracing::{debug, info, trace, warn};

use crate::cli::{OutputFormat, PollingArgs, ProfileCommands};
use crate::connection::ConnectionManager;
use crate::error::{Result as CliResult, ShipdashError};
use crate::output::print_output;

/// Profile as shown to the user; the token itself is never printed
#[derive(Debug, Serialize)]
struct ProfileView<'a> {
    name: &'a str,
    url: &'a str,
    token: &'static str,
    interval_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_attempts: Option<u32>,
    default: bool,
}

impl<'a> ProfileView<'a> {
    fn new(name: &'a str, profile: &'a Profile, default: bool) -> Self {
        let token = match profile.api_token.as_deref() {
            Some(value) if CredentialStore::is_keyring_reference(value) => "keyring",
            Some(value) if value.contains("${") => "environment",
            Some(_) => "configured",
            None => "none",
        };
        Self {
            name,
            url: &profile.url,
            token,
            interval_ms: profile
                .interval_ms
                .unwrap_or(DEFAULT_INTERVAL.as_millis() as u64),
            max_attempts: profile.max_attempts,
            default,
        }
    }
}

/// Handle profile management commands
pub async fn handle_profile_command(
    profile_cmd: &ProfileCommands,
    conn_mgr: &ConnectionManager,
    output_format: OutputFormat,
) -> CliResult<()> {
    use ProfileCommands::*;

    match profile_cmd {
        List => handle_list(conn_mgr, output_format),
        Path => handle_path(conn_mgr, output_format),
        Show { name } => handle_show(conn_mgr, name, output_format),
        Set {
            name,
            url,
            api_token,
            keyring,
            polling,
        } => handle_set(conn_mgr, name, url, api_token.as_deref(), *keyring, polling),
        Remove { name } => handle_remove(conn_mgr, name),
        Default { name } => handle_default(conn_mgr, name),
    }
}

fn handle_list(conn_mgr: &ConnectionManager, output_format: OutputFormat) -> CliResult<()> {
    debug!("Listing all configured profiles");
    let config = &conn_mgr.config;
    let profiles = config.list_profiles();
    trace!("Found {} profiles", profiles.len());

    // The implicit default is what a command without --profile would use
    let effective_default = config.resolve_profile(None).ok();
    let views: Vec<_> = profiles
        .iter()
        .map(|(name, profile)| {
            ProfileView::new(
                name,
                profile,
                effective_default.as_deref() == Some(name.as_str()),
            )
        })
        .collect();

    match output_format {
        OutputFormat::Auto => {
            if views.is_empty() {
                println!("No profiles configured.");
                println!("Create one with: shipdash profile set <name> --url <url>");
                return Ok(());
            }
            for view in &views {
                let marker = if view.default { "*" } else { " " };
                println!("{} {:<16} {}", marker.green().bold(), view.name, view.url);
            }
        }
        _ => print_output(&views, output_format.into())?,
    }
    Ok(())
}

fn handle_path(conn_mgr: &ConnectionManager, output_format: OutputFormat) -> CliResult<()> {
    let location = conn_mgr.config_location()?;
    match output_format {
        OutputFormat::Json | OutputFormat::Yaml => {
            print_output(serde_json::json!({ "path": location }), output_format.into())?
        }
        OutputFormat::Auto | OutputFormat::Table => println!("{}", location),
    }
    Ok(())
}

fn handle_show(
    conn_mgr: &ConnectionManager,
    name: &str,
    output_format: OutputFormat,
) -> CliResult<()> {
    let profile = conn_mgr.config.profile(name)?;
    let is_default = conn_mgr.config.resolve_profile(None).ok().as_deref() == Some(name);
    let view = ProfileView::new(name, profile, is_default);

    match output_format {
        OutputFormat::Auto => {
            println!("Profile: {}", view.name);
            println!("URL: {}", view.url);
            println!("Token: {}", view.token);
            println!("Interval: {}ms", view.interval_ms);
            match view.max_attempts {
                Some(n) => println!("Max attempts: {}", n),
                None => println!("Max attempts: unlimited"),
            }
            if view.default {
                println!("Default: yes");
            }
        }
        _ => print_output(&view, output_format.into())?,
    }
    Ok(())
}

fn handle_set(
    conn_mgr: &ConnectionManager,
    name: &str,
    url: &str,
    api_token: Option<&str>,
    use_keyring: bool,
    polling: &PollingArgs,
) -> CliResult<()> {
    debug!("Setting profile: {}", name);
    let store = CredentialStore::new();
    if use_keyring && !store.keyring_available() {
        return Err(ShipdashError::InvalidInput {
            message: "--keyring requires shipdash to be built with the secure-storage feature"
                .to_string(),
        });
    }

    let mut config = conn_mgr.config.clone();
    let existing = config.profiles.get(name).cloned();
    let old_token = existing.as_ref().and_then(|p| p.api_token.clone());

    let mut profile = Profile {
        url: url.to_string(),
        api_token: old_token.clone(),
        interval_ms: polling
            .interval_ms
            .or(existing.as_ref().and_then(|p| p.interval_ms)),
        max_attempts: polling
            .max_attempts
            .or(existing.as_ref().and_then(|p| p.max_attempts)),
    };
    profile.validate(name)?;

    // Credentials are only touched once the profile is known to be valid
    if let Some(token) = api_token {
        profile.api_token = Some(if use_keyring {
            store.store(name, token)?
        } else {
            token.to_string()
        });
    }
    let new_token = profile.api_token.clone();

    let is_first = config.profiles.is_empty();
    config.set_profile(name.to_string(), profile);
    if is_first {
        config.default_profile = Some(name.to_string());
    }
    conn_mgr.save_config(&config)?;

    // A replaced keyring token would otherwise be left behind
    if let Some(old) = old_token.as_deref()
        && Some(old) != new_token.as_deref()
        && let Err(e) = store.delete(old)
    {
        warn!("Failed to remove replaced token for profile '{}': {}", name, e);
    }

    info!("Profile '{}' saved", name);
    println!("Profile '{}' saved.", name);
    if is_first {
        println!("Set as default profile.");
    }
    Ok(())
}

fn handle_remove(conn_mgr: &ConnectionManager, name: &str) -> CliResult<()> {
    debug!("Removing profile: {}", name);
    let mut config = conn_mgr.config.clone();

    let was_default = config.default_profile.as_deref() == Some(name);
    let removed = config
        .remove_profile(name)
        .ok_or_else(|| ShipdashError::ProfileNotFound {
            name: name.to_string(),
        })?;

    conn_mgr.save_config(&config)?;
    if let Some(token) = removed.api_token.as_deref()
        && let Err(e) = CredentialStore::new().delete(token)
    {
        warn!("Failed to remove stored token for profile '{}': {}", name, e);
    }

    println!("Profile '{}' removed.", name);
    if was_default {
        println!("Default profile cleared.");
    }
    Ok(())
}

fn handle_default(conn_mgr: &ConnectionManager, name: &str) -> CliResult<()> {
    let mut config = conn_mgr.config.clone();
    config.profile(name)?;
    config.default_profile = Some(name.to_string());
    conn_mgr.save_config(&config)?;

    println!("Default profile set to '{}'.", name);
    Ok(())
}
