//! CLI structure and command definitions

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

/// Command-line client for the shipments dashboard backend
#[derive(Parser, Debug)]
#[command(name = "shipdash")]
#[command(version, about = "Command-line client for the shipments dashboard backend")]
#[command(long_about = "
Command-line client for the shipments dashboard backend

Start background jobs for a date range and follow them until they finish.

EXAMPLES:
    # Configure a backend
    shipdash profile set prod --url https://dashboard.example.com

    # Save March shipments to the database and wait for the job
    shipdash save --start-date 2024-03-01 --end-date 2024-03-31 --wait

    # Follow a job started elsewhere
    shipdash job wait 7f3c2a --interval-ms 1000 --max-attempts 60

    # Machine-readable status
    shipdash job status 7f3c2a -o json
")]
pub struct Cli {
    /// Profile to use for this command
    #[arg(long, short, global = true, env = "SHIPDASH_PROFILE")]
    pub profile: Option<String>,

    /// Path to alternate configuration file
    #[arg(long, global = true, env = "SHIPDASH_CONFIG_FILE")]
    pub config_file: Option<String>,

    /// Backend URL, overriding the profile
    #[arg(long, global = true, env = "SHIPDASH_URL")]
    pub url: Option<String>,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value = "auto")]
    pub output: OutputFormat,

    /// Enable verbose logging
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with a progress spinner
    Auto,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Human-readable table format
    Table,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Save shipments for a date range to the database via a backend job
    #[command(after_help = "EXAMPLES:
    shipdash save --start-date 2024-03-01 --end-date 2024-03-31
    shipdash save --start-date 2024-03-01 --end-date 2024-03-31 --project Retail --wait
")]
    Save {
        #[command(flatten)]
        range: DateRangeArgs,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Inspect background jobs
    #[command(subcommand)]
    Job(JobCommands),

    /// Check that the backend is reachable
    Health,

    /// Profile management
    #[command(subcommand, visible_alias = "prof")]
    Profile(ProfileCommands),

    /// Version information
    #[command(visible_alias = "ver")]
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Date range and filters shared by data commands
#[derive(Args, Debug, Clone)]
pub struct DateRangeArgs {
    /// First day of the range (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: NaiveDate,

    /// Last day of the range (YYYY-MM-DD)
    #[arg(long)]
    pub end_date: NaiveDate,

    /// Only include this project
    #[arg(long)]
    pub project: Option<String>,

    /// Only include this sales channel
    #[arg(long)]
    pub channel: Option<String>,
}

/// Polling arguments for commands that can wait for a job
#[derive(Args, Debug, Clone)]
pub struct WaitArgs {
    /// Wait for the job to finish
    #[arg(long)]
    pub wait: bool,

    #[command(flatten)]
    pub polling: PollingArgs,
}

/// Polling interval and limit, overriding the profile
#[derive(Args, Debug, Clone, Default)]
pub struct PollingArgs {
    /// Time between status checks in milliseconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_ms: Option<u64>,

    /// Give up after this many status checks
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_attempts: Option<u32>,
}

/// Job commands
#[derive(Subcommand, Debug)]
pub enum JobCommands {
    /// Show the current status of a job
    Status {
        /// Job ID
        id: String,
    },

    /// Poll a job until it finishes
    Wait {
        /// Job ID
        id: String,

        #[command(flatten)]
        polling: PollingArgs,
    },
}

/// Profile management commands
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// List all profiles
    #[command(visible_alias = "ls")]
    List,

    /// Show the configuration file path
    Path,

    /// Show profile details
    Show {
        /// Profile name
        name: String,
    },

    /// Create or update a profile
    Set {
        /// Profile name
        name: String,

        /// Backend URL
        #[arg(long)]
        url: String,

        /// API token sent as a bearer token
        #[arg(long)]
        api_token: Option<String>,

        /// Store the API token in the OS keyring
        #[arg(long, requires = "api_token")]
        keyring: bool,

        #[command(flatten)]
        polling: PollingArgs,
    },

    /// Remove a profile
    #[command(visible_alias = "rm")]
    Remove {
        /// Profile name
        name: String,
    },

    /// Set the default profile
    Default {
        /// Profile name
        name: String,
    },
}

/// Supported shells for completions
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
    Elvish,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_save_with_wait() {
        let cli = Cli::parse_from([
            "shipdash",
            "save",
            "--start-date",
            "2024-03-01",
            "--end-date",
            "2024-03-31",
            "--wait",
            "--max-attempts",
            "5",
        ]);
        let Commands::Save { range, wait } = cli.command else {
            panic!("expected save command");
        };
        assert_eq!(range.start_date.to_string(), "2024-03-01");
        assert!(wait.wait);
        assert_eq!(wait.polling.max_attempts, Some(5));
        assert_eq!(wait.polling.interval_ms, None);
    }

    #[test]
    fn test_rejects_zero_interval() {
        let result = Cli::try_parse_from(["shipdash", "job", "wait", "abc", "--interval-ms", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_bad_date() {
        let result = Cli::try_parse_from([
            "shipdash",
            "save",
            "--start-date",
            "03/01/2024",
            "--end-date",
            "2024-03-31",
        ]);
        assert!(result.is_err());
    }
}
