//! Error types for shipdash
//!
//! Structured CLI errors with suggestions, printed as cargo-style diagnostics.

use colored::Colorize;
use shipdash_core::{ConfigError, CoreError};
use thiserror::Error;

/// Cargo-style diagnostic formatter for CLI errors.
///
/// Produces structured output like:
/// ```text
/// error: Profile 'prod' not found
///
///   tip: List available profiles: shipdash profile list
/// ```
pub struct CliDiagnostic {
    message: String,
    tips: Vec<String>,
}

impl CliDiagnostic {
    pub fn error(message: &str) -> Self {
        Self {
            message: message.to_string(),
            tips: Vec::new(),
        }
    }

    pub fn tip(mut self, text: &str) -> Self {
        self.tips.push(text.to_string());
        self
    }

    /// Print the diagnostic to stderr with colored formatting.
    pub fn print(&self) {
        eprint!("{}{}", "error".red().bold(), ": ".bold());
        eprintln!("{}", self.message);

        if !self.tips.is_empty() {
            eprintln!();
        }
        for tip in &self.tips {
            eprint!("  {}{}", "tip".yellow().bold(), ": ".bold());
            eprintln!("{}", tip);
        }
    }
}

/// Main error type for the shipdash application
#[derive(Error, Debug)]
pub enum ShipdashError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("No profile configured and no --url given")]
    NoProfileConfigured,

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("API error: {message}")]
    ApiError { message: String },

    #[error("Connection error: {message}")]
    ConnectionError { message: String },

    #[error("Timeout: {message}")]
    Timeout { message: String },

    #[error("Job failed: {message}")]
    JobFailed { message: String },

    #[error("Interrupted while waiting for job {id}")]
    Interrupted { id: String },

    #[error("Output formatting error: {message}")]
    OutputError { message: String },
}

/// Result type for shipdash operations
pub type Result<T> = std::result::Result<T, ShipdashError>;

impl ShipdashError {
    /// Get helpful suggestions for resolving this error
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            ShipdashError::ProfileNotFound { name } => vec![
                "List available profiles: shipdash profile list".to_string(),
                format!("Create profile '{}': shipdash profile set {} --url <url>", name, name),
            ],
            ShipdashError::NoProfileConfigured => vec![
                "Create a profile: shipdash profile set <name> --url <url>".to_string(),
                "Or pass the backend directly: shipdash --url <url> <command>".to_string(),
            ],
            ShipdashError::AuthenticationFailed { .. } => vec![
                "Check the profile token: shipdash profile show <profile>".to_string(),
                "Set SHIPDASH_API_TOKEN to override the stored token".to_string(),
            ],
            ShipdashError::ConnectionError { .. } => vec![
                "Check that the backend is running: shipdash health".to_string(),
                "Verify the backend URL: shipdash profile show <profile>".to_string(),
            ],
            ShipdashError::ApiError { message } if message.contains("404") => vec![
                "Verify the job ID is correct".to_string(),
                "Check that you're using the correct profile".to_string(),
            ],
            ShipdashError::Timeout { .. } => vec![
                "Keep following the job: shipdash job wait <id>".to_string(),
                "Raise the limit with --max-attempts or drop it to wait indefinitely".to_string(),
            ],
            ShipdashError::Interrupted { id } => vec![format!(
                "The job keeps running on the backend; resume with: shipdash job wait {}",
                id
            )],
            ShipdashError::InvalidInput { .. } => {
                vec!["Check the command syntax: shipdash <command> --help".to_string()]
            }
            _ => vec![],
        }
    }

    /// Process exit code; 130 mirrors a shell's SIGINT status
    pub fn exit_code(&self) -> i32 {
        match self {
            ShipdashError::Interrupted { .. } => 130,
            _ => 1,
        }
    }

    /// Print a cargo-style diagnostic to stderr
    pub fn print_diagnostic(&self) {
        let diag = self
            .suggestions()
            .iter()
            .fold(CliDiagnostic::error(&self.to_string()), |diag, tip| {
                diag.tip(tip)
            });
        diag.print();
    }
}

impl From<CoreError> for ShipdashError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Request(e) if e.is_connect() || e.is_timeout() => {
                ShipdashError::ConnectionError {
                    message: e.to_string(),
                }
            }
            CoreError::Http { status: 401 | 403, body } => {
                ShipdashError::AuthenticationFailed { message: body }
            }
            CoreError::Validation(message) => ShipdashError::InvalidInput { message },
            CoreError::Config(e) => ShipdashError::from(e),
            CoreError::OperationFailed(message) => ShipdashError::JobFailed { message },
            CoreError::AttemptsExhausted(attempts) => ShipdashError::Timeout {
                message: format!("job did not finish after {} status checks", attempts),
            },
            other => ShipdashError::ApiError {
                message: other.to_string(),
            },
        }
    }
}

impl From<ConfigError> for ShipdashError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ProfileNotFound { name } => ShipdashError::ProfileNotFound { name },
            ConfigError::NoProfiles { .. } => ShipdashError::NoProfileConfigured,
            other => ShipdashError::Config(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ShipdashError {
    fn from(err: serde_json::Error) -> Self {
        ShipdashError::OutputError {
            message: format!("JSON error: {}", err),
        }
    }
}

impl From<serde_yaml::Error> for ShipdashError {
    fn from(err: serde_yaml::Error) -> Self {
        ShipdashError::OutputError {
            message: format!("YAML error: {}", err),
        }
    }
}
