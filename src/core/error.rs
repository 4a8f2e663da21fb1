//! Error handling for groundwork
//!
//! This module provides the crate-level error type and user-friendly error
//! reporting for the CLI. The error system follows two principles:
//! 1. **Strongly-typed errors** for precise error handling in code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! Per-item failures have their own narrower types and never reach this
//! module: registry lookups fail with [`crate::resolvers::ResolveError`] and
//! consultations with [`crate::consult::ConsultError`]. Both are contained by
//! their batch and converted into "this one item failed" markers.
//!
//! # Examples
//!
//! ```rust,no_run
//! use groundwork::core::{ErrorContext, GroundworkError};
//!
//! let context = ErrorContext::new(GroundworkError::GitNotFound)
//!     .with_suggestion("Install git from https://git-scm.com/");
//! context.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for groundwork operations.
///
/// Each variant represents a failure that is meaningful at the level of a
/// whole command. Failures of individual dependencies or consultations are
/// reported through their own types and never abort a batch.
#[derive(Error, Debug)]
pub enum GroundworkError {
    /// Git operation failed during execution
    ///
    /// # Fields
    /// - `operation`: The git operation that failed (e.g., "clone", "fetch")
    /// - `stderr`: The error output from the git command
    #[error("Git operation failed: {operation}")]
    GitCommandError {
        /// The git operation that failed
        operation: String,
        /// The error output from the git command
        stderr: String,
    },

    /// Git executable not found in PATH
    #[error("Git is not installed or not found in PATH")]
    GitNotFound,

    /// Git repository clone failed
    #[error("Failed to clone repository: {url}")]
    GitCloneFailed {
        /// The repository URL that failed to clone
        url: String,
        /// The reason for the clone failure
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// The ecosystem identifier is not one of the supported set
    #[error("Unknown ecosystem: {name}")]
    UnknownEcosystem {
        /// The identifier that was supplied
        name: String,
    },

    /// The registry file could not be written
    #[error("Failed to persist resource registry at {path}")]
    RegistryWriteFailed {
        /// Location of the registry file
        path: String,
        /// Underlying reason
        reason: String,
    },

    /// Unit-of-work descriptor could not be read
    #[error("Invalid unit of work in {path}")]
    InvalidUnitOfWork {
        /// File the descriptor was read from
        path: String,
        /// Why it was rejected
        reason: String,
    },

    /// A prompt template is missing or failed to render
    #[error("Prompt template '{name}' failed: {reason}")]
    TemplateError {
        /// Template name in the asset map
        name: String,
        /// Rendering or lookup failure
        reason: String,
    },

    /// Generic error for cases not covered above
    #[error("{message}")]
    Other {
        /// The error message
        message: String,
    },
}

impl Clone for GroundworkError {
    fn clone(&self) -> Self {
        match self {
            Self::GitCommandError {
                operation,
                stderr,
            } => Self::GitCommandError {
                operation: operation.clone(),
                stderr: stderr.clone(),
            },
            Self::GitNotFound => Self::GitNotFound,
            Self::GitCloneFailed {
                url,
                reason,
            } => Self::GitCloneFailed {
                url: url.clone(),
                reason: reason.clone(),
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            Self::UnknownEcosystem {
                name,
            } => Self::UnknownEcosystem {
                name: name.clone(),
            },
            Self::RegistryWriteFailed {
                path,
                reason,
            } => Self::RegistryWriteFailed {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::InvalidUnitOfWork {
                path,
                reason,
            } => Self::InvalidUnitOfWork {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::TemplateError {
                name,
                reason,
            } => Self::TemplateError {
                name: name.clone(),
                reason: reason.clone(),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error wrapper carrying a user-facing suggestion and details.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: GroundworkError,
    /// Actionable next step, shown in green
    pub suggestion: Option<String>,
    /// Extra explanation, shown in yellow
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: GroundworkError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    ///
    /// - Error message: Red and bold
    /// - Details: Yellow
    /// - Suggestion: Green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// Recognizes [`GroundworkError`] variants, [`std::io::Error`] and
/// [`toml::de::Error`]; anything else is wrapped as [`GroundworkError::Other`]
/// with the full `anyhow` chain as the message.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(err) = error.downcast_ref::<GroundworkError>() {
        return create_error_context(err.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(GroundworkError::Other {
                    message: format!("{error:#}"),
                })
                .with_suggestion("Check ownership and permissions of the cache directory")
                .with_details("groundwork could not read or write a file it needs");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(GroundworkError::Other {
                    message: format!("{error:#}"),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(GroundworkError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax in ~/.groundwork/config.toml");
    }

    ErrorContext::new(GroundworkError::Other {
        message: format!("{error:#}"),
    })
}

fn create_error_context(error: GroundworkError) -> ErrorContext {
    match &error {
        GroundworkError::GitNotFound => ErrorContext::new(error)
            .with_suggestion("Install git from https://git-scm.com/ or your package manager (e.g., 'brew install git', 'apt install git')")
            .with_details("groundwork uses the system git to cache framework source repositories"),

        GroundworkError::GitCommandError { operation, .. } => {
            let suggestion = match operation.as_str() {
                op if op.contains("clone") => "Check the repository URL and your internet connection",
                op if op.contains("fetch") || op.contains("pull") => "Check your internet connection. Removing the checkout with 'groundwork cache clean' forces a fresh clone",
                op if op.contains("ls-remote") => "The remote may be unreachable or private; only public repositories are supported",
                _ => "Try running the git command manually for more details",
            };
            ErrorContext::new(error).with_suggestion(suggestion)
        }

        GroundworkError::GitCloneFailed { .. } => ErrorContext::new(error)
            .with_suggestion("Verify the repository is public and reachable")
            .with_details("Framework sources are cloned anonymously; authenticated remotes are not supported"),

        GroundworkError::ConfigError { .. } => ErrorContext::new(error)
            .with_suggestion("Check ~/.groundwork/config.toml or the file passed with --config"),

        GroundworkError::UnknownEcosystem { .. } => ErrorContext::new(error)
            .with_suggestion("Use one of: node, go, python, rust, ruby"),

        GroundworkError::RegistryWriteFailed { .. } => ErrorContext::new(error)
            .with_suggestion("Check free disk space and permissions of the cache directory"),

        GroundworkError::InvalidUnitOfWork { .. } => ErrorContext::new(error)
            .with_suggestion("The story file must be JSON with id, title, description, acceptance_criteria and tags"),

        GroundworkError::TemplateError { .. } => ErrorContext::new(error)
            .with_details("Prompt templates are rendered with Tera; check variable names and syntax"),

        _ => ErrorContext::new(error),
    }
}
