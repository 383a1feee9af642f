//! Error types for the relight supervisor.
//!
//! Variants follow the failure taxonomy of the supervisor: spawn and hook
//! failures propagate to the caller, termination failures are recovered
//! locally and only ever logged as advisory.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for supervisor operations.
#[derive(Debug, Error)]
pub enum ShellError {
    /// The shell executable could not be spawned (missing, not executable).
    /// Surfaced synchronously to the `start()` caller and never retried.
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Signal delivery or tree termination failed. Constructed by the
    /// platform helpers; callers on the stop path swallow it and log an
    /// advisory line instead of failing.
    #[error("Failed to terminate process {pid}: {message}")]
    Terminate { pid: u32, message: String },

    /// A user-supplied before-startup hook or barrier reaction failed.
    /// Propagated to the caller of the triggering event.
    #[error("Startup hook failed: {message}")]
    Hook { message: String },

    /// The dev-server refused or failed to deliver a message.
    #[error("Dev server error: {message}")]
    DevServer { message: String },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },
}

/// Result type alias for supervisor operations.
pub type Result<T> = std::result::Result<T, ShellError>;

impl From<std::io::Error> for ShellError {
    fn from(err: std::io::Error) -> Self {
        ShellError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for ShellError {
    fn from(err: serde_json::Error) -> Self {
        ShellError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl ShellError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        ShellError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a hook error from any displayable cause.
    pub fn hook(cause: impl std::fmt::Display) -> Self {
        ShellError::Hook {
            message: cause.to_string(),
        }
    }

    /// Whether this error is advisory on the stop path (never propagated
    /// as a failure of `start()`/`stop()`).
    pub fn is_advisory(&self) -> bool {
        matches!(self, ShellError::Terminate { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ShellError::Terminate {
            pid: 42,
            message: "no such process".into(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to terminate process 42: no such process"
        );
    }

    #[test]
    fn test_spawn_error_carries_source() {
        let io = std::io::Error::from(std::io::ErrorKind::NotFound);
        let err = ShellError::Spawn {
            program: "electron".into(),
            source: io,
        };
        assert!(err.to_string().starts_with("Failed to spawn electron"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_advisory_classification() {
        assert!(ShellError::Terminate {
            pid: 1,
            message: String::new()
        }
        .is_advisory());
        assert!(!ShellError::Config {
            message: String::new()
        }
        .is_advisory());
    }
}
