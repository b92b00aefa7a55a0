//! Error types for the Doctorino desktop host.
//!
//! Startup errors are fatal and end the application after a dialog; runtime
//! errors are logged and surfaced to the window; bridge errors are returned to
//! the caller as JSON-RPC errors.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for the host.
#[derive(Debug, Error)]
pub enum DoctorinoError {
    // Startup errors
    #[error("Backend entry point not found: {0}")]
    BackendEntryNotFound(PathBuf),

    #[error("No Python interpreter found (searched {} locations and PATH)", searched.len())]
    InterpreterNotFound { searched: Vec<PathBuf> },

    #[error("Failed to spawn backend with {program:?}: {message}")]
    SpawnFailed {
        program: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Backend at {url} was not healthy after {attempts} attempts")]
    HealthCheckTimeout { url: String, attempts: u32 },

    #[error("Backend exited before becoming ready (exit code {code:?})")]
    BackendExited { code: Option<i32> },

    #[error("Invalid supervisor state: cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    #[error("Process termination failed for pid {pid}: {message}")]
    TerminateFailed { pid: u32, message: String },

    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

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

    #[error("Dependency installation failed: {message}")]
    DependencyInstallFailed { message: String },

    // Bridge errors
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {message}")]
    InvalidParams { message: String },

    #[error("Dialog failed: {message}")]
    Dialog { message: String },

    // Window errors
    #[error("Window error: {message}")]
    Window { message: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for host operations.
pub type Result<T> = std::result::Result<T, DoctorinoError>;

impl From<std::io::Error> for DoctorinoError {
    fn from(err: std::io::Error) -> Self {
        DoctorinoError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for DoctorinoError {
    fn from(err: serde_json::Error) -> Self {
        DoctorinoError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for DoctorinoError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DoctorinoError::Timeout(Duration::from_secs(0))
        } else {
            DoctorinoError::Network {
                message: err.to_string(),
                source: Some(err),
            }
        }
    }
}

impl DoctorinoError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        DoctorinoError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Whether this error ends the application during startup.
    pub fn is_fatal_startup(&self) -> bool {
        matches!(
            self,
            DoctorinoError::BackendEntryNotFound(_)
                | DoctorinoError::InterpreterNotFound { .. }
                | DoctorinoError::SpawnFailed { .. }
                | DoctorinoError::HealthCheckTimeout { .. }
                | DoctorinoError::BackendExited { .. }
                | DoctorinoError::Config { .. }
        )
    }

    /// Convert to a JSON-RPC error code.
    ///
    /// - -32601: Method not found
    /// - -32602: Invalid params
    /// - -32000: Network/connectivity error
    /// - -32603: Internal error
    pub fn to_rpc_error_code(&self) -> i32 {
        match self {
            DoctorinoError::MethodNotFound(_) => -32601,
            DoctorinoError::InvalidParams { .. } => -32602,
            DoctorinoError::Network { .. } | DoctorinoError::Timeout(_) => -32000,
            _ => -32603,
        }
    }
}
