//! Error handling for the live-update channel.
//!
//! The hierarchy mirrors how failures are treated at runtime:
//! - **`ConfigError`** is fatal to server start and is raised before any
//!   socket is opened (bad transport, path collision, invalid options).
//! - **`TransportError`** describes a single client failing. It is recovered
//!   locally by deregistering that client and never reaches other clients.
//! - **`CompilerSignalError`** describes malformed build stats. It is logged
//!   and the build cycle stays open until the next valid signal.
//!
//! Everything converts into [`LiveError`] via `#[from]`.
//!
//! # Example
//!
//! ```rust,no_run
//! use fob_live::error::{Result, ResultExt};
//! use std::path::Path;
//!
//! fn read_runtime(path: &Path) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .with_path(path)
//!         .with_hint("Point client.transport at an existing file")
//! }
//! ```

use crate::socket::ClientId;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum LiveError {
    /// Configuration-related errors (bad transport, colliding paths, etc.)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A single client connection failed
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The compiler handed over unusable stats
    #[error("Compiler signal error: {0}")]
    Compiler(#[from] CompilerSignalError),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from listener or file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP server errors
    #[error("Server error: {0}")]
    Server(String),

    /// File watching errors
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

/// Configuration errors. All of these prevent the server from starting.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `client.transport` could not be resolved to an implementation
    #[error("client.transport must be a string denoting a supported transport name (\"ws\", \"sockjs\") or a path to a valid transport implementation, got: {value}\n\nHint: {hint}")]
    InvalidTransport {
        /// The configured value
        value: String,
        /// Why resolution failed
        hint: String,
    },

    /// Two socket servers tried to claim the same path on one HTTP host
    #[error("Socket path '{path}' collides with already mounted path '{existing}'\n\nHint: Give each socket server its own webSocketServer.options.path")]
    PathCollision {
        /// Path that was being mounted
        path: String,
        /// Path already mounted on the host
        existing: String,
    },

    /// Socket path is not a usable URL path prefix
    #[error("Invalid socket path '{path}'\n\nHint: {hint}")]
    InvalidPath {
        /// The offending path
        path: String,
        /// What a valid path looks like
        hint: String,
    },

    /// Invalid value for a configuration option
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The invalid value
        value: String,
        /// Helpful hint for correct values
        hint: String,
    },

    /// Config file doesn't exist at the given location
    #[error("Config file not found: {}\n\nHint: Create a fob-live.config.json file or pass --config <path>", .0.display())]
    NotFound(PathBuf),

    /// I/O error while reading config
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of an individual client connection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The socket server is closing or closed
    #[error("socket server is closed")]
    ServerClosed,

    /// The client is no longer registered (already disconnected)
    #[error("client {0} is no longer connected")]
    ClientGone(ClientId),
}

/// Malformed build stats received from the compiler.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompilerSignalError {
    /// Stats arrived without a content hash
    #[error("build stats are missing a hash")]
    MissingHash,

    /// Stats could not be interpreted
    #[error("malformed build stats: {0}")]
    Malformed(String),
}

/// Result type alias using `LiveError` as the default error type.
pub type Result<T, E = LiveError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Add a file path to the error context.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    /// Add a helpful hint to the error context.
    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T>;

    /// Prefix the error with a custom message.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<LiveError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| {
            let err: LiveError = e.into();
            match err {
                LiveError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                    LiveError::FileNotFound(path.as_ref().to_path_buf())
                }
                other => other,
            }
        })
    }

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: LiveError = e.into();
            LiveError::Custom(format!("{}\n\nHint: {}", err, hint))
        })
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: LiveError = e.into();
            LiveError::Custom(format!("{}: {}", msg, err))
        })
    }
}

/// Convert a `LiveError` into a miette report for the binary's exit path.
pub fn live_error_to_miette(err: LiveError) -> miette::Report {
    match err {
        LiveError::Config(e) => miette::miette!("Configuration error: {}", e),
        other => miette::miette!("{}", other),
    }
}
