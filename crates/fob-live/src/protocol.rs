//! Wire messages sent from the live server to browser clients.
//!
//! Every message is a JSON object tagged by `type`:
//!
//! ```json
//! {"type": "invalid"}
//! {"type": "hash", "data": "3f2a..."}
//! {"type": "ok"}
//! {"type": "warnings", "data": [...], "params": {"hasErrors": false, "hasWarnings": true}}
//! {"type": "errors", "data": [...], "params": {"hasErrors": true, "hasWarnings": false}}
//! ```
//!
//! A finished build cycle is always `hash` followed by exactly one of `ok`,
//! `warnings` or `errors`.

use crate::config::{ClientLogLevel, OverlaySetting};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Server-to-client message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Hot module replacement is enabled
    Hot,
    /// Full-page reload is enabled
    LiveReload,
    /// Log level for the browser runtime
    Logging { data: ClientLogLevel },
    /// Overlay configuration for the browser runtime
    Overlay { data: OverlaySetting },
    /// A rebuild started
    Invalid,
    /// Content hash of the finished build
    Hash { data: String },
    /// Build finished cleanly
    Ok,
    /// Build finished with warnings only
    Warnings {
        data: Vec<Diagnostic>,
        params: StatusFlags,
    },
    /// Build finished with errors
    Errors {
        data: Vec<Diagnostic>,
        params: StatusFlags,
    },
}

impl ServerMessage {
    /// Serialize once for fan-out to many clients.
    pub fn to_frame(&self) -> Arc<str> {
        // Infallible for these types.
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"type":"invalid"}"#.to_string())
            .into()
    }

    /// Whether this message ends a build cycle.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ServerMessage::Ok | ServerMessage::Warnings { .. } | ServerMessage::Errors { .. }
        )
    }
}

/// Badge state computed from the unfiltered diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusFlags {
    pub has_errors: bool,
    pub has_warnings: bool,
}

/// A single compiler error or warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<SourceLocation>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            file: None,
            loc: None,
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_loc(mut self, line: u32, column: u32) -> Self {
        self.loc = Some(SourceLocation { line, column });
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}
