use crate::broadcast::filter::{compile_patterns, DiagnosticFilter};
use crate::config::{LiveConfig, PatternFilter, SeverityFilter};
use crate::error::{ConfigError, Result};

/// Validate and normalize a socket URL path.
///
/// The path must be absolute, must not be `/` itself, and must not contain
/// route metacharacters. A trailing slash is dropped.
pub fn normalize_socket_path(path: &str) -> Result<String, ConfigError> {
    let invalid = |hint: &str| ConfigError::InvalidPath {
        path: path.to_string(),
        hint: hint.to_string(),
    };

    if !path.starts_with('/') {
        return Err(invalid("Socket paths must start with '/' (e.g. \"/ws\")"));
    }

    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(invalid(
            "The socket path cannot be the site root; use a prefix such as \"/ws\"",
        ));
    }

    if trimmed.contains("//") {
        return Err(invalid("Socket paths cannot contain empty segments"));
    }

    if let Some(c) = trimmed
        .chars()
        .find(|c| matches!(c, '{' | '}' | '*' | '?' | '#' | ':') || c.is_whitespace())
    {
        return Err(invalid(&format!("Invalid character '{}' in socket path", c)));
    }

    Ok(trimmed.to_string())
}

impl LiveConfig {
    /// Validate configuration for logical consistency.
    ///
    /// Transport resolution is not checked here; it happens when the server
    /// starts.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "host".to_string(),
                value: self.host.clone(),
                hint: "Provide an interface to bind, e.g. \"127.0.0.1\"".to_string(),
            }
            .into());
        }

        if self.server_type().is_some_and(|kind| kind.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "webSocketServer.type".to_string(),
                value: String::new(),
                hint: "Use \"ws\" or \"sockjs\"".to_string(),
            }
            .into());
        }

        normalize_socket_path(self.socket_path())?;

        DiagnosticFilter::from_overlay(&self.client.overlay)?;
        if let Some(SeverityFilter::Patterns(PatternFilter { include, exclude })) = self
            .client
            .overlay
            .filters()
            .map(|filters| &filters.runtime_errors)
        {
            compile_patterns("runtimeErrors", "include", include)?;
            compile_patterns("runtimeErrors", "exclude", exclude)?;
        }

        Ok(())
    }
}
