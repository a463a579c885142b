use serde::{Deserialize, Serialize};

use crate::config::defaults::{default_true, DEFAULT_SOCKET_PATH};

/// Browser-side options that shape the injected bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClientOptions {
    /// Transport name ("ws", "sockjs") or path to a client runtime.
    /// Defaults to the webSocketServer type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<String>,

    /// Error overlay activation and filtering
    #[serde(default)]
    pub overlay: OverlaySetting,

    /// Inject the transport runtime at all
    #[serde(default = "default_true")]
    pub need_client_entry: bool,

    /// Inject the hot-update runtime
    #[serde(default = "default_true")]
    pub hot_entry: bool,

    /// Log level of the browser runtime
    #[serde(default)]
    pub logging: ClientLogLevel,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            transport: None,
            overlay: OverlaySetting::default(),
            need_client_entry: true,
            hot_entry: true,
            logging: ClientLogLevel::default(),
        }
    }
}

/// `client.overlay`: either a plain switch or per-severity filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OverlaySetting {
    Enabled(bool),
    Filtered(OverlayFilters),
}

impl Default for OverlaySetting {
    fn default() -> Self {
        OverlaySetting::Enabled(true)
    }
}

impl OverlaySetting {
    /// Whether the overlay runtime should be injected at all.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, OverlaySetting::Enabled(false))
    }

    /// Filters to apply to transmitted diagnostics, if any were configured.
    pub fn filters(&self) -> Option<&OverlayFilters> {
        match self {
            OverlaySetting::Filtered(filters) => Some(filters),
            OverlaySetting::Enabled(_) => None,
        }
    }
}

/// Per-severity overlay filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OverlayFilters {
    #[serde(default)]
    pub errors: SeverityFilter,

    #[serde(default)]
    pub warnings: SeverityFilter,

    /// Only consumed by the browser runtime
    #[serde(default)]
    pub runtime_errors: SeverityFilter,
}

/// Filter for one severity: on/off, or regular-expression patterns
/// matched against the diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeverityFilter {
    Enabled(bool),
    Patterns(PatternFilter),
}

impl Default for SeverityFilter {
    fn default() -> Self {
        SeverityFilter::Enabled(true)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternFilter {
    /// Keep only messages matching one of these (empty keeps all)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,

    /// Drop messages matching any of these
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

/// Log level of the injected browser runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientLogLevel {
    None,
    Error,
    Warn,
    #[default]
    Info,
    Log,
    Verbose,
}

impl ClientLogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientLogLevel::None => "none",
            ClientLogLevel::Error => "error",
            ClientLogLevel::Warn => "warn",
            ClientLogLevel::Info => "info",
            ClientLogLevel::Log => "log",
            ClientLogLevel::Verbose => "verbose",
        }
    }
}

/// `webSocketServer`: a transport name, or a name plus options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WebSocketServerSetting {
    Name(String),
    Detailed(WebSocketServerDetails),
}

impl WebSocketServerSetting {
    /// Name of the server-side transport implementation, if given.
    pub fn type_name(&self) -> Option<&str> {
        match self {
            WebSocketServerSetting::Name(name) => Some(name.as_str()),
            WebSocketServerSetting::Detailed(details) => details.kind.as_deref(),
        }
    }

    /// Options, when configured in detailed form.
    pub fn options(&self) -> Option<&WebSocketServerOptions> {
        match self {
            WebSocketServerSetting::Name(_) => None,
            WebSocketServerSetting::Detailed(details) => Some(&details.options),
        }
    }

    /// URL path the socket server binds to.
    pub fn path(&self) -> &str {
        self.options()
            .and_then(|options| options.path.as_deref())
            .unwrap_or(DEFAULT_SOCKET_PATH)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebSocketServerDetails {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default)]
    pub options: WebSocketServerOptions,
}

/// Connection options shared by the server and the client bootstrap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebSocketServerOptions {
    /// Hostname clients connect to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Port clients connect to (defaults to the HTTP port)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// URL path prefix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}
