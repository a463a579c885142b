//! Live server configuration with multi-source loading.
//!
//! Merges settings from CLI overrides, environment variables, and
//! `fob-live.config.json`. Priority: CLI > Environment > File > Defaults

mod defaults;
mod loading;
mod types;
mod validation;

use serde::{Deserialize, Serialize};

pub use defaults::*;
pub use loading::ConfigOverrides;
pub use types::*;
pub use validation::*;

/// Live server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LiveConfig {
    /// Interface the HTTP listener binds to
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP port (0 picks an ephemeral port)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Announce hot module replacement to clients
    #[serde(default = "default_true")]
    pub hot: bool,

    /// Announce full-page live reload to clients
    #[serde(default = "default_true")]
    pub live_reload: bool,

    /// Browser runtime options
    #[serde(default)]
    pub client: ClientOptions,

    /// Server-side transport and its options. When unset, the server side
    /// follows `client.transport`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_socket_server: Option<WebSocketServerSetting>,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            hot: true,
            live_reload: true,
            client: ClientOptions::default(),
            web_socket_server: None,
        }
    }
}

impl LiveConfig {
    /// Transport descriptor the client side resolves from:
    /// `client.transport`, falling back to the webSocketServer type.
    pub fn client_transport(&self) -> &str {
        self.client
            .transport
            .as_deref()
            .or_else(|| self.server_type())
            .unwrap_or(DEFAULT_SERVER_TYPE)
    }

    /// Explicitly configured server-side transport, if any.
    pub fn server_type(&self) -> Option<&str> {
        self.web_socket_server
            .as_ref()
            .and_then(WebSocketServerSetting::type_name)
    }

    /// Socket path as configured (not yet normalized).
    pub fn socket_path(&self) -> &str {
        self.web_socket_server
            .as_ref()
            .map(WebSocketServerSetting::path)
            .unwrap_or(DEFAULT_SOCKET_PATH)
    }

    /// Connection options announced to clients.
    pub fn socket_options(&self) -> Option<&WebSocketServerOptions> {
        self.web_socket_server
            .as_ref()
            .and_then(WebSocketServerSetting::options)
    }

    /// Generate example fob-live.config.json content.
    pub fn example_config() -> String {
        let example = Self {
            web_socket_server: Some(WebSocketServerSetting::Detailed(WebSocketServerDetails {
                kind: Some("sockjs".to_string()),
                options: WebSocketServerOptions {
                    host: Some("localhost".to_string()),
                    port: None,
                    path: Some("/__fob_live__".to_string()),
                },
            })),
            client: ClientOptions {
                overlay: OverlaySetting::Filtered(OverlayFilters {
                    warnings: SeverityFilter::Patterns(PatternFilter {
                        include: Vec::new(),
                        exclude: vec!["DEP0\\d+".to_string()],
                    }),
                    ..OverlayFilters::default()
                }),
                ..ClientOptions::default()
            },
            ..Self::default()
        };

        serde_json::to_string_pretty(&example)
            .unwrap_or_else(|_| "{}".to_string())
    }
}
