//! Client bootstrap entries.
//!
//! Decides which runtime modules are prepended to the user's entry points so
//! the browser connects back to the live server:
//!
//! 1. the transport runtime, with connection settings in its query string
//! 2. the hot-update runtime (`client.hotEntry`)
//! 3. the error overlay (`client.overlay`)

use crate::config::{ClientLogLevel, LiveConfig, OverlaySetting};
use crate::error::Result;
use crate::transport::{ClientRuntime, ResolvedTransport};
use serde::Serialize;
use std::fmt;
use urlencoding::encode;

/// Hot-update runtime module.
pub const HOT_RUNTIME: &str = "@fob/live/hot/dev-server.js";

/// Error overlay module.
pub const OVERLAY_RUNTIME: &str = "@fob/live/client/overlay.js";

/// Hostname meaning "whatever host served the page".
pub const ANY_HOST: &str = "0.0.0.0";

/// Where the browser runtime connects to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionTarget {
    /// URL scheme with trailing colon, e.g. `ws:`
    pub protocol: String,
    pub hostname: String,
    pub port: u16,
    pub pathname: String,
}

/// Everything that shapes the bootstrap entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientFlags {
    pub need_client_entry: bool,
    pub hot_entry: bool,
    pub overlay: OverlaySetting,
    pub client_runtime: ClientRuntime,
    pub logging: ClientLogLevel,
    pub target: ConnectionTarget,
}

impl ClientFlags {
    /// Derive flags from configuration, the resolved transport and the port
    /// the HTTP host actually listens on.
    pub fn from_config(config: &LiveConfig, transport: &ResolvedTransport, http_port: u16) -> Result<Self> {
        let options = config.socket_options();
        let pathname = crate::config::normalize_socket_path(config.socket_path())?;

        Ok(Self {
            need_client_entry: config.client.need_client_entry,
            hot_entry: config.client.hot_entry,
            overlay: config.client.overlay.clone(),
            client_runtime: transport.client_runtime.clone(),
            logging: config.client.logging,
            target: ConnectionTarget {
                protocol: format!("{}:", transport.server.scheme()),
                hostname: options
                    .and_then(|o| o.host.clone())
                    .unwrap_or_else(|| ANY_HOST.to_string()),
                port: options.and_then(|o| o.port).unwrap_or(http_port),
                pathname,
            },
        })
    }
}

/// Role of a bootstrap entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryKind {
    Transport,
    HotRuntime,
    Overlay,
}

/// One module to prepend, including its query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootstrapEntry {
    pub kind: EntryKind,
    pub module: String,
}

impl BootstrapEntry {
    fn new(kind: EntryKind, module: impl Into<String>) -> Self {
        Self {
            kind,
            module: module.into(),
        }
    }

    /// Module specifier without the query string.
    pub fn specifier(&self) -> &str {
        strip_query(&self.module)
    }
}

impl fmt::Display for BootstrapEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.module)
    }
}

/// Entries to prepend, in injection order. Empty when the client entry is
/// disabled.
pub fn compute_entries(flags: &ClientFlags) -> Vec<BootstrapEntry> {
    if !flags.need_client_entry {
        return Vec::new();
    }

    let mut entries = vec![BootstrapEntry::new(
        EntryKind::Transport,
        format!("{}?{}", flags.client_runtime, connection_query(flags)),
    )];

    if flags.hot_entry {
        entries.push(BootstrapEntry::new(EntryKind::HotRuntime, HOT_RUNTIME));
    }

    if flags.overlay.is_enabled() {
        let options = serde_json::to_string(&flags.overlay).unwrap_or_else(|_| "true".to_string());
        entries.push(BootstrapEntry::new(
            EntryKind::Overlay,
            format!("{}?options={}", OVERLAY_RUNTIME, encode(&options)),
        ));
    }

    entries
}

/// Prepend bootstrap entries to the user's entry list.
///
/// A runtime the user already lists (query strings ignored) is not injected
/// a second time, and user entries keep their order.
pub fn prepend_entries(flags: &ClientFlags, user_entries: &[String]) -> Vec<String> {
    let listed = |specifier: &str| {
        user_entries
            .iter()
            .any(|entry| strip_query(entry) == specifier)
    };

    compute_entries(flags)
        .into_iter()
        .filter(|entry| !listed(entry.specifier()))
        .map(|entry| entry.module)
        .chain(user_entries.iter().cloned())
        .collect()
}

fn connection_query(flags: &ClientFlags) -> String {
    let target = &flags.target;
    let port = target.port.to_string();
    [
        ("protocol", target.protocol.as_str()),
        ("hostname", target.hostname.as_str()),
        ("port", port.as_str()),
        ("pathname", target.pathname.as_str()),
        ("logging", flags.logging.as_str()),
    ]
    .iter()
    .map(|(key, value)| format!("{}={}", key, encode(value)))
    .collect::<Vec<_>>()
    .join("&")
}

fn strip_query(module: &str) -> &str {
    module.split_once('?').map_or(module, |(specifier, _)| specifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OverlayFilters, PatternFilter, SeverityFilter};
    use crate::transport::{SOCKJS_CLIENT_RUNTIME, WS_CLIENT_RUNTIME};

    fn flags() -> ClientFlags {
        ClientFlags {
            need_client_entry: true,
            hot_entry: true,
            overlay: OverlaySetting::Enabled(true),
            client_runtime: ClientRuntime::new(WS_CLIENT_RUNTIME),
            logging: ClientLogLevel::Info,
            target: ConnectionTarget {
                protocol: "ws:".to_string(),
                hostname: ANY_HOST.to_string(),
                port: 8080,
                pathname: "/ws".to_string(),
            },
        }
    }

    #[test]
    fn test_full_bootstrap_order() {
        let entries = compute_entries(&flags());
        let kinds: Vec<_> = entries.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![EntryKind::Transport, EntryKind::HotRuntime, EntryKind::Overlay]
        );

        assert_eq!(
            entries[0].module,
            format!(
                "{}?protocol=ws%3A&hostname=0.0.0.0&port=8080&pathname=%2Fws&logging=info",
                WS_CLIENT_RUNTIME
            )
        );
        assert_eq!(entries[1].module, HOT_RUNTIME);
        assert_eq!(entries[2].module, format!("{}?options=true", OVERLAY_RUNTIME));
    }

    #[test]
    fn test_need_client_entry_false_injects_nothing() {
        let flags = ClientFlags {
            need_client_entry: false,
            ..flags()
        };
        assert!(compute_entries(&flags).is_empty());

        let user = vec!["./src/main.js".to_string()];
        assert_eq!(prepend_entries(&flags, &user), user);
    }

    #[test]
    fn test_hot_entry_false_skips_hot_runtime() {
        let flags = ClientFlags {
            hot_entry: false,
            ..flags()
        };
        let entries = compute_entries(&flags);
        assert!(entries.iter().all(|e| e.kind != EntryKind::HotRuntime));
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_overlay_disabled_and_filtered() {
        let disabled = ClientFlags {
            overlay: OverlaySetting::Enabled(false),
            ..flags()
        };
        assert!(compute_entries(&disabled)
            .iter()
            .all(|e| e.kind != EntryKind::Overlay));

        let filtered = ClientFlags {
            overlay: OverlaySetting::Filtered(OverlayFilters {
                warnings: SeverityFilter::Patterns(PatternFilter {
                    include: vec![],
                    exclude: vec!["x".to_string()],
                }),
                ..OverlayFilters::default()
            }),
            ..flags()
        };
        let overlay = compute_entries(&filtered).pop().unwrap();
        assert_eq!(overlay.kind, EntryKind::Overlay);
        assert_eq!(overlay.specifier(), OVERLAY_RUNTIME);
        assert!(overlay.module.contains("%22exclude%22"));
    }

    #[test]
    fn test_runtime_follows_transport() {
        let flags = ClientFlags {
            client_runtime: ClientRuntime::new(SOCKJS_CLIENT_RUNTIME),
            ..flags()
        };
        assert_eq!(compute_entries(&flags)[0].specifier(), SOCKJS_CLIENT_RUNTIME);
    }

    #[test]
    fn test_prepend_skips_user_listed_runtime() {
        let user = vec![
            format!("{}?reload=true", HOT_RUNTIME),
            "./src/index.js".to_string(),
        ];
        let merged = prepend_entries(&flags(), &user);

        assert_eq!(merged.len(), 4);
        assert!(merged[0].starts_with(WS_CLIENT_RUNTIME));
        assert!(merged[1].starts_with(OVERLAY_RUNTIME));
        assert_eq!(&merged[2..], &user[..]);
    }
}
