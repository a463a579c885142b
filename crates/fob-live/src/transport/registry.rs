use super::{
    ClientRuntime, ResolvedTransport, SockJsTransport, Transport, TransportDescriptor,
    WebSocketTransport, WS,
};
use crate::error::ConfigError;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Module extensions accepted for a client runtime given by path.
const RUNTIME_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "ts", "mts"];

/// Named transports plus the rule for transports given by path.
///
/// A path names only the browser runtime; its server side is the transport
/// registered under `path_server` (plain WebSocket unless changed).
#[derive(Clone)]
pub struct TransportRegistry {
    transports: IndexMap<String, Arc<dyn Transport>>,
    path_server: String,
}

impl Default for TransportRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TransportRegistry {
    /// Registry with the `ws` and `sockjs` transports.
    pub fn builtin() -> Self {
        let mut registry = Self {
            transports: IndexMap::new(),
            path_server: WS.to_string(),
        };
        registry.register(Arc::new(WebSocketTransport));
        registry.register(Arc::new(SockJsTransport));
        registry
    }

    /// Add or replace a named transport.
    pub fn register(&mut self, transport: Arc<dyn Transport>) {
        self.transports
            .insert(transport.name().to_string(), transport);
    }

    /// Server side used for transports given by path.
    pub fn with_path_server(mut self, name: impl Into<String>) -> Self {
        self.path_server = name.into();
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.transports.keys().map(String::as_str).collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Transport>> {
        self.transports.get(name).cloned()
    }

    /// Resolve a descriptor to a server implementation and client runtime.
    ///
    /// Known names map to their built-in. Any other string is taken as a
    /// path to a client runtime module. Implementations are accepted after a
    /// sanity check.
    pub fn resolve(&self, descriptor: &TransportDescriptor) -> Result<ResolvedTransport, ConfigError> {
        match descriptor {
            TransportDescriptor::Named(value) => match self.get(value) {
                Some(server) => Ok(ResolvedTransport {
                    client_runtime: server.client_runtime(),
                    server,
                }),
                None => self.resolve_path(value),
            },
            TransportDescriptor::Implementation(transport) => {
                validate_implementation(descriptor, transport)?;
                Ok(ResolvedTransport {
                    server: Arc::clone(transport),
                    client_runtime: transport.client_runtime(),
                })
            }
        }
    }

    /// Look up the server side named by `webSocketServer.type`.
    pub fn resolve_server(&self, name: &str) -> Result<Arc<dyn Transport>, ConfigError> {
        self.get(name).ok_or_else(|| ConfigError::InvalidValue {
            field: "webSocketServer.type".to_string(),
            value: name.to_string(),
            hint: format!("Supported servers: {}", self.names().join(", ")),
        })
    }

    fn resolve_path(&self, value: &str) -> Result<ResolvedTransport, ConfigError> {
        let invalid = |hint: String| ConfigError::InvalidTransport {
            value: value.to_string(),
            hint,
        };

        if value.trim().is_empty() {
            return Err(invalid("The transport name is empty".to_string()));
        }

        let runtime = runtime_file(Path::new(value)).map_err(invalid)?;

        let contents = std::fs::read(&runtime)
            .map_err(|e| invalid(format!("Cannot read {}: {}", runtime.display(), e)))?;
        if contents.iter().all(u8::is_ascii_whitespace) {
            return Err(invalid(format!("{} is empty", runtime.display())));
        }

        let server = self.get(&self.path_server).ok_or_else(|| {
            invalid(format!(
                "No server transport named '{}' is registered for runtime paths",
                self.path_server
            ))
        })?;

        let runtime = runtime.canonicalize().unwrap_or(runtime);
        tracing::debug!(
            runtime = %runtime.display(),
            server = server.name(),
            "resolved transport from path"
        );

        Ok(ResolvedTransport {
            server,
            client_runtime: ClientRuntime::new(runtime.to_string_lossy()),
        })
    }
}

/// Locate the runtime module for a path: the file itself, or `index.js`
/// inside a directory.
fn runtime_file(path: &Path) -> Result<PathBuf, String> {
    let file = if path.is_dir() {
        let index = path.join("index.js");
        if !index.is_file() {
            return Err(format!("Directory {} has no index.js", path.display()));
        }
        index
    } else if path.is_file() {
        path.to_path_buf()
    } else {
        return Err(format!(
            "Not a built-in transport, and no transport implementation exists at {}",
            path.display()
        ));
    };

    let supported = file
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| RUNTIME_EXTENSIONS.contains(&ext));
    if !supported {
        return Err(format!(
            "{} is not a JavaScript or TypeScript module (expected one of: {})",
            file.display(),
            RUNTIME_EXTENSIONS.join(", ")
        ));
    }

    Ok(file)
}

fn validate_implementation(
    descriptor: &TransportDescriptor,
    transport: &Arc<dyn Transport>,
) -> Result<(), ConfigError> {
    let invalid = |hint: &str| ConfigError::InvalidTransport {
        value: descriptor.describe(),
        hint: hint.to_string(),
    };

    let name = transport.name();
    if name.trim().is_empty() || name.chars().any(char::is_whitespace) {
        return Err(invalid("Transport implementations need a non-empty name without whitespace"));
    }
    if transport.client_runtime().is_empty() {
        return Err(invalid("Transport implementations must name their client runtime"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::SocketServer;
    use crate::transport::{SOCKJS, SOCKJS_CLIENT_RUNTIME, WS_CLIENT_RUNTIME};
    use axum::Router;
    use std::fs;
    use tempfile::TempDir;

    struct Custom {
        name: &'static str,
        runtime: &'static str,
    }

    impl Transport for Custom {
        fn name(&self) -> &str {
            self.name
        }

        fn client_runtime(&self) -> ClientRuntime {
            ClientRuntime::new(self.runtime)
        }

        fn routes(&self, path: &str, server: SocketServer) -> Router {
            WebSocketTransport.routes(path, server)
        }
    }

    #[test]
    fn test_builtin_names() {
        let registry = TransportRegistry::builtin();
        assert_eq!(registry.names(), vec![WS, SOCKJS]);

        let ws = registry.resolve(&"ws".into()).unwrap();
        assert_eq!(ws.server.name(), WS);
        assert_eq!(ws.client_runtime.as_str(), WS_CLIENT_RUNTIME);

        let sockjs = registry.resolve(&"sockjs".into()).unwrap();
        assert_eq!(sockjs.server.name(), SOCKJS);
        assert_eq!(sockjs.client_runtime.as_str(), SOCKJS_CLIENT_RUNTIME);
    }

    #[test]
    fn test_missing_path_is_invalid_transport() {
        let registry = TransportRegistry::builtin();
        let err = registry
            .resolve(&"/bad/path/to/implementation".into())
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTransport { .. }));
        assert!(err
            .to_string()
            .starts_with("client.transport must be a string denoting a supported transport name"));
    }

    #[test]
    fn test_path_resolves_to_runtime_and_path_server() {
        let temp = TempDir::new().unwrap();
        let runtime = temp.path().join("CustomClient.js");
        fs::write(&runtime, "export default class CustomClient {}\n").unwrap();

        let resolved = TransportRegistry::builtin()
            .resolve(&runtime.to_string_lossy().to_string().into())
            .unwrap();
        assert_eq!(resolved.server.name(), WS);
        assert!(resolved.client_runtime.as_str().ends_with("CustomClient.js"));

        let resolved = TransportRegistry::builtin()
            .with_path_server(SOCKJS)
            .resolve(&runtime.to_string_lossy().to_string().into())
            .unwrap();
        assert_eq!(resolved.server.name(), SOCKJS);
    }

    #[test]
    fn test_directory_needs_index() {
        let temp = TempDir::new().unwrap();
        let registry = TransportRegistry::builtin();
        let dir = temp.path().to_string_lossy().to_string();

        assert!(registry.resolve(&dir.clone().into()).is_err());

        fs::write(temp.path().join("index.js"), "export default {}\n").unwrap();
        let resolved = registry.resolve(&dir.into()).unwrap();
        assert!(resolved.client_runtime.as_str().ends_with("index.js"));
    }

    #[test]
    fn test_rejects_empty_and_non_module_files() {
        let temp = TempDir::new().unwrap();
        let registry = TransportRegistry::builtin();

        let empty = temp.path().join("empty.js");
        fs::write(&empty, "  \n").unwrap();
        assert!(registry
            .resolve(&empty.to_string_lossy().to_string().into())
            .is_err());

        let text = temp.path().join("notes.txt");
        fs::write(&text, "hello").unwrap();
        assert!(registry
            .resolve(&text.to_string_lossy().to_string().into())
            .is_err());

        assert!(registry.resolve(&"".into()).is_err());
    }

    #[test]
    fn test_implementation_is_validated() {
        let registry = TransportRegistry::builtin();

        let good: Arc<dyn Transport> = Arc::new(Custom {
            name: "custom",
            runtime: "/client/custom.js",
        });
        let resolved = registry.resolve(&good.into()).unwrap();
        assert_eq!(resolved.server.name(), "custom");
        assert_eq!(resolved.client_runtime.as_str(), "/client/custom.js");

        let nameless: Arc<dyn Transport> = Arc::new(Custom {
            name: "",
            runtime: "/client/custom.js",
        });
        assert!(registry.resolve(&nameless.into()).is_err());

        let no_runtime: Arc<dyn Transport> = Arc::new(Custom {
            name: "custom",
            runtime: "",
        });
        assert!(registry.resolve(&no_runtime.into()).is_err());
    }

    #[test]
    fn test_resolve_server_reports_supported_names() {
        let registry = TransportRegistry::builtin();
        assert_eq!(registry.resolve_server("sockjs").unwrap().name(), SOCKJS);

        let err = registry.resolve_server("socket.io").unwrap_err();
        assert!(err.to_string().contains("ws, sockjs"));
    }
}
