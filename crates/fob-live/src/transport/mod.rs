//! Pluggable socket transports.
//!
//! A transport pairs a server side (axum routes mounted under the socket
//! path) with the browser runtime module that speaks to it. Two are built in:
//!
//! - [`WebSocketTransport`] (`"ws"`): plain WebSocket, one JSON message per
//!   text frame.
//! - [`SockJsTransport`] (`"sockjs"`): SockJS framing over WebSocket, plus
//!   an EventSource fallback for browsers without WebSocket.
//!
//! Configuration names a transport with a string (built-in name or path to a
//! client runtime) or hands over an implementation directly. Either way it is
//! resolved once at startup by [`TransportRegistry::resolve`].

pub mod registry;
pub mod sockjs;
pub mod ws;

use crate::socket::SocketServer;
use axum::Router;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

pub use registry::TransportRegistry;
pub use sockjs::{SockJsTransport, SOCKJS_CLIENT_RUNTIME};
pub use ws::{WebSocketTransport, WS_CLIENT_RUNTIME};

/// Built-in plain WebSocket transport name.
pub const WS: &str = "ws";

/// Built-in SockJS transport name.
pub const SOCKJS: &str = "sockjs";

/// A socket transport implementation.
pub trait Transport: Send + Sync + 'static {
    /// Name used in logs and configuration.
    fn name(&self) -> &str;

    /// Browser runtime module that connects to this transport.
    fn client_runtime(&self) -> ClientRuntime;

    /// URL scheme the browser runtime connects with.
    fn scheme(&self) -> &'static str {
        "ws"
    }

    /// Routes serving this transport under `path`. Every accepted
    /// connection must go through [`SocketServer::accept`].
    fn routes(&self, path: &str, server: SocketServer) -> Router;
}

impl fmt::Debug for dyn Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("name", &self.name())
            .field("client_runtime", &self.client_runtime())
            .finish()
    }
}

/// Module specifier (or absolute path) of a browser transport runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ClientRuntime(String);

impl ClientRuntime {
    pub fn new(specifier: impl Into<String>) -> Self {
        Self(specifier.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ClientRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How configuration identifies a transport.
#[derive(Clone)]
pub enum TransportDescriptor {
    /// A built-in name, or a filesystem path to a client runtime
    Named(String),
    /// An implementation supplied directly
    Implementation(Arc<dyn Transport>),
}

impl TransportDescriptor {
    /// Value shown in error messages.
    pub fn describe(&self) -> String {
        match self {
            TransportDescriptor::Named(value) => value.clone(),
            TransportDescriptor::Implementation(transport) => {
                format!("<implementation '{}'>", transport.name())
            }
        }
    }
}

impl fmt::Debug for TransportDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportDescriptor::Named(value) => f.debug_tuple("Named").field(value).finish(),
            TransportDescriptor::Implementation(transport) => f
                .debug_tuple("Implementation")
                .field(&transport.name())
                .finish(),
        }
    }
}

impl From<&str> for TransportDescriptor {
    fn from(value: &str) -> Self {
        TransportDescriptor::Named(value.to_string())
    }
}

impl From<String> for TransportDescriptor {
    fn from(value: String) -> Self {
        TransportDescriptor::Named(value)
    }
}

impl From<Arc<dyn Transport>> for TransportDescriptor {
    fn from(transport: Arc<dyn Transport>) -> Self {
        TransportDescriptor::Implementation(transport)
    }
}

/// Outcome of resolution: the server side to mount and the runtime to inject.
#[derive(Clone)]
pub struct ResolvedTransport {
    pub server: Arc<dyn Transport>,
    pub client_runtime: ClientRuntime,
}

impl fmt::Debug for ResolvedTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedTransport")
            .field("server", &self.server.name())
            .field("client_runtime", &self.client_runtime)
            .finish()
    }
}
