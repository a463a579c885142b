//! Transport-agnostic socket server.
//!
//! [`SocketServer`] owns the registry of connected clients and fans messages
//! out to them. Transports only deal with framing: they call
//! [`SocketServer::accept`] for every new connection and pump the returned
//! [`ClientSession`] into their socket until either side goes away.

mod clients;

pub use clients::{ClientHandle, ClientId, ClientRegistry, FrameSender};

use crate::config::normalize_socket_path;
use crate::error::{Result, TransportError};
use crate::host::HttpHost;
use crate::protocol::ServerMessage;
use crate::transport::Transport;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;

/// Receives every newly accepted client.
///
/// Implementations must hand the client to [`SocketServer::register`],
/// optionally with greeting frames that are delivered before any broadcast.
pub trait ConnectionHandler: Send + Sync + 'static {
    fn on_connection(&self, server: &SocketServer, client: ClientHandle);
}

/// Cheaply cloneable handle to one socket server.
#[derive(Clone)]
pub struct SocketServer {
    inner: Arc<Inner>,
}

struct Inner {
    path: String,
    transport: String,
    clients: Mutex<ClientRegistry>,
    next_id: AtomicU64,
    closed: AtomicBool,
    handler: RwLock<Option<Arc<dyn ConnectionHandler>>>,
}

impl SocketServer {
    /// Create a server for `path` without mounting it anywhere.
    pub fn new(path: impl Into<String>, transport: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                path: path.into(),
                transport: transport.into(),
                clients: Mutex::new(ClientRegistry::new()),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
                handler: RwLock::new(None),
            }),
        }
    }

    /// Create a server and mount the transport's routes under `path` on
    /// `host`.
    ///
    /// Fails when the path is malformed or overlaps a route already mounted
    /// on the host.
    pub fn start(transport: &Arc<dyn Transport>, host: &mut HttpHost, path: &str) -> Result<Self> {
        let path = normalize_socket_path(path)?;
        let server = Self::new(path.clone(), transport.name());
        host.mount(&path, transport.routes(&path, server.clone()))?;

        tracing::debug!(path = %path, transport = transport.name(), "socket server mounted");
        Ok(server)
    }

    pub fn path(&self) -> &str {
        &self.inner.path
    }

    pub fn transport_name(&self) -> &str {
        &self.inner.transport
    }

    /// Install the handler that decides what a new client receives first.
    pub fn on_connection(&self, handler: Arc<dyn ConnectionHandler>) {
        *self.inner.handler.write() = Some(handler);
    }

    /// Accept a new connection.
    ///
    /// Returns `None` once the server is closed.
    pub fn accept(&self) -> Option<ClientSession> {
        if self.is_closed() {
            return None;
        }

        let id = ClientId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ClientHandle::new(id, tx);

        let handler = self.inner.handler.read().clone();
        match handler {
            Some(handler) => handler.on_connection(self, handle),
            None => self.register(handle, &[]),
        }

        tracing::debug!(client = %id, path = %self.path(), "client connected");

        Some(ClientSession {
            id,
            rx,
            server: Arc::downgrade(&self.inner),
        })
    }

    /// Queue `greeting` for the client and add it to the registry.
    ///
    /// Both happen under the registry lock, so no broadcast can slip in
    /// between the greeting and registration.
    pub fn register(&self, client: ClientHandle, greeting: &[Arc<str>]) {
        let mut clients = self.inner.clients.lock();
        if self.is_closed() {
            return;
        }

        for frame in greeting {
            if client.push(frame.clone()).is_err() {
                tracing::debug!(client = %client.id(), "client left before registration");
                return;
            }
        }

        clients.add(client);
    }

    /// Send a message to every connected client. Returns the number of
    /// clients it was delivered to.
    pub fn broadcast(&self, message: &ServerMessage) -> usize {
        self.broadcast_frame(message.to_frame())
    }

    /// Send a pre-serialized frame to every connected client.
    ///
    /// Clients whose connection is gone are dropped from the registry; a
    /// failure never stops delivery to the others.
    pub fn broadcast_frame(&self, frame: Arc<str>) -> usize {
        let mut clients = self.inner.clients.lock();
        let mut delivered = 0;
        let mut gone = Vec::new();

        clients.for_each(|client| match client.push(frame.clone()) {
            Ok(()) => delivered += 1,
            Err(_) => gone.push(client.id()),
        });

        for id in gone {
            clients.remove(id);
            tracing::debug!(client = %id, "dropped disconnected client");
        }

        delivered
    }

    /// Send a message to one client.
    pub fn send(&self, id: ClientId, message: &ServerMessage) -> Result<(), TransportError> {
        let mut clients = self.inner.clients.lock();
        if self.is_closed() {
            return Err(TransportError::ServerClosed);
        }

        let client = clients.get(id).ok_or(TransportError::ClientGone(id))?;
        if client.push(message.to_frame()).is_err() {
            clients.remove(id);
            return Err(TransportError::ClientGone(id));
        }
        Ok(())
    }

    pub fn client_count(&self) -> usize {
        self.inner.clients.lock().len()
    }

    pub fn client_ids(&self) -> Vec<ClientId> {
        self.inner.clients.lock().ids()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Stop accepting connections and disconnect every client.
    ///
    /// Dropping the client handles ends each connection task. Returns the
    /// number of clients that were connected.
    pub fn close(&self) -> usize {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.handler.write().take();

        let closed = self.inner.clients.lock().clear();
        tracing::debug!(path = %self.path(), clients = closed, "socket server closed");
        closed
    }
}

impl std::fmt::Debug for SocketServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketServer")
            .field("path", &self.inner.path)
            .field("transport", &self.inner.transport)
            .field("clients", &self.client_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Connection-side end of one client.
///
/// Yields frames in the order they were queued. Dropping the session
/// removes the client from the registry.
#[derive(Debug)]
pub struct ClientSession {
    id: ClientId,
    rx: mpsc::UnboundedReceiver<Arc<str>>,
    server: Weak<Inner>,
}

impl ClientSession {
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Next frame for this client, or `None` once the server dropped it.
    pub async fn recv(&mut self) -> Option<Arc<str>> {
        self.rx.recv().await
    }

    /// Next already-queued frame, without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<str>> {
        self.rx.try_recv().ok()
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        if let Some(inner) = self.server.upgrade() {
            if inner.clients.lock().remove(self.id).is_some() {
                tracing::debug!(client = %self.id, "client disconnected");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Greeter(Vec<Arc<str>>);

    impl ConnectionHandler for Greeter {
        fn on_connection(&self, server: &SocketServer, client: ClientHandle) {
            server.register(client, &self.0);
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_client_in_order() {
        let server = SocketServer::new("/ws", "ws");
        let mut a = server.accept().unwrap();
        let mut b = server.accept().unwrap();
        assert_eq!(server.client_count(), 2);

        assert_eq!(server.broadcast(&ServerMessage::Invalid), 2);
        assert_eq!(server.broadcast(&ServerMessage::Ok), 2);

        for session in [&mut a, &mut b] {
            assert_eq!(&*session.recv().await.unwrap(), r#"{"type":"invalid"}"#);
            assert_eq!(&*session.recv().await.unwrap(), r#"{"type":"ok"}"#);
        }
    }

    #[tokio::test]
    async fn test_greeting_precedes_broadcasts() {
        let server = SocketServer::new("/ws", "ws");
        server.on_connection(Arc::new(Greeter(vec![ServerMessage::Hot.to_frame()])));

        let mut session = server.accept().unwrap();
        server.broadcast(&ServerMessage::Invalid);

        assert_eq!(&*session.recv().await.unwrap(), r#"{"type":"hot"}"#);
        assert_eq!(&*session.recv().await.unwrap(), r#"{"type":"invalid"}"#);
    }

    #[test]
    fn test_dropped_session_leaves_registry() {
        let server = SocketServer::new("/ws", "ws");
        let session = server.accept().unwrap();
        let other = server.accept().unwrap();
        assert_ne!(session.id(), other.id());

        drop(session);
        assert_eq!(server.client_ids(), vec![other.id()]);
    }

    #[test]
    fn test_send_to_departed_client_fails() {
        let server = SocketServer::new("/ws", "ws");
        let session = server.accept().unwrap();
        let id = session.id();

        server.send(id, &ServerMessage::Ok).unwrap();
        drop(session);
        assert_eq!(
            server.send(id, &ServerMessage::Ok),
            Err(TransportError::ClientGone(id))
        );
    }

    #[tokio::test]
    async fn test_close_disconnects_and_refuses_new_clients() {
        let server = SocketServer::new("/ws", "ws");
        let mut session = server.accept().unwrap();

        assert_eq!(server.close(), 1);
        assert!(session.recv().await.is_none());
        assert!(server.accept().is_none());
        assert_eq!(server.broadcast(&ServerMessage::Ok), 0);
        assert_eq!(
            server.send(session.id(), &ServerMessage::Ok),
            Err(TransportError::ServerClosed)
        );
    }
}
