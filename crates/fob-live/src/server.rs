//! Live server: transport, socket server and broadcaster wired onto one
//! HTTP host.

use crate::bootstrap::{self, BootstrapEntry, ClientFlags};
use crate::broadcast::{BroadcastOptions, BuildStats, CompilerEvent, EventBroadcaster};
use crate::config::{LiveConfig, DEFAULT_SERVER_TYPE};
use crate::error::{LiveError, Result};
use crate::host::{HttpHost, RunningHost};
use crate::socket::SocketServer;
use crate::transport::{ResolvedTransport, Transport, TransportDescriptor, TransportRegistry};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Capacity of the compiler signal channel.
const COMPILER_CHANNEL_CAPACITY: usize = 64;

/// The live-update channel of a development server.
///
/// # Example
///
/// ```rust,no_run
/// use fob_live::{BuildStats, LiveConfig, LiveServer};
///
/// # async fn run() -> fob_live::Result<()> {
/// let mut server = LiveServer::new(LiveConfig::default());
/// let addr = server.listen().await?;
/// println!("listening on {}", addr);
///
/// server.invalidate();
/// server.done(BuildStats::new("3f2a9c"))?;
///
/// server.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct LiveServer {
    options: LiveConfig,
    registry: TransportRegistry,
    transport: Option<Arc<dyn Transport>>,
    static_dir: Option<PathBuf>,
    running: Option<Running>,
}

struct Running {
    host: RunningHost,
    socket: SocketServer,
    broadcaster: Arc<EventBroadcaster>,
    transport: ResolvedTransport,
}

impl LiveServer {
    pub fn new(options: LiveConfig) -> Self {
        Self {
            options,
            registry: TransportRegistry::builtin(),
            transport: None,
            static_dir: None,
            running: None,
        }
    }

    /// Use a transport implementation instead of `client.transport`.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Make an additional named transport available to configuration.
    pub fn register_transport(&mut self, transport: Arc<dyn Transport>) {
        self.registry.register(transport);
    }

    /// Serve files from `dir` for requests outside the socket path.
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    pub fn options(&self) -> &LiveConfig {
        &self.options
    }

    /// How the transport is identified by the current options.
    pub fn descriptor(&self) -> TransportDescriptor {
        match &self.transport {
            Some(transport) => TransportDescriptor::Implementation(Arc::clone(transport)),
            None => TransportDescriptor::Named(self.options.client_transport().to_string()),
        }
    }

    /// Resolve the transport without starting anything.
    ///
    /// An explicit `webSocketServer` type picks the server side; otherwise it
    /// follows the client transport. Runtime paths pair with that type too,
    /// plain WebSocket by default.
    pub fn resolve_transport(&self) -> Result<ResolvedTransport> {
        let server_type = self.options.server_type();
        let registry = self
            .registry
            .clone()
            .with_path_server(server_type.unwrap_or(DEFAULT_SERVER_TYPE));

        let mut resolved = registry.resolve(&self.descriptor())?;
        if let (Some(server_type), None) = (server_type, &self.transport) {
            resolved.server = registry.resolve_server(server_type)?;
        }
        Ok(resolved)
    }

    /// Bind on the configured host and port.
    pub async fn listen(&mut self) -> Result<SocketAddr> {
        let (host, port) = (self.options.host.clone(), self.options.port);
        let addr = tokio::net::lookup_host((host.as_str(), port))
            .await
            .map_err(|e| LiveError::Server(format!("Cannot resolve {}:{}: {}", host, port, e)))?
            .next()
            .ok_or_else(|| LiveError::Server(format!("{} resolved to no address", host)))?;

        self.listen_on(addr).await
    }

    /// Resolve the transport, mount it and start serving on `addr`.
    ///
    /// All configuration errors surface here, before anything is bound.
    pub async fn listen_on(&mut self, addr: SocketAddr) -> Result<SocketAddr> {
        if self.running.is_some() {
            return Err(LiveError::Server("live server is already listening".to_string()));
        }

        self.options.validate()?;
        let transport = self.resolve_transport()?;

        let mut host = HttpHost::new();
        let socket = SocketServer::start(&transport.server, &mut host, self.options.socket_path())?;
        let broadcaster = match EventBroadcaster::attach(socket.clone(), &BroadcastOptions::from_config(&self.options)) {
            Ok(broadcaster) => broadcaster,
            Err(e) => {
                socket.close();
                return Err(e.into());
            }
        };

        if let Some(dir) = &self.static_dir {
            host.serve_dir(dir);
        }

        let host = match host.bind(addr).await {
            Ok(host) => host,
            Err(e) => {
                socket.close();
                return Err(e);
            }
        };

        let local_addr = host.local_addr();
        tracing::info!(
            addr = %local_addr,
            path = %socket.path(),
            transport = transport.server.name(),
            client = %transport.client_runtime,
            "live server listening"
        );

        self.running = Some(Running {
            host,
            socket,
            broadcaster,
            transport,
        });
        Ok(local_addr)
    }

    pub fn is_listening(&self) -> bool {
        self.running.is_some()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.host.local_addr())
    }

    /// Socket server of the running instance.
    pub fn socket(&self) -> Option<&SocketServer> {
        self.running.as_ref().map(|r| &r.socket)
    }

    pub fn broadcaster(&self) -> Option<&Arc<EventBroadcaster>> {
        self.running.as_ref().map(|r| &r.broadcaster)
    }

    pub fn client_count(&self) -> usize {
        self.running.as_ref().map_or(0, |r| r.socket.client_count())
    }

    /// Signal that a rebuild started. No-op unless listening.
    pub fn invalidate(&self) {
        if let Some(running) = &self.running {
            running.broadcaster.on_invalid();
        }
    }

    /// Signal that a build finished. No-op unless listening.
    pub fn done(&self, stats: BuildStats) -> Result<()> {
        if let Some(running) = &self.running {
            running.broadcaster.on_done(stats)?;
        }
        Ok(())
    }

    /// Channel for feeding compiler signals from another task.
    pub fn compiler_channel(&self) -> Result<mpsc::Sender<CompilerEvent>> {
        let running = self
            .running
            .as_ref()
            .ok_or_else(|| LiveError::Server("live server is not listening".to_string()))?;

        let (tx, rx) = mpsc::channel(COMPILER_CHANNEL_CAPACITY);
        tokio::spawn(Arc::clone(&running.broadcaster).run(rx));
        Ok(tx)
    }

    /// Flags for the client bootstrap, using the bound port once listening.
    pub fn client_flags(&self) -> Result<ClientFlags> {
        match &self.running {
            Some(running) => ClientFlags::from_config(
                &self.options,
                &running.transport,
                running.host.local_addr().port(),
            ),
            None => ClientFlags::from_config(&self.options, &self.resolve_transport()?, self.options.port),
        }
    }

    /// Modules to prepend to the application's entry points.
    pub fn bootstrap_entries(&self) -> Result<Vec<BootstrapEntry>> {
        Ok(bootstrap::compute_entries(&self.client_flags()?))
    }

    /// Disconnect every client and release the listener.
    ///
    /// Closing a server that never started, or closing twice, does nothing.
    pub async fn close(&mut self) -> Result<()> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        let clients = running.socket.close();
        running.broadcaster.reset();
        running.host.shutdown().await?;

        tracing::info!(clients, "live server closed");
        Ok(())
    }
}

impl Drop for LiveServer {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.socket.close();
        }
    }
}
