//! fob-live - the live-update channel of a development server.
//!
//! Keeps browsers connected to the dev server and tells them about builds:
//! when a rebuild starts, the hash of each finished build, and whether it
//! produced errors or warnings. It also decides which runtime modules are
//! prepended to the application so the browser connects back at all.
//!
//! # Architecture
//!
//! - [`transport`] - pluggable socket transports (`ws`, `sockjs`, custom) and
//!   their resolution from configuration
//! - [`socket`] - transport-agnostic socket server and client registry
//! - [`broadcast`] - build cycle state machine fanning compiler signals out
//! - [`bootstrap`] - client runtime entries prepended to user entry points
//! - [`server`] - [`LiveServer`], which wires all of the above onto one
//!   HTTP host
//! - [`config`] - `fob-live.config.json` + environment + CLI configuration
//! - [`error`] - error types with actionable messages
//!
//! # Example
//!
//! ```rust,no_run
//! use fob_live::{BuildStats, Diagnostic, LiveConfig, LiveServer};
//!
//! # async fn run() -> fob_live::Result<()> {
//! let mut server = LiveServer::new(LiveConfig::default());
//! server.listen().await?;
//!
//! server.invalidate();
//! server.done(BuildStats::new("8e1f0c").with_warning(Diagnostic::new("unused import")))?;
//!
//! server.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod broadcast;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod host;
pub mod logger;
pub mod protocol;
pub mod server;
pub mod socket;
pub mod transport;
pub mod ui;
pub mod watch;

pub use bootstrap::{compute_entries, prepend_entries, BootstrapEntry, ClientFlags, EntryKind};
pub use broadcast::{BuildStats, CompilerEvent, CyclePhase, EventBroadcaster};
pub use config::LiveConfig;
pub use error::{CompilerSignalError, ConfigError, LiveError, Result, ResultExt, TransportError};
pub use protocol::{Diagnostic, ServerMessage, StatusFlags};
pub use server::LiveServer;
pub use socket::{ClientId, SocketServer};
pub use transport::{Transport, TransportDescriptor, TransportRegistry};
