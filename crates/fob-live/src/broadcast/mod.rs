//! Translates compiler signals into client messages.
//!
//! Every build cycle is announced as:
//!
//! ```text
//! invalid            (once, when the rebuild starts)
//! hash <h>           (when it finishes)
//! ok | warnings | errors
//! ```
//!
//! Repeated "rebuild started" signals within one cycle collapse into a single
//! `invalid`. Clients that connect mid-session are caught up by the
//! connection handler: they receive the preamble, then either `invalid` (a
//! rebuild is running) or the last finished cycle's messages.

pub mod filter;
mod stats;

pub use filter::DiagnosticFilter;
pub use stats::{BuildStats, CompilerEvent};

use crate::config::{ClientLogLevel, LiveConfig, OverlaySetting};
use crate::error::{CompilerSignalError, ConfigError};
use crate::protocol::ServerMessage;
use crate::socket::{ClientHandle, ConnectionHandler, SocketServer};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Where the broadcaster is within a build cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    /// No rebuild in progress
    Idle,
    /// `invalid` was sent and no result has arrived yet
    Invalidated,
}

/// Settings announced to each client when it connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastOptions {
    pub hot: bool,
    pub live_reload: bool,
    pub logging: ClientLogLevel,
    pub overlay: OverlaySetting,
}

impl BroadcastOptions {
    pub fn from_config(config: &LiveConfig) -> Self {
        Self {
            hot: config.hot,
            live_reload: config.live_reload,
            logging: config.client.logging,
            overlay: config.client.overlay.clone(),
        }
    }

    /// Messages every client receives first.
    pub fn preamble(&self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        if self.hot {
            messages.push(ServerMessage::Hot);
        }
        if self.live_reload {
            messages.push(ServerMessage::LiveReload);
        }
        messages.push(ServerMessage::Logging { data: self.logging });
        if self.overlay.is_enabled() {
            messages.push(ServerMessage::Overlay {
                data: self.overlay.clone(),
            });
        }
        messages
    }
}

impl Default for BroadcastOptions {
    fn default() -> Self {
        Self::from_config(&LiveConfig::default())
    }
}

#[derive(Debug)]
struct CycleState {
    phase: CyclePhase,
    /// Frames of the last finished cycle, replayed to late joiners
    last_result: Option<Vec<Arc<str>>>,
    last_hash: Option<String>,
    completed: u64,
}

impl CycleState {
    fn new() -> Self {
        Self {
            phase: CyclePhase::Idle,
            last_result: None,
            last_hash: None,
            completed: 0,
        }
    }
}

/// Broadcasts build cycles to every client of a socket server.
///
/// Lock order is cycle state, then client registry. Both the broadcast path
/// and the connection handler follow it, which keeps a late joiner from
/// missing or duplicating a message.
pub struct EventBroadcaster {
    server: SocketServer,
    filter: DiagnosticFilter,
    preamble: Vec<Arc<str>>,
    state: Mutex<CycleState>,
}

impl EventBroadcaster {
    /// Create a broadcaster and install it as the server's connection
    /// handler.
    pub fn attach(server: SocketServer, options: &BroadcastOptions) -> Result<Arc<Self>, ConfigError> {
        let broadcaster = Arc::new(Self {
            filter: DiagnosticFilter::from_overlay(&options.overlay)?,
            preamble: options.preamble().iter().map(ServerMessage::to_frame).collect(),
            state: Mutex::new(CycleState::new()),
            server: server.clone(),
        });

        server.on_connection(broadcaster.clone());
        Ok(broadcaster)
    }

    pub fn phase(&self) -> CyclePhase {
        self.state.lock().phase
    }

    /// Hash of the last finished build.
    pub fn last_hash(&self) -> Option<String> {
        self.state.lock().last_hash.clone()
    }

    /// Number of build results broadcast so far.
    pub fn completed_cycles(&self) -> u64 {
        self.state.lock().completed
    }

    /// A rebuild started. Returns whether `invalid` was broadcast; repeats
    /// within an open cycle are swallowed.
    pub fn on_invalid(&self) -> bool {
        let mut state = self.state.lock();
        if state.phase == CyclePhase::Invalidated {
            tracing::trace!("rebuild already announced");
            return false;
        }

        state.phase = CyclePhase::Invalidated;
        let delivered = self.server.broadcast(&ServerMessage::Invalid);
        tracing::debug!(clients = delivered, "announced rebuild");
        true
    }

    /// A build finished. Broadcasts `hash` then exactly one of `errors`,
    /// `warnings` or `ok`.
    ///
    /// Stats without a hash are rejected and leave the cycle open.
    pub fn on_done(&self, stats: BuildStats) -> Result<(), CompilerSignalError> {
        if let Err(e) = stats.validate() {
            tracing::warn!(error = %e, "ignoring build result");
            return Err(e);
        }

        let frames: Vec<Arc<str>> = self
            .result_messages(&stats)
            .iter()
            .map(ServerMessage::to_frame)
            .collect();

        let mut state = self.state.lock();
        let mut delivered = 0;
        for frame in &frames {
            delivered = self.server.broadcast_frame(frame.clone());
        }

        state.phase = CyclePhase::Idle;
        state.last_result = Some(frames);
        state.last_hash = Some(stats.hash.clone());
        state.completed += 1;

        tracing::info!(
            hash = %stats.hash,
            errors = stats.errors.len(),
            warnings = stats.warnings.len(),
            clients = delivered,
            "build result sent"
        );
        Ok(())
    }

    /// Dispatch one compiler signal. Rejected stats are logged and dropped.
    pub fn handle(&self, event: CompilerEvent) {
        match event {
            CompilerEvent::Invalid => {
                self.on_invalid();
            }
            CompilerEvent::Done(stats) => {
                if self.on_done(stats).is_err() {
                    tracing::trace!(phase = ?self.phase(), "build cycle left open until the next result");
                }
            }
        }
    }

    /// Consume compiler signals until the sender side is dropped.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<CompilerEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(event);
        }
        tracing::debug!("compiler signal stream ended");
    }

    /// Forget the current cycle and the last result.
    pub fn reset(&self) {
        *self.state.lock() = CycleState::new();
    }

    fn result_messages(&self, stats: &BuildStats) -> Vec<ServerMessage> {
        let terminal = if stats.has_errors() {
            ServerMessage::Errors {
                data: self.filter.errors(&stats.errors),
                params: stats.flags(),
            }
        } else if stats.has_warnings() {
            ServerMessage::Warnings {
                data: self.filter.warnings(&stats.warnings),
                params: stats.flags(),
            }
        } else {
            ServerMessage::Ok
        };

        vec![
            ServerMessage::Hash {
                data: stats.hash.clone(),
            },
            terminal,
        ]
    }
}

impl ConnectionHandler for EventBroadcaster {
    fn on_connection(&self, server: &SocketServer, client: ClientHandle) {
        let state = self.state.lock();

        let mut greeting = self.preamble.clone();
        match (state.phase, &state.last_result) {
            (CyclePhase::Invalidated, _) => greeting.push(ServerMessage::Invalid.to_frame()),
            (CyclePhase::Idle, Some(frames)) => greeting.extend(frames.iter().cloned()),
            (CyclePhase::Idle, None) => {}
        }

        server.register(client, &greeting);
    }
}

impl std::fmt::Debug for EventBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBroadcaster")
            .field("server", &self.server)
            .field("state", &*self.state.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OverlayFilters, PatternFilter, SeverityFilter};
    use crate::protocol::{Diagnostic, StatusFlags};
    use crate::socket::ClientSession;

    fn setup(options: BroadcastOptions) -> (SocketServer, Arc<EventBroadcaster>) {
        let server = SocketServer::new("/ws", "ws");
        let broadcaster = EventBroadcaster::attach(server.clone(), &options).unwrap();
        (server, broadcaster)
    }

    fn quiet() -> BroadcastOptions {
        BroadcastOptions {
            hot: false,
            live_reload: false,
            logging: ClientLogLevel::Info,
            overlay: OverlaySetting::Enabled(false),
        }
    }

    fn drain(session: &mut ClientSession) -> Vec<ServerMessage> {
        std::iter::from_fn(|| session.try_recv())
            .map(|frame| serde_json::from_str(&frame).unwrap())
            .collect()
    }

    #[test]
    fn test_invalid_is_coalesced() {
        let (server, broadcaster) = setup(quiet());
        let mut session = server.accept().unwrap();

        assert!(broadcaster.on_invalid());
        assert!(!broadcaster.on_invalid());
        assert!(!broadcaster.on_invalid());
        broadcaster.on_done(BuildStats::new("h1")).unwrap();
        assert!(broadcaster.on_invalid());

        let messages = drain(&mut session);
        let invalids = messages
            .iter()
            .filter(|m| **m == ServerMessage::Invalid)
            .count();
        assert_eq!(invalids, 2);
        assert_eq!(broadcaster.phase(), CyclePhase::Invalidated);
    }

    #[test]
    fn test_done_sends_hash_then_one_terminal() {
        let (server, broadcaster) = setup(quiet());
        let mut session = server.accept().unwrap();

        broadcaster.on_done(BuildStats::new("a")).unwrap();
        broadcaster
            .on_done(BuildStats::new("b").with_warning(Diagnostic::new("w")))
            .unwrap();
        broadcaster
            .on_done(
                BuildStats::new("c")
                    .with_warning(Diagnostic::new("w"))
                    .with_error(Diagnostic::new("e")),
            )
            .unwrap();

        let both = StatusFlags {
            has_errors: true,
            has_warnings: true,
        };
        assert_eq!(
            drain(&mut session),
            vec![
                ServerMessage::Hash { data: "a".into() },
                ServerMessage::Ok,
                ServerMessage::Hash { data: "b".into() },
                ServerMessage::Warnings {
                    data: vec![Diagnostic::new("w")],
                    params: StatusFlags {
                        has_errors: false,
                        has_warnings: true
                    },
                },
                ServerMessage::Hash { data: "c".into() },
                ServerMessage::Errors {
                    data: vec![Diagnostic::new("e")],
                    params: both,
                },
            ]
        );
        assert_eq!(broadcaster.completed_cycles(), 3);
        assert_eq!(broadcaster.last_hash().as_deref(), Some("c"));
    }

    #[test]
    fn test_missing_hash_keeps_cycle_open() {
        let (server, broadcaster) = setup(quiet());
        let mut session = server.accept().unwrap();

        broadcaster.on_invalid();
        assert_eq!(
            broadcaster.on_done(BuildStats::new("")),
            Err(CompilerSignalError::MissingHash)
        );
        assert_eq!(broadcaster.phase(), CyclePhase::Invalidated);
        assert_eq!(drain(&mut session), vec![ServerMessage::Invalid]);
    }

    #[test]
    fn test_handle_drops_rejected_stats_and_recovers() {
        let (server, broadcaster) = setup(quiet());
        let mut session = server.accept().unwrap();
        drain(&mut session);

        broadcaster.handle(CompilerEvent::Invalid);
        broadcaster.handle(CompilerEvent::Done(BuildStats::new("  ")));
        assert_eq!(broadcaster.phase(), CyclePhase::Invalidated);
        assert_eq!(broadcaster.completed_cycles(), 0);

        broadcaster.handle(CompilerEvent::Done(BuildStats::new("c0ffee")));
        assert_eq!(broadcaster.phase(), CyclePhase::Idle);
        assert_eq!(broadcaster.last_hash().as_deref(), Some("c0ffee"));
        assert_eq!(
            drain(&mut session),
            vec![
                ServerMessage::Invalid,
                ServerMessage::Hash {
                    data: "c0ffee".to_string()
                },
                ServerMessage::Ok,
            ]
        );
    }

    #[test]
    fn test_filtered_terminal_still_follows_unfiltered_result() {
        let options = BroadcastOptions {
            overlay: OverlaySetting::Filtered(OverlayFilters {
                warnings: SeverityFilter::Patterns(PatternFilter {
                    include: vec![],
                    exclude: vec!["deprecated".to_string()],
                }),
                ..OverlayFilters::default()
            }),
            ..quiet()
        };
        let (server, broadcaster) = setup(options);

        broadcaster
            .on_done(BuildStats::new("h").with_warning(Diagnostic::new("deprecated API")))
            .unwrap();

        // Late joiner: preamble carries the overlay, then the replayed result.
        let mut session = server.accept().unwrap();
        let messages = drain(&mut session);
        assert!(matches!(messages[0], ServerMessage::Logging { .. }));
        assert!(matches!(messages[1], ServerMessage::Overlay { .. }));
        assert_eq!(messages[2], ServerMessage::Hash { data: "h".into() });
        assert_eq!(
            messages[3],
            ServerMessage::Warnings {
                data: vec![],
                params: StatusFlags {
                    has_errors: false,
                    has_warnings: true
                },
            }
        );
    }

    #[test]
    fn test_late_joiner_during_rebuild_gets_invalid() {
        let (server, broadcaster) = setup(BroadcastOptions::default());
        broadcaster.on_done(BuildStats::new("old")).unwrap();
        broadcaster.on_invalid();

        let mut session = server.accept().unwrap();
        assert_eq!(
            drain(&mut session),
            vec![
                ServerMessage::Hot,
                ServerMessage::LiveReload,
                ServerMessage::Logging {
                    data: ClientLogLevel::Info
                },
                ServerMessage::Overlay {
                    data: OverlaySetting::Enabled(true)
                },
                ServerMessage::Invalid,
            ]
        );
    }

    #[test]
    fn test_reset_forgets_last_result() {
        let (server, broadcaster) = setup(quiet());
        broadcaster.on_done(BuildStats::new("h")).unwrap();
        broadcaster.reset();

        let mut session = server.accept().unwrap();
        assert_eq!(
            drain(&mut session),
            vec![ServerMessage::Logging {
                data: ClientLogLevel::Info
            }]
        );
        assert_eq!(broadcaster.last_hash(), None);
    }

    #[tokio::test]
    async fn test_run_consumes_channel() {
        let (server, broadcaster) = setup(quiet());
        let mut session = server.accept().unwrap();
        let (tx, rx) = mpsc::channel(8);

        let task = tokio::spawn(broadcaster.clone().run(rx));
        tx.send(CompilerEvent::Invalid).await.unwrap();
        tx.send(CompilerEvent::Done(BuildStats::new("x"))).await.unwrap();
        drop(tx);
        task.await.unwrap();

        assert_eq!(&*session.recv().await.unwrap(), r#"{"type":"logging","data":"info"}"#);
        assert_eq!(&*session.recv().await.unwrap(), r#"{"type":"invalid"}"#);
        assert_eq!(&*session.recv().await.unwrap(), r#"{"type":"hash","data":"x"}"#);
        assert_eq!(&*session.recv().await.unwrap(), r#"{"type":"ok"}"#);
    }
}
