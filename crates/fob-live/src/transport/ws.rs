//! Plain WebSocket transport.

use super::{sockjs, ClientRuntime, Transport, WS};
use crate::socket::{ClientSession, SocketServer};
use axum::{
    body::Bytes,
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::time::Duration;

/// Browser runtime for the plain WebSocket transport.
pub const WS_CLIENT_RUNTIME: &str = "@fob/live/client/clients/WebSocketClient.js";

/// Interval between keep-alive frames on idle connections.
pub(crate) const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);

/// One JSON message per text frame, heartbeats as WebSocket pings.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketTransport;

impl Transport for WebSocketTransport {
    fn name(&self) -> &str {
        WS
    }

    fn client_runtime(&self) -> ClientRuntime {
        ClientRuntime::new(WS_CLIENT_RUNTIME)
    }

    fn routes(&self, path: &str, server: SocketServer) -> Router {
        Router::new()
            .route(path, get(handle_upgrade))
            .with_state(server)
    }
}

/// Upgrade requests become clients; a plain GET gets a short liveness reply.
async fn handle_upgrade(
    State(server): State<SocketServer>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let Ok(upgrade) = upgrade else {
        return (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            "fob-live websocket endpoint\n",
        )
            .into_response();
    };

    upgrade_into_session(upgrade, server, Framing::Plain)
}

/// Accept a client and pump its session into the upgraded socket.
pub(crate) fn upgrade_into_session(
    upgrade: WebSocketUpgrade,
    server: SocketServer,
    framing: Framing,
) -> Response {
    let Some(session) = server.accept() else {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };

    upgrade.on_upgrade(move |socket| pump(socket, session, framing))
}

/// Frame encoding used on a WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Framing {
    Plain,
    SockJs,
}

impl Framing {
    fn open(self) -> Option<Message> {
        match self {
            Framing::Plain => None,
            Framing::SockJs => Some(Message::Text(sockjs::OPEN_FRAME.into())),
        }
    }

    fn message(self, frame: &str) -> Message {
        match self {
            Framing::Plain => Message::Text(frame.into()),
            Framing::SockJs => Message::Text(sockjs::message_frame(frame).into()),
        }
    }

    fn heartbeat(self) -> Message {
        match self {
            Framing::Plain => Message::Ping(Bytes::new()),
            Framing::SockJs => Message::Text(sockjs::HEARTBEAT_FRAME.into()),
        }
    }

    fn close(self) -> Message {
        match self {
            Framing::Plain => Message::Close(None),
            Framing::SockJs => Message::Text(sockjs::close_frame().into()),
        }
    }
}

/// Forward queued frames to the socket until either side goes away.
///
/// Incoming messages are read only to notice disconnects; clients have
/// nothing to say on this channel.
pub(crate) async fn pump(mut socket: WebSocket, mut session: ClientSession, framing: Framing) {
    let id = session.id();

    if let Some(open) = framing.open() {
        if socket.send(open).await.is_err() {
            return;
        }
    }

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    // The first tick fires immediately.
    heartbeat.tick().await;

    loop {
        tokio::select! {
            frame = session.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = socket.send(framing.message(&frame)).await {
                        tracing::debug!(client = %id, error = %e, "write failed");
                        break;
                    }
                }
                None => {
                    let _ = socket.send(framing.close()).await;
                    break;
                }
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::debug!(client = %id, error = %e, "read failed");
                    break;
                }
                Some(Ok(_)) => {}
            },
            _ = heartbeat.tick() => {
                if socket.send(framing.heartbeat()).await.is_err() {
                    break;
                }
            }
        }
    }
}
