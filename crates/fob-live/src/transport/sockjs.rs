//! SockJS transport.
//!
//! Serves the subset of the SockJS protocol the browser runtime uses:
//!
//! | Route                                   | Purpose                          |
//! |-----------------------------------------|----------------------------------|
//! | `GET {path}`                            | greeting, doubles as health check |
//! | `GET {path}/info`                       | capability probe                 |
//! | `GET {path}/websocket`                  | raw WebSocket, unframed          |
//! | `GET {path}/{server}/{session}/websocket` | framed WebSocket               |
//! | `GET {path}/{server}/{session}/eventsource` | framed EventSource fallback  |
//!
//! Framed sessions open with `o`, carry messages as `a["<json>"]`,
//! heartbeat with `h` and end with `c[3000,"Go away!"]`.

use super::ws::{upgrade_into_session, Framing, HEARTBEAT_INTERVAL};
use super::{ClientRuntime, Transport, SOCKJS};
use crate::socket::SocketServer;
use axum::{
    extract::{ws::WebSocketUpgrade, Path, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Response, Sse,
    },
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::convert::Infallible;

/// Browser runtime for the SockJS transport.
pub const SOCKJS_CLIENT_RUNTIME: &str = "@fob/live/client/clients/SockJSClient.js";

pub(crate) const OPEN_FRAME: &str = "o";
pub(crate) const HEARTBEAT_FRAME: &str = "h";

const GREETING: &str = "Welcome to SockJS!\n";

#[derive(Debug, Default, Clone, Copy)]
pub struct SockJsTransport;

impl Transport for SockJsTransport {
    fn name(&self) -> &str {
        SOCKJS
    }

    fn client_runtime(&self) -> ClientRuntime {
        ClientRuntime::new(SOCKJS_CLIENT_RUNTIME)
    }

    fn scheme(&self) -> &'static str {
        "http"
    }

    fn routes(&self, path: &str, server: SocketServer) -> Router {
        Router::new()
            .route(path, get(greeting))
            .route(&format!("{path}/"), get(greeting))
            .route(&format!("{path}/info"), get(info))
            .route(&format!("{path}/websocket"), get(raw_websocket))
            .route(
                &format!("{path}/{{server}}/{{session}}/websocket"),
                get(framed_websocket),
            )
            .route(
                &format!("{path}/{{server}}/{{session}}/eventsource"),
                get(eventsource),
            )
            .with_state(server)
    }
}

/// Wrap one pre-serialized message in a SockJS array frame.
pub(crate) fn message_frame(frame: &str) -> String {
    format!("a{}", serde_json::to_string(&[frame]).unwrap_or_default())
}

pub(crate) fn close_frame() -> String {
    format!("c{}", json!([3000, "Go away!"]))
}

async fn greeting() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=UTF-8")],
        GREETING,
    )
}

async fn info() -> impl IntoResponse {
    let entropy = rand::random::<u32>();
    (
        [(header::CACHE_CONTROL, "no-store, no-cache, must-revalidate, max-age=0")],
        Json(json!({
            "websocket": true,
            "origins": ["*:*"],
            "cookie_needed": false,
            "entropy": entropy,
        })),
    )
}

async fn raw_websocket(State(server): State<SocketServer>, upgrade: WebSocketUpgrade) -> Response {
    upgrade_into_session(upgrade, server, Framing::Plain)
}

async fn framed_websocket(
    State(server): State<SocketServer>,
    Path((server_id, session_id)): Path<(String, String)>,
    upgrade: WebSocketUpgrade,
) -> Response {
    if !valid_session_segments(&server_id, &session_id) {
        return StatusCode::NOT_FOUND.into_response();
    }
    upgrade_into_session(upgrade, server, Framing::SockJs)
}

async fn eventsource(
    State(server): State<SocketServer>,
    Path((server_id, session_id)): Path<(String, String)>,
) -> Response {
    if !valid_session_segments(&server_id, &session_id) {
        return StatusCode::NOT_FOUND.into_response();
    }

    let Some(mut session) = server.accept() else {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };

    // Dropping the stream (client went away) drops the session with it.
    let stream = async_stream::stream! {
        yield Ok::<_, Infallible>(Event::default().data(OPEN_FRAME));
        while let Some(frame) = session.recv().await {
            yield Ok(Event::default().data(message_frame(&frame)));
        }
        yield Ok(Event::default().data(close_frame()));
    };

    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(HEARTBEAT_INTERVAL)
                .text(HEARTBEAT_FRAME),
        )
        .into_response()
}

/// SockJS server and session ids are non-empty and dot-free.
fn valid_session_segments(server_id: &str, session_id: &str) -> bool {
    [server_id, session_id]
        .iter()
        .all(|segment| !segment.is_empty() && !segment.contains('.'))
}
