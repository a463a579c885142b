//! HTTP host shared by socket servers and static file serving.
//!
//! Socket servers claim URL path prefixes on an [`HttpHost`] before it is
//! bound. Overlapping claims are rejected up front, so two servers can never
//! compete for the same requests.

use crate::error::{ConfigError, LiveError, Result};
use axum::Router;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

/// Time open connections get to finish after shutdown is requested.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Router under construction plus the path prefixes mounted on it.
pub struct HttpHost {
    router: Router,
    mounts: Vec<String>,
}

impl Default for HttpHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpHost {
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            mounts: Vec::new(),
        }
    }

    /// Claim `path` and everything below it for `routes`.
    pub fn mount(&mut self, path: &str, routes: Router) -> Result<(), ConfigError> {
        if let Some(existing) = self.mounts.iter().find(|m| overlaps(m, path)) {
            return Err(ConfigError::PathCollision {
                path: path.to_string(),
                existing: existing.clone(),
            });
        }

        let router = std::mem::replace(&mut self.router, Router::new());
        self.router = router.merge(routes);
        self.mounts.push(path.to_string());
        Ok(())
    }

    /// Serve files from `dir` for every request no mount claims.
    pub fn serve_dir(&mut self, dir: &Path) {
        let router = std::mem::replace(&mut self.router, Router::new());
        self.router = router.fallback_service(ServeDir::new(dir));
    }

    pub fn mounts(&self) -> &[String] {
        &self.mounts
    }

    /// Bind the listener and start serving in the background.
    pub async fn bind(self, addr: SocketAddr) -> Result<RunningHost> {
        let app = self.router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| LiveError::Server(format!("Failed to bind to {}: {}", addr, e)))?;
        let local_addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        tracing::debug!(addr = %local_addr, "http host listening");

        Ok(RunningHost {
            local_addr,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }
}

/// Whether two mount prefixes would route the same requests.
fn overlaps(a: &str, b: &str) -> bool {
    fn covers(prefix: &str, path: &str) -> bool {
        path == prefix
            || path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    }
    covers(a, b) || covers(b, a)
}

/// A bound, serving HTTP host.
pub struct RunningHost {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<std::io::Result<()>>>,
}

impl RunningHost {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting, let open connections drain, and release the listener.
    ///
    /// Connections still open after the drain timeout are cut off.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        let Some(mut task) = self.task.take() else {
            return Ok(());
        };

        match tokio::time::timeout(DRAIN_TIMEOUT, &mut task).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => return Err(LiveError::Server(format!("Server error: {}", e))),
            Ok(Err(e)) if e.is_cancelled() => {}
            Ok(Err(e)) => return Err(LiveError::Server(format!("Server task failed: {}", e))),
            Err(_) => {
                tracing::warn!(addr = %self.local_addr, "connections did not drain, aborting");
                task.abort();
                let _ = task.await;
            }
        }

        tracing::debug!(addr = %self.local_addr, "http host stopped");
        Ok(())
    }
}

impl Drop for RunningHost {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;

    #[test]
    fn test_overlap_rules() {
        assert!(overlaps("/ws", "/ws"));
        assert!(overlaps("/ws", "/ws/inner"));
        assert!(overlaps("/foo/test/bar", "/foo"));
        assert!(!overlaps("/ws", "/wsx"));
        assert!(!overlaps("/ws", "/live"));
    }

    #[test]
    fn test_mount_rejects_collisions() {
        let mut host = HttpHost::new();
        host.mount("/ws", Router::new().route("/ws", get(|| async { "a" })))
            .unwrap();

        let err = host
            .mount("/ws", Router::new().route("/ws", get(|| async { "b" })))
            .unwrap_err();
        assert!(matches!(err, ConfigError::PathCollision { ref existing, .. } if existing == "/ws"));

        host.mount("/live", Router::new().route("/live", get(|| async { "c" })))
            .unwrap();
        assert_eq!(host.mounts(), ["/ws".to_string(), "/live".to_string()]);
    }

    #[tokio::test]
    async fn test_bind_and_shutdown_releases_port() {
        let mut host = HttpHost::new();
        host.mount("/ping", Router::new().route("/ping", get(|| async { "pong" })))
            .unwrap();

        let running = host.bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = running.local_addr();

        let body = reqwest::get(format!("http://{}/ping", addr))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "pong");

        running.shutdown().await.unwrap();
        assert!(tokio::net::TcpListener::bind(addr).await.is_ok());
    }
}
