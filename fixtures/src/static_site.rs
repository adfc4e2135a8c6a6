//! In-process static file server for sample and test sites.

use crate::background::run_in_background;
use crate::fixture::ServerFixture;
use crate::projects::find_sample_or_test_site_path;
use anyhow::Context;
use axum::Router;
use errors::FixtureError;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use tokio::sync::oneshot;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Serves the directory of a registered test application over HTTP.
///
/// The server runs on its own thread with its own tokio runtime, so the
/// fixture works from plain `#[test]` functions as well as async tests.
pub struct StaticSiteServerFixture {
    project_name: String,
    content_root: Option<PathBuf>,
    server: Mutex<Option<RunningServer>>,
}

struct RunningServer {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    thread: JoinHandle<anyhow::Result<()>>,
}

impl StaticSiteServerFixture {
    /// Fixture for the site registered as `project_name`.
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            content_root: None,
            server: Mutex::new(None),
        }
    }

    /// Serves `content_root` instead of looking the project up.
    pub fn with_content_root(mut self, content_root: impl Into<PathBuf>) -> Self {
        self.content_root = Some(content_root.into());
        self
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Address the server is bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.lock().as_ref().map(|server| server.addr)
    }
}

impl ServerFixture for StaticSiteServerFixture {
    fn start_and_get_root_uri(&self) -> anyhow::Result<String> {
        let content_root = match &self.content_root {
            Some(root) => root.clone(),
            None => find_sample_or_test_site_path(&self.project_name)?,
        };

        let server = run_in_background(move || spawn_server(content_root))?;
        let root_uri = format!("http://{}", server.addr);
        *self.server.lock() = Some(server);

        Ok(root_uri)
    }

    fn dispose(&mut self) -> anyhow::Result<()> {
        let Some(server) = self.server.get_mut().take() else {
            return Ok(());
        };

        // The receiver is gone only if the server already stopped.
        let _ = server.shutdown.send(());
        server
            .thread
            .join()
            .map_err(|_| FixtureError::Server {
                reason: format!("static site server on {} panicked", server.addr),
            })??;

        info!(addr = %server.addr, project = %self.project_name, "Static site server stopped");
        Ok(())
    }
}

fn spawn_server(content_root: PathBuf) -> anyhow::Result<RunningServer> {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0))?;
    listener.set_nonblocking(true)?;
    let addr = listener.local_addr()?;
    let (shutdown, shutdown_rx) = oneshot::channel::<()>();

    debug!(%addr, root = %content_root.display(), "Starting static site server");

    let thread = thread::Builder::new()
        .name(format!("static-site-{}", addr.port()))
        .spawn(move || -> anyhow::Result<()> {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .context("failed to build static site runtime")?;

            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener)?;
                let router = Router::new()
                    .fallback_service(ServeDir::new(content_root))
                    .layer(TraceLayer::new_for_http());

                axum::serve(listener, router)
                    .with_graceful_shutdown(async {
                        let _ = shutdown_rx.await;
                    })
                    .await?;
                Ok::<(), anyhow::Error>(())
            })
        })?;

    Ok(RunningServer {
        addr,
        shutdown,
        thread,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::FixtureHost;
    use config::E2eTestOptions;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use tempfile::TempDir;

    fn http_get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        write!(
            stream,
            "GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n"
        )
        .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    #[test]
    fn test_serves_content_root() {
        let root = TempDir::new().unwrap();
        std::fs::write(root.path().join("index.html"), "<h1>fixture</h1>").unwrap();

        let host = FixtureHost::with_options(
            StaticSiteServerFixture::new("Scratch").with_content_root(root.path()),
            E2eTestOptions::default(),
        );
        let uri = host.root_uri().unwrap().clone();
        assert_eq!(uri.host_str(), Some("127.0.0.1"));

        let addr = host.fixture().local_addr().unwrap();
        assert_eq!(uri.port(), Some(addr.port()));

        let response = http_get(addr, "/index.html");
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("<h1>fixture</h1>"));

        host.dispose().unwrap();
        assert!(TcpStream::connect(addr).is_err());
    }

    #[test]
    fn test_unknown_project_fails_startup() {
        let host = FixtureHost::with_options(
            StaticSiteServerFixture::new("DoesNotExist"),
            E2eTestOptions::default(),
        );
        let err = host.root_uri().unwrap_err();
        assert!(err.to_string().contains("DoesNotExist"));
        assert!(host.fixture().local_addr().is_none());
    }

    #[test]
    fn test_dispose_without_start() {
        let mut fixture = StaticSiteServerFixture::new("SampleApp");
        fixture.dispose().unwrap();
    }
}
