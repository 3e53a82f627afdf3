//! The mock HTTP server.
//!
//! The server binds `127.0.0.1` on an ephemeral port and serves HTTP/1.1 from
//! a background thread running its own Tokio runtime. Every request is
//! recorded and answered with the next queued [`MockResponse`], or a 404 when
//! the queue is empty.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use bytes::Bytes;
use http::Request;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use tokio::net::TcpListener;

use crate::error::{ServerError, ServerResult};
use crate::exchange::{MockResponse, RecordedRequest};
use crate::shutdown::ShutdownSignal;

#[derive(Debug, Default)]
struct ServerState {
    responses: Mutex<VecDeque<MockResponse>>,
    requests: Mutex<VecDeque<RecordedRequest>>,
    request_count: AtomicUsize,
}

/// A local HTTP server answering with queued responses.
///
/// Shut down explicitly with [`shutdown`](Self::shutdown) or by dropping it.
///
/// ```no_run
/// use assayer_server::{MockResponse, MockServer};
///
/// # fn main() -> Result<(), assayer_server::ServerError> {
/// let server = MockServer::start()?;
/// server.enqueue(MockResponse::json(r#"{"greeting":"Hello World"}"#));
/// println!("listening on {}", server.url("/greeting"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MockServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    shutdown: ShutdownSignal,
    thread: Option<JoinHandle<()>>,
}

impl MockServer {
    /// Binds an ephemeral port on `127.0.0.1` and starts serving.
    pub fn start() -> ServerResult<Self> {
        let requested = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = StdTcpListener::bind(requested).map_err(|source| ServerError::Bind {
            addr: requested,
            source,
        })?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let state = Arc::new(ServerState::default());
        let shutdown = ShutdownSignal::new();

        let thread = {
            let state = Arc::clone(&state);
            let shutdown = shutdown.clone();
            std::thread::Builder::new()
                .name(format!("assayer-mock-server-{}", addr.port()))
                .spawn(move || {
                    runtime.block_on(async move {
                        match TcpListener::from_std(listener) {
                            Ok(listener) => serve(listener, state, shutdown).await,
                            Err(e) => tracing::error!("Failed to register listener: {}", e),
                        }
                    });
                })?
        };

        tracing::debug!("Mock server listening on {}", addr);

        Ok(Self {
            addr,
            state,
            shutdown,
            thread: Some(thread),
        })
    }

    /// Queues a response for the next unanswered request.
    pub fn enqueue(&self, response: MockResponse) {
        self.state.responses.lock().push_back(response);
    }

    /// Absolute URL for `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Base URI including the port, e.g. `http://127.0.0.1:41234`.
    pub fn base_uri(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// The bound port.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// The bound address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Removes and returns the oldest recorded request.
    pub fn take_request(&self) -> Option<RecordedRequest> {
        self.state.requests.lock().pop_front()
    }

    /// Number of requests received since start.
    pub fn request_count(&self) -> usize {
        self.state.request_count.load(Ordering::SeqCst)
    }

    /// Stops accepting connections and waits for the server thread to exit.
    pub fn shutdown(&mut self) {
        self.shutdown.trigger();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Mock server thread on {} panicked", self.addr);
            }
            tracing::debug!("Mock server on {} stopped", self.addr);
        }
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn serve(listener: TcpListener, state: Arc<ServerState>, shutdown: ShutdownSignal) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, remote_addr)) => {
                        let state = Arc::clone(&state);
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, state, shutdown).await {
                                tracing::debug!("Connection error from {}: {}", remote_addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!("Failed to accept connection: {}", e);
                    }
                }
            }

            () = shutdown.recv() => {
                break;
            }
        }
    }
}

async fn handle_connection(
    stream: tokio::net::TcpStream,
    state: Arc<ServerState>,
    shutdown: ShutdownSignal,
) -> Result<(), hyper::Error> {
    let io = TokioIo::new(stream);
    let service = service_fn(move |req: Request<Incoming>| {
        let state = Arc::clone(&state);
        async move { handle_request(&state, req).await }
    });

    let conn = http1::Builder::new().serve_connection(io, service);

    tokio::select! {
        result = conn => result,
        () = shutdown.recv() => Ok(()),
    }
}

async fn handle_request(
    state: &ServerState,
    req: Request<Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            tracing::warn!("Failed to read request body: {}", e);
            Bytes::new()
        }
    };

    tracing::debug!("{} {}", parts.method, parts.uri);

    // Record before answering so the request is visible once the client has a response
    state.requests.lock().push_back(RecordedRequest {
        method: parts.method,
        uri: parts.uri,
        headers: parts.headers,
        body,
    });
    state.request_count.fetch_add(1, Ordering::SeqCst);

    let response = state
        .responses
        .lock()
        .pop_front()
        .unwrap_or_else(MockResponse::not_found);
    Ok(response.into_http())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serves_queued_responses_in_order() {
        let server = MockServer::start().unwrap();
        server.enqueue(MockResponse::json(r#"{"n":1}"#));
        server.enqueue(MockResponse::new(201).body("second"));

        let client = reqwest::Client::new();
        let first = client.get(server.url("/a")).send().await.unwrap();
        assert_eq!(first.status(), 200);
        assert_eq!(first.headers()["content-type"], "application/json");
        assert_eq!(first.text().await.unwrap(), r#"{"n":1}"#);

        let second = client.post(server.url("/b")).body("payload").send().await.unwrap();
        assert_eq!(second.status(), 201);
        assert_eq!(second.text().await.unwrap(), "second");

        assert_eq!(server.request_count(), 2);
        let recorded = server.take_request().unwrap();
        assert_eq!(recorded.method, http::Method::GET);
        assert_eq!(recorded.path(), "/a");
        let recorded = server.take_request().unwrap();
        assert_eq!(recorded.body_str(), Some("payload"));
        assert!(server.take_request().is_none());
    }

    #[tokio::test]
    async fn test_empty_queue_returns_not_found() {
        let server = MockServer::start().unwrap();
        let response = reqwest::get(server.url("/missing")).await.unwrap();
        assert_eq!(response.status(), 404);
        assert_eq!(server.request_count(), 1);
    }

    #[test]
    fn test_shutdown_releases_port() {
        let mut server = MockServer::start().unwrap();
        let addr = server.addr();
        server.shutdown();
        server.shutdown();
        assert!(std::net::TcpStream::connect(addr).is_err());
    }

    #[test]
    fn test_url_and_port() {
        let server = MockServer::start().unwrap();
        assert!(server.port() > 0);
        assert_eq!(server.url("/x"), format!("http://127.0.0.1:{}/x", server.port()));
        assert_eq!(server.base_uri(), format!("http://127.0.0.1:{}", server.port()));
    }
}
