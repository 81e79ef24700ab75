//! Native HTTP server
//!
//! hyper HTTP/1.1 on a multi-threaded tokio runtime:
//! - one task per accepted connection
//! - the [`Dispatcher`] is shared through an `Arc` and never locked
//! - SO_REUSEADDR so a restarted stub can rebind immediately
//! - TCP_NODELAY for low latency

use crate::{Dispatcher, Error, Method, Request, Response, Result};
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use socket2::{Domain, Protocol, Socket, Type};
use std::convert::Infallible;
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{watch, Notify};

/// Environment variable holding the listening port
pub const PORT_ENV: &str = "TEST_SERVER_PORT";

/// Port used when [`PORT_ENV`] is unset
pub const DEFAULT_PORT: u16 = 7986;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub workers: usize,
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            workers: num_cpus::get(),
            max_body_size: crate::dispatcher::DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl ServerConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`.
    ///
    /// An unset port falls back to [`DEFAULT_PORT`]; a set but unparseable
    /// one is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup(PORT_ENV) {
            config.port = raw
                .trim()
                .parse()
                .map_err(|_| Error::InvalidPort(raw.clone()))?;
        }
        Ok(config)
    }

    /// Set the listening port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the listening address
    pub fn host(mut self, host: impl Into<IpAddr>) -> Self {
        self.host = host.into();
        self
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Create a listening TCP socket with optimizations
pub fn create_optimized_socket(addr: &SocketAddr) -> std::io::Result<Socket> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    // SO_REUSEADDR - allow binding to address in TIME_WAIT
    socket.set_reuse_address(true)?;

    // TCP_NODELAY - disable Nagle's algorithm for lower latency
    socket.set_nodelay(true)?;

    socket.set_nonblocking(true)?;
    socket.bind(&(*addr).into())?;
    socket.listen(1024)?;

    Ok(socket)
}

/// Convert hyper request parts plus a buffered body to our Request type
pub fn from_hyper_request(parts: &http::request::Parts, body: Bytes) -> Request {
    let mut request = Request::new(Method::parse(parts.method.as_str()), parts.uri.path());
    request.body = body;

    for (name, value) in &parts.headers {
        if let Ok(v) = value.to_str() {
            request.headers.push((name.to_string(), v.to_string()));
        }
    }

    request
}

/// Convert our Response to hyper Response
pub fn to_hyper_response(res: Response) -> hyper::Response<Full<Bytes>> {
    let mut builder = hyper::Response::builder().status(res.status.as_u16());

    for (name, value) in &res.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    match builder.body(Full::new(res.body)) {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(error = %err, "could not build response");
            let mut response = hyper::Response::new(Full::new(Bytes::new()));
            *response.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
            response
        }
    }
}

/// Buffer a hyper request, refusing bodies over `limit` bytes.
///
/// Only POST bodies are read; the dispatcher answers every other method
/// without looking at the body.
pub async fn read_request(req: hyper::Request<Incoming>, limit: usize) -> Result<Request> {
    let (parts, body) = req.into_parts();
    if parts.method != http::Method::POST {
        return Ok(from_hyper_request(&parts, Bytes::new()));
    }

    let declared = parts
        .headers
        .get(http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());

    let collected = Limited::new(body, limit).collect().await.map_err(|err| {
        if err.is::<LengthLimitError>() {
            Error::BodyTooLarge {
                size: declared.unwrap_or(limit + 1),
                limit,
            }
        } else {
            Error::Hyper(err.to_string())
        }
    })?;

    Ok(from_hyper_request(&parts, collected.to_bytes()))
}

/// Answer one hyper request
async fn handle(
    dispatcher: Arc<Dispatcher>,
    req: hyper::Request<Incoming>,
) -> std::result::Result<hyper::Response<Full<Bytes>>, Infallible> {
    let response = match read_request(req, dispatcher.body_limit()).await {
        Ok(request) => dispatcher.dispatch(&request),
        Err(err) => {
            tracing::debug!(error = %err, "could not read request");
            Response::invalid_request()
        }
    };
    Ok(to_hyper_response(response))
}

/// Stub HTTP server bound to a socket
pub struct Server {
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    tracker: Arc<ConnectionTracker>,
}

impl Server {
    /// Bind the listening socket.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(config: &ServerConfig, dispatcher: Dispatcher) -> Result<Self> {
        let socket = create_optimized_socket(&config.socket_addr())?;
        let listener = TcpListener::from_std(socket.into())?;
        Ok(Self {
            listener,
            dispatcher: Arc::new(dispatcher.max_body_size(config.max_body_size)),
            tracker: Arc::new(ConnectionTracker::new()),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn tracker(&self) -> Arc<ConnectionTracker> {
        self.tracker.clone()
    }

    /// Serve until `shutdown` resolves, then drain open connections
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let Server {
            listener,
            dispatcher,
            tracker,
        } = self;
        let (closing_tx, closing_rx) = watch::channel(false);
        tokio::pin!(shutdown);

        loop {
            let stream = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, _)) => stream,
                    Err(err) => {
                        tracing::warn!(error = %err, "accept failed");
                        continue;
                    }
                },
                _ = &mut shutdown => break,
            };

            let dispatcher = dispatcher.clone();
            let tracker = tracker.clone();
            let mut closing = closing_rx.clone();
            tracker.increment();

            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| handle(dispatcher.clone(), req));
                let conn = http1::Builder::new().serve_connection(io, service);
                tokio::pin!(conn);

                let result = tokio::select! {
                    res = conn.as_mut() => res,
                    _ = closing.changed() => {
                        conn.as_mut().graceful_shutdown();
                        conn.as_mut().await
                    }
                };
                if let Err(err) = result {
                    tracing::debug!(error = %err, "connection error");
                }

                tracker.decrement();
            });
        }

        drop(listener);
        let _ = closing_tx.send(true);
        tracing::info!(active = tracker.count(), "shutting down, draining connections");
        tracker.wait_idle().await;
        Ok(())
    }
}

/// Tracks active connections for graceful shutdown
#[derive(Debug, Default)]
pub struct ConnectionTracker {
    active: AtomicU64,
    idle: Notify,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment(&self) {
        self.active.fetch_add(1, Ordering::SeqCst);
    }

    #[inline]
    pub fn decrement(&self) {
        if self.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    /// Get current active connection count
    #[inline]
    pub fn count(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }

    /// Wait until no connection is active
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // register before checking so a concurrent decrement is not missed
            notified.as_mut().enable();
            if self.count() == 0 {
                return;
            }
            notified.await;
        }
    }
}
