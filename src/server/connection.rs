// Connection handling
// Admission against the connection limit, then one HTTP/1.1 connection per task

use crate::app::App;
use crate::config::PerformanceConfig;
use crate::handler;
use crate::http::ResponseBody;
use crate::logger::{self, AccessLogEntry};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioIo, TokioTimer};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::watch;

/// Per-connection HTTP settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionOptions {
    pub keep_alive: bool,
    /// Time allowed for a request head to arrive
    pub header_read_timeout: Duration,
    /// Upper bound on a connection's whole lifetime
    pub connection_timeout: Duration,
    pub max_connections: Option<usize>,
}

impl ConnectionOptions {
    pub fn from_config(perf: &PerformanceConfig) -> Self {
        Self {
            keep_alive: perf.keep_alive_timeout > 0,
            header_read_timeout: Duration::from_secs(perf.read_timeout.max(1)),
            connection_timeout: Duration::from_secs(
                perf.read_timeout.max(perf.write_timeout).max(1),
            ),
            max_connections: perf
                .max_connections
                .map(|max| usize::try_from(max).unwrap_or(usize::MAX)),
        }
    }
}

/// Slot in the active connection count, released on drop
pub struct ConnectionGuard {
    counter: Arc<AtomicUsize>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Reserve a connection slot; `None` when the limit is reached
pub fn admit(counter: &Arc<AtomicUsize>, max: Option<usize>) -> Option<ConnectionGuard> {
    // Increment first, then check, so concurrent accepts cannot overshoot
    let prev = counter.fetch_add(1, Ordering::SeqCst);
    let guard = ConnectionGuard {
        counter: Arc::clone(counter),
    };
    match max {
        Some(max) if prev >= max => {
            logger::log_warning(&format!(
                "Max connections reached: {prev}/{max}. Connection rejected."
            ));
            None
        }
        _ => Some(guard),
    }
}

/// Serve one accepted connection until it closes, times out, or finishes
/// draining after shutdown was signalled
pub async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    app: Arc<App>,
    options: ConnectionOptions,
    mut shutdown: watch::Receiver<bool>,
) {
    let service = service_fn(move |req: Request<Incoming>| {
        let app = Arc::clone(&app);
        async move { Ok::<_, Infallible>(respond(req, app, peer).await) }
    });

    let mut builder = http1::Builder::new();
    builder
        .keep_alive(options.keep_alive)
        .timer(TokioTimer::new())
        .header_read_timeout(options.header_read_timeout);

    let conn = builder.serve_connection(TokioIo::new(stream), service);
    tokio::pin!(conn);
    let deadline = tokio::time::sleep(options.connection_timeout);
    tokio::pin!(deadline);
    let mut draining = *shutdown.borrow();
    if draining {
        conn.as_mut().graceful_shutdown();
    }

    loop {
        tokio::select! {
            res = conn.as_mut() => {
                if let Err(err) = res {
                    logger::log_connection_error(&err);
                }
                break;
            }
            changed = shutdown.changed(), if !draining => {
                draining = true;
                if changed.is_ok() {
                    conn.as_mut().graceful_shutdown();
                }
            }
            () = &mut deadline => {
                logger::log_warning(&format!(
                    "Connection from {peer} closed after {} seconds",
                    options.connection_timeout.as_secs()
                ));
                break;
            }
        }
    }
}

/// Dispatch one request and write its access log line
async fn respond(req: Request<Incoming>, app: Arc<App>, peer: SocketAddr) -> Response<ResponseBody> {
    if !logger::access_log_enabled() {
        return handler::handle_request(req, app, Some(peer)).await;
    }

    let started = Instant::now();
    let mut entry = AccessLogEntry::from_request(&req, Some(peer));
    let resp = handler::handle_request(req, app, Some(peer)).await;
    entry.finish(
        resp.status().as_u16(),
        resp.body().size_hint().exact(),
        started.elapsed(),
    );
    logger::log_access(&entry);
    resp
}
