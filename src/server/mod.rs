// Server module entry
// Accept loop, connection admission and graceful shutdown

pub mod connection;
pub mod listener;
pub mod signal;

pub use connection::ConnectionOptions;
pub use listener::create_reusable_listener;
pub use signal::shutdown_signal;

use crate::app::App;
use crate::error::Error;
use crate::logger;
use std::future::Future;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;

/// Serve until SIGTERM/SIGINT, then drain in-flight connections
pub async fn serve(listener: TcpListener, app: Arc<App>, options: ConnectionOptions) -> Result<(), Error> {
    serve_with_shutdown(listener, app, options, shutdown_signal()).await
}

/// Serve until `shutdown` resolves; its output names the trigger in the log
pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    app: Arc<App>,
    options: ConnectionOptions,
    shutdown: F,
) -> Result<(), Error>
where
    F: Future<Output = &'static str>,
{
    let active = Arc::new(AtomicUsize::new(0));
    let (drain_tx, drain_rx) = watch::channel(false);
    let mut tasks = JoinSet::new();

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            // Shutdown wins over queued accepts
            biased;

            reason = &mut shutdown => {
                logger::log_shutdown_requested(reason);
                break;
            }

            res = listener.accept() => {
                let (stream, peer) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                        continue;
                    }
                };
                let Some(guard) = connection::admit(&active, options.max_connections) else {
                    drop(stream);
                    continue;
                };

                let app = Arc::clone(&app);
                let drain = drain_rx.clone();
                tasks.spawn(async move {
                    connection::serve_connection(stream, peer, app, options, drain).await;
                    drop(guard);
                });
            }

            // Reap finished tasks so the set does not grow unbounded
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    drop(listener);
    let _ = drain_tx.send(true);
    let mut drained = 0;
    while tasks.join_next().await.is_some() {
        drained += 1;
    }
    logger::log_shutdown_complete(drained);
    Ok(())
}
