use crate::error::CatalogError;
use crate::service::SyncScheduler;
use axum::Router;
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const DEFAULT_GRACE: Duration = Duration::from_secs(10);

/// Why the process is going down.
#[derive(Debug)]
pub enum ShutdownReason {
    Interrupt,
    SyncFailed(CatalogError),
    /// The serving loop ended without a shutdown request.
    ServerStopped,
}

/// Runs the feed sync loop next to the HTTP server and stops both together.
pub struct Supervisor {
    listener: TcpListener,
    router: Router,
    scheduler: SyncScheduler,
    grace: Duration,
}

impl Supervisor {
    pub fn new(listener: TcpListener, router: Router, scheduler: SyncScheduler) -> Self {
        Self {
            listener,
            router,
            scheduler,
            grace: DEFAULT_GRACE,
        }
    }

    /// How long each task gets to finish once shutdown has started.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Serve until `interrupt` resolves, the sync loop fails or the server exits.
    ///
    /// Returns `Err` only when the server itself failed; a sync failure is
    /// reported as `ShutdownReason::SyncFailed`.
    pub async fn run<F>(self, interrupt: F) -> Result<ShutdownReason, CatalogError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Supervisor {
            listener,
            router,
            scheduler,
            grace,
        } = self;
        let token = CancellationToken::new();
        let (fatal_tx, fatal_rx) = oneshot::channel::<CatalogError>();

        let sync_token = token.clone();
        let mut sync_task = tokio::spawn(async move {
            if let Err(e) = scheduler.run(sync_token).await {
                let _ = fatal_tx.send(e);
            }
        });

        let server_token = token.clone();
        let mut server_task: JoinHandle<std::io::Result<()>> = tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(server_token.clone().cancelled_owned())
                .await;
            server_token.cancel();
            served
        });

        let watch_token = token.clone();
        let watcher = tokio::spawn(async move {
            let reason = tokio::select! {
                _ = interrupt => {
                    info!("interrupt received, shutting down");
                    ShutdownReason::Interrupt
                }
                Ok(err) = fatal_rx => {
                    error!(error = %err, "feed sync failed, shutting down");
                    ShutdownReason::SyncFailed(err)
                }
                _ = watch_token.cancelled() => {
                    warn!("server loop ended, shutting down");
                    ShutdownReason::ServerStopped
                }
            };
            watch_token.cancel();
            reason
        });

        let reason = watcher.await?;

        let served = match timeout(grace, &mut server_task).await {
            Ok(joined) => joined?,
            Err(_) => {
                warn!(grace_secs = grace.as_secs(), "server did not drain in time, aborting");
                server_task.abort();
                Ok(())
            }
        };
        match timeout(grace, &mut sync_task).await {
            Ok(joined) => joined?,
            Err(_) => {
                warn!(grace_secs = grace.as_secs(), "feed sync did not stop in time, aborting");
                sync_task.abort();
            }
        }

        served?;
        info!(?reason, "shutdown complete");
        Ok(reason)
    }
}
