use crate::api::FeedClient;
use crate::db::models::FeedProduct;
use crate::db::storage::ProductStorage;
use crate::error::CatalogError;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Where the sync loop currently is.
///
/// `Priming -> Fetching -> Reconciling -> Waiting -> (Fetching | Stopped)`,
/// with any fetch or reconcile error ending in `Failed`.
#[derive(Debug)]
pub enum SyncState {
    Priming,
    Waiting,
    Fetching,
    Reconciling(Vec<FeedProduct>),
    Stopped,
    Failed(CatalogError),
}

/// Pulls feed pages on a fixed interval and reconciles each into the catalog.
///
/// The offset cursor lives only in memory and advances by one page after a
/// committed batch, so a restart re-reads from offset 0.
pub struct SyncScheduler {
    feed: Arc<dyn FeedClient>,
    store: Arc<dyn ProductStorage>,
    interval: Duration,
    page_size: u64,
    offset: u64,
}

impl SyncScheduler {
    pub fn new(
        feed: Arc<dyn FeedClient>,
        store: Arc<dyn ProductStorage>,
        interval: Duration,
        page_size: u64,
    ) -> Self {
        Self {
            feed,
            store,
            interval,
            page_size,
            offset: 0,
        }
    }

    /// Runs until `shutdown` is cancelled (`Ok`) or a page fails to sync (`Err`).
    ///
    /// Cancellation is only observed while waiting for the next tick; an
    /// in-flight fetch or reconcile always runs to completion.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), CatalogError> {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut state = SyncState::Priming;
        loop {
            state = match state {
                SyncState::Priming => {
                    info!(
                        interval_secs = self.interval.as_secs(),
                        page_size = self.page_size,
                        "feed sync started"
                    );
                    SyncState::Fetching
                }
                SyncState::Waiting => {
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => SyncState::Stopped,
                        _ = ticker.tick() => SyncState::Fetching,
                    }
                }
                SyncState::Fetching => match self.feed.fetch_page(self.offset).await {
                    Ok(page) => SyncState::Reconciling(page),
                    Err(e) => SyncState::Failed(e),
                },
                SyncState::Reconciling(page) => match self.store.reconcile_batch(&page).await {
                    Ok(()) => {
                        debug!(offset = self.offset, count = page.len(), "feed page committed");
                        self.offset += self.page_size;
                        SyncState::Waiting
                    }
                    Err(e) => SyncState::Failed(e),
                },
                SyncState::Stopped => {
                    info!(offset = self.offset, "feed sync stopped");
                    return Ok(());
                }
                SyncState::Failed(e) => {
                    error!(offset = self.offset, error = %e, "feed sync failed");
                    return Err(e);
                }
            };
        }
    }
}
