use mimalloc::MiMalloc;
use std::sync::Arc;
use storefront_catalog::api::DummyJsonClient;
use storefront_catalog::config::Config;
use storefront_catalog::db::{self, SqliteCategories, SqliteProducts, SqliteSessions, SqliteUsers};
use storefront_catalog::router::{CatalogState, catalog_router};
use storefront_catalog::service::{Accounts, SessionManager, SyncScheduler};
use storefront_catalog::supervisor::{ShutdownReason, Supervisor};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        listen_addr = %cfg.basic.listen_addr,
        database_url = %cfg.basic.database_url,
        loglevel = %cfg.basic.loglevel,
        feed_url = %cfg.sync.feed_url,
        interval_secs = cfg.sync.interval_secs,
        page_size = cfg.sync.page_size,
        session_ttl_hours = cfg.session.ttl_hours
    );

    let pool = db::sqlite::connect(&cfg.basic.database_url).await?;
    let products = Arc::new(SqliteProducts::new(pool.clone()));
    let categories = Arc::new(SqliteCategories::new(pool.clone()));
    let sessions = SessionManager::new(
        Arc::new(SqliteSessions::new(pool.clone())),
        cfg.session.ttl(),
    );
    let accounts = Accounts::new(Arc::new(SqliteUsers::new(pool)), sessions);

    let feed = DummyJsonClient::new(
        cfg.sync.feed_url.clone(),
        cfg.sync.page_size,
        cfg.sync.request_timeout(),
    )?;
    let scheduler = SyncScheduler::new(
        Arc::new(feed),
        products.clone(),
        cfg.sync.interval(),
        cfg.sync.page_size,
    );

    let state = CatalogState::new(accounts, categories, products, cfg.basic.insecure_cookie);
    let app = catalog_router(state);

    let listener = TcpListener::bind(&cfg.basic.listen_addr).await?;
    info!("HTTP server listening on {}", cfg.basic.listen_addr);

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    match Supervisor::new(listener, app, scheduler).run(interrupt).await? {
        ShutdownReason::SyncFailed(e) => Err(e.into()),
        ShutdownReason::Interrupt | ShutdownReason::ServerStopped => Ok(()),
    }
}
