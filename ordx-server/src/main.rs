use clap::Parser;
use ordx_core::config::ConfigStore;
use ordx_core::processors::{BlockSource, BlockSyncRunner, HttpBlockSource};
use ordx_core::store::{InscriptionStore, MemoryStore, PgStore};
use ordx_server::config::{ConfigLoader, ListenOverrides, get_database_url};
use ordx_server::server::{build_admin_router, build_router, run_server};
use ordx_server::shutdown::spawn_config_reload_handler;
use ordx_server::state::AppState;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// ordx - inscription location and count indexer
#[derive(Parser, Debug)]
#[command(name = "ordx-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./ordx-config.toml")]
    config: PathBuf,

    /// Override the public API listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Override the admin RPC listen address (e.g., 127.0.0.1:3001)
    #[arg(long)]
    admin_listen: Option<SocketAddr>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting ordx-server v{}", env!("CARGO_PKG_VERSION"));

    let config_loader = Arc::new(ConfigLoader::new(
        &args.config,
        ListenOverrides {
            listen: args.listen,
            admin_listen: args.admin_listen,
        },
    ));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let (store, db_pool) = open_store(args.migrate).await?;

    let source: Option<Arc<dyn BlockSource>> = loaded_config
        .source_url
        .clone()
        .map(|url| Arc::new(HttpBlockSource::new(url)) as Arc<dyn BlockSource>);

    let state = AppState::new(
        store,
        source.clone(),
        ConfigStore::new(loaded_config.ingest),
        ConfigStore::new(loaded_config.sync.clone()),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sync_handle = source.map(|source| {
        tracing::info!("Following upstream block source");
        let runner = BlockSyncRunner::new(
            state.ingestor.clone(),
            source,
            state.sync_config.clone(),
            shutdown_rx.clone(),
        );
        tokio::spawn(runner.run())
    });
    if sync_handle.is_none() {
        tracing::info!("No upstream block source configured, accepting pushed blocks only");
    }

    let reload_notify = spawn_config_reload_handler(state.clone(), config_loader);

    let public = run_server(build_router(state.clone()), loaded_config.server.listen, "public");
    let admin = run_server(
        build_admin_router(state),
        loaded_config.server.admin_listen,
        "admin",
    );
    let result = tokio::try_join!(public, admin);

    reload_notify.notify_one();
    let _ = shutdown_tx.send(true);
    if let Some(handle) = sync_handle {
        if let Err(e) = handle.await {
            tracing::error!("Block sync task failed: {}", e);
        }
    }

    if let Some(pool) = db_pool {
        tracing::info!("Closing database connections...");
        pool.close().await;
    }
    tracing::info!("Server shutdown complete");

    result.map(|_| ()).map_err(Into::into)
}

/// Postgres when `DATABASE_URL` is set, otherwise a process-local store.
async fn open_store(migrate: bool) -> anyhow::Result<(Arc<dyn InscriptionStore>, Option<PgPool>)> {
    let Some(database_url) = get_database_url() else {
        tracing::warn!("DATABASE_URL not set, using the in-memory store; nothing will be persisted");
        let store: Arc<dyn InscriptionStore> = Arc::new(MemoryStore::new());
        return Ok((store, None));
    };

    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    if migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&db_pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                e
            })?;
        tracing::info!("Migrations completed successfully");
    }

    let store: Arc<dyn InscriptionStore> = Arc::new(PgStore::new(db_pool.clone()));
    Ok((store, Some(db_pool)))
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
