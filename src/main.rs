//! stakegate server entry point.
//!
//! Starts the Axum HTTP server over the ledger services: connects the
//! database pool, runs migrations, loads the chain registry, and wires
//! the reconciliation and sync services into the REST router.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use stakegate::api;
use stakegate::app_state::AppState;
use stakegate::chain::ChainReader;
use stakegate::chain::registry::ChainRegistry;
use stakegate::chain::rpc::RpcChainReader;
use stakegate::config::GatewayConfig;
use stakegate::persistence::LedgerStore;
use stakegate::persistence::postgres::PostgresLedgerStore;
use stakegate::service::{BalanceSyncService, PoolService, ReconciliationService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = GatewayConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting stakegate");

    let registry = Arc::new(ChainRegistry::from_config(&config)?);
    if registry.is_empty() {
        tracing::warn!("no chains configured; all reconciliations will be rejected as unsupported");
    }

    // Connect the database and apply migrations
    let db = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    // Build the service layer over the store and chain seams
    let store: Arc<dyn LedgerStore> = Arc::new(PostgresLedgerStore::new(db));
    let chain: Arc<dyn ChainReader> = Arc::new(RpcChainReader::new(config.rpc_timeout_secs)?);

    let app_state = AppState {
        pools: Arc::new(PoolService::new(
            Arc::clone(&store),
            Arc::clone(&chain),
            Arc::clone(&registry),
        )),
        reconciliation: Arc::new(ReconciliationService::new(
            Arc::clone(&store),
            Arc::clone(&chain),
            Arc::clone(&registry),
        )),
        balance_sync: Arc::new(BalanceSyncService::new(store, chain, Arc::clone(&registry))),
        registry,
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
