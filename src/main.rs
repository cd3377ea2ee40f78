use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use friendscore_api::{
    api::{create_router, AppState},
    config::Config,
    db::{self, ConsensusStore, InMemoryStore, PgConsensusStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("friendscore_api=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let settings = config.engine_settings()?;

    let store: Arc<dyn ConsensusStore> = if config.in_memory {
        tracing::warn!("Running with in-memory storage; data is lost on shutdown");
        Arc::new(InMemoryStore::new())
    } else {
        let pool = db::create_pool(&config.database_url).await?;
        db::run_migrations(&pool).await?;
        tracing::info!("Connected to database and applied migrations");
        Arc::new(PgConsensusStore::new(pool))
    };

    let app = create_router(AppState::new(store, settings));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        address = %addr,
        default_trust_weight = settings.default_weight.value(),
        recalc_concurrency = settings.max_concurrency,
        "Server running"
    );
    axum::serve(listener, app).await?;

    Ok(())
}
