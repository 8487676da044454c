use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use screener::config::Config;
use screener::db::create_pool;
use screener::init_tracing;
use screener::notify::{spawn_push_relay, ConnectionRegistry};
use screener::pipeline::build_pipeline;
use screener::queue::RedisJobQueue;
use screener::routes::build_router;
use screener::state::AppState;
use screener::store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(env!("CARGO_CRATE_NAME"), &config.rust_log);

    info!("Starting screener API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config).await?;
    let store = Arc::new(PgStore::new(db));

    // Initialize Redis
    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    // Inline analyses push straight into this process's sessions; worker
    // events arrive through the relay.
    let registry = ConnectionRegistry::new();
    spawn_push_relay(redis.clone(), registry.clone());

    let pipeline = build_pipeline(&config, store.clone(), Arc::new(registry.clone())).await?;

    let state = AppState {
        store,
        pipeline,
        queue: Arc::new(RedisJobQueue::new(redis)),
        registry,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
