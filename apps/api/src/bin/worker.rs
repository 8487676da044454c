use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use screener::config::Config;
use screener::db::create_pool;
use screener::init_tracing;
use screener::notify::RedisPushPublisher;
use screener::pipeline::build_pipeline;
use screener::queue::{run_worker, RedisJobQueue, WorkerSettings};
use screener::store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(env!("CARGO_CRATE_NAME"), &config.rust_log);

    let settings = WorkerSettings::from_config(&config);
    info!(
        worker = %settings.name,
        time_limit_secs = settings.time_limit.as_secs(),
        "Starting screener worker v{}",
        env!("CARGO_PKG_VERSION")
    );

    let db = create_pool(&config).await?;
    let store = Arc::new(PgStore::new(db));

    let redis = redis::Client::open(config.redis_url.clone())?;
    // No sockets here: match events go out through the API processes.
    let push = Arc::new(RedisPushPublisher::new(redis.clone()));
    let pipeline = build_pipeline(&config, store, push).await?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Could not listen for shutdown signal: {e}");
            std::future::pending::<()>().await;
        }
        info!("Shutdown requested; finishing current job");
    };

    run_worker(pipeline, Arc::new(RedisJobQueue::new(redis)), settings, shutdown).await;
    Ok(())
}
