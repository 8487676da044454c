use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{Audience, ConnectionRegistry, PushChannel, PushError, PushEvent};

/// Redis pub/sub channel carrying push events from workers to API processes.
pub const PUSH_CHANNEL: &str = "screener:push";

const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize, Deserialize)]
struct RelayEnvelope {
    audience: Audience,
    event: PushEvent,
}

/// Push channel for processes without sockets: publishes each event for the
/// API processes' relays to deliver.
#[derive(Clone)]
pub struct RedisPushPublisher {
    client: redis::Client,
}

impl RedisPushPublisher {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PushChannel for RedisPushPublisher {
    /// Returns the number of subscribed relays, not sessions.
    async fn push(&self, audience: Audience, event: &PushEvent) -> Result<usize, PushError> {
        let payload = serde_json::to_string(&RelayEnvelope {
            audience,
            event: event.clone(),
        })?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let receivers: usize = redis::cmd("PUBLISH")
            .arg(PUSH_CHANNEL)
            .arg(&payload)
            .query_async::<_, usize>(&mut conn)
            .await?;
        debug!(receivers, kind = %event.kind, "Push event published");
        Ok(receivers)
    }
}

/// Subscribes to [`PUSH_CHANNEL`] and forwards every event into `registry`,
/// resubscribing after connection loss.
pub fn spawn_push_relay(client: redis::Client, registry: ConnectionRegistry) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match run_relay(&client, &registry).await {
                Ok(()) => warn!("Push relay subscription ended"),
                Err(e) => error!("Push relay failed: {e}"),
            }
            tokio::time::sleep(RESUBSCRIBE_DELAY).await;
        }
    })
}

async fn run_relay(
    client: &redis::Client,
    registry: &ConnectionRegistry,
) -> Result<(), redis::RedisError> {
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(PUSH_CHANNEL).await?;
    info!(channel = PUSH_CHANNEL, "Push relay subscribed");

    let mut messages = pubsub.on_message();
    while let Some(msg) = messages.next().await {
        let payload: String = match msg.get_payload() {
            Ok(p) => p,
            Err(e) => {
                warn!("Unreadable push relay payload: {e}");
                continue;
            }
        };
        if let Err(e) = deliver_envelope(registry, &payload).await {
            warn!("Dropping malformed push relay message: {e}");
        }
    }
    Ok(())
}

async fn deliver_envelope(
    registry: &ConnectionRegistry,
    payload: &str,
) -> Result<usize, PushError> {
    let envelope: RelayEnvelope = serde_json::from_str(payload)?;
    registry.push(envelope.audience, &envelope.event).await
}
