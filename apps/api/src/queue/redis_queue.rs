use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use super::{AnalysisJob, JobQueue, JobStatus, QueueError, Reservation, QUEUE_KEY};

/// Job status entries expire after a week.
const STATUS_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Redis list queue with per-worker processing lists.
#[derive(Clone)]
pub struct RedisJobQueue {
    client: redis::Client,
    queue_key: String,
}

impl RedisJobQueue {
    pub fn new(client: redis::Client) -> Self {
        Self {
            client,
            queue_key: QUEUE_KEY.to_string(),
        }
    }

    async fn get_conn(&self) -> Result<redis::aio::MultiplexedConnection, QueueError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| QueueError::Unavailable(e.to_string()))
    }

    fn processing_key(&self, worker: &str) -> String {
        format!("{}:processing:{worker}", self.queue_key)
    }

    fn heartbeat_key(&self, worker: &str) -> String {
        format!("{}:alive:{worker}", self.queue_key)
    }

    /// Worker name encoded in a processing list key.
    fn owner_of<'a>(&self, processing_key: &'a str) -> Option<&'a str> {
        processing_key
            .strip_prefix(self.queue_key.as_str())?
            .strip_prefix(":processing:")
            .filter(|owner| !owner.is_empty())
    }

    async fn processing_keys(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
    ) -> Result<Vec<String>, QueueError> {
        let pattern = format!("{}:processing:*", self.queue_key);
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn drain(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        processing: &str,
    ) -> Result<usize, QueueError> {
        let mut moved_count = 0;
        loop {
            let moved: Option<String> = redis::cmd("RPOPLPUSH")
                .arg(processing)
                .arg(&self.queue_key)
                .query_async(conn)
                .await?;
            if moved.is_none() {
                return Ok(moved_count);
            }
            moved_count += 1;
        }
    }
}

fn status_key(job_id: Uuid) -> String {
    format!("screener:job:{job_id}")
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue(&self, job: &AnalysisJob) -> Result<(), QueueError> {
        let payload = serde_json::to_string(job)?;
        self.set_status(&JobStatus::queued(job)).await?;

        let mut conn = self.get_conn().await?;
        redis::cmd("LPUSH")
            .arg(&self.queue_key)
            .arg(&payload)
            .query_async::<_, i64>(&mut conn)
            .await?;

        debug!(queue = %self.queue_key, job_id = %job.job_id, "Job enqueued");
        Ok(())
    }

    async fn reserve(
        &self,
        worker: &str,
        wait: Duration,
    ) -> Result<Option<Reservation>, QueueError> {
        let mut conn = self.get_conn().await?;
        let payload: Option<String> = redis::cmd("BRPOPLPUSH")
            .arg(&self.queue_key)
            .arg(self.processing_key(worker))
            .arg(wait.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(payload.map(|payload| Reservation { payload }))
    }

    async fn ack(&self, worker: &str, reservation: &Reservation) -> Result<(), QueueError> {
        let mut conn = self.get_conn().await?;
        redis::cmd("LREM")
            .arg(self.processing_key(worker))
            .arg(1)
            .arg(&reservation.payload)
            .query_async::<_, i64>(&mut conn)
            .await?;
        Ok(())
    }

    async fn heartbeat(&self, worker: &str, ttl: Duration) -> Result<(), QueueError> {
        let mut conn = self.get_conn().await?;
        redis::cmd("SET")
            .arg(self.heartbeat_key(worker))
            .arg(1)
            .arg("PX")
            .arg(ttl.as_millis().max(1) as u64)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn recover(&self, worker: &str) -> Result<usize, QueueError> {
        let mut conn = self.get_conn().await?;
        let mut recovered = 0;
        for key in self.processing_keys(&mut conn).await? {
            let Some(owner) = self.owner_of(&key) else {
                continue;
            };
            if owner != worker {
                let alive: bool = redis::cmd("EXISTS")
                    .arg(self.heartbeat_key(owner))
                    .query_async(&mut conn)
                    .await?;
                if alive {
                    continue;
                }
            }
            let moved = self.drain(&mut conn, &key).await?;
            if moved > 0 {
                info!(worker, owner, moved, "Re-queued unacknowledged jobs");
            }
            recovered += moved;
        }
        Ok(recovered)
    }

    async fn set_status(&self, status: &JobStatus) -> Result<(), QueueError> {
        let json = serde_json::to_string(status)?;
        let mut conn = self.get_conn().await?;
        redis::cmd("SET")
            .arg(status_key(status.job_id))
            .arg(json)
            .arg("EX")
            .arg(STATUS_TTL_SECS)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn status(&self, job_id: Uuid) -> Result<Option<JobStatus>, QueueError> {
        let mut conn = self.get_conn().await?;
        let json: Option<String> = redis::cmd("GET")
            .arg(status_key(job_id))
            .query_async(&mut conn)
            .await?;
        Ok(json.map(|j| serde_json::from_str(&j)).transpose()?)
    }
}
