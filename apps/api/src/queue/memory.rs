use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use super::{AnalysisJob, JobQueue, JobStatus, QueueError, Reservation};

/// Same reserve/ack discipline as the Redis queue, held in memory.
#[derive(Default)]
pub struct MemoryQueue {
    pending: Mutex<VecDeque<String>>,
    processing: Mutex<HashMap<String, Vec<String>>>,
    alive_until: Mutex<HashMap<String, Instant>>,
    statuses: Mutex<HashMap<Uuid, JobStatus>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a payload verbatim, bypassing job encoding.
    pub async fn push_raw(&self, payload: &str) {
        self.pending.lock().await.push_back(payload.to_string());
    }

    pub async fn pending_len(&self) -> usize {
        self.pending.lock().await.len()
    }

    pub async fn processing_len(&self, worker: &str) -> usize {
        self.processing
            .lock()
            .await
            .get(worker)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(&self, job: &AnalysisJob) -> Result<(), QueueError> {
        let payload = serde_json::to_string(job)?;
        self.set_status(&JobStatus::queued(job)).await?;
        self.pending.lock().await.push_back(payload);
        Ok(())
    }

    async fn reserve(
        &self,
        worker: &str,
        wait: Duration,
    ) -> Result<Option<Reservation>, QueueError> {
        let next = self.pending.lock().await.pop_front();
        match next {
            Some(payload) => {
                self.processing
                    .lock()
                    .await
                    .entry(worker.to_string())
                    .or_default()
                    .push(payload.clone());
                Ok(Some(Reservation { payload }))
            }
            None => {
                tokio::time::sleep(wait).await;
                Ok(None)
            }
        }
    }

    async fn ack(&self, worker: &str, reservation: &Reservation) -> Result<(), QueueError> {
        if let Some(list) = self.processing.lock().await.get_mut(worker) {
            if let Some(pos) = list.iter().position(|p| *p == reservation.payload) {
                list.remove(pos);
            }
        }
        Ok(())
    }

    async fn heartbeat(&self, worker: &str, ttl: Duration) -> Result<(), QueueError> {
        self.alive_until
            .lock()
            .await
            .insert(worker.to_string(), Instant::now() + ttl);
        Ok(())
    }

    async fn recover(&self, worker: &str) -> Result<usize, QueueError> {
        let now = Instant::now();
        let alive = self.alive_until.lock().await.clone();
        let mut processing = self.processing.lock().await;
        let owners: Vec<String> = processing
            .keys()
            .filter(|owner| {
                owner.as_str() == worker || alive.get(owner.as_str()).map_or(true, |t| *t <= now)
            })
            .cloned()
            .collect();

        let mut pending = self.pending.lock().await;
        let mut count = 0;
        for owner in owners {
            let leftovers = processing.remove(&owner).unwrap_or_default();
            count += leftovers.len();
            pending.extend(leftovers);
        }
        Ok(count)
    }

    async fn set_status(&self, status: &JobStatus) -> Result<(), QueueError> {
        self.statuses
            .lock()
            .await
            .insert(status.job_id, status.clone());
        Ok(())
    }

    async fn status(&self, job_id: Uuid) -> Result<Option<JobStatus>, QueueError> {
        Ok(self.statuses.lock().await.get(&job_id).cloned())
    }
}
