//! Queued execution of the analysis pipeline.
//!
//! Jobs sit on a Redis list. A worker reserves one by atomically moving it onto
//! its own processing list and removes it from there only after the run has
//! finished. Live workers keep a heartbeat key alive; any worker starting up
//! re-queues its own leftovers and those of workers whose heartbeat has lapsed,
//! so a crashed worker's job is redelivered even if it never comes back under
//! the same name. There are no retries and no deduplication: a redelivered job
//! is a full re-run.

pub mod handlers;
#[cfg(test)]
mod memory;
mod redis_queue;
mod worker;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::requirement::Requirement;
use crate::pipeline::{AnalysisOutcome, AnalysisRequest};

#[cfg(test)]
pub use memory::MemoryQueue;
pub use redis_queue::RedisJobQueue;
pub use worker::{process_job, run_worker, WorkerSettings};

/// Redis list holding pending analysis jobs.
pub const QUEUE_KEY: &str = "screener:queue:resume_analysis";

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("job encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("queue unavailable: {0}")]
    Unavailable(String),
}

/// Queued payload: everything the worker needs to run the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub job_id: Uuid,
    pub resume_id: Uuid,
    pub user_id: Uuid,
    pub requirement: Requirement,
    pub enqueued_at: DateTime<Utc>,
}

impl AnalysisJob {
    pub fn new(resume_id: Uuid, user_id: Uuid, requirement: Requirement) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            resume_id,
            user_id,
            requirement,
            enqueued_at: Utc::now(),
        }
    }

    pub fn request(&self) -> AnalysisRequest {
        AnalysisRequest {
            task_id: self.job_id,
            resume_id: self.resume_id,
            user_id: self.user_id,
            requirement: self.requirement.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_id: Uuid,
    pub resume_id: Uuid,
    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl JobStatus {
    fn with_state(job: &AnalysisJob, state: JobState) -> Self {
        Self {
            job_id: job.job_id,
            resume_id: job.resume_id,
            state,
            analysis_id: None,
            match_score: None,
            error: None,
            updated_at: Utc::now(),
        }
    }

    pub fn queued(job: &AnalysisJob) -> Self {
        Self::with_state(job, JobState::Queued)
    }

    pub fn running(job: &AnalysisJob) -> Self {
        Self::with_state(job, JobState::Running)
    }

    pub fn succeeded(job: &AnalysisJob, outcome: &AnalysisOutcome) -> Self {
        Self {
            analysis_id: Some(outcome.record.id),
            match_score: Some(outcome.record.result.match_score),
            ..Self::with_state(job, JobState::Succeeded)
        }
    }

    pub fn failed(job: &AnalysisJob, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::with_state(job, JobState::Failed)
        }
    }
}

/// A job taken off the queue but not yet acknowledged.
#[derive(Debug, Clone)]
pub struct Reservation {
    /// Exact payload as stored; acknowledging removes this value.
    pub payload: String,
}

impl Reservation {
    pub fn decode(&self) -> Result<AnalysisJob, serde_json::Error> {
        serde_json::from_str(&self.payload)
    }
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Records the job as queued and appends it to the queue.
    async fn enqueue(&self, job: &AnalysisJob) -> Result<(), QueueError>;

    /// Waits up to `wait` for a job and moves it onto `worker`'s processing list.
    async fn reserve(&self, worker: &str, wait: Duration)
        -> Result<Option<Reservation>, QueueError>;

    /// Removes a finished job from `worker`'s processing list.
    async fn ack(&self, worker: &str, reservation: &Reservation) -> Result<(), QueueError>;

    /// Marks `worker` as alive for `ttl`.
    async fn heartbeat(&self, worker: &str, ttl: Duration) -> Result<(), QueueError>;

    /// Moves everything left on `worker`'s processing list, and on the lists of
    /// workers without a live heartbeat, back onto the queue.
    async fn recover(&self, worker: &str) -> Result<usize, QueueError>;

    async fn set_status(&self, status: &JobStatus) -> Result<(), QueueError>;

    async fn status(&self, job_id: Uuid) -> Result<Option<JobStatus>, QueueError>;
}
