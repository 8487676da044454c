use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, info_span, warn, Instrument};

use super::{AnalysisJob, JobQueue, JobState, JobStatus, Reservation};
use crate::config::Config;
use crate::pipeline::Pipeline;

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Identifies this worker's processing list and heartbeat; unique among live workers.
    pub name: String,
    /// Wall-clock limit for a single job.
    pub time_limit: Duration,
    /// How long one reserve call blocks waiting for work.
    pub poll_wait: Duration,
    /// Heartbeat refresh period. The heartbeat lapses after three missed beats.
    pub heartbeat_every: Duration,
}

impl WorkerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            name: config.worker_name.clone(),
            time_limit: Duration::from_secs(config.job_time_limit_secs),
            poll_wait: Duration::from_secs(5),
            heartbeat_every: Duration::from_secs(10),
        }
    }

    fn heartbeat_ttl(&self) -> Duration {
        self.heartbeat_every * 3
    }
}

/// Runs one job to completion or until `time_limit`, recording its status.
pub async fn process_job(
    pipeline: &Pipeline,
    queue: &dyn JobQueue,
    job: &AnalysisJob,
    time_limit: Duration,
) -> JobStatus {
    if let Err(e) = queue.set_status(&JobStatus::running(job)).await {
        warn!(job_id = %job.job_id, "Could not record running status: {e}");
    }

    let status = match tokio::time::timeout(time_limit, pipeline.run_analysis(job.request())).await
    {
        Ok(Ok(outcome)) => JobStatus::succeeded(job, &outcome),
        Ok(Err(e)) => JobStatus::failed(job, e.to_string()),
        Err(_) => {
            error!(
                job_id = %job.job_id,
                limit_secs = time_limit.as_secs(),
                "Job exceeded its time limit and was terminated"
            );
            JobStatus::failed(
                job,
                format!("time limit of {}s exceeded", time_limit.as_secs()),
            )
        }
    };

    if let Err(e) = queue.set_status(&status).await {
        warn!(job_id = %job.job_id, "Could not record final status: {e}");
    }
    status
}

/// Consumes jobs one at a time until `shutdown` resolves.
///
/// Starts a heartbeat, then re-queues anything left on this worker's processing
/// list or on the list of any worker whose heartbeat has lapsed. A job is
/// acknowledged only after it has finished.
pub async fn run_worker<F>(
    pipeline: Pipeline,
    queue: Arc<dyn JobQueue>,
    settings: WorkerSettings,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    let heartbeat = spawn_heartbeat(queue.clone(), &settings).await;

    match queue.recover(&settings.name).await {
        Ok(0) => {}
        Ok(n) => info!(worker = %settings.name, recovered = n, "Redelivering unfinished jobs"),
        Err(e) => error!(worker = %settings.name, "Recovery of unfinished jobs failed: {e}"),
    }

    info!(worker = %settings.name, "Worker waiting for jobs");
    tokio::pin!(shutdown);

    loop {
        let reserved = tokio::select! {
            _ = &mut shutdown => break,
            reserved = queue.reserve(&settings.name, settings.poll_wait) => reserved,
        };

        match reserved {
            Ok(Some(reservation)) => handle(&pipeline, queue.as_ref(), &settings, reservation).await,
            Ok(None) => {}
            Err(e) => {
                error!(worker = %settings.name, "Reserving a job failed: {e}");
                tokio::time::sleep(settings.poll_wait).await;
            }
        }
    }

    heartbeat.abort();
    info!(worker = %settings.name, "Worker stopped");
}

/// Beats once before returning so recovery by other workers sees this one as alive.
async fn spawn_heartbeat(
    queue: Arc<dyn JobQueue>,
    settings: &WorkerSettings,
) -> tokio::task::JoinHandle<()> {
    let name = settings.name.clone();
    let every = settings.heartbeat_every;
    let ttl = settings.heartbeat_ttl();

    if let Err(e) = queue.heartbeat(&name, ttl).await {
        warn!(worker = %name, "Heartbeat failed: {e}");
    }

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = queue.heartbeat(&name, ttl).await {
                warn!(worker = %name, "Heartbeat failed: {e}");
            }
        }
    })
}

async fn handle(
    pipeline: &Pipeline,
    queue: &dyn JobQueue,
    settings: &WorkerSettings,
    reservation: Reservation,
) {
    match reservation.decode() {
        Ok(job) => {
            let span = info_span!("analysis_job", job_id = %job.job_id, resume_id = %job.resume_id);
            let status = process_job(pipeline, queue, &job, settings.time_limit)
                .instrument(span)
                .await;
            match status.state {
                JobState::Succeeded => info!(job_id = %job.job_id, "Job succeeded"),
                _ => warn!(job_id = %job.job_id, error = ?status.error, "Job failed"),
            }
        }
        Err(e) => error!(worker = %settings.name, "Discarding undecodable job: {e}"),
    }

    if let Err(e) = queue.ack(&settings.name, &reservation).await {
        error!(worker = %settings.name, "Acknowledging job failed: {e}");
    }
}
