//! The analysis sequence shared by inline requests and queued jobs.

mod runner;
mod state;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

pub use runner::{AnalysisOutcome, AnalysisRequest, Pipeline, PipelineError};
pub use state::{TaskState, TaskTracker, TransitionError};

use crate::config::Config;
use crate::evaluation::MatchEvaluator;
use crate::llm_client::build_provider;
use crate::notify::{Mailer, Notifier, PushChannel, SesMailer};
use crate::store::Store;

/// Wires the configured provider and mail transport into a pipeline that
/// pushes through `push`.
pub async fn build_pipeline(
    config: &Config,
    store: Arc<dyn Store>,
    push: Arc<dyn PushChannel>,
) -> Result<Pipeline> {
    let provider = build_provider(config)?;
    info!(provider = provider.name(), "LLM provider initialized");

    let mailer: Option<Arc<dyn Mailer>> = if config.email_enabled() {
        let mailer = SesMailer::from_config(config).await;
        info!("SES mailer initialized");
        mailer.map(|m| Arc::new(m) as Arc<dyn Mailer>)
    } else {
        info!("MAIL_FROM not set; match emails disabled");
        None
    };

    Ok(Pipeline::new(
        store,
        MatchEvaluator::new(provider),
        Notifier::new(push, mailer),
    ))
}
