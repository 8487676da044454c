//! Every call to an external language model goes through here.
//!
//! Backends implement [`LlmProvider`]; one is picked at startup from
//! `AI_PROVIDER` and shared as `Arc<dyn LlmProvider>`. No call is retried.
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use thiserror::Error;

use crate::config::{AiProvider, Config};

mod anthropic;
mod openai;

pub use anthropic::AnthropicClient;
pub use openai::OpenAiCompatibleClient;

/// Sampling temperature for all evaluation calls.
pub const TEMPERATURE: f32 = 0.2;
pub const MAX_TOKENS: u32 = 3000;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// A text-completion backend: one system instruction, one user message, one reply.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ProviderError>;

    /// Short backend label for logs.
    fn name(&self) -> &str;
}

/// Builds the backend selected by `config.ai_provider`.
pub fn build_provider(config: &Config) -> Result<Arc<dyn LlmProvider>> {
    let timeout = Duration::from_secs(config.llm_timeout_secs);
    let provider: Arc<dyn LlmProvider> = match config.ai_provider {
        AiProvider::Anthropic => {
            let key = config
                .anthropic_api_key
                .clone()
                .context("ANTHROPIC_API_KEY is required when AI_PROVIDER=anthropic")?;
            Arc::new(AnthropicClient::new(key, timeout)?)
        }
        AiProvider::OpenAi => {
            let key = config
                .openai_api_key
                .clone()
                .context("OPENAI_API_KEY is required when AI_PROVIDER=openai")?;
            let base_url = config
                .openai_base_url
                .clone()
                .unwrap_or_else(|| openai::OPENAI_BASE_URL.to_string());
            Arc::new(OpenAiCompatibleClient::new(
                "openai",
                base_url,
                key,
                config.openai_model.clone(),
                timeout,
            )?)
        }
        AiProvider::ZhipuAi => {
            let key = config
                .zhipuai_api_key
                .clone()
                .context("ZHIPUAI_API_KEY is required when AI_PROVIDER=zhipuai")?;
            Arc::new(OpenAiCompatibleClient::new(
                "zhipuai",
                openai::ZHIPUAI_BASE_URL.to_string(),
                key,
                config.zhipuai_model.clone(),
                timeout,
            )?)
        }
    };
    Ok(provider)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
