use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

const DEFAULT_MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Which LLM backend the match evaluator talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    Anthropic,
    OpenAi,
    ZhipuAi,
}

impl FromStr for AiProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(AiProvider::Anthropic),
            "openai" => Ok(AiProvider::OpenAi),
            "zhipuai" | "zhipu" => Ok(AiProvider::ZhipuAi),
            other => Err(anyhow!(
                "AI_PROVIDER must be one of anthropic, openai, zhipuai (got '{other}')"
            )),
        }
    }
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AiProvider::Anthropic => "anthropic",
            AiProvider::OpenAi => "openai",
            AiProvider::ZhipuAi => "zhipuai",
        })
    }
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub redis_url: String,

    pub ai_provider: AiProvider,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: Option<String>,
    pub zhipuai_api_key: Option<String>,
    pub zhipuai_model: String,
    pub llm_timeout_secs: u64,

    pub upload_dir: PathBuf,
    pub max_upload_size: usize,

    /// Email notifications are disabled when unset.
    pub mail_from: Option<String>,
    pub ses_region: Option<String>,

    pub worker_name: String,
    pub job_time_limit_secs: u64,

    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        let ai_provider = match var("AI_PROVIDER") {
            Some(raw) => raw.parse()?,
            None => AiProvider::OpenAi,
        };

        Ok(Config {
            database_url: require("DATABASE_URL")?,
            db_max_connections: parse_or(&var, "DB_MAX_CONNECTIONS", 10)?,
            redis_url: require("REDIS_URL")?,
            ai_provider,
            anthropic_api_key: var("ANTHROPIC_API_KEY"),
            openai_api_key: var("OPENAI_API_KEY"),
            openai_model: var("OPENAI_MODEL").unwrap_or_else(|| "gpt-4".to_string()),
            openai_base_url: var("OPENAI_BASE_URL"),
            zhipuai_api_key: var("ZHIPUAI_API_KEY"),
            zhipuai_model: var("ZHIPUAI_MODEL").unwrap_or_else(|| "glm-4".to_string()),
            llm_timeout_secs: parse_or(&var, "LLM_TIMEOUT_SECS", 120)?,
            upload_dir: PathBuf::from(var("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string())),
            max_upload_size: parse_or(&var, "MAX_UPLOAD_SIZE", DEFAULT_MAX_UPLOAD_SIZE)?,
            mail_from: var("MAIL_FROM"),
            ses_region: var("SES_REGION"),
            worker_name: var("WORKER_NAME").unwrap_or_else(default_worker_name),
            job_time_limit_secs: parse_or(&var, "JOB_TIME_LIMIT_SECS", 1800)?,
            port: parse_or(&var, "PORT", 8080)?,
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    pub fn email_enabled(&self) -> bool {
        self.mail_from.is_some()
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

fn default_worker_name() -> String {
    format!("worker-{}", std::process::id())
}
