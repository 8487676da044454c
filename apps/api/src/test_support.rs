//! Fixtures shared by the unit tests.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::Config;
use crate::evaluation::MatchEvaluator;
use crate::llm_client::{LlmProvider, ProviderError};
use crate::models::analysis::AnalysisResult;
use crate::models::requirement::{Requirement, SkillRequirement};
use crate::models::resume::{NewResume, Resume};
use crate::notify::{ConnectionRegistry, MailError, Mailer, Notifier};
use crate::parser::DocumentFormat;
use crate::pipeline::Pipeline;
use crate::queue::MemoryQueue;
use crate::state::AppState;
use crate::store::{MemoryStore, Store};

/// Provider that answers every prompt with a fixed reply.
pub struct ScriptedProvider {
    reply: Option<String>,
    delay: Duration,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            delay: Duration::ZERO,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            delay: Duration::ZERO,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(&self, _system: &str, prompt: &str) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.reply.clone().ok_or(ProviderError::Api {
            status: 503,
            message: "scripted outage".to_string(),
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Default)]
pub struct RecordingMailer {
    fail: bool,
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_html(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Send("mailbox unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}

pub async fn open_session(
    registry: &ConnectionRegistry,
    user_id: Uuid,
) -> (Uuid, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let session_id = registry.register(user_id, tx).await;
    (session_id, rx)
}

pub fn sample_requirement() -> Requirement {
    Requirement {
        id: None,
        job_title: "Backend Engineer".to_string(),
        experience_years: Some(5),
        education: Some("Bachelor's degree in Computer Science".to_string()),
        skills: vec![
            SkillRequirement {
                name: "Rust".to_string(),
                level: "expert".to_string(),
            },
            SkillRequirement {
                name: "PostgreSQL".to_string(),
                level: "proficient".to_string(),
            },
        ],
        description: Some("Build and operate the matching backend.".to_string()),
    }
}

pub fn sample_result(score: f64) -> AnalysisResult {
    AnalysisResult {
        matches_requirements: score >= 70.0,
        match_score: score,
        reasoning: "Solid systems background".to_string(),
        skills_match: BTreeMap::from([
            ("Rust".to_string(), true),
            ("PostgreSQL".to_string(), score >= 70.0),
        ]),
        experience_match: true,
        education_match: true,
        strengths: vec!["Rust services in production".to_string()],
        weaknesses: vec![],
        summary: "Candidate summary".to_string(),
    }
}

/// A well-formed provider reply with the given score.
pub fn reply_with_score(score: f64) -> String {
    serde_json::json!({
        "matches_requirements": score >= 70.0,
        "match_score": score,
        "reasoning": "Scored by the scripted provider",
        "skills_match": {"Rust": true, "PostgreSQL": false},
        "experience_match": true,
        "education_match": true,
        "strengths": ["Rust"],
        "weaknesses": ["PostgreSQL"],
        "summary": "Scripted summary"
    })
    .to_string()
}

pub async fn seed_resume(store: &MemoryStore) -> Resume {
    store
        .insert_resume(NewResume {
            candidate_name: "Jane Doe".to_string(),
            position: "Backend Engineer".to_string(),
            file_path: "/tmp/jane.txt".to_string(),
            file_name: "jane.txt".to_string(),
            file_type: DocumentFormat::Txt,
            content: "Jane Doe\n6 years of Rust and PostgreSQL".to_string(),
        })
        .await
        .unwrap()
}

pub fn test_pipeline(
    store: Arc<MemoryStore>,
    provider: ScriptedProvider,
    registry: ConnectionRegistry,
    mailer: Arc<RecordingMailer>,
) -> Pipeline {
    Pipeline::new(
        store,
        MatchEvaluator::new(Arc::new(provider)),
        Notifier::new(Arc::new(registry), Some(mailer)),
    )
}

pub fn test_config(upload_dir: &Path) -> Config {
    let upload_dir = upload_dir.display().to_string();
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://localhost/screener_test".to_string()),
        "REDIS_URL" => Some("redis://localhost".to_string()),
        "UPLOAD_DIR" => Some(upload_dir.clone()),
        "MAX_UPLOAD_SIZE" => Some("4096".to_string()),
        _ => None,
    })
    .unwrap()
}

/// Router state over in-memory backends. Push events land in the returned
/// registry; no mail transport is configured.
pub fn test_state(
    store: Arc<MemoryStore>,
    queue: Arc<MemoryQueue>,
    provider: ScriptedProvider,
    upload_dir: &Path,
) -> AppState {
    let registry = ConnectionRegistry::new();
    let pipeline = Pipeline::new(
        store.clone(),
        MatchEvaluator::new(Arc::new(provider)),
        Notifier::new(Arc::new(registry.clone()), None),
    );
    AppState {
        store,
        pipeline,
        queue,
        registry,
        config: test_config(upload_dir),
    }
}

/// Writes a PDF with one line of Courier text per page.
pub fn write_sample_pdf(path: &Path, pages: &[&str]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 14.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

/// Writes a DOCX with one paragraph per entry.
pub fn write_sample_docx(path: &Path, paragraphs: &[&str]) {
    let docx = paragraphs.iter().fold(docx_rs::Docx::new(), |docx, text| {
        docx.add_paragraph(docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text(*text)))
    });
    let file = std::fs::File::create(path).unwrap();
    docx.build().pack(file).unwrap();
}
