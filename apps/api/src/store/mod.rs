//! Persistence for requirements, resumes and analysis records.
//!
//! `PgStore` is the production backend; handlers and the pipeline only see
//! `Arc<dyn Store>`.

#[cfg(test)]
mod memory;
mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::analysis::{
    AnalysisFilter, AnalysisRecord, AnalysisSummary, DateRange, NewAnalysis,
};
use crate::models::requirement::{
    Requirement, RequirementFilter, RequirementPatch, RequirementRecord,
};
use crate::models::resume::{NewResume, Resume, ResumeFilter, ResumeOutcome};

#[cfg(test)]
pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("value out of range: {0}")]
    OutOfRange(String),
}

#[async_trait]
pub trait Store: Send + Sync {
    // ── users ──
    async fn user_email(&self, user_id: Uuid) -> Result<Option<String>, StoreError>;

    // ── requirements ──
    async fn insert_requirement(
        &self,
        user_id: Uuid,
        requirement: &Requirement,
    ) -> Result<RequirementRecord, StoreError>;
    async fn get_requirement(&self, id: Uuid) -> Result<Option<RequirementRecord>, StoreError>;
    async fn list_requirements(
        &self,
        filter: &RequirementFilter,
    ) -> Result<Vec<RequirementRecord>, StoreError>;
    async fn update_requirement(
        &self,
        id: Uuid,
        patch: &RequirementPatch,
    ) -> Result<Option<RequirementRecord>, StoreError>;
    /// Returns false when nothing was deleted.
    async fn delete_requirement(&self, id: Uuid) -> Result<bool, StoreError>;

    // ── resumes ──
    async fn insert_resume(&self, resume: NewResume) -> Result<Resume, StoreError>;
    async fn get_resume(&self, id: Uuid) -> Result<Option<Resume>, StoreError>;
    async fn list_resumes(&self, filter: &ResumeFilter) -> Result<Vec<Resume>, StoreError>;
    async fn apply_analysis_outcome(
        &self,
        resume_id: Uuid,
        outcome: &ResumeOutcome,
    ) -> Result<(), StoreError>;

    // ── analyses (append-only) ──
    async fn insert_analysis(&self, analysis: NewAnalysis) -> Result<AnalysisRecord, StoreError>;
    async fn get_analysis(&self, id: Uuid) -> Result<Option<AnalysisRecord>, StoreError>;
    async fn latest_analysis_for_resume(
        &self,
        resume_id: Uuid,
    ) -> Result<Option<AnalysisRecord>, StoreError>;
    async fn list_analyses(
        &self,
        filter: &AnalysisFilter,
    ) -> Result<Vec<AnalysisRecord>, StoreError>;
    async fn analysis_summary(
        &self,
        user_id: Uuid,
        range: DateRange,
    ) -> Result<AnalysisSummary, StoreError>;
}
