use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::analyses::MATCH_THRESHOLD;
use crate::models::analysis::{
    AnalysisFilter, AnalysisRecord, AnalysisSummary, DateRange, NewAnalysis, PositionStatistics,
};
use crate::models::requirement::{
    Requirement, RequirementFilter, RequirementPatch, RequirementRecord,
};
use crate::models::resume::{NewResume, Resume, ResumeFilter, ResumeOutcome, ResumeStatus};

/// In-process store for tests. `fail_writes` makes every write return
/// `StoreError::Unavailable`.
#[derive(Default)]
pub struct MemoryStore {
    emails: RwLock<HashMap<Uuid, String>>,
    requirements: RwLock<Vec<RequirementRecord>>,
    resumes: RwLock<Vec<Resume>>,
    analyses: RwLock<Vec<AnalysisRecord>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user_id: Uuid, email: &str) {
        self.emails.write().await.insert(user_id, email.to_string());
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn analyses_for_resume(&self, resume_id: Uuid) -> Vec<AnalysisRecord> {
        self.analyses
            .read()
            .await
            .iter()
            .filter(|a| a.resume_id == resume_id)
            .cloned()
            .collect()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("writes disabled".to_string()))
        } else {
            Ok(())
        }
    }
}

fn paginate<T: Clone>(items: Vec<T>, page: crate::models::Page) -> Vec<T> {
    items
        .into_iter()
        .skip(page.skip as usize)
        .take(page.limit as usize)
        .collect()
}

#[async_trait]
impl Store for MemoryStore {
    async fn user_email(&self, user_id: Uuid) -> Result<Option<String>, StoreError> {
        Ok(self.emails.read().await.get(&user_id).cloned())
    }

    async fn insert_requirement(
        &self,
        user_id: Uuid,
        requirement: &Requirement,
    ) -> Result<RequirementRecord, StoreError> {
        self.check_writable()?;
        let now = Utc::now();
        let record = RequirementRecord {
            id: Uuid::new_v4(),
            user_id,
            job_title: requirement.job_title.clone(),
            experience_years: requirement.experience_years,
            education: requirement.education.clone(),
            skills: requirement.skills.clone(),
            description: requirement.description.clone(),
            created_at: now,
            updated_at: now,
        };
        self.requirements.write().await.push(record.clone());
        Ok(record)
    }

    async fn get_requirement(&self, id: Uuid) -> Result<Option<RequirementRecord>, StoreError> {
        Ok(self
            .requirements
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn list_requirements(
        &self,
        filter: &RequirementFilter,
    ) -> Result<Vec<RequirementRecord>, StoreError> {
        let needle = filter.job_title.as_deref().map(str::to_lowercase);
        let mut matching: Vec<RequirementRecord> = self
            .requirements
            .read()
            .await
            .iter()
            .filter(|r| filter.user_id.map_or(true, |u| r.user_id == u))
            .filter(|r| {
                needle
                    .as_deref()
                    .map_or(true, |n| r.job_title.to_lowercase().contains(n))
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(matching, filter.page))
    }

    async fn update_requirement(
        &self,
        id: Uuid,
        patch: &RequirementPatch,
    ) -> Result<Option<RequirementRecord>, StoreError> {
        self.check_writable()?;
        let mut requirements = self.requirements.write().await;
        let Some(record) = requirements.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        record.apply(patch, Utc::now());
        Ok(Some(record.clone()))
    }

    async fn delete_requirement(&self, id: Uuid) -> Result<bool, StoreError> {
        self.check_writable()?;
        let mut requirements = self.requirements.write().await;
        let before = requirements.len();
        requirements.retain(|r| r.id != id);
        Ok(requirements.len() < before)
    }

    async fn insert_resume(&self, resume: NewResume) -> Result<Resume, StoreError> {
        self.check_writable()?;
        let record = Resume {
            id: Uuid::new_v4(),
            candidate_name: resume.candidate_name,
            position: resume.position,
            file_path: resume.file_path,
            file_name: resume.file_name,
            file_type: resume.file_type,
            content: resume.content,
            status: ResumeStatus::Pending,
            match_score: None,
            matches_requirements: None,
            uploaded_at: Utc::now(),
            last_analyzed_at: None,
        };
        self.resumes.write().await.push(record.clone());
        Ok(record)
    }

    async fn get_resume(&self, id: Uuid) -> Result<Option<Resume>, StoreError> {
        Ok(self.resumes.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn list_resumes(&self, filter: &ResumeFilter) -> Result<Vec<Resume>, StoreError> {
        let mut matching: Vec<Resume> = self
            .resumes
            .read()
            .await
            .iter()
            .filter(|r| filter.status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(paginate(matching, filter.page))
    }

    async fn apply_analysis_outcome(
        &self,
        resume_id: Uuid,
        outcome: &ResumeOutcome,
    ) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut resumes = self.resumes.write().await;
        if let Some(resume) = resumes.iter_mut().find(|r| r.id == resume_id) {
            resume.status = outcome.status;
            resume.matches_requirements = Some(outcome.matches_requirements);
            resume.match_score = Some(outcome.match_score);
            resume.last_analyzed_at = Some(outcome.analyzed_at);
        }
        Ok(())
    }

    async fn insert_analysis(&self, analysis: NewAnalysis) -> Result<AnalysisRecord, StoreError> {
        self.check_writable()?;
        let record = AnalysisRecord {
            id: Uuid::new_v4(),
            resume_id: analysis.resume_id,
            user_id: analysis.user_id,
            requirement: analysis.requirement,
            result: analysis.result,
            created_at: Utc::now(),
        };
        self.analyses.write().await.push(record.clone());
        Ok(record)
    }

    async fn get_analysis(&self, id: Uuid) -> Result<Option<AnalysisRecord>, StoreError> {
        Ok(self.analyses.read().await.iter().find(|a| a.id == id).cloned())
    }

    async fn latest_analysis_for_resume(
        &self,
        resume_id: Uuid,
    ) -> Result<Option<AnalysisRecord>, StoreError> {
        // Later pushes win ties on created_at.
        Ok(self
            .analyses
            .read()
            .await
            .iter()
            .filter(|a| a.resume_id == resume_id)
            .max_by_key(|a| a.created_at)
            .cloned())
    }

    async fn list_analyses(
        &self,
        filter: &AnalysisFilter,
    ) -> Result<Vec<AnalysisRecord>, StoreError> {
        let mut matching: Vec<AnalysisRecord> = self
            .analyses
            .read()
            .await
            .iter()
            .filter(|a| a.user_id == filter.user_id)
            .filter(|a| filter.resume_id.map_or(true, |id| a.resume_id == id))
            .filter(|a| {
                filter
                    .requirement_id
                    .map_or(true, |id| a.requirement.id == Some(id))
            })
            .filter(|a| filter.min_score.map_or(true, |min| a.result.match_score >= min))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(matching, filter.page))
    }

    async fn analysis_summary(
        &self,
        user_id: Uuid,
        range: DateRange,
    ) -> Result<AnalysisSummary, StoreError> {
        let analyses = self.analyses.read().await;
        let resumes = self.resumes.read().await;

        let scoped: Vec<&AnalysisRecord> = analyses
            .iter()
            .filter(|a| a.user_id == user_id && range.contains(a.created_at))
            .collect();
        let total = scoped.len() as i64;
        let matched = scoped
            .iter()
            .filter(|a| a.result.match_score >= MATCH_THRESHOLD)
            .count() as i64;

        let mut by_position: HashMap<String, (i64, f64)> = HashMap::new();
        for analysis in &scoped {
            let Some(resume) = resumes.iter().find(|r| r.id == analysis.resume_id) else {
                continue;
            };
            let entry = by_position.entry(resume.position.clone()).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += analysis.result.match_score;
        }
        let mut position_statistics: Vec<PositionStatistics> = by_position
            .into_iter()
            .map(|(position, (count, sum))| PositionStatistics {
                position,
                count,
                avg_score: sum / count as f64,
            })
            .collect();
        position_statistics.sort_by(|a, b| b.count.cmp(&a.count).then(a.position.cmp(&b.position)));

        Ok(AnalysisSummary::new(total, matched, position_statistics))
    }
}
