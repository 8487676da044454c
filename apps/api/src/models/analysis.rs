use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::requirement::Requirement;

/// Structured judgment produced by the match evaluator.
///
/// `skills_match` is keyed only by skill names of the requirement the result
/// was computed against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub matches_requirements: bool,
    /// 0 – 100
    pub match_score: f64,
    pub reasoning: String,
    pub skills_match: BTreeMap<String, bool>,
    pub experience_match: bool,
    pub education_match: bool,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub summary: String,
}

/// One append-only row per analysis invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub resume_id: Uuid,
    pub user_id: Uuid,
    pub requirement: Requirement,
    pub result: AnalysisResult,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAnalysis {
    pub resume_id: Uuid,
    pub user_id: Uuid,
    pub requirement: Requirement,
    pub result: AnalysisResult,
}

/// Listing filter. Always scoped to `user_id`.
#[derive(Debug, Clone)]
pub struct AnalysisFilter {
    pub user_id: Uuid,
    pub resume_id: Option<Uuid>,
    pub requirement_id: Option<Uuid>,
    pub min_score: Option<f64>,
    pub page: super::Page,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| at >= s) && self.end.map_or(true, |e| at <= e)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionStatistics {
    pub position: String,
    pub count: i64,
    pub avg_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_analyses: i64,
    pub matched_resumes: i64,
    pub match_rate: f64,
    pub position_statistics: Vec<PositionStatistics>,
}

impl AnalysisSummary {
    pub fn new(total: i64, matched: i64, position_statistics: Vec<PositionStatistics>) -> Self {
        let match_rate = if total > 0 {
            matched as f64 / total as f64
        } else {
            0.0
        };
        Self {
            total_analyses: total,
            matched_resumes: matched,
            match_rate,
            position_statistics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_result_deserializes_from_provider_shape() {
        let json = r#"{
            "matches_requirements": true,
            "match_score": 82.5,
            "reasoning": "Strong Rust background",
            "skills_match": {"Rust": true, "Kafka": false},
            "experience_match": true,
            "education_match": false,
            "strengths": ["systems work"],
            "weaknesses": ["no streaming experience"],
            "summary": "Good fit"
        }"#;
        let result: AnalysisResult = serde_json::from_str(json).unwrap();
        assert!(result.matches_requirements);
        assert_eq!(result.skills_match.get("Kafka"), Some(&false));
        assert_eq!(result.weaknesses.len(), 1);
    }

    #[test]
    fn test_summary_match_rate_handles_zero_total() {
        let summary = AnalysisSummary::new(0, 0, vec![]);
        assert_eq!(summary.match_rate, 0.0);

        let summary = AnalysisSummary::new(4, 1, vec![]);
        assert!((summary.match_rate - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_date_range_bounds_are_inclusive() {
        let now = Utc::now();
        let range = DateRange {
            start: Some(now),
            end: Some(now),
        };
        assert!(range.contains(now));
        assert!(!range.contains(now + chrono::Duration::seconds(1)));
        assert!(DateRange::default().contains(now));
    }
}
