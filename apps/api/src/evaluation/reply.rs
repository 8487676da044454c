use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::llm_client::strip_json_fences;
use crate::models::analysis::AnalysisResult;
use crate::models::requirement::Requirement;

/// Weakness entry that marks a degraded result.
pub const DEGRADED_WEAKNESS: &str = "unable to complete analysis";

#[derive(Debug, Error)]
pub enum ParseFailure {
    #[error("reply contains no JSON object")]
    NoJsonObject,

    #[error("reply is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("reply is missing `{0}`")]
    MissingField(&'static str),

    #[error("reply field `{field}` has an unusable value: {value}")]
    InvalidField { field: &'static str, value: String },
}

/// Turns a provider reply into an [`AnalysisResult`] conformed to `requirement`.
///
/// A reply that is exactly a schema-valid JSON object is taken as-is; anything
/// else goes through a lenient pass that strips fences, isolates the outermost
/// object and coerces loosely typed fields.
pub fn parse_reply(reply: &str, requirement: &Requirement) -> Result<AnalysisResult, ParseFailure> {
    let trimmed = reply.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        if let Ok(result) = serde_json::from_str::<AnalysisResult>(trimmed) {
            return Ok(conform(result, requirement));
        }
    }

    let object = isolate_object(strip_json_fences(trimmed)).ok_or(ParseFailure::NoJsonObject)?;
    let value: Value = serde_json::from_str(object)?;
    let Value::Object(fields) = value else {
        return Err(ParseFailure::NoJsonObject);
    };
    Ok(conform(coerce(&fields)?, requirement))
}

/// Valid, negative result used whenever no real judgment could be obtained.
pub fn degraded_result(reason: &str) -> AnalysisResult {
    AnalysisResult {
        matches_requirements: false,
        match_score: 0.0,
        reasoning: format!("Analysis failed: {reason}"),
        skills_match: BTreeMap::new(),
        experience_match: false,
        education_match: false,
        strengths: Vec::new(),
        weaknesses: vec![DEGRADED_WEAKNESS.to_string()],
        summary: format!("Unable to complete analysis ({reason}); please retry."),
    }
}

/// Clamps the score and keeps only skills named by the requirement, under the
/// requirement's own spelling.
fn conform(mut result: AnalysisResult, requirement: &Requirement) -> AnalysisResult {
    result.match_score = if result.match_score.is_finite() {
        result.match_score.clamp(0.0, 100.0)
    } else {
        0.0
    };
    result.skills_match = result
        .skills_match
        .into_iter()
        .filter_map(|(name, matched)| {
            requirement
                .canonical_skill(&name)
                .map(|canonical| (canonical.to_string(), matched))
        })
        .collect();
    result
}

fn isolate_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn coerce(fields: &Map<String, Value>) -> Result<AnalysisResult, ParseFailure> {
    let match_score = match fields.get("match_score") {
        Some(value) => as_score(value).ok_or_else(|| ParseFailure::InvalidField {
            field: "match_score",
            value: value.to_string(),
        })?,
        None => return Err(ParseFailure::MissingField("match_score")),
    };

    let skills_match = match fields.get("skills_match") {
        Some(Value::Object(skills)) => skills
            .iter()
            .filter_map(|(name, v)| as_bool(v).map(|b| (name.clone(), b)))
            .collect(),
        _ => BTreeMap::new(),
    };

    Ok(AnalysisResult {
        matches_requirements: flag(fields, "matches_requirements"),
        match_score,
        reasoning: text(fields, "reasoning"),
        skills_match,
        experience_match: flag(fields, "experience_match"),
        education_match: flag(fields, "education_match"),
        strengths: list(fields, "strengths"),
        weaknesses: list(fields, "weaknesses"),
        summary: text(fields, "summary"),
    })
}

fn as_score(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn flag(fields: &Map<String, Value>, key: &str) -> bool {
    fields.get(key).and_then(as_bool).unwrap_or(false)
}

fn text(fields: &Map<String, Value>, key: &str) -> String {
    match fields.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn list(fields: &Map<String, Value>, key: &str) -> Vec<String> {
    match fields.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}
