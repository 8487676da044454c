//! Scores resume text against a [`Requirement`] through the
//! configured LLM backend. Never fails: any provider or reply problem becomes a
//! degraded, negative [`AnalysisResult`].
//!
//! [`Requirement`]: crate::models::requirement::Requirement
//! [`AnalysisResult`]: crate::models::analysis::AnalysisResult

mod evaluator;
pub mod prompts;
mod render;
mod reply;

pub use evaluator::{EvaluationFailure, MatchEvaluator};
pub use render::render_requirement;
pub use reply::{degraded_result, parse_reply, ParseFailure, DEGRADED_WEAKNESS};
