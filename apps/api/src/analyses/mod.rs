pub mod handlers;
mod record;

pub use record::{record, status_for_score, MATCH_THRESHOLD};
