use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Lifecycle of one pipeline task.
///
/// `Parsing` only happens for uploads; `Notifying` only when the score clears
/// the match threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Created,
    Parsing,
    Evaluating,
    Storing,
    Notifying,
    Done,
    Failed,
}

impl TaskState {
    pub fn can_advance_to(self, next: TaskState) -> bool {
        use TaskState::*;
        match (self, next) {
            (Done | Failed, _) => false,
            (_, Failed) => true,
            (Created, Parsing | Evaluating) => true,
            (Parsing, Evaluating | Storing) => true,
            (Evaluating, Storing) => true,
            (Storing, Notifying | Done) => true,
            (Notifying, Done) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Done | TaskState::Failed)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Created => "created",
            TaskState::Parsing => "parsing",
            TaskState::Evaluating => "evaluating",
            TaskState::Storing => "storing",
            TaskState::Notifying => "notifying",
            TaskState::Done => "done",
            TaskState::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
#[error("illegal task transition {from} -> {to}")]
pub struct TransitionError {
    pub from: TaskState,
    pub to: TaskState,
}

/// Current state plus the path taken to reach it.
#[derive(Debug, Clone)]
pub struct TaskTracker {
    task_id: Uuid,
    history: Vec<TaskState>,
}

impl TaskTracker {
    pub fn new(task_id: Uuid) -> Self {
        Self {
            task_id,
            history: vec![TaskState::Created],
        }
    }

    pub fn state(&self) -> TaskState {
        self.history.last().copied().unwrap_or(TaskState::Created)
    }

    pub fn advance(&mut self, next: TaskState) -> Result<(), TransitionError> {
        let from = self.state();
        if !from.can_advance_to(next) {
            return Err(TransitionError { from, to: next });
        }
        debug!(task_id = %self.task_id, %from, to = %next, "Task state advanced");
        self.history.push(next);
        Ok(())
    }

    /// Moves to `Failed` unless already terminal.
    pub fn fail(&mut self) {
        if !self.state().is_terminal() {
            self.history.push(TaskState::Failed);
        }
    }

    pub fn into_history(self) -> Vec<TaskState> {
        self.history
    }
}
