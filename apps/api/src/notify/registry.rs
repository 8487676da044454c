use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use super::{Audience, PushChannel, PushError, PushEvent};

struct Session {
    id: Uuid,
    tx: mpsc::UnboundedSender<String>,
}

/// Live push sessions of this process, keyed by user, in connection order.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, Vec<Session>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a session for `user_id`. Events are queued on `tx`, which the
    /// socket task drains.
    pub async fn register(&self, user_id: Uuid, tx: mpsc::UnboundedSender<String>) -> Uuid {
        let session_id = Uuid::new_v4();

        let mut sessions = self.sessions.write().await;
        let user_sessions = sessions.entry(user_id).or_default();
        user_sessions.push(Session { id: session_id, tx });

        info!(
            %user_id,
            %session_id,
            sessions = user_sessions.len(),
            "Push session registered"
        );
        session_id
    }

    pub async fn unregister(&self, user_id: Uuid, session_id: Uuid) {
        let mut sessions = self.sessions.write().await;
        if let Some(user_sessions) = sessions.get_mut(&user_id) {
            user_sessions.retain(|s| s.id != session_id);
            let remaining = user_sessions.len();
            if remaining == 0 {
                sessions.remove(&user_id);
            }
            info!(%user_id, %session_id, remaining, "Push session unregistered");
        }
    }

    /// Queues `text` on every session of `user_id`. Returns how many accepted it.
    pub async fn send_to_user(&self, user_id: Uuid, text: &str) -> usize {
        let sessions = self.sessions.read().await;
        let delivered = sessions
            .get(&user_id)
            .map_or(0, |user_sessions| deliver(user_sessions, text));
        debug!(%user_id, delivered, "Push fan-out to user");
        delivered
    }

    pub async fn broadcast(&self, text: &str) -> usize {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .map(|user_sessions| deliver(user_sessions, text))
            .sum()
    }
}

fn deliver(sessions: &[Session], text: &str) -> usize {
    // A closed receiver means the socket task is shutting down; it unregisters itself.
    sessions
        .iter()
        .filter(|s| s.tx.send(text.to_string()).is_ok())
        .count()
}

#[async_trait]
impl PushChannel for ConnectionRegistry {
    async fn push(&self, audience: Audience, event: &PushEvent) -> Result<usize, PushError> {
        let text = event.to_json()?;
        Ok(match audience {
            Audience::User { user_id } => self.send_to_user(user_id, &text).await,
            Audience::Everyone => self.broadcast(&text).await,
        })
    }
}
