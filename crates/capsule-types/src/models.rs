use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored capsule. `content` is ciphertext and is never interpreted by the server.
///
/// `opened_at` doubles as the opened flag, so a capsule can't be opened
/// without an open timestamp or carry one while still sealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capsule {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub open_at: DateTime<Utc>,
    pub opened_at: Option<DateTime<Utc>>,
}

impl Capsule {
    pub fn is_opened(&self) -> bool {
        self.opened_at.is_some()
    }
}

/// What the public feed knows about someone else's capsule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicCapsule {
    pub id: Uuid,
    pub owner_id: Uuid,
    /// Owner email, already masked for display.
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub open_at: DateTime<Utc>,
    pub is_opened: bool,
}
