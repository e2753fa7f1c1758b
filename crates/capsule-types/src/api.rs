use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Capsule, PublicCapsule};

// -- JWT Claims --

/// JWT claims shared by the REST middleware and the CLI session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
    pub token: String,
}

// -- Capsules --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCapsuleRequest {
    #[serde(default)]
    pub title: Option<String>,
    /// Base64 ciphertext produced by the client.
    pub content: String,
    pub open_at: DateTime<Utc>,
}

/// An owned capsule as listed in "my capsules". Content is only returned by the open call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapsuleResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub open_at: DateTime<Utc>,
    pub is_opened: bool,
    pub opened_at: Option<DateTime<Utc>>,
}

impl From<&Capsule> for CapsuleResponse {
    fn from(c: &Capsule) -> Self {
        Self {
            id: c.id,
            owner_id: c.owner_id,
            title: c.title.clone(),
            created_at: c.created_at,
            open_at: c.open_at,
            is_opened: c.is_opened(),
            opened_at: c.opened_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenCapsuleResponse {
    pub capsule: CapsuleResponse,
    pub content: String,
    /// True when an earlier open already won; `opened_at` is that earlier stamp.
    pub already_opened: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicPage {
    pub capsules: Vec<PublicCapsule>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl PublicPage {
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(self.page_size as u64)
    }
}
