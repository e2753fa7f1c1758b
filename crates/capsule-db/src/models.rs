//! Database row types. These map directly to SQLite rows.
//! Distinct from capsule-types models to keep the DB layer independent.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use uuid::Uuid;

use capsule_types::models::Capsule;

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

pub struct CapsuleRow {
    pub id: String,
    pub owner_id: String,
    pub title: Option<String>,
    pub content: String,
    pub created_at: String,
    pub open_at: String,
    pub opened_at: Option<String>,
}

/// A public feed row: no title, no content, owner email joined in.
pub struct PublicCapsuleRow {
    pub id: String,
    pub owner_id: String,
    pub owner_email: Option<String>,
    pub created_at: String,
    pub open_at: String,
    pub is_opened: bool,
}

/// Format a timestamp the way every capsule column stores it.
pub fn to_db_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_db_time(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's datetime('now') default has no timezone: "YYYY-MM-DD HH:MM:SS", UTC.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .with_context(|| format!("Corrupt timestamp '{}'", raw))
}

pub fn parse_id(raw: &str) -> Result<Uuid> {
    raw.parse::<Uuid>().with_context(|| format!("Corrupt id '{}'", raw))
}

impl TryFrom<CapsuleRow> for Capsule {
    type Error = anyhow::Error;

    fn try_from(row: CapsuleRow) -> Result<Self> {
        Ok(Capsule {
            id: parse_id(&row.id)?,
            owner_id: parse_id(&row.owner_id)?,
            title: row.title,
            content: row.content,
            created_at: parse_db_time(&row.created_at)?,
            open_at: parse_db_time(&row.open_at)?,
            opened_at: row.opened_at.as_deref().map(parse_db_time).transpose()?,
        })
    }
}

impl From<&Capsule> for CapsuleRow {
    fn from(c: &Capsule) -> Self {
        Self {
            id: c.id.to_string(),
            owner_id: c.owner_id.to_string(),
            title: c.title.clone(),
            content: c.content.clone(),
            created_at: to_db_time(c.created_at),
            open_at: to_db_time(c.open_at),
            opened_at: c.opened_at.map(to_db_time),
        }
    }
}
