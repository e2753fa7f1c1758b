use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use capsule_types::api::CapsuleResponse;
use capsule_types::models::{Capsule, PublicCapsule};

/// The fields of a capsule the evaluator looks at.
///
/// Implemented for every shape a capsule travels in (full record, owner
/// listing row, public feed row) so the same rules apply everywhere.
pub trait CapsuleRecord {
    fn owner_id(&self) -> Uuid;
    fn open_at(&self) -> DateTime<Utc>;
    fn is_opened(&self) -> bool;
}

impl CapsuleRecord for Capsule {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
    fn open_at(&self) -> DateTime<Utc> {
        self.open_at
    }
    fn is_opened(&self) -> bool {
        Capsule::is_opened(self)
    }
}

impl CapsuleRecord for CapsuleResponse {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
    fn open_at(&self) -> DateTime<Utc> {
        self.open_at
    }
    fn is_opened(&self) -> bool {
        self.is_opened
    }
}

impl CapsuleRecord for PublicCapsule {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
    fn open_at(&self) -> DateTime<Utc> {
        self.open_at
    }
    fn is_opened(&self) -> bool {
        self.is_opened
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// `open_at` has not passed yet.
    Sealed,
    /// `open_at` has passed but nobody has opened it.
    ReadyToOpen,
    /// Terminal.
    Opened,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Self::Sealed => "sealed",
            Self::ReadyToOpen => "ready",
            Self::Opened => "opened",
        }
    }
}

/// Which listing a capsule belongs to for a given viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feed {
    Public,
    Mine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub status: Status,
    pub feed: Feed,
    pub is_owner: bool,
    pub can_open: bool,
    pub can_delete: bool,
}

/// Decide what `viewer` sees and may do with `capsule` at `now`.
///
/// An opened capsule is `Opened` no matter how its `opened_at` compares to
/// `open_at`; clock skew between clients is not second-guessed here.
pub fn classify<R>(capsule: &R, now: DateTime<Utc>, viewer: Option<Uuid>) -> Classification
where
    R: CapsuleRecord + ?Sized,
{
    let is_owner = viewer.is_some_and(|v| v == capsule.owner_id());
    let is_opened = capsule.is_opened();
    let is_openable = !is_opened && capsule.open_at() <= now;

    let status = if is_opened {
        Status::Opened
    } else if is_openable {
        Status::ReadyToOpen
    } else {
        Status::Sealed
    };

    Classification {
        status,
        feed: if is_owner { Feed::Mine } else { Feed::Public },
        is_owner,
        // Re-opening an opened capsule only re-displays it.
        can_open: is_owner && matches!(status, Status::ReadyToOpen | Status::Opened),
        can_delete: is_owner && status != Status::Opened,
    }
}
