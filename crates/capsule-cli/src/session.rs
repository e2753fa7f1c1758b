use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use capsule_types::api::AuthResponse;

/// The logged-in user, persisted between invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    pub token: String,
}

impl From<AuthResponse> for Session {
    fn from(res: AuthResponse) -> Self {
        Self {
            user_id: res.user_id,
            email: res.email,
            token: res.token,
        }
    }
}

impl Session {
    /// `None` when nobody is logged in.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read session file {}", path.display()))?;
        let session = serde_json::from_str(&raw)
            .with_context(|| format!("Corrupt session file {}; run `capsule logout`", path.display()))?;
        Ok(Some(session))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)
            .with_context(|| format!("Failed to write session file {}", path.display()))?;
        debug!("Session saved to {}", path.display());
        Ok(())
    }

    /// Remove the session file. Returns false if there was none.
    pub fn clear(path: &Path) -> Result<bool> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_load_clear() {
        let path = std::env::temp_dir().join(format!("capsule_session_{}.json", Uuid::new_v4()));
        assert_eq!(Session::load(&path).unwrap(), None);

        let session = Session {
            user_id: Uuid::new_v4(),
            email: "me@example.com".into(),
            token: "tok".into(),
        };
        session.save(&path).unwrap();
        assert_eq!(Session::load(&path).unwrap(), Some(session));

        assert!(Session::clear(&path).unwrap());
        assert!(!Session::clear(&path).unwrap());
        assert_eq!(Session::load(&path).unwrap(), None);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("capsule_session_{}.json", Uuid::new_v4()));
        std::fs::write(&path, "{not json").unwrap();
        assert!(Session::load(&path).is_err());
        Session::clear(&path).unwrap();
    }
}
