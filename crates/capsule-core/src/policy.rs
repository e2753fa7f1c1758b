//! Client-side guards for the capsule actions.
//!
//! These decide whether a request is worth sending at all. Storage enforces
//! the same rules again and has the final word on which open wins.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::CapsuleError;
use crate::evaluator::{CapsuleRecord, Status, classify};

pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_CONTENT_BYTES: usize = 64 * 1024;
pub const MIN_PASSWORD_LEN: usize = 6;

/// What an authorized open should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAttempt {
    /// First reveal: stamp `opened_at` and show the content.
    Unseal,
    /// Already opened: show the content, change nothing.
    Reveal,
}

pub fn authorize_open<R>(
    capsule: &R,
    now: DateTime<Utc>,
    viewer: Option<Uuid>,
) -> Result<OpenAttempt, CapsuleError>
where
    R: CapsuleRecord + ?Sized,
{
    let cls = classify(capsule, now, viewer);
    if !cls.is_owner {
        return Err(CapsuleError::forbidden("only the owner can open a capsule"));
    }
    match cls.status {
        Status::Sealed => Err(CapsuleError::conflict("capsule is still sealed")),
        Status::ReadyToOpen => Ok(OpenAttempt::Unseal),
        Status::Opened => Ok(OpenAttempt::Reveal),
    }
}

pub fn authorize_delete<R>(
    capsule: &R,
    now: DateTime<Utc>,
    viewer: Option<Uuid>,
) -> Result<(), CapsuleError>
where
    R: CapsuleRecord + ?Sized,
{
    let cls = classify(capsule, now, viewer);
    if !cls.is_owner {
        return Err(CapsuleError::forbidden("only the owner can delete a capsule"));
    }
    if !cls.can_delete {
        return Err(CapsuleError::conflict("opened capsules cannot be deleted"));
    }
    Ok(())
}

/// Check a new capsule's metadata. Returns the trimmed title, `None` if blank.
pub fn validate_draft(
    title: Option<&str>,
    open_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Option<String>, CapsuleError> {
    if open_at <= now {
        return Err(CapsuleError::validation("open_at must be in the future"));
    }

    let title = title.map(str::trim).filter(|t| !t.is_empty());
    if let Some(t) = title {
        if t.chars().count() > MAX_TITLE_CHARS {
            return Err(CapsuleError::validation(format!(
                "title must be at most {MAX_TITLE_CHARS} characters"
            )));
        }
    }
    Ok(title.map(str::to_string))
}

/// Check the plaintext body before it is encrypted.
pub fn validate_message(message: &str) -> Result<(), CapsuleError> {
    if message.trim().is_empty() {
        return Err(CapsuleError::validation("message must not be empty"));
    }
    Ok(())
}

/// Check the encoded ciphertext the server is asked to store.
pub fn validate_ciphertext(content: &str) -> Result<(), CapsuleError> {
    if content.is_empty() {
        return Err(CapsuleError::validation("content must not be empty"));
    }
    if content.len() > MAX_CONTENT_BYTES {
        return Err(CapsuleError::validation("content is too large"));
    }
    Ok(())
}

/// Trim and lower-case an email, rejecting anything without a local part and a domain.
pub fn normalize_email(email: &str) -> Result<String, CapsuleError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(email)
        }
        _ => Err(CapsuleError::validation("a valid email address is required")),
    }
}

pub fn validate_password(password: &str) -> Result<(), CapsuleError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CapsuleError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use capsule_types::models::Capsule;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn capsule(owner: Uuid, open_at: DateTime<Utc>, opened_at: Option<DateTime<Utc>>) -> Capsule {
        Capsule {
            id: Uuid::new_v4(),
            owner_id: owner,
            title: None,
            content: "ciphertext".into(),
            created_at: now() - Duration::days(1),
            open_at,
            opened_at,
        }
    }

    #[test]
    fn open_requires_owner() {
        let c = capsule(Uuid::new_v4(), now() - Duration::hours(1), None);
        assert!(matches!(
            authorize_open(&c, now(), Some(Uuid::new_v4())),
            Err(CapsuleError::Forbidden(_))
        ));
        assert!(matches!(authorize_open(&c, now(), None), Err(CapsuleError::Forbidden(_))));
    }

    #[test]
    fn open_sealed_is_rejected() {
        let owner = Uuid::new_v4();
        let c = capsule(owner, now() + Duration::hours(1), None);
        assert!(matches!(authorize_open(&c, now(), Some(owner)), Err(CapsuleError::Conflict(_))));
    }

    #[test]
    fn open_ready_unseals_and_opened_reveals() {
        let owner = Uuid::new_v4();
        let ready = capsule(owner, now() - Duration::hours(1), None);
        assert_eq!(authorize_open(&ready, now(), Some(owner)), Ok(OpenAttempt::Unseal));

        let opened = capsule(owner, now() - Duration::hours(2), Some(now() - Duration::hours(1)));
        assert_eq!(authorize_open(&opened, now(), Some(owner)), Ok(OpenAttempt::Reveal));
    }

    #[test]
    fn delete_rules() {
        let owner = Uuid::new_v4();
        let sealed = capsule(owner, now() + Duration::days(1), None);
        assert_eq!(authorize_delete(&sealed, now(), Some(owner)), Ok(()));
        assert!(matches!(
            authorize_delete(&sealed, now(), Some(Uuid::new_v4())),
            Err(CapsuleError::Forbidden(_))
        ));

        let opened = capsule(owner, now() - Duration::days(1), Some(now()));
        assert!(matches!(
            authorize_delete(&opened, now(), Some(owner)),
            Err(CapsuleError::Conflict(_))
        ));
    }

    #[test]
    fn draft_requires_future_open_at() {
        assert!(validate_draft(None, now(), now()).is_err());
        assert!(validate_draft(None, now() - Duration::days(1), now()).is_err());
        assert_eq!(validate_draft(None, now() + Duration::minutes(1), now()), Ok(None));
    }

    #[test]
    fn draft_trims_title() {
        let later = now() + Duration::days(1);
        assert_eq!(validate_draft(Some("  hi  "), later, now()), Ok(Some("hi".into())));
        assert_eq!(validate_draft(Some("   "), later, now()), Ok(None));

        let long = "x".repeat(MAX_TITLE_CHARS + 1);
        assert!(validate_draft(Some(&long), later, now()).is_err());
    }

    #[test]
    fn message_and_ciphertext_checks() {
        assert!(validate_message(" \n").is_err());
        assert!(validate_message("see you in 2030").is_ok());
        assert!(validate_ciphertext("").is_err());
        assert!(validate_ciphertext(&"a".repeat(MAX_CONTENT_BYTES + 1)).is_err());
    }

    #[test]
    fn email_normalization() {
        assert_eq!(normalize_email("  Ab@Example.COM "), Ok("ab@example.com".into()));
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("ab@").is_err());
        assert!(normalize_email("a@b@c").is_err());
    }

    #[test]
    fn password_length() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }
}
