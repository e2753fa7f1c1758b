use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use capsule_core::policy::{
    OpenAttempt, authorize_delete, authorize_open, validate_ciphertext, validate_draft,
    validate_message,
};
use capsule_core::{CapsuleError, Classification, classify};
use capsule_crypto::{ContentKey, decrypt_content, encrypt_content};
use capsule_types::api::{CapsuleResponse, CreateCapsuleRequest};
use capsule_types::models::PublicCapsule;

use crate::store::CapsuleStore;

/// A capsule paired with what the current viewer may do with it.
#[derive(Debug, Clone)]
pub struct Card<R> {
    pub capsule: R,
    pub class: Classification,
}

#[derive(Debug, Clone)]
pub struct Listing {
    pub public: Vec<Card<PublicCapsule>>,
    pub mine: Vec<Card<CapsuleResponse>>,
    pub page: u32,
    pub page_size: u32,
    pub total_public: u64,
    pub total_pages: u64,
}

/// A decrypted capsule, ready to show.
#[derive(Debug, Clone)]
pub struct Revealed {
    pub capsule: CapsuleResponse,
    pub message: String,
    pub already_opened: bool,
}

pub struct CapsuleClient<S> {
    store: S,
    viewer: Option<Uuid>,
    key: Option<ContentKey>,
}

impl<S: CapsuleStore> CapsuleClient<S> {
    pub fn new(store: S, viewer: Option<Uuid>, key: Option<ContentKey>) -> Self {
        Self { store, viewer, key }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Both feeds as of `now`. Anonymous viewers only get the public one.
    pub async fn listing(
        &self,
        page: u32,
        page_size: u32,
        now: DateTime<Utc>,
    ) -> Result<Listing, CapsuleError> {
        let public_page = self.store.list_public(page, page_size).await?;
        let total_pages = public_page.total_pages();

        let public = public_page
            .capsules
            .into_iter()
            .map(|capsule| Card {
                class: classify(&capsule, now, self.viewer),
                capsule,
            })
            .collect();

        let mine = match self.viewer {
            Some(_) => self
                .store
                .list_owned()
                .await?
                .into_iter()
                .map(|capsule| Card {
                    class: classify(&capsule, now, self.viewer),
                    capsule,
                })
                .collect(),
            None => Vec::new(),
        };

        Ok(Listing {
            public,
            mine,
            page: public_page.page,
            page_size: public_page.page_size,
            total_public: public_page.total,
            total_pages,
        })
    }

    pub async fn create(
        &self,
        title: Option<&str>,
        message: &str,
        open_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<CapsuleResponse, CapsuleError> {
        self.require_viewer()?;
        validate_message(message)?;
        let title = validate_draft(title, open_at, now)?;

        let content = encrypt_content(self.require_key()?, message).map_err(CapsuleError::backend)?;
        validate_ciphertext(&content)?;

        let created = self
            .store
            .create(&CreateCapsuleRequest {
                title,
                content,
                open_at,
            })
            .await?;
        info!("Created capsule {}", created.id);
        Ok(created)
    }

    /// Open one of the viewer's capsules and decrypt it.
    ///
    /// Nothing is sent unless the evaluator allows the open. Opening an
    /// already-opened capsule re-displays it; the server keeps the first
    /// `opened_at`.
    pub async fn open(&self, id: Uuid, now: DateTime<Utc>) -> Result<Revealed, CapsuleError> {
        let viewer = self.require_viewer()?;
        // Without the key we couldn't show the content, so don't stamp it opened.
        let key = self.require_key()?;

        let capsule = self.find_owned(id).await?;
        let attempt = authorize_open(&capsule, now, Some(viewer))?;
        debug!("Open {} as {:?}", id, attempt);

        let opened = self.store.open(id).await?;
        let message = decrypt_content(key, &opened.content).map_err(|e| {
            CapsuleError::validation(format!("could not decrypt capsule, check the content key ({})", e))
        })?;

        Ok(Revealed {
            already_opened: opened.already_opened || attempt == OpenAttempt::Reveal,
            capsule: opened.capsule,
            message,
        })
    }

    /// Delete one of the viewer's sealed capsules. Opened capsules are
    /// refused here without a round trip.
    pub async fn delete(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), CapsuleError> {
        let viewer = self.require_viewer()?;
        let capsule = self.find_owned(id).await?;
        authorize_delete(&capsule, now, Some(viewer))?;

        self.store.delete(id).await?;
        info!("Deleted capsule {}", id);
        Ok(())
    }

    async fn find_owned(&self, id: Uuid) -> Result<CapsuleResponse, CapsuleError> {
        self.store
            .list_owned()
            .await?
            .into_iter()
            .find(|c| c.id == id)
            .ok_or(CapsuleError::NotFound)
    }

    fn require_viewer(&self) -> Result<Uuid, CapsuleError> {
        self.viewer.ok_or(CapsuleError::Unauthenticated)
    }

    fn require_key(&self) -> Result<&ContentKey, CapsuleError> {
        self.key
            .as_ref()
            .ok_or_else(|| CapsuleError::validation("CAPSULE_CONTENT_KEY is not set"))
    }
}
