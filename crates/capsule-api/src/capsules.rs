use axum::{
    Extension, Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use capsule_core::format::mask_email;
use capsule_core::policy::{OpenAttempt, authorize_delete, authorize_open, validate_ciphertext, validate_draft};
use capsule_core::CapsuleError;
use capsule_db::models::{parse_db_time, parse_id};
use capsule_db::{CapsuleRow, PublicCapsuleRow};
use capsule_types::api::{
    CapsuleResponse, Claims, CreateCapsuleRequest, OpenCapsuleResponse, PublicPage,
};
use capsule_types::models::{Capsule, PublicCapsule};

use crate::auth::{AppState, with_db};
use crate::error::{ApiError, internal};
use crate::middleware::optional_claims;

pub const DEFAULT_PAGE_SIZE: u32 = 6;
pub const MAX_PAGE_SIZE: u32 = 50;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

pub async fn create_capsule(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<CreateCapsuleRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let now = Utc::now();
    let title = validate_draft(req.title.as_deref(), req.open_at, now)?;
    validate_ciphertext(&req.content)?;

    let capsule = Capsule {
        id: Uuid::new_v4(),
        owner_id: claims.sub,
        title,
        content: req.content,
        created_at: now,
        open_at: req.open_at,
        opened_at: None,
    };

    let row = CapsuleRow::from(&capsule);
    with_db(&state, move |db| db.insert_capsule(&row)).await?;
    info!("Capsule {} sealed until {}", capsule.id, capsule.open_at);

    Ok((StatusCode::CREATED, Json(CapsuleResponse::from(&capsule))))
}

/// Everyone else's capsules, newest first. Anonymous viewers see all of them.
pub async fn list_public(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = optional_claims(&headers, &state.jwt_secret)?.map(|c| c.sub);
    let page = query.page.max(1);
    let page_size = query.page_size.clamp(1, MAX_PAGE_SIZE);

    let exclude = viewer.map(|v| v.to_string());
    let (rows, total) =
        with_db(&state, move |db| db.list_public(exclude.as_deref(), page, page_size)).await?;

    let capsules = rows
        .into_iter()
        .filter_map(|row| {
            let id = row.id.clone();
            public_capsule(row)
                .map_err(|e| warn!("Skipping corrupt capsule '{}': {}", id, e))
                .ok()
        })
        .collect();

    Ok(Json(PublicPage {
        capsules,
        total,
        page,
        page_size,
    }))
}

pub async fn list_mine(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = claims.sub.to_string();
    let rows = with_db(&state, move |db| db.list_owned(&owner)).await?;

    let capsules: Vec<CapsuleResponse> = rows
        .into_iter()
        .filter_map(|row| {
            let id = row.id.clone();
            Capsule::try_from(row)
                .map_err(|e| warn!("Skipping corrupt capsule '{}': {}", id, e))
                .ok()
        })
        .map(|c| CapsuleResponse::from(&c))
        .collect();

    Ok(Json(capsules))
}

/// Reveal a capsule to its owner, stamping `opened_at` on the first open.
///
/// Whatever happens between our read and our write, the response reflects
/// the stored record: if another session won the open, its `opened_at`
/// is returned with `already_opened` set.
pub async fn open_capsule(
    State(state): State<AppState>,
    Path(capsule_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let capsule_id = parse_capsule_id(&capsule_id)?;
    let capsule = load_capsule(&state, capsule_id).await?;
    let (capsule, already_opened) = open_loaded(&state, capsule, claims.sub, Utc::now()).await?;

    Ok(Json(OpenCapsuleResponse {
        capsule: CapsuleResponse::from(&capsule),
        content: capsule.content,
        already_opened,
    }))
}

/// Open `capsule` as read earlier by the handler, which may be stale by now.
/// Returns the stored record and whether it was opened before this call.
async fn open_loaded(
    state: &AppState,
    capsule: Capsule,
    viewer: Uuid,
    now: DateTime<Utc>,
) -> Result<(Capsule, bool), ApiError> {
    let capsule_id = capsule.id;
    let won = match authorize_open(&capsule, now, Some(viewer))? {
        OpenAttempt::Reveal => false,
        OpenAttempt::Unseal => {
            let (id, owner) = (capsule_id.to_string(), viewer.to_string());
            with_db(state, move |db| db.open_capsule(&id, &owner, now)).await?
        }
    };

    if won {
        info!("Capsule {} opened by its owner", capsule_id);
        return Ok((load_capsule(state, capsule_id).await?, false));
    }
    if capsule.is_opened() {
        return Ok((capsule, true));
    }

    // Lost a race; re-read the winner's record.
    let current = load_capsule(state, capsule_id).await?;
    if !current.is_opened() {
        return Err(internal(format!("capsule {} did not open", capsule_id)));
    }
    Ok((current, true))
}

pub async fn delete_capsule(
    State(state): State<AppState>,
    Path(capsule_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let capsule_id = parse_capsule_id(&capsule_id)?;
    let capsule = load_capsule(&state, capsule_id).await?;
    authorize_delete(&capsule, Utc::now(), Some(claims.sub))?;

    let (id, owner) = (capsule_id.to_string(), claims.sub.to_string());
    let deleted = with_db(&state, move |db| db.delete_capsule(&id, &owner)).await?;
    if !deleted {
        // Opened or deleted by another session since we read it.
        return Err(CapsuleError::conflict("capsule changed before it could be deleted").into());
    }

    info!("Capsule {} deleted", capsule_id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

fn parse_capsule_id(raw: &str) -> Result<Uuid, CapsuleError> {
    raw.parse()
        .map_err(|_| CapsuleError::validation(format!("'{}' is not a capsule id", raw)))
}

async fn load_capsule(state: &AppState, capsule_id: Uuid) -> Result<Capsule, ApiError> {
    let id = capsule_id.to_string();
    let row = with_db(state, move |db| db.get_capsule(&id))
        .await?
        .ok_or(CapsuleError::NotFound)?;
    Capsule::try_from(row).map_err(internal)
}

fn public_capsule(row: PublicCapsuleRow) -> anyhow::Result<PublicCapsule> {
    Ok(PublicCapsule {
        id: parse_id(&row.id)?,
        owner_id: parse_id(&row.owner_id)?,
        author: mask_email(row.owner_email.as_deref().unwrap_or_default()),
        created_at: parse_db_time(&row.created_at)?,
        open_at: parse_db_time(&row.open_at)?,
        is_opened: row.is_opened,
    })
}
