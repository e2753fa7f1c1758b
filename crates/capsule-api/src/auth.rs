use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use capsule_core::policy::{normalize_email, validate_password};
use capsule_db::Database;
use capsule_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest};

use crate::error::{ApiError, internal};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

/// Run a blocking DB call off the async runtime.
pub async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| internal(format!("spawn_blocking join error: {}", e)))?
        .map_err(internal)
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let email = normalize_email(&req.email)?;
    validate_password(&req.password)?;

    // Check if email is taken
    let lookup = email.clone();
    if with_db(&state, move |db| db.get_user_by_email(&lookup)).await?.is_some() {
        return Err(email_taken());
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(internal)?
        .to_string();

    let user_id = Uuid::new_v4();

    let (uid, mail) = (user_id.to_string(), email.clone());
    // Another request may have taken the email while we were hashing
    let created = with_db(&state, move |db| db.create_user(&uid, &mail, &password_hash)).await?;
    if !created {
        return Err(email_taken());
    }
    info!("Registered user {}", user_id);

    let token = create_token(&state.jwt_secret, user_id, &email).map_err(internal)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user_id,
            email,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let bad_credentials = || ApiError::new(StatusCode::UNAUTHORIZED, "invalid email or password");

    let email = normalize_email(&req.email).map_err(|_| bad_credentials())?;
    let user = with_db(&state, move |db| db.get_user_by_email(&email))
        .await?
        .ok_or_else(bad_credentials)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password).map_err(internal)?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| bad_credentials())?;

    let user_id: Uuid = user.id.parse().map_err(internal)?;

    let token = create_token(&state.jwt_secret, user_id, &user.email).map_err(internal)?;

    Ok(Json(AuthResponse {
        user_id,
        email: user.email,
        token,
    }))
}

fn email_taken() -> ApiError {
    ApiError::new(StatusCode::CONFLICT, "email is already registered")
}

fn create_token(secret: &str, user_id: Uuid, email: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
