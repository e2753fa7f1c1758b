use axum::{
    Router, middleware,
    routing::{delete, get, post},
};

use crate::auth::{self, AppState};
use crate::capsules;
use crate::middleware::require_auth;

/// All API routes. CORS and request tracing are layered on by the server binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/capsules/public", get(capsules::list_public))
        .route("/health", get(capsules::health));

    let protected_routes = Router::new()
        .route("/capsules", post(capsules::create_capsule))
        .route("/capsules/mine", get(capsules::list_mine))
        .route("/capsules/{capsule_id}/open", post(capsules::open_capsule))
        .route("/capsules/{capsule_id}", delete(capsules::delete_capsule))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
