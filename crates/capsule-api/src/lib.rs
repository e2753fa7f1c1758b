pub mod auth;
pub mod capsules;
pub mod error;
pub mod middleware;
pub mod routes;

pub use auth::{AppState, AppStateInner};
pub use routes::router;
