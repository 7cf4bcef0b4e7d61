//! API Routes
//!
//! Configures the Axum router with the cache server endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{get_handler, put_handler, AppState};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `POST /put` - Store a key-value pair
/// - `GET /get?key=` - Retrieve a value by key
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/put", post(put_handler))
        .route("/get", get(get_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
