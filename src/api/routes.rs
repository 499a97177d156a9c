//! API Routes
//!
//! Configures the Axum router with all storage endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, delete_handler, flush_handler, get_handler, health_handler, keys_handler,
    set_handler, stats_handler, update_handler, AppState,
};

/// Creates the main router with all endpoints configured.
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
        .route(
            "/items/:key",
            get(get_handler)
                .put(set_handler)
                .patch(update_handler)
                .delete(delete_handler),
        )
        .route("/items", delete(clear_handler))
        .route("/keys", get(keys_handler))
        .route("/flush", post(flush_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
