//! REST API routes configuration

use crate::api::handlers::{self, ApiState};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

/// Create the API router with all routes
pub fn create_router(state: ApiState) -> Router {
    // Configure CORS for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Mining
        .route("/mine", get(handlers::mine))
        // Transactions
        .route("/transactions/new", post(handlers::new_transaction))
        // Chain
        .route("/chain", get(handlers::full_chain))
        // Peers and consensus
        .route("/nodes/register", post(handlers::register_nodes))
        .route("/nodes/resolve", get(handlers::resolve))
        .with_state(state)
        .layer(cors)
}
