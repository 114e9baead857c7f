//! # mdk-server
//!
//! Axum server fronting the MoneyDevKit SDK routes: webhook payment
//! confirmation, checkout creation, customer lookup, and subscription
//! portal URLs. The router is exposed so integration tests can drive it
//! without binding a socket.

pub mod handlers;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{
    create_checkout, health_check, lookup_customer, mdk_dispatch, subscription_urls,
};
use crate::state::AppState;

/// Build the application router with CORS and request tracing
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & info
        .route("/health", get(health_check))
        // SDK dispatcher (webhooks + passthrough)
        .route("/api/mdk", post(mdk_dispatch))
        // Payments API
        .route("/api/checkout", post(create_checkout))
        .route("/api/customer", post(lookup_customer))
        .route("/api/subscription-urls", post(subscription_urls))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
