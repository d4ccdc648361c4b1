//! API handlers for the lending ledger REST endpoints

pub mod books;
pub mod health;
pub mod openapi;
pub mod stats;
pub mod subscriptions;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Books (inventory)
        .route("/books", get(books::list_books).post(books::create_book))
        .route("/books/detailed", get(books::list_book_details))
        .route("/books/detailed/", get(books::list_book_details))
        .route("/books/:id", get(books::get_book))
        .route("/books/:id/quantity", get(books::get_book_quantity))
        // Subscriptions (ledger)
        .route(
            "/subscriptions",
            get(subscriptions::list_subscriptions).post(subscriptions::create_subscription),
        )
        .route("/subscriptions/active", get(subscriptions::list_active_subscriptions))
        .route("/subscriptions/active/", get(subscriptions::list_active_subscriptions))
        .route("/subscriptions/detailed", get(subscriptions::list_subscription_details))
        .route("/subscriptions/detailed/", get(subscriptions::list_subscription_details))
        .route(
            "/subscriptions/:id",
            get(subscriptions::get_subscription).delete(subscriptions::delete_subscription),
        )
        .route("/subscriptions/:id/return", post(subscriptions::return_book))
        .route("/subscriptions/:id/status", get(subscriptions::get_subscription_status))
        .route(
            "/readers/:id/subscriptions/active",
            get(subscriptions::get_reader_active_subscriptions),
        )
        // Statistics
        .route("/stats/libraries", get(stats::get_library_stats))
        .route("/stats/authors", get(stats::get_author_stats))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
