//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, health, stats, subscriptions};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library Ledger API",
        version = "0.1.0",
        description = "Book lending and inventory REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::create_book,
        books::list_books,
        books::list_book_details,
        books::get_book,
        books::get_book_quantity,
        // Subscriptions
        subscriptions::create_subscription,
        subscriptions::list_subscriptions,
        subscriptions::get_subscription,
        subscriptions::return_book,
        subscriptions::delete_subscription,
        subscriptions::get_subscription_status,
        subscriptions::list_active_subscriptions,
        subscriptions::list_subscription_details,
        subscriptions::get_reader_active_subscriptions,
        // Stats
        stats::get_library_stats,
        stats::get_author_stats,
    ),
    components(
        schemas(
            // Books
            crate::models::book::Book,
            crate::models::book::CreateBook,
            crate::models::book::BookDetails,
            books::QuantityResponse,
            // Subscriptions
            crate::models::subscription::Subscription,
            crate::models::subscription::CreateSubscription,
            crate::models::subscription::SubscriptionStatus,
            crate::models::subscription::ActiveSubscriptionDetails,
            crate::models::subscription::SubscriptionDetails,
            crate::models::subscription::SubscriptionSortField,
            crate::models::subscription::SortOrder,
            subscriptions::ReturnResponse,
            subscriptions::DeleteResponse,
            // Stats
            crate::models::stats::LibraryStats,
            crate::models::stats::AuthorStats,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Books and available copies"),
        (name = "subscriptions", description = "Lending ledger"),
        (name = "stats", description = "Statistics")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
