//! Subscription (lending) endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    error::AppResult,
    models::subscription::{
        ActiveSubscriptionDetails, CreateSubscription, Subscription, SubscriptionDetails,
        SubscriptionQuery, SubscriptionStatus,
    },
};

/// Return response with the book's new copy count
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    /// Status message
    pub message: String,
    /// Copies available after the return
    pub book_quantity: i32,
    /// Updated subscription
    pub subscription: Subscription,
}

/// Delete confirmation
#[derive(Serialize, ToSchema)]
pub struct DeleteResponse {
    pub message: String,
    pub subscription_id: i32,
    /// Whether a copy went back to inventory (the loan was still active)
    pub inventory_restored: bool,
    /// Copies available after the deletion, when inventory was restored
    pub book_quantity: Option<i32>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActiveSubscriptionsQuery {
    /// Restrict to one library
    pub library_id: Option<i32>,
}

/// Issue a book to a reader
#[utoipa::path(
    post,
    path = "/subscriptions",
    tag = "subscriptions",
    request_body = CreateSubscription,
    responses(
        (status = 201, description = "Subscription created", body = Subscription),
        (status = 400, description = "Book not available or invalid input"),
        (status = 404, description = "Book, reader or library not found")
    )
)]
pub async fn create_subscription(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateSubscription>,
) -> AppResult<(StatusCode, Json<Subscription>)> {
    request.validate()?;

    let subscription = state.services.ledger.issue(request).await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

/// List subscriptions
#[utoipa::path(
    get,
    path = "/subscriptions",
    tag = "subscriptions",
    params(SubscriptionQuery),
    responses(
        (status = 200, description = "Subscriptions, newest first by default", body = Vec<Subscription>)
    )
)]
pub async fn list_subscriptions(
    State(state): State<crate::AppState>,
    Query(query): Query<SubscriptionQuery>,
) -> AppResult<Json<Vec<Subscription>>> {
    let subscriptions = state.services.ledger.list(&query).await?;
    Ok(Json(subscriptions))
}

/// Get subscription by ID
#[utoipa::path(
    get,
    path = "/subscriptions/{id}",
    tag = "subscriptions",
    params(
        ("id" = i32, Path, description = "Subscription ID")
    ),
    responses(
        (status = 200, description = "Subscription", body = Subscription),
        (status = 404, description = "Subscription not found")
    )
)]
pub async fn get_subscription(
    State(state): State<crate::AppState>,
    Path(subscription_id): Path<i32>,
) -> AppResult<Json<Subscription>> {
    let subscription = state.services.ledger.get(subscription_id).await?;
    Ok(Json(subscription))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/subscriptions/{id}/return",
    tag = "subscriptions",
    params(
        ("id" = i32, Path, description = "Subscription ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = ReturnResponse),
        (status = 400, description = "Book already returned"),
        (status = 404, description = "Subscription not found")
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    Path(subscription_id): Path<i32>,
) -> AppResult<Json<ReturnResponse>> {
    let outcome = state.services.ledger.return_book(subscription_id).await?;

    Ok(Json(ReturnResponse {
        message: "Book returned successfully".to_string(),
        book_quantity: outcome.book_quantity,
        subscription: outcome.subscription,
    }))
}

/// Delete a subscription, restoring inventory if the book is still out
#[utoipa::path(
    delete,
    path = "/subscriptions/{id}",
    tag = "subscriptions",
    params(
        ("id" = i32, Path, description = "Subscription ID")
    ),
    responses(
        (status = 200, description = "Subscription deleted", body = DeleteResponse),
        (status = 404, description = "Subscription not found")
    )
)]
pub async fn delete_subscription(
    State(state): State<crate::AppState>,
    Path(subscription_id): Path<i32>,
) -> AppResult<Json<DeleteResponse>> {
    let deletion = state.services.ledger.delete(subscription_id).await?;

    Ok(Json(DeleteResponse {
        message: "Subscription deleted successfully".to_string(),
        subscription_id,
        inventory_restored: deletion.restored_quantity.is_some(),
        book_quantity: deletion.restored_quantity,
    }))
}

/// Status of a subscription relative to today
#[utoipa::path(
    get,
    path = "/subscriptions/{id}/status",
    tag = "subscriptions",
    params(
        ("id" = i32, Path, description = "Subscription ID")
    ),
    responses(
        (status = 200, description = "Subscription status", body = SubscriptionStatus),
        (status = 404, description = "Subscription not found")
    )
)]
pub async fn get_subscription_status(
    State(state): State<crate::AppState>,
    Path(subscription_id): Path<i32>,
) -> AppResult<Json<SubscriptionStatus>> {
    let status = state.services.ledger.status(subscription_id).await?;
    Ok(Json(status))
}

/// Active subscriptions with reader, book and library names
#[utoipa::path(
    get,
    path = "/subscriptions/active/",
    tag = "subscriptions",
    params(ActiveSubscriptionsQuery),
    responses(
        (status = 200, description = "Active subscriptions", body = Vec<ActiveSubscriptionDetails>)
    )
)]
pub async fn list_active_subscriptions(
    State(state): State<crate::AppState>,
    Query(query): Query<ActiveSubscriptionsQuery>,
) -> AppResult<Json<Vec<ActiveSubscriptionDetails>>> {
    let details = state.services.reports.active_subscriptions(query.library_id).await?;
    Ok(Json(details))
}

/// All subscriptions with reader, book and library names
#[utoipa::path(
    get,
    path = "/subscriptions/detailed/",
    tag = "subscriptions",
    responses(
        (status = 200, description = "Subscriptions, newest first", body = Vec<SubscriptionDetails>)
    )
)]
pub async fn list_subscription_details(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<SubscriptionDetails>>> {
    let details = state.services.reports.subscription_details().await?;
    Ok(Json(details))
}

/// Books a reader currently holds
#[utoipa::path(
    get,
    path = "/readers/{id}/subscriptions/active",
    tag = "subscriptions",
    params(
        ("id" = i32, Path, description = "Reader ID")
    ),
    responses(
        (status = 200, description = "Active subscriptions of the reader", body = Vec<Subscription>)
    )
)]
pub async fn get_reader_active_subscriptions(
    State(state): State<crate::AppState>,
    Path(reader_id): Path<i32>,
) -> AppResult<Json<Vec<Subscription>>> {
    let subscriptions = state.services.ledger.get_active(Some(reader_id)).await?;
    Ok(Json(subscriptions))
}
