//! Book endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookDetails, CreateBook},
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookListQuery {
    /// Rows to skip (default: 0)
    pub skip: Option<i64>,
    /// Maximum rows to return (default from configuration)
    pub limit: Option<i64>,
}

/// Available copies of one book
#[derive(Serialize, ToSchema)]
pub struct QuantityResponse {
    pub book_id: i32,
    pub quantity: i32,
}

/// Create a book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Library, topic or author not found")
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    request.validate()?;

    let book = state.services.catalog.create_book(request).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// List books
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookListQuery),
    responses(
        (status = 200, description = "Books", body = Vec<Book>)
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    Query(query): Query<BookListQuery>,
) -> AppResult<Json<Vec<Book>>> {
    let (skip, limit) = state.config.ledger.page(query.skip, query.limit);

    let books = state.services.catalog.list_books(skip, limit).await?;
    Ok(Json(books))
}

/// Books with author, topic and library names
#[utoipa::path(
    get,
    path = "/books/detailed/",
    tag = "books",
    responses(
        (status = 200, description = "Books with joined names", body = Vec<BookDetails>)
    )
)]
pub async fn list_book_details(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<BookDetails>>> {
    let details = state.services.reports.book_details().await?;
    Ok(Json(details))
}

/// Get book by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    Path(book_id): Path<i32>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.get_book(book_id).await?;
    Ok(Json(book))
}

/// Copies of a book currently available for lending
#[utoipa::path(
    get,
    path = "/books/{id}/quantity",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Available copies", body = QuantityResponse),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book_quantity(
    State(state): State<crate::AppState>,
    Path(book_id): Path<i32>,
) -> AppResult<Json<QuantityResponse>> {
    let quantity = state
        .services
        .catalog
        .current_quantity(book_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;

    Ok(Json(QuantityResponse { book_id, quantity }))
}
