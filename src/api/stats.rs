//! Statistics endpoints

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::stats::{AuthorStats, LibraryStats},
};

/// Holdings per library
#[utoipa::path(
    get,
    path = "/stats/libraries",
    tag = "stats",
    responses(
        (status = 200, description = "Per-library book count, copies and value", body = Vec<LibraryStats>)
    )
)]
pub async fn get_library_stats(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<LibraryStats>>> {
    let stats = state.services.reports.library_stats().await?;
    Ok(Json(stats))
}

/// Holdings per author
#[utoipa::path(
    get,
    path = "/stats/authors",
    tag = "stats",
    responses(
        (status = 200, description = "Per-author book count, copies and average price", body = Vec<AuthorStats>)
    )
)]
pub async fn get_author_stats(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<AuthorStats>>> {
    let stats = state.services.reports.author_stats().await?;
    Ok(Json(stats))
}
