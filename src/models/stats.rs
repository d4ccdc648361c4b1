//! Aggregate projections over books

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Holdings of one library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LibraryStats {
    pub library_name: String,
    /// Distinct titles
    pub total_books: i64,
    /// Copies currently on the shelves
    pub total_copies: i64,
    /// Sum of quantity * price
    pub total_value: Decimal,
}

/// Holdings written by one author
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AuthorStats {
    pub author_name: String,
    pub total_books: i64,
    pub total_copies: i64,
    /// Rounded to two decimal places
    pub avg_price: Decimal,
}
