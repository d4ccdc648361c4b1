//! Book model: catalog entry and its lendable copy count

use chrono::{Datelike, Local};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// Earliest accepted publication year
pub const MIN_PUBLISH_YEAR: i32 = 1500;

/// Book model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub book_id: i32,
    pub library_id: i32,
    pub topic_id: i32,
    pub author_id: i32,
    pub title: String,
    pub publisher: Option<String>,
    pub publish_place: Option<String>,
    pub publish_year: Option<i32>,
    /// Copies currently available for lending
    pub quantity: i32,
    pub price: Decimal,
}

/// Book joined with its author, topic and library names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookDetails {
    pub book_id: i32,
    pub title: String,
    pub author_name: String,
    pub topic_name: String,
    pub library_name: String,
    pub quantity: i32,
    pub price: Decimal,
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_create_book", skip_on_field_errors = false))]
pub struct CreateBook {
    pub library_id: i32,
    pub topic_id: i32,
    pub author_id: i32,
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,
    #[validate(length(max = 100))]
    pub publisher: Option<String>,
    #[validate(length(max = 100))]
    pub publish_place: Option<String>,
    #[validate(range(min = 1500, message = "Publish year must not be before 1500"))]
    pub publish_year: Option<i32>,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: i32,
    #[serde(default)]
    pub price: Decimal,
}

fn default_quantity() -> i32 {
    1
}

/// Checks that depend on the current date or on money amounts
fn validate_create_book(book: &CreateBook) -> Result<(), ValidationError> {
    if let Some(year) = book.publish_year {
        let current = Local::now().year();
        if year > current {
            let mut error = ValidationError::new("publish_year");
            error.message = Some(
                format!("Publish year must be between {} and {}", MIN_PUBLISH_YEAR, current).into(),
            );
            return Err(error);
        }
    }
    validate_non_negative(&book.price)
}

/// Shared check for money amounts (price, deposit)
pub(crate) fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut error = ValidationError::new("non_negative");
        error.message = Some("Amount cannot be negative".into());
        return Err(error);
    }
    Ok(())
}
