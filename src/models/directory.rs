//! Records the ledger references by id but does not manage.
//!
//! Their lifecycle belongs to the directory tables; the ledger only reads
//! their names for the joined reports.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Library {
    pub library_id: i32,
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Reader {
    pub reader_id: i32,
    pub full_name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Author {
    pub author_id: i32,
    pub full_name: String,
    pub birth_year: Option<i32>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Topic {
    pub topic_id: i32,
    pub name: String,
    pub description: Option<String>,
}
