//! Repository layer: transactional access to books and subscriptions
//!
//! The ledger never touches the store outside of these traits. Every
//! mutation of a subscription and of a book's quantity goes through a
//! [`LedgerTransaction`]; dropping a transaction without calling
//! [`LedgerTransaction::commit`] discards all of its writes.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookDetails, CreateBook},
        stats::{AuthorStats, LibraryStats},
        subscription::{
            ActiveSubscriptionDetails, NewSubscription, Subscription, SubscriptionDetails,
            SubscriptionQuery,
        },
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Copy-count primitives, only available inside a transaction
#[async_trait]
pub trait InventoryStore: Send {
    /// Take one copy of the book. Fails with `OutOfStock` when none is left
    /// or the book does not exist, leaving the quantity untouched. Returns
    /// the new quantity.
    async fn try_decrement(&mut self, book_id: i32) -> AppResult<i32>;

    /// Put one copy back. No upper bound. Returns the new quantity.
    async fn increment(&mut self, book_id: i32) -> AppResult<i32>;
}

/// One atomic unit of ledger work
#[async_trait]
pub trait LedgerTransaction: InventoryStore {
    async fn insert_subscription(&mut self, subscription: &NewSubscription) -> AppResult<Subscription>;

    /// Load a subscription and hold it until the transaction ends.
    /// Concurrent transactions locking the same row wait for this one.
    async fn lock_subscription(&mut self, subscription_id: i32) -> AppResult<Option<Subscription>>;

    /// Requires a prior [`lock_subscription`](Self::lock_subscription)
    async fn set_return_date(&mut self, subscription_id: i32, date: NaiveDate) -> AppResult<Subscription>;

    /// Requires a prior [`lock_subscription`](Self::lock_subscription)
    async fn remove_subscription(&mut self, subscription_id: i32) -> AppResult<()>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}

/// Entry point to a ledger store and its committed-state reads
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn LedgerTransaction>>;

    /// Cheap round-trip used by the readiness check
    async fn ping(&self) -> AppResult<()>;

    // Books
    async fn create_book(&self, book: &CreateBook) -> AppResult<Book>;
    async fn get_book(&self, book_id: i32) -> AppResult<Option<Book>>;
    async fn list_books(&self, skip: i64, limit: i64) -> AppResult<Vec<Book>>;
    async fn current_quantity(&self, book_id: i32) -> AppResult<Option<i32>>;
    /// Books with author, topic and library names, by id
    async fn book_details(&self) -> AppResult<Vec<BookDetails>>;

    // Subscriptions
    async fn get_subscription(&self, subscription_id: i32) -> AppResult<Option<Subscription>>;
    async fn list_subscriptions(&self, query: &SubscriptionQuery, skip: i64, limit: i64) -> AppResult<Vec<Subscription>>;
    async fn active_details(&self, library_id: Option<i32>) -> AppResult<Vec<ActiveSubscriptionDetails>>;
    /// Every subscription with joined names, newest first
    async fn subscription_details(&self) -> AppResult<Vec<SubscriptionDetails>>;

    // Aggregates
    async fn library_stats(&self) -> AppResult<Vec<LibraryStats>>;
    async fn author_stats(&self) -> AppResult<Vec<AuthorStats>>;
}

/// Main repository handle shared by the services
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn Store>,
}

impl Repository {
    /// Create a new repository over the given store
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self::new(Arc::new(PgStore::new(pool)))
    }

    pub fn memory(store: MemoryStore) -> Self {
        Self::new(Arc::new(store))
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }
}
