//! Read-only projections over committed ledger state.
//! Recomputed on every call; nothing here writes.

use crate::{
    error::AppResult,
    models::{
        book::BookDetails,
        stats::{AuthorStats, LibraryStats},
        subscription::{ActiveSubscriptionDetails, SubscriptionDetails},
    },
    repository::{Repository, Store},
};

#[derive(Clone)]
pub struct ReportsService {
    repository: Repository,
}

impl ReportsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Active subscriptions with reader, book and library names
    pub async fn active_subscriptions(&self, library_id: Option<i32>) -> AppResult<Vec<ActiveSubscriptionDetails>> {
        self.repository.store().active_details(library_id).await
    }

    /// Full lending history, returned subscriptions included
    pub async fn subscription_details(&self) -> AppResult<Vec<SubscriptionDetails>> {
        self.repository.store().subscription_details().await
    }

    pub async fn book_details(&self) -> AppResult<Vec<BookDetails>> {
        self.repository.store().book_details().await
    }

    pub async fn library_stats(&self) -> AppResult<Vec<LibraryStats>> {
        self.repository.store().library_stats().await
    }

    pub async fn author_stats(&self) -> AppResult<Vec<AuthorStats>> {
        self.repository.store().author_stats().await
    }
}
