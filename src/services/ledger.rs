//! Subscription ledger: issue, return and delete with inventory compensation
//!
//! Every transition runs in a single store transaction that covers both the
//! subscription row and the book counter. An error anywhere drops the
//! transaction, so neither side is applied.

use chrono::{Local, NaiveDate};

use crate::{
    config::LedgerConfig,
    error::{AppError, AppResult},
    models::subscription::{
        CreateSubscription, Deletion, LoanState, NewSubscription, Subscription, SubscriptionQuery,
        SubscriptionStatus,
    },
    repository::{InventoryStore, LedgerTransaction, Repository, Store},
};

/// Result of a successful return
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnOutcome {
    pub subscription: Subscription,
    /// Copies available after the return
    pub book_quantity: i32,
}

#[derive(Clone)]
pub struct LedgerService {
    repository: Repository,
    config: LedgerConfig,
}

impl LedgerService {
    pub fn new(repository: Repository, config: LedgerConfig) -> Self {
        Self { repository, config }
    }

    /// Lend a copy: take it from inventory and open an active subscription.
    /// An unknown book is reported like an empty shelf, as `OutOfStock`.
    ///
    /// Reader and library ids are not checked here; the store's referential
    /// constraints decide.
    pub async fn issue(&self, request: CreateSubscription) -> AppResult<Subscription> {
        let new = NewSubscription {
            library_id: request.library_id,
            book_id: request.book_id,
            reader_id: request.reader_id,
            issue_date: request.issue_date.unwrap_or_else(today),
            deposit: request.deposit,
        };

        let mut tx = self.repository.store().begin().await?;
        let remaining = tx.try_decrement(new.book_id).await?;
        let subscription = tx.insert_subscription(&new).await?;
        tx.commit().await?;

        tracing::info!(
            subscription_id = subscription.subscription_id,
            book_id = subscription.book_id,
            reader_id = subscription.reader_id,
            remaining,
            "Book issued"
        );
        Ok(subscription)
    }

    /// Close an active subscription and put the copy back
    pub async fn return_book(&self, subscription_id: i32) -> AppResult<ReturnOutcome> {
        let mut tx = self.repository.store().begin().await?;
        let subscription = tx
            .lock_subscription(subscription_id)
            .await?
            .ok_or_else(|| not_found(subscription_id))?;

        if let LoanState::Returned { on } = subscription.state() {
            tracing::warn!(subscription_id, returned_on = %on, "Return of an already returned book");
            return Err(AppError::AlreadyReturned { subscription_id });
        }

        let subscription = tx.set_return_date(subscription_id, today()).await?;
        let book_quantity = tx.increment(subscription.book_id).await?;
        tx.commit().await?;

        tracing::info!(
            subscription_id,
            book_id = subscription.book_id,
            book_quantity,
            "Book returned"
        );
        Ok(ReturnOutcome {
            subscription,
            book_quantity,
        })
    }

    /// Remove a subscription. An active one gives its copy back first; a
    /// returned one already did.
    pub async fn delete(&self, subscription_id: i32) -> AppResult<Deletion> {
        let mut tx = self.repository.store().begin().await?;
        let subscription = tx
            .lock_subscription(subscription_id)
            .await?
            .ok_or_else(|| not_found(subscription_id))?;

        let restored_quantity = match subscription.state() {
            LoanState::Active => Some(tx.increment(subscription.book_id).await?),
            LoanState::Returned { .. } => None,
        };
        tx.remove_subscription(subscription_id).await?;
        tx.commit().await?;

        tracing::info!(
            subscription_id,
            book_id = subscription.book_id,
            restored = restored_quantity.is_some(),
            "Subscription deleted"
        );
        Ok(Deletion {
            subscription,
            restored_quantity,
        })
    }

    pub async fn get(&self, subscription_id: i32) -> AppResult<Subscription> {
        self.repository
            .store()
            .get_subscription(subscription_id)
            .await?
            .ok_or_else(|| not_found(subscription_id))
    }

    /// Filtered page of subscriptions, newest first unless asked otherwise
    pub async fn list(&self, query: &SubscriptionQuery) -> AppResult<Vec<Subscription>> {
        let (skip, limit) = self.config.page(query.skip, query.limit);

        self.repository
            .store()
            .list_subscriptions(query, skip, limit)
            .await
    }

    /// Every subscription whose copy is still out, optionally for one reader
    pub async fn get_active(&self, reader_id: Option<i32>) -> AppResult<Vec<Subscription>> {
        let query = SubscriptionQuery {
            reader_id,
            active_only: true,
            ..Default::default()
        };
        self.repository
            .store()
            .list_subscriptions(&query, 0, i64::MAX)
            .await
    }

    pub async fn status(&self, subscription_id: i32) -> AppResult<SubscriptionStatus> {
        let subscription = self.get(subscription_id).await?;
        Ok(SubscriptionStatus::at(&subscription, today()))
    }
}

/// Calendar date on the server's local clock
fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn not_found(subscription_id: i32) -> AppError {
    AppError::NotFound(format!("Subscription with id {} not found", subscription_id))
}
