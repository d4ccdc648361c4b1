//! PostgreSQL store
//!
//! Each ledger transaction is one `sqlx` transaction. The book counter is
//! serialized by row locks taken by the conditional `UPDATE`; subscription
//! rows are locked with `SELECT ... FOR UPDATE` before they change.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

use crate::{
    error::{map_foreign_key, AppError, AppResult},
    models::{
        book::{Book, BookDetails, CreateBook},
        stats::{AuthorStats, LibraryStats},
        subscription::{
            ActiveSubscriptionDetails, NewSubscription, Subscription, SubscriptionDetails,
            SubscriptionQuery,
        },
    },
};

use super::{InventoryStore, LedgerTransaction, Store};

const SUBSCRIPTION_COLUMNS: &str =
    "subscription_id, library_id, book_id, reader_id, issue_date, return_date, deposit";

const BOOK_COLUMNS: &str = "book_id, library_id, topic_id, author_id, title, publisher, \
     publish_place, publish_year, quantity, price";

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl InventoryStore for PgTransaction {
    async fn try_decrement(&mut self, book_id: i32) -> AppResult<i32> {
        // The row lock makes concurrent issuers wait, then re-check the guard.
        // No row back means no copy to lend, whether the book is empty or unknown.
        let quantity: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE books
            SET quantity = quantity - 1
            WHERE book_id = $1 AND quantity > 0
            RETURNING quantity
            "#,
        )
        .bind(book_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        quantity.ok_or(AppError::OutOfStock { book_id })
    }

    async fn increment(&mut self, book_id: i32) -> AppResult<i32> {
        sqlx::query_scalar::<_, i32>(
            "UPDATE books SET quantity = quantity + 1 WHERE book_id = $1 RETURNING quantity",
        )
        .bind(book_id)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))
    }
}

#[async_trait]
impl LedgerTransaction for PgTransaction {
    async fn insert_subscription(&mut self, subscription: &NewSubscription) -> AppResult<Subscription> {
        sqlx::query_as::<_, Subscription>(&format!(
            r#"
            INSERT INTO subscriptions (library_id, book_id, reader_id, issue_date, deposit)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            SUBSCRIPTION_COLUMNS
        ))
        .bind(subscription.library_id)
        .bind(subscription.book_id)
        .bind(subscription.reader_id)
        .bind(subscription.issue_date)
        .bind(subscription.deposit)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_foreign_key)
    }

    async fn lock_subscription(&mut self, subscription_id: i32) -> AppResult<Option<Subscription>> {
        let subscription = sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {} FROM subscriptions WHERE subscription_id = $1 FOR UPDATE",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(subscription_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(subscription)
    }

    async fn set_return_date(&mut self, subscription_id: i32, date: NaiveDate) -> AppResult<Subscription> {
        sqlx::query_as::<_, Subscription>(&format!(
            "UPDATE subscriptions SET return_date = $2 WHERE subscription_id = $1 RETURNING {}",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(subscription_id)
        .bind(date)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Subscription with id {} not found", subscription_id)))
    }

    async fn remove_subscription(&mut self, subscription_id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE subscription_id = $1")
            .bind(subscription_id)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Subscription with id {} not found",
                subscription_id
            )));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> AppResult<Box<dyn LedgerTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction { tx }))
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_book(&self, book: &CreateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!(
            r#"
            INSERT INTO books (library_id, topic_id, author_id, title, publisher,
                               publish_place, publish_year, quantity, price)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(book.library_id)
        .bind(book.topic_id)
        .bind(book.author_id)
        .bind(&book.title)
        .bind(&book.publisher)
        .bind(&book.publish_place)
        .bind(book.publish_year)
        .bind(book.quantity)
        .bind(book.price)
        .fetch_one(&self.pool)
        .await
        .map_err(map_foreign_key)
    }

    async fn get_book(&self, book_id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE book_id = $1",
            BOOK_COLUMNS
        ))
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(book)
    }

    async fn list_books(&self, skip: i64, limit: i64) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books ORDER BY book_id OFFSET $1 LIMIT $2",
            BOOK_COLUMNS
        ))
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    async fn current_quantity(&self, book_id: i32) -> AppResult<Option<i32>> {
        let quantity = sqlx::query_scalar("SELECT quantity FROM books WHERE book_id = $1")
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(quantity)
    }

    async fn book_details(&self) -> AppResult<Vec<BookDetails>> {
        let details = sqlx::query_as::<_, BookDetails>(
            r#"
            SELECT b.book_id, b.title,
                   a.full_name AS author_name,
                   t.name AS topic_name,
                   l.name AS library_name,
                   b.quantity, b.price
            FROM books b
            JOIN authors a ON b.author_id = a.author_id
            JOIN topics t ON b.topic_id = t.topic_id
            JOIN libraries l ON b.library_id = l.library_id
            ORDER BY b.book_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(details)
    }

    async fn get_subscription(&self, subscription_id: i32) -> AppResult<Option<Subscription>> {
        let subscription = sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {} FROM subscriptions WHERE subscription_id = $1",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(subscription)
    }

    async fn list_subscriptions(
        &self,
        query: &SubscriptionQuery,
        skip: i64,
        limit: i64,
    ) -> AppResult<Vec<Subscription>> {
        let mut builder = listing_query(query);
        builder.push(" OFFSET ").push_bind(skip);
        builder.push(" LIMIT ").push_bind(limit);

        let subscriptions = builder
            .build_query_as::<Subscription>()
            .fetch_all(&self.pool)
            .await?;
        Ok(subscriptions)
    }

    async fn active_details(&self, library_id: Option<i32>) -> AppResult<Vec<ActiveSubscriptionDetails>> {
        let details = sqlx::query_as::<_, ActiveSubscriptionDetails>(
            r#"
            SELECT s.subscription_id,
                   r.reader_id, r.full_name AS reader_name,
                   b.book_id, b.title AS book_title,
                   l.library_id, l.name AS library_name,
                   s.issue_date, s.deposit
            FROM subscriptions s
            JOIN readers r ON s.reader_id = r.reader_id
            JOIN books b ON s.book_id = b.book_id
            JOIN libraries l ON s.library_id = l.library_id
            WHERE s.return_date IS NULL
              AND ($1::INTEGER IS NULL OR s.library_id = $1)
            ORDER BY s.subscription_id DESC
            "#,
        )
        .bind(library_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(details)
    }

    async fn subscription_details(&self) -> AppResult<Vec<SubscriptionDetails>> {
        let details = sqlx::query_as::<_, SubscriptionDetails>(
            r#"
            SELECT s.subscription_id, s.issue_date, s.return_date, s.deposit,
                   b.title AS book_title,
                   r.full_name AS reader_name,
                   l.name AS library_name
            FROM subscriptions s
            JOIN readers r ON s.reader_id = r.reader_id
            JOIN books b ON s.book_id = b.book_id
            JOIN libraries l ON s.library_id = l.library_id
            ORDER BY s.subscription_id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(details)
    }

    async fn library_stats(&self) -> AppResult<Vec<LibraryStats>> {
        let stats = sqlx::query_as::<_, LibraryStats>(
            r#"
            SELECT l.name AS library_name,
                   COUNT(b.book_id) AS total_books,
                   COALESCE(SUM(b.quantity), 0)::BIGINT AS total_copies,
                   COALESCE(SUM(b.quantity * b.price), 0)::NUMERIC(14, 2) AS total_value
            FROM libraries l
            JOIN books b ON l.library_id = b.library_id
            GROUP BY l.library_id, l.name
            HAVING COUNT(b.book_id) > 0
            ORDER BY l.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(stats)
    }

    async fn author_stats(&self) -> AppResult<Vec<AuthorStats>> {
        let stats = sqlx::query_as::<_, AuthorStats>(
            r#"
            SELECT a.full_name AS author_name,
                   COUNT(b.book_id) AS total_books,
                   COALESCE(SUM(b.quantity), 0)::BIGINT AS total_copies,
                   ROUND(AVG(b.price), 2) AS avg_price
            FROM authors a
            JOIN books b ON a.author_id = b.author_id
            GROUP BY a.author_id, a.full_name
            HAVING COUNT(b.book_id) > 0
            ORDER BY a.full_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(stats)
    }
}

/// SELECT with filters and ordering; pagination is appended by the caller
fn listing_query(query: &SubscriptionQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {} FROM subscriptions WHERE TRUE", SUBSCRIPTION_COLUMNS));

    if let Some(reader_id) = query.reader_id {
        builder.push(" AND reader_id = ").push_bind(reader_id);
    }
    if let Some(library_id) = query.library_id {
        builder.push(" AND library_id = ").push_bind(library_id);
    }
    if let Some(book_id) = query.book_id {
        builder.push(" AND book_id = ").push_bind(book_id);
    }
    if query.active_only {
        builder.push(" AND return_date IS NULL");
    }

    // Column and direction come from closed enums, never from raw input
    builder.push(format!(
        " ORDER BY {} {}",
        query.sort_by.column(),
        query.order.keyword()
    ));
    if query.sort_by.column() != "subscription_id" {
        builder.push(format!(", subscription_id {}", query.order.keyword()));
    }

    builder
}
