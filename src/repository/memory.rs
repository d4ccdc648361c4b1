//! In-process store
//!
//! Every book and subscription row sits behind its own async mutex. A
//! transaction holds the guards of the rows it touched until it commits or is
//! dropped, which gives the same row-level serialization as `FOR UPDATE` on
//! PostgreSQL. Writes are staged next to the guard and only reach the row on
//! commit, so readers never observe uncommitted state.
//!
//! Lock order is always subscription row, then book row.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookDetails, CreateBook},
        directory::{Author, Library, Reader, Topic},
        stats::{AuthorStats, LibraryStats},
        subscription::{
            ActiveSubscriptionDetails, NewSubscription, SortOrder, Subscription, SubscriptionDetails,
            SubscriptionQuery, SubscriptionSortField,
        },
    },
};

use super::{InventoryStore, LedgerTransaction, Store};

type Row<T> = Arc<Mutex<T>>;

#[derive(Default)]
struct Tables {
    books: RwLock<BTreeMap<i32, Row<Book>>>,
    /// `None` marks a row deleted by a committed transaction
    subscriptions: RwLock<BTreeMap<i32, Row<Option<Subscription>>>>,
    libraries: RwLock<BTreeMap<i32, Library>>,
    readers: RwLock<BTreeMap<i32, Reader>>,
    authors: RwLock<BTreeMap<i32, Author>>,
    topics: RwLock<BTreeMap<i32, Topic>>,
    book_seq: AtomicI32,
    subscription_seq: AtomicI32,
}

/// Store kept in process memory
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_library(&self, name: &str, address: &str) -> Library {
        let mut libraries = self.tables.libraries.write().await;
        let library = Library {
            library_id: next_key(&libraries),
            name: name.to_string(),
            address: address.to_string(),
            phone: None,
        };
        libraries.insert(library.library_id, library.clone());
        library
    }

    pub async fn add_reader(&self, full_name: &str) -> Reader {
        let mut readers = self.tables.readers.write().await;
        let reader = Reader {
            reader_id: next_key(&readers),
            full_name: full_name.to_string(),
            address: None,
            phone: None,
        };
        readers.insert(reader.reader_id, reader.clone());
        reader
    }

    pub async fn add_author(&self, full_name: &str) -> Author {
        let mut authors = self.tables.authors.write().await;
        let author = Author {
            author_id: next_key(&authors),
            full_name: full_name.to_string(),
            birth_year: None,
            country: None,
        };
        authors.insert(author.author_id, author.clone());
        author
    }

    pub async fn add_topic(&self, name: &str) -> Topic {
        let mut topics = self.tables.topics.write().await;
        let topic = Topic {
            topic_id: next_key(&topics),
            name: name.to_string(),
            description: None,
        };
        topics.insert(topic.topic_id, topic.clone());
        topic
    }

    /// Committed rows, each read under its own lock
    async fn all_subscriptions(&self) -> Vec<Subscription> {
        let rows: Vec<Row<Option<Subscription>>> =
            self.tables.subscriptions.read().await.values().cloned().collect();

        let mut subscriptions = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(subscription) = row.lock().await.clone() {
                subscriptions.push(subscription);
            }
        }
        subscriptions
    }

    async fn all_books(&self) -> Vec<Book> {
        let rows: Vec<Row<Book>> = self.tables.books.read().await.values().cloned().collect();

        let mut books = Vec::with_capacity(rows.len());
        for row in rows {
            books.push(row.lock().await.clone());
        }
        books
    }
}

/// Money columns are `NUMERIC(10, 2)` in PostgreSQL
fn money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn next_key<T>(table: &BTreeMap<i32, T>) -> i32 {
    table.keys().next_back().map_or(1, |last| last + 1)
}

struct LockedBook {
    guard: OwnedMutexGuard<Book>,
    quantity: i32,
}

struct LockedSubscription {
    guard: OwnedMutexGuard<Option<Subscription>>,
    staged: Option<Subscription>,
}

pub struct MemoryTransaction {
    tables: Arc<Tables>,
    books: BTreeMap<i32, LockedBook>,
    subscriptions: BTreeMap<i32, LockedSubscription>,
    inserted: Vec<Subscription>,
}

impl MemoryTransaction {
    async fn lock_book(&mut self, book_id: i32) -> AppResult<&mut LockedBook> {
        if !self.books.contains_key(&book_id) {
            let row = self
                .tables
                .books
                .read()
                .await
                .get(&book_id)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;
            let guard = row.lock_owned().await;
            let quantity = guard.quantity;
            self.books.insert(book_id, LockedBook { guard, quantity });
        }
        self.books
            .get_mut(&book_id)
            .ok_or_else(|| AppError::Internal(format!("Book {} lock lost", book_id)))
    }

    fn locked_subscription(&mut self, subscription_id: i32) -> AppResult<&mut Subscription> {
        self.subscriptions
            .get_mut(&subscription_id)
            .and_then(|locked| locked.staged.as_mut())
            .ok_or_else(|| {
                AppError::Internal(format!("Subscription {} is not locked by this transaction", subscription_id))
            })
    }
}

#[async_trait]
impl InventoryStore for MemoryTransaction {
    async fn try_decrement(&mut self, book_id: i32) -> AppResult<i32> {
        let book = match self.lock_book(book_id).await {
            Ok(book) => book,
            Err(AppError::NotFound(_)) => return Err(AppError::OutOfStock { book_id }),
            Err(error) => return Err(error),
        };
        if book.quantity <= 0 {
            return Err(AppError::OutOfStock { book_id });
        }
        book.quantity -= 1;
        Ok(book.quantity)
    }

    async fn increment(&mut self, book_id: i32) -> AppResult<i32> {
        let book = self.lock_book(book_id).await?;
        book.quantity += 1;
        Ok(book.quantity)
    }
}

#[async_trait]
impl LedgerTransaction for MemoryTransaction {
    async fn insert_subscription(&mut self, subscription: &NewSubscription) -> AppResult<Subscription> {
        let subscription = Subscription {
            subscription_id: self.tables.subscription_seq.fetch_add(1, Ordering::SeqCst) + 1,
            library_id: subscription.library_id,
            book_id: subscription.book_id,
            reader_id: subscription.reader_id,
            issue_date: subscription.issue_date,
            return_date: None,
            deposit: money(subscription.deposit),
        };
        self.inserted.push(subscription.clone());
        Ok(subscription)
    }

    async fn lock_subscription(&mut self, subscription_id: i32) -> AppResult<Option<Subscription>> {
        if let Some(locked) = self.subscriptions.get(&subscription_id) {
            return Ok(locked.staged.clone());
        }

        let row = match self.tables.subscriptions.read().await.get(&subscription_id) {
            Some(row) => row.clone(),
            None => return Ok(None),
        };
        let guard = row.lock_owned().await;
        // Deleted while we were waiting for the lock
        let Some(subscription) = (*guard).clone() else {
            return Ok(None);
        };

        self.subscriptions.insert(
            subscription_id,
            LockedSubscription {
                guard,
                staged: Some(subscription.clone()),
            },
        );
        Ok(Some(subscription))
    }

    async fn set_return_date(&mut self, subscription_id: i32, date: NaiveDate) -> AppResult<Subscription> {
        let subscription = self.locked_subscription(subscription_id)?;
        subscription.return_date = Some(date);
        Ok(subscription.clone())
    }

    async fn remove_subscription(&mut self, subscription_id: i32) -> AppResult<()> {
        self.locked_subscription(subscription_id)?;
        if let Some(locked) = self.subscriptions.get_mut(&subscription_id) {
            locked.staged = None;
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTransaction {
            tables,
            books,
            subscriptions,
            inserted,
        } = *self;

        // Guards stay alive until every staged write is visible
        let mut book_guards = Vec::with_capacity(books.len());
        for (_, mut locked) in books {
            locked.guard.quantity = locked.quantity;
            book_guards.push(locked.guard);
        }

        let mut removed = Vec::new();
        let mut subscription_guards = Vec::with_capacity(subscriptions.len());
        for (subscription_id, mut locked) in subscriptions {
            if locked.staged.is_none() {
                removed.push(subscription_id);
            }
            *locked.guard = locked.staged;
            subscription_guards.push(locked.guard);
        }

        {
            let mut rows = tables.subscriptions.write().await;
            for subscription_id in removed {
                rows.remove(&subscription_id);
            }
            for subscription in inserted {
                rows.insert(subscription.subscription_id, Arc::new(Mutex::new(Some(subscription))));
            }
        }

        drop(subscription_guards);
        drop(book_guards);
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn LedgerTransaction>> {
        Ok(Box::new(MemoryTransaction {
            tables: self.tables.clone(),
            books: BTreeMap::new(),
            subscriptions: BTreeMap::new(),
            inserted: Vec::new(),
        }))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn create_book(&self, book: &CreateBook) -> AppResult<Book> {
        let book = Book {
            book_id: self.tables.book_seq.fetch_add(1, Ordering::SeqCst) + 1,
            library_id: book.library_id,
            topic_id: book.topic_id,
            author_id: book.author_id,
            title: book.title.clone(),
            publisher: book.publisher.clone(),
            publish_place: book.publish_place.clone(),
            publish_year: book.publish_year,
            quantity: book.quantity,
            price: money(book.price),
        };
        self.tables
            .books
            .write()
            .await
            .insert(book.book_id, Arc::new(Mutex::new(book.clone())));
        Ok(book)
    }

    async fn get_book(&self, book_id: i32) -> AppResult<Option<Book>> {
        let row = self.tables.books.read().await.get(&book_id).cloned();
        match row {
            Some(row) => Ok(Some(row.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn list_books(&self, skip: i64, limit: i64) -> AppResult<Vec<Book>> {
        let books = self.all_books().await;
        Ok(books
            .into_iter()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn current_quantity(&self, book_id: i32) -> AppResult<Option<i32>> {
        Ok(self.get_book(book_id).await?.map(|book| book.quantity))
    }

    async fn book_details(&self) -> AppResult<Vec<BookDetails>> {
        let books = self.all_books().await;
        let authors = self.tables.authors.read().await;
        let topics = self.tables.topics.read().await;
        let libraries = self.tables.libraries.read().await;

        Ok(books
            .into_iter()
            .filter_map(|book| {
                Some(BookDetails {
                    author_name: authors.get(&book.author_id)?.full_name.clone(),
                    topic_name: topics.get(&book.topic_id)?.name.clone(),
                    library_name: libraries.get(&book.library_id)?.name.clone(),
                    book_id: book.book_id,
                    title: book.title,
                    quantity: book.quantity,
                    price: book.price,
                })
            })
            .collect())
    }

    async fn get_subscription(&self, subscription_id: i32) -> AppResult<Option<Subscription>> {
        let row = self.tables.subscriptions.read().await.get(&subscription_id).cloned();
        match row {
            Some(row) => Ok(row.lock().await.clone()),
            None => Ok(None),
        }
    }

    async fn list_subscriptions(
        &self,
        query: &SubscriptionQuery,
        skip: i64,
        limit: i64,
    ) -> AppResult<Vec<Subscription>> {
        let mut subscriptions: Vec<Subscription> = self
            .all_subscriptions()
            .await
            .into_iter()
            .filter(|subscription| query.matches(subscription))
            .collect();

        subscriptions.sort_by(|a, b| {
            let ordering = compare(a, b, query.sort_by);
            match query.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        Ok(subscriptions
            .into_iter()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn active_details(&self, library_id: Option<i32>) -> AppResult<Vec<ActiveSubscriptionDetails>> {
        let subscriptions = self.all_subscriptions().await;
        let books: HashMap<i32, Book> = self
            .all_books()
            .await
            .into_iter()
            .map(|book| (book.book_id, book))
            .collect();
        let readers = self.tables.readers.read().await;
        let libraries = self.tables.libraries.read().await;

        let mut details: Vec<ActiveSubscriptionDetails> = subscriptions
            .into_iter()
            .filter(|s| s.is_active() && library_id.map_or(true, |id| s.library_id == id))
            .filter_map(|s| {
                let reader = readers.get(&s.reader_id)?;
                let book = books.get(&s.book_id)?;
                let library = libraries.get(&s.library_id)?;
                Some(ActiveSubscriptionDetails {
                    subscription_id: s.subscription_id,
                    reader_id: reader.reader_id,
                    reader_name: reader.full_name.clone(),
                    book_id: book.book_id,
                    book_title: book.title.clone(),
                    library_id: library.library_id,
                    library_name: library.name.clone(),
                    issue_date: s.issue_date,
                    deposit: s.deposit,
                })
            })
            .collect();

        details.sort_by(|a, b| b.subscription_id.cmp(&a.subscription_id));
        Ok(details)
    }

    async fn subscription_details(&self) -> AppResult<Vec<SubscriptionDetails>> {
        let subscriptions = self.all_subscriptions().await;
        let titles: HashMap<i32, String> = self
            .all_books()
            .await
            .into_iter()
            .map(|book| (book.book_id, book.title))
            .collect();
        let readers = self.tables.readers.read().await;
        let libraries = self.tables.libraries.read().await;

        // Inner-join semantics: rows with a dangling reference are skipped
        let mut details: Vec<SubscriptionDetails> = subscriptions
            .into_iter()
            .filter_map(|s| {
                Some(SubscriptionDetails {
                    book_title: titles.get(&s.book_id)?.clone(),
                    reader_name: readers.get(&s.reader_id)?.full_name.clone(),
                    library_name: libraries.get(&s.library_id)?.name.clone(),
                    subscription_id: s.subscription_id,
                    issue_date: s.issue_date,
                    return_date: s.return_date,
                    deposit: s.deposit,
                })
            })
            .collect();

        details.sort_by(|a, b| b.subscription_id.cmp(&a.subscription_id));
        Ok(details)
    }

    async fn library_stats(&self) -> AppResult<Vec<LibraryStats>> {
        let books = self.all_books().await;
        let libraries = self.tables.libraries.read().await;

        let mut grouped: BTreeMap<i32, LibraryStats> = BTreeMap::new();
        for book in books {
            let Some(library) = libraries.get(&book.library_id) else {
                continue;
            };
            let entry = grouped.entry(library.library_id).or_insert_with(|| LibraryStats {
                library_name: library.name.clone(),
                total_books: 0,
                total_copies: 0,
                total_value: Decimal::ZERO,
            });
            entry.total_books += 1;
            entry.total_copies += i64::from(book.quantity);
            entry.total_value += Decimal::from(book.quantity) * book.price;
        }

        let mut stats: Vec<LibraryStats> = grouped.into_values().collect();
        stats.sort_by(|a, b| a.library_name.cmp(&b.library_name));
        Ok(stats)
    }

    async fn author_stats(&self) -> AppResult<Vec<AuthorStats>> {
        let books = self.all_books().await;
        let authors = self.tables.authors.read().await;

        let mut grouped: BTreeMap<i32, (String, i64, i64, Decimal)> = BTreeMap::new();
        for book in books {
            let Some(author) = authors.get(&book.author_id) else {
                continue;
            };
            let entry = grouped
                .entry(author.author_id)
                .or_insert_with(|| (author.full_name.clone(), 0, 0, Decimal::ZERO));
            entry.1 += 1;
            entry.2 += i64::from(book.quantity);
            entry.3 += book.price;
        }

        let mut stats: Vec<AuthorStats> = grouped
            .into_values()
            .map(|(author_name, total_books, total_copies, price_sum)| AuthorStats {
                author_name,
                total_books,
                total_copies,
                avg_price: (price_sum / Decimal::from(total_books))
                    .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            })
            .collect();
        stats.sort_by(|a, b| a.author_name.cmp(&b.author_name));
        Ok(stats)
    }
}

/// Mirrors PostgreSQL ordering: NULL sorts after every date in ascending order
fn compare(a: &Subscription, b: &Subscription, field: SubscriptionSortField) -> CmpOrdering {
    let primary = match field {
        SubscriptionSortField::SubscriptionId => CmpOrdering::Equal,
        SubscriptionSortField::IssueDate => a.issue_date.cmp(&b.issue_date),
        SubscriptionSortField::ReturnDate => match (a.return_date, b.return_date) {
            (None, None) => CmpOrdering::Equal,
            (None, Some(_)) => CmpOrdering::Greater,
            (Some(_), None) => CmpOrdering::Less,
            (Some(x), Some(y)) => x.cmp(&y),
        },
        SubscriptionSortField::Deposit => a.deposit.cmp(&b.deposit),
    };
    primary.then(a.subscription_id.cmp(&b.subscription_id))
}
