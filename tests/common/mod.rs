//! Shared fixtures for integration tests

#![allow(dead_code)]

use library_ledger::{
    models::{book::CreateBook, subscription::CreateSubscription},
    repository::{MemoryStore, Repository},
    AppConfig, AppState,
};
use rust_decimal::Decimal;

/// Ids of the seeded directory records and one book
pub struct Fixture {
    pub store: MemoryStore,
    pub state: AppState,
    pub library_id: i32,
    pub reader_id: i32,
    pub author_id: i32,
    pub topic_id: i32,
    pub book_id: i32,
}

impl Fixture {
    /// Memory-backed application with one library, reader, author, topic and
    /// a book holding `quantity` copies
    pub async fn with_quantity(quantity: i32) -> Self {
        let store = MemoryStore::new();
        let library = store.add_library("Central Library", "1 Nevsky Prospect").await;
        let reader = store.add_reader("Anna Karenina").await;
        let author = store.add_author("Leo Tolstoy").await;
        let topic = store.add_topic("Novels").await;

        let state = AppState::new(AppConfig::default(), Repository::memory(store.clone()));
        let book = state
            .services
            .catalog
            .create_book(CreateBook {
                library_id: library.library_id,
                topic_id: topic.topic_id,
                author_id: author.author_id,
                title: "War and Peace".to_string(),
                publisher: Some("The Russian Messenger".to_string()),
                publish_place: Some("Moscow".to_string()),
                publish_year: Some(1869),
                quantity,
                price: Decimal::new(2500, 2),
            })
            .await
            .expect("book fixture");

        Self {
            store,
            state,
            library_id: library.library_id,
            reader_id: reader.reader_id,
            author_id: author.author_id,
            topic_id: topic.topic_id,
            book_id: book.book_id,
        }
    }

    pub fn issue_request(&self) -> CreateSubscription {
        CreateSubscription {
            library_id: self.library_id,
            book_id: self.book_id,
            reader_id: self.reader_id,
            issue_date: None,
            deposit: Decimal::new(500, 2),
        }
    }

    pub async fn quantity(&self) -> i32 {
        self.state
            .services
            .catalog
            .current_quantity(self.book_id)
            .await
            .expect("quantity lookup")
            .expect("book exists")
    }
}
