//! Book catalog service

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, CreateBook},
    repository::{Repository, Store},
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn create_book(&self, book: CreateBook) -> AppResult<Book> {
        let book = self.repository.store().create_book(&book).await?;
        tracing::info!(book_id = book.book_id, quantity = book.quantity, "Book created");
        Ok(book)
    }

    pub async fn get_book(&self, book_id: i32) -> AppResult<Book> {
        self.repository
            .store()
            .get_book(book_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))
    }

    pub async fn list_books(&self, skip: i64, limit: i64) -> AppResult<Vec<Book>> {
        self.repository.store().list_books(skip, limit).await
    }

    /// Committed copy count, `None` when the book does not exist
    pub async fn current_quantity(&self, book_id: i32) -> AppResult<Option<i32>> {
        self.repository.store().current_quantity(book_id).await
    }
}
