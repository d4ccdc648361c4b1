//! Library lending ledger
//!
//! Tracks books and lending subscriptions, keeping each book's available
//! copy count consistent with its open loans, and serves it over a REST
//! JSON API.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

impl AppState {
    pub fn new(config: AppConfig, repository: repository::Repository) -> Self {
        let services = services::Services::new(repository, config.ledger.clone());
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}
