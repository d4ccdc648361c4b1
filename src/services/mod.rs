//! Business logic services

pub mod catalog;
pub mod ledger;
pub mod reports;

use crate::{
    config::LedgerConfig,
    error::AppResult,
    repository::{Repository, Store},
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub ledger: ledger::LedgerService,
    pub reports: reports::ReportsService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, ledger_config: LedgerConfig) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            ledger: ledger::LedgerService::new(repository.clone(), ledger_config),
            reports: reports::ReportsService::new(repository.clone()),
            repository,
        }
    }

    /// Check that the backing store answers
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.store().ping().await
    }
}
