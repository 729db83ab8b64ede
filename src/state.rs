use crate::services::{
    account_service::AccountService, catalog_service::CatalogService,
    ledger_service::LedgerService, session_store::SessionStore,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<SqlitePool>,
    pub catalog: CatalogService,
    pub ledger: LedgerService,
    pub accounts: AccountService,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(db: Arc<SqlitePool>, bcrypt_cost: u32) -> Self {
        Self::with_ledger(db.clone(), bcrypt_cost, LedgerService::new(db))
    }

    pub fn with_ledger(db: Arc<SqlitePool>, bcrypt_cost: u32, ledger: LedgerService) -> Self {
        Self {
            catalog: CatalogService::new(db.clone()),
            accounts: AccountService::new(db.clone(), bcrypt_cost),
            sessions: SessionStore::new(),
            ledger,
            db,
        }
    }
}
