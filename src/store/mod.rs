//! Record stores: the exclusive owners of users and tasks.
//!
//! [`RecordStore`] is implemented by [`MemoryStore`] (process-local tables behind
//! one lock) and [`PgStore`] (PostgreSQL, one transaction per mutation). Both
//! give every mutation all-or-nothing semantics, including the user → tasks
//! cascade.

mod memory;
mod postgres;

pub use memory::{MemoryRecord, MemoryStore, MemoryTables, Table};
pub use postgres::{ensure_database_exists, PgStore};

use crate::error::AppError;
use crate::model::Record;
use async_trait::async_trait;

#[async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    /// Up to `limit` records starting at offset `skip`, in id order.
    async fn list(&self, skip: u32, limit: u32) -> Result<Vec<R>, AppError>;

    async fn get(&self, id: i64) -> Result<R, AppError>;

    /// Validate, derive the slug, check uniqueness, assign the next id and insert.
    async fn create(&self, draft: R::Draft) -> Result<R, AppError>;

    /// Merge `patch` over the stored record and commit the validated result.
    async fn update(&self, id: i64, patch: R::Patch) -> Result<R, AppError>;

    /// Remove the record and everything listed in [`Record::DEPENDENTS`] that references it.
    async fn delete(&self, id: i64) -> Result<(), AppError>;

    /// Empty the store. Dependents of the removed records go with them.
    async fn delete_all(&self) -> Result<(), AppError>;

    /// Records whose owner column equals `owner_id`, in id order.
    async fn list_owned(&self, owner_id: i64) -> Result<Vec<R>, AppError>;

    /// Cheap liveness probe of the backing storage.
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

pub(crate) fn no_owner<R: Record>() -> AppError {
    AppError::BadRequest(format!("{} records have no owner", R::ENTITY))
}
