//! Record types held by the stores.
//!
//! A [`Record`] carries its own table layout so the SQL builder, the migration
//! and the in-memory backend can treat users and tasks the same way.

mod task;
mod user;

pub use task::{Task, TaskDraft, TaskPatch};
pub use user::{User, UserDraft, UserPatch};

use crate::error::AppError;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// A non-key column of a record table.
#[derive(Clone, Copy, Debug)]
pub struct Column {
    pub name: &'static str,
    pub pg_type: &'static str,
}

/// Rows of another table that reference a record and are deleted with it.
#[derive(Clone, Copy, Debug)]
pub struct Dependent {
    pub table: &'static str,
    pub column: &'static str,
}

pub trait Record:
    Clone
    + Serialize
    + Send
    + Sync
    + Unpin
    + 'static
    + for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow>
{
    /// Full field set accepted on create.
    type Draft: DeserializeOwned + Send;
    /// Sparse field set accepted on update; absent fields keep their value.
    type Patch: DeserializeOwned + Default + Send;

    /// Singular name used in messages.
    const ENTITY: &'static str;
    const TABLE: &'static str;
    /// Every column except `id`, in bind order. Includes `slug`.
    const COLUMNS: &'static [Column];
    /// Columns that must be unique as a group; empty when there is no such rule.
    const UNIQUE_TOGETHER: &'static [&'static str] = &[];
    const DEPENDENTS: &'static [Dependent] = &[];
    /// Column holding the owning record's id, for records that have one.
    const OWNER_COLUMN: Option<&'static str> = None;

    fn id(&self) -> i64;
    fn slug(&self) -> &str;

    fn owner_id(&self) -> Option<i64> {
        None
    }

    /// Validate a draft and build an unsaved record (id 0) with its slug derived.
    fn from_draft(draft: Self::Draft) -> Result<Self, AppError>;

    /// Overlay the fields present in `patch`, re-derive the slug and re-validate.
    /// `self` is left untouched; the merged record is returned.
    fn merge(&self, patch: Self::Patch) -> Result<Self, AppError>;

    fn with_id(self, id: i64) -> Self;

    /// Values of [`Record::COLUMNS`], same order.
    fn column_values(&self) -> Vec<Value>;

    /// Values of [`Record::UNIQUE_TOGETHER`], same order.
    fn unique_key(&self) -> Vec<Value> {
        let values = self.column_values();
        Self::UNIQUE_TOGETHER
            .iter()
            .filter_map(|name| {
                Self::COLUMNS
                    .iter()
                    .position(|c| c.name == *name)
                    .and_then(|i| values.get(i).cloned())
            })
            .collect()
    }
}
