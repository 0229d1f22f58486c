use super::{no_owner, RecordStore};
use crate::error::AppError;
use crate::model::{Record, Task, User};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Rows of one record type keyed by id. Ids come from a counter that only grows,
/// so iteration order is insertion order and deleted ids are never handed out again.
#[derive(Debug)]
pub struct Table<R> {
    rows: BTreeMap<i64, R>,
    next_id: i64,
}

impl<R> Default for Table<R> {
    fn default() -> Self {
        Table {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<R: Record> Table<R> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn page(&self, skip: u32, limit: u32) -> Vec<R> {
        self.rows
            .values()
            .skip(skip as usize)
            .take(limit as usize)
            .cloned()
            .collect()
    }

    fn get(&self, id: i64) -> Result<&R, AppError> {
        self.rows
            .get(&id)
            .ok_or_else(|| AppError::not_found(R::ENTITY, id))
    }

    fn others(&self, id: i64) -> impl Iterator<Item = &R> + '_ {
        self.rows.values().filter(move |r| r.id() != id)
    }

    /// Slug first, then the business uniqueness group. Rows with `candidate`'s own id are skipped.
    fn check_conflicts(&self, candidate: &R) -> Result<(), AppError> {
        if self.others(candidate.id()).any(|r| r.slug() == candidate.slug()) {
            return Err(AppError::Conflict(format!(
                "{} slug '{}' already exists",
                R::ENTITY,
                candidate.slug()
            )));
        }
        if !R::UNIQUE_TOGETHER.is_empty() {
            let key = candidate.unique_key();
            if self.others(candidate.id()).any(|r| r.unique_key() == key) {
                return Err(AppError::Conflict(format!(
                    "{} with the same {} already exists",
                    R::ENTITY,
                    R::UNIQUE_TOGETHER.join(" and ")
                )));
            }
        }
        Ok(())
    }

    fn insert(&mut self, record: R) -> Result<R, AppError> {
        self.check_conflicts(&record)?;
        let record = record.with_id(self.next_id);
        self.next_id += 1;
        self.rows.insert(record.id(), record.clone());
        Ok(record)
    }

    fn replace(&mut self, record: R) -> Result<R, AppError> {
        self.check_conflicts(&record)?;
        self.rows.insert(record.id(), record.clone());
        Ok(record)
    }

    fn remove(&mut self, id: i64) -> Result<R, AppError> {
        self.rows
            .remove(&id)
            .ok_or_else(|| AppError::not_found(R::ENTITY, id))
    }

    fn ids(&self) -> HashSet<i64> {
        self.rows.keys().copied().collect()
    }
}

/// All tables of the in-memory backend. Guarded by a single lock so cascades are atomic.
#[derive(Debug, Default)]
pub struct MemoryTables {
    pub users: Table<User>,
    pub tasks: Table<Task>,
}

/// Ties a record type to its table in [`MemoryTables`] and to the rows that depend on it.
pub trait MemoryRecord: Record {
    fn table(tables: &MemoryTables) -> &Table<Self>;
    fn table_mut(tables: &mut MemoryTables) -> &mut Table<Self>;

    /// Drop rows elsewhere that reference the record with `id`.
    fn cascade(_tables: &mut MemoryTables, _id: i64) {}

    /// Drop rows elsewhere that reference any record of this type.
    fn cascade_all(_tables: &mut MemoryTables) {}
}

impl MemoryRecord for User {
    fn table(tables: &MemoryTables) -> &Table<Self> {
        &tables.users
    }

    fn table_mut(tables: &mut MemoryTables) -> &mut Table<Self> {
        &mut tables.users
    }

    fn cascade(tables: &mut MemoryTables, id: i64) {
        tables.tasks.rows.retain(|_, t| t.owner_id != id);
    }

    fn cascade_all(tables: &mut MemoryTables) {
        let owners = tables.users.ids();
        tables.tasks.rows.retain(|_, t| !owners.contains(&t.owner_id));
    }
}

impl MemoryRecord for Task {
    fn table(tables: &MemoryTables) -> &Table<Self> {
        &tables.tasks
    }

    fn table_mut(tables: &mut MemoryTables) -> &mut Table<Self> {
        &mut tables.tasks
    }
}

/// Process-local backend. Clones share the same tables.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<MemoryTables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records of type `R`.
    pub fn count<R: MemoryRecord>(&self) -> usize {
        R::table(&self.tables.read()).len()
    }
}

#[async_trait]
impl<R: MemoryRecord> RecordStore<R> for MemoryStore {
    async fn list(&self, skip: u32, limit: u32) -> Result<Vec<R>, AppError> {
        Ok(R::table(&self.tables.read()).page(skip, limit))
    }

    async fn get(&self, id: i64) -> Result<R, AppError> {
        R::table(&self.tables.read()).get(id).cloned()
    }

    async fn create(&self, draft: R::Draft) -> Result<R, AppError> {
        let record = R::from_draft(draft)?;
        let created = R::table_mut(&mut self.tables.write()).insert(record)?;
        tracing::debug!(entity = R::ENTITY, id = created.id(), slug = created.slug(), "created");
        Ok(created)
    }

    async fn update(&self, id: i64, patch: R::Patch) -> Result<R, AppError> {
        let mut tables = self.tables.write();
        let table = R::table_mut(&mut tables);
        let merged = table.get(id)?.merge(patch)?;
        let updated = table.replace(merged)?;
        tracing::debug!(entity = R::ENTITY, id, slug = updated.slug(), "updated");
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let mut tables = self.tables.write();
        R::table_mut(&mut tables).remove(id)?;
        R::cascade(&mut tables, id);
        tracing::debug!(entity = R::ENTITY, id, "deleted");
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), AppError> {
        let mut tables = self.tables.write();
        R::cascade_all(&mut tables);
        let table = R::table_mut(&mut tables);
        let removed = table.len();
        table.rows.clear();
        tracing::debug!(entity = R::ENTITY, removed, "deleted all");
        Ok(())
    }

    async fn list_owned(&self, owner_id: i64) -> Result<Vec<R>, AppError> {
        if R::OWNER_COLUMN.is_none() {
            return Err(no_owner::<R>());
        }
        Ok(R::table(&self.tables.read())
            .rows
            .values()
            .filter(|r| r.owner_id() == Some(owner_id))
            .cloned()
            .collect())
    }
}
