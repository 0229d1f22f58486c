//! Shared application state for all routes: one store per record type, created once at startup.

use crate::config::PageLimits;
use crate::model::{Record, Task, User};
use crate::store::{MemoryStore, PgStore, RecordStore};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn RecordStore<User>>,
    pub tasks: Arc<dyn RecordStore<Task>>,
    pub pages: PageLimits,
}

impl AppState {
    /// Both stores share one set of in-memory tables so the user → tasks cascade stays atomic.
    pub fn in_memory(pages: PageLimits) -> Self {
        Self::with_memory_store(MemoryStore::new(), pages)
    }

    pub fn with_memory_store(store: MemoryStore, pages: PageLimits) -> Self {
        AppState {
            users: Arc::new(store.clone()),
            tasks: Arc::new(store),
            pages,
        }
    }

    pub fn postgres(pool: PgPool, schema: impl Into<String>, pages: PageLimits) -> Self {
        let store = PgStore::new(pool, schema);
        AppState {
            users: Arc::new(store.clone()),
            tasks: Arc::new(store),
            pages,
        }
    }
}

/// Record types reachable through [`AppState`]; lets one generic handler serve every entity.
pub trait Stored: Record {
    fn store(state: &AppState) -> &dyn RecordStore<Self>;
}

impl Stored for User {
    fn store(state: &AppState) -> &dyn RecordStore<Self> {
        state.users.as_ref()
    }
}

impl Stored for Task {
    fn store(state: &AppState) -> &dyn RecordStore<Self> {
        state.tasks.as_ref()
    }
}
