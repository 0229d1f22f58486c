//! Taskmanager: users and tasks REST backend over an in-memory or PostgreSQL record store.

pub mod config;
pub mod error;
pub mod handlers;
pub mod migration;
pub mod model;
pub mod response;
pub mod routes;
pub mod service;
pub mod slug;
pub mod sql;
pub mod state;
pub mod store;

pub use config::{PageLimits, ServerConfig, StorageKind};
pub use error::{AppError, ConfigError};
pub use migration::apply_migrations;
pub use model::{Record, Task, TaskDraft, TaskPatch, User, UserDraft, UserPatch};
pub use response::{success_many, success_one};
pub use routes::{app, common_routes_with_ready, entity_routes};
pub use state::AppState;
pub use store::{ensure_database_exists, MemoryStore, PgStore, RecordStore};
