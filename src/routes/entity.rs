//! Record CRUD routes. One generic handler set, instantiated per record type.

use crate::handlers::entity::{
    create, delete as delete_handler, delete_all, list, list_user_tasks, read, update,
};
use crate::model::{Task, User};
use crate::state::{AppState, Stored};
use axum::{routing::get, Router};

/// GET/POST/DELETE on `base`, GET/PUT/DELETE on `base/:id`.
fn record_routes<R: Stored>(base: &str) -> Router<AppState> {
    Router::new()
        .route(base, get(list::<R>).post(create::<R>).delete(delete_all::<R>))
        .route(
            &format!("{}/:id", base),
            get(read::<R>).put(update::<R>).delete(delete_handler::<R>),
        )
}

pub fn entity_routes(state: AppState) -> Router {
    Router::new()
        .merge(record_routes::<User>("/users"))
        .merge(record_routes::<Task>("/tasks"))
        .route(
            "/users/:id/tasks",
            get(list_user_tasks).delete(delete_handler::<User>),
        )
        .with_state(state)
}
