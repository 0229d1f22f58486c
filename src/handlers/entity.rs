//! Record CRUD handlers, generic over the record type: list, read, create, update, delete, delete all.

use crate::error::AppError;
use crate::model::User;
use crate::response::{success_many, success_message, success_one, success_one_ok};
use crate::state::{AppState, Stored};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;

fn parse_id(id_str: &str) -> Result<i64, AppError> {
    id_str
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid id: {}", id_str)))
}

/// `skip` or `limit` from the query string; anything but a non-negative integer is rejected.
fn page_param(params: &HashMap<String, String>, key: &str) -> Result<Option<u32>, AppError> {
    params
        .get(key)
        .map(|v| {
            v.parse()
                .map_err(|_| AppError::BadRequest(format!("invalid {}: {}", key, v)))
        })
        .transpose()
}

/// Malformed JSON and non-objects are bad requests; objects that do not fit the field set
/// fail validation on the offending field.
fn parse_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, AppError> {
    let body: Value = serde_json::from_slice(bytes)
        .map_err(|e| AppError::BadRequest(format!("invalid JSON body: {}", e)))?;
    if !body.is_object() {
        return Err(AppError::BadRequest("body must be a JSON object".into()));
    }
    serde_path_to_error::deserialize(body).map_err(|e| {
        let field = failing_field(&e);
        AppError::validation(field, e.into_inner().to_string())
    })
}

/// Path of the value that failed to deserialize. A missing field fails on the enclosing
/// object, so its name is taken from the error instead.
fn failing_field(err: &serde_path_to_error::Error<serde_json::Error>) -> String {
    let path = err.path().to_string();
    if path != "." {
        return path;
    }
    let message = err.inner().to_string();
    message
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split('`').next())
        .unwrap_or("body")
        .to_string()
}

pub async fn list<R: Stored>(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let skip = page_param(&params, "skip")?.unwrap_or(0);
    let limit = state.pages.resolve(page_param(&params, "limit")?);
    let rows = R::store(&state).list(skip, limit).await?;
    Ok(success_many(rows))
}

pub async fn read<R: Stored>(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let row = R::store(&state).get(id).await?;
    Ok(success_one_ok(row))
}

pub async fn create<R: Stored>(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let draft: R::Draft = parse_body(&body)?;
    let row = R::store(&state).create(draft).await?;
    tracing::info!(entity = R::ENTITY, id = row.id(), "record created");
    Ok(success_one(row))
}

pub async fn update<R: Stored>(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let patch: R::Patch = parse_body(&body)?;
    let row = R::store(&state).update(id, patch).await?;
    Ok(success_one_ok(row))
}

pub async fn delete<R: Stored>(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    R::store(&state).delete(id).await?;
    tracing::info!(entity = R::ENTITY, id, "record deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_all<R: Stored>(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    R::store(&state).delete_all().await?;
    tracing::info!(entity = R::ENTITY, "all records deleted");
    Ok(success_message(format!("all {} records deleted", R::ENTITY)))
}

/// Tasks owned by one user; 404 when the user does not exist.
pub async fn list_user_tasks(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    User::store(&state).get(id).await?;
    let rows = state.tasks.list_owned(id).await?;
    Ok(success_many(rows))
}
