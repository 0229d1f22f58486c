use super::{no_owner, RecordStore};
use crate::error::{AppError, ConfigError};
use crate::model::Record;
use crate::sql::{self, PgBindValue, QueryBuf};
use async_trait::async_trait;
use sqlx::postgres::PgQueryResult;
use sqlx::{ConnectOptions, Executor, PgConnection, PgPool, Postgres};
use std::str::FromStr;

/// PostgreSQL backend. Every mutation runs in its own transaction; dropping the
/// transaction on an early return rolls it back.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
    schema: String,
}

impl PgStore {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        PgStore {
            pool,
            schema: schema.into(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Slug first, then the business uniqueness group, excluding `record`'s own row.
    async fn check_conflicts<R: Record>(
        &self,
        conn: &mut PgConnection,
        record: &R,
    ) -> Result<(), AppError> {
        let q = sql::select_slug_taken(&self.schema, record);
        if fetch_id::<R>(&mut *conn, &q).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "{} slug '{}' already exists",
                R::ENTITY,
                record.slug()
            )));
        }
        if let Some(q) = sql::select_unique_taken(&self.schema, record) {
            if fetch_id::<R>(&mut *conn, &q).await?.is_some() {
                return Err(AppError::Conflict(format!(
                    "{} with the same {} already exists",
                    R::ENTITY,
                    R::UNIQUE_TOGETHER.join(" and ")
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for PgStore {
    async fn list(&self, skip: u32, limit: u32) -> Result<Vec<R>, AppError> {
        let q = sql::select_page::<R>(&self.schema, skip, limit);
        fetch_all(&self.pool, &q).await
    }

    async fn get(&self, id: i64) -> Result<R, AppError> {
        let q = sql::select_by_id::<R>(&self.schema, id, false);
        fetch_optional(&self.pool, &q)
            .await?
            .ok_or_else(|| AppError::not_found(R::ENTITY, id))
    }

    async fn create(&self, draft: R::Draft) -> Result<R, AppError> {
        let record = R::from_draft(draft)?;
        let mut tx = self.pool.begin().await?;
        self.check_conflicts(&mut tx, &record).await?;
        let created: R = fetch_optional(&mut *tx, &sql::insert(&self.schema, &record))
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))?;
        tx.commit().await?;
        tracing::debug!(entity = R::ENTITY, id = created.id(), slug = created.slug(), "created");
        Ok(created)
    }

    async fn update(&self, id: i64, patch: R::Patch) -> Result<R, AppError> {
        let mut tx = self.pool.begin().await?;
        let current: R = fetch_optional(&mut *tx, &sql::select_by_id::<R>(&self.schema, id, true))
            .await?
            .ok_or_else(|| AppError::not_found(R::ENTITY, id))?;
        let merged = current.merge(patch)?;
        self.check_conflicts(&mut tx, &merged).await?;
        let updated: R = fetch_optional(&mut *tx, &sql::update(&self.schema, &merged))
            .await?
            .ok_or_else(|| AppError::not_found(R::ENTITY, id))?;
        tx.commit().await?;
        tracing::debug!(entity = R::ENTITY, id, slug = updated.slug(), "updated");
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        for dep in R::DEPENDENTS {
            let res = execute::<R>(&mut *tx, &sql::delete_dependents(&self.schema, dep, id)).await?;
            tracing::debug!(entity = R::ENTITY, id, table = dep.table, removed = res.rows_affected(), "cascade");
        }
        let res = execute::<R>(&mut *tx, &sql::delete_by_id::<R>(&self.schema, id)).await?;
        if res.rows_affected() == 0 {
            return Err(AppError::not_found(R::ENTITY, id));
        }
        tx.commit().await?;
        tracing::debug!(entity = R::ENTITY, id, "deleted");
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        for dep in R::DEPENDENTS {
            execute::<R>(&mut *tx, &sql::delete_all_dependents::<R>(&self.schema, dep)).await?;
        }
        let res = execute::<R>(&mut *tx, &sql::delete_all::<R>(&self.schema)).await?;
        tx.commit().await?;
        tracing::debug!(entity = R::ENTITY, removed = res.rows_affected(), "deleted all");
        Ok(())
    }

    async fn list_owned(&self, owner_id: i64) -> Result<Vec<R>, AppError> {
        let column = R::OWNER_COLUMN.ok_or_else(no_owner::<R>)?;
        let q = sql::select_owned::<R>(&self.schema, column, owner_id);
        fetch_all(&self.pool, &q).await
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

/// Unique violations raised by the database (a concurrent insert won the race) are conflicts.
fn storage_error<R: Record>(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return AppError::Conflict(format!(
                "{} violates a uniqueness constraint",
                R::ENTITY
            ));
        }
    }
    AppError::Db(e)
}

fn bind_params(q: &QueryBuf) -> Result<Vec<PgBindValue>, AppError> {
    q.params.iter().map(PgBindValue::from_json).collect()
}

async fn fetch_all<'c, R, E>(executor: E, q: &QueryBuf) -> Result<Vec<R>, AppError>
where
    R: Record,
    E: Executor<'c, Database = Postgres>,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query_as::<_, R>(&q.sql);
    for p in bind_params(q)? {
        query = query.bind(p);
    }
    query.fetch_all(executor).await.map_err(storage_error::<R>)
}

async fn fetch_optional<'c, R, E>(executor: E, q: &QueryBuf) -> Result<Option<R>, AppError>
where
    R: Record,
    E: Executor<'c, Database = Postgres>,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query_as::<_, R>(&q.sql);
    for p in bind_params(q)? {
        query = query.bind(p);
    }
    query.fetch_optional(executor).await.map_err(storage_error::<R>)
}

async fn fetch_id<R: Record>(conn: &mut PgConnection, q: &QueryBuf) -> Result<Option<i64>, AppError> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query (tx)");
    let mut query = sqlx::query_scalar::<_, i64>(&q.sql);
    for p in bind_params(q)? {
        query = query.bind(p);
    }
    query.fetch_optional(conn).await.map_err(storage_error::<R>)
}

async fn execute<R: Record>(conn: &mut PgConnection, q: &QueryBuf) -> Result<PgQueryResult, AppError> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query (tx)");
    let mut query = sqlx::query::<Postgres>(&q.sql);
    for p in bind_params(q)? {
        query = query.bind(p);
    }
    query.execute(conn).await.map_err(storage_error::<R>)
}

/// Create the database named in `database_url` when it does not exist yet.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| invalid_database_url(e.to_string()))?;
    let mut conn: PgConnection = opts.connect().await?;
    let exists: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(&db_name)
            .fetch_one(&mut conn)
            .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", sql::quoted(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn invalid_database_url(value: String) -> AppError {
    AppError::Config(ConfigError::Invalid {
        key: "DATABASE_URL",
        value,
    })
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| invalid_database_url(url.to_string()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = format!("{}postgres", base);
    Ok((admin_url, db_name.to_string()))
}
