//! Create the schema and record tables. Every statement is idempotent, so this runs on each startup.

use crate::error::AppError;
use crate::model::{Record, Task, User};
use crate::sql::{qualified_table, quoted};
use sqlx::PgPool;

/// CREATE TABLE for `R`: BIGSERIAL id, every column NOT NULL, unique slug and unique group.
pub fn create_table_sql<R: Record>(schema: &str) -> String {
    let mut col_defs: Vec<String> = vec![format!("{} BIGSERIAL PRIMARY KEY", quoted("id"))];
    for c in R::COLUMNS {
        col_defs.push(format!("{} {} NOT NULL", quoted(c.name), c.pg_type));
    }
    col_defs.push(format!(
        "CONSTRAINT {} UNIQUE ({})",
        quoted(&format!("{}_slug_key", R::TABLE)),
        quoted("slug")
    ));
    if !R::UNIQUE_TOGETHER.is_empty() {
        let cols: Vec<String> = R::UNIQUE_TOGETHER.iter().map(|s| quoted(s)).collect();
        col_defs.push(format!(
            "CONSTRAINT {} UNIQUE ({})",
            quoted(&format!("{}_{}_key", R::TABLE, R::UNIQUE_TOGETHER.join("_"))),
            cols.join(", ")
        ));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        qualified_table(schema, R::TABLE),
        col_defs.join(",\n  ")
    )
}

/// Index on the owner column, for records that have one.
pub fn owner_index_sql<R: Record>(schema: &str) -> Option<String> {
    R::OWNER_COLUMN.map(|col| {
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
            quoted(&format!("{}_{}_idx", R::TABLE, col)),
            qualified_table(schema, R::TABLE),
            quoted(col)
        )
    })
}

async fn migrate_table<R: Record>(pool: &PgPool, schema: &str) -> Result<(), AppError> {
    let ddl = create_table_sql::<R>(schema);
    tracing::debug!(sql = %ddl, "migration");
    sqlx::query(&ddl).execute(pool).await?;
    if let Some(idx) = owner_index_sql::<R>(schema) {
        tracing::debug!(sql = %idx, "migration");
        sqlx::query(&idx).execute(pool).await?;
    }
    Ok(())
}

/// CREATE SCHEMA, then the users and tasks tables.
pub async fn apply_migrations(pool: &PgPool, schema: &str) -> Result<(), AppError> {
    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(schema)))
        .execute(pool)
        .await?;
    migrate_table::<User>(pool, schema).await?;
    migrate_table::<Task>(pool, schema).await?;
    tracing::info!(schema = %schema, "migrations applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn users_table_has_slug_and_group_constraints() {
        let ddl = create_table_sql::<User>("public");
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS \"public\".\"users\""));
        assert!(ddl.contains("\"id\" BIGSERIAL PRIMARY KEY"));
        assert!(ddl.contains("\"age\" INTEGER NOT NULL"));
        assert!(ddl.contains("CONSTRAINT \"users_slug_key\" UNIQUE (\"slug\")"));
        assert!(ddl.contains(
            "CONSTRAINT \"users_username_firstname_key\" UNIQUE (\"username\", \"firstname\")"
        ));
        assert!(owner_index_sql::<User>("public").is_none());
    }

    #[test]
    fn tasks_table_is_indexed_by_owner() {
        let ddl = create_table_sql::<Task>("app");
        assert!(ddl.contains("\"owner_id\" BIGINT NOT NULL"));
        assert!(!ddl.contains("users_"));
        assert_eq!(
            owner_index_sql::<Task>("app").unwrap(),
            "CREATE INDEX IF NOT EXISTS \"tasks_owner_id_idx\" ON \"app\".\"tasks\" (\"owner_id\")"
        );
    }
}
