//! Builds parameterized SELECT, INSERT, UPDATE, DELETE from a record's table layout.

use crate::model::{Dependent, Record};
use serde_json::Value;

/// Quote identifier for PostgreSQL (safe: only from static record layouts and config).
pub(crate) fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
pub(crate) fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }
}

/// `"id"` followed by every record column.
fn select_column_list<R: Record>() -> String {
    std::iter::once("id")
        .chain(R::COLUMNS.iter().map(|c| c.name))
        .map(quoted)
        .collect::<Vec<_>>()
        .join(", ")
}

/// One page in primary key order.
pub fn select_page<R: Record>(schema: &str, skip: u32, limit: u32) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, R::TABLE);
    let limit_n = q.push_param(Value::from(limit));
    let offset_n = q.push_param(Value::from(skip));
    q.sql = format!(
        "SELECT {} FROM {} ORDER BY \"id\" LIMIT ${} OFFSET ${}",
        select_column_list::<R>(),
        table,
        limit_n,
        offset_n
    );
    q
}

/// SELECT by primary key. `for_update` locks the row for the rest of the transaction.
pub fn select_by_id<R: Record>(schema: &str, id: i64, for_update: bool) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, R::TABLE);
    let n = q.push_param(Value::from(id));
    q.sql = format!(
        "SELECT {} FROM {} WHERE \"id\" = ${}{}",
        select_column_list::<R>(),
        table,
        n,
        if for_update { " FOR UPDATE" } else { "" }
    );
    q
}

/// Every row whose owner column equals `owner_id`, in primary key order.
pub fn select_owned<R: Record>(schema: &str, owner_column: &str, owner_id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, R::TABLE);
    let n = q.push_param(Value::from(owner_id));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = ${} ORDER BY \"id\"",
        select_column_list::<R>(),
        table,
        quoted(owner_column),
        n
    );
    q
}

/// Id of another row already using `record`'s slug.
pub fn select_slug_taken<R: Record>(schema: &str, record: &R) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, R::TABLE);
    let slug_n = q.push_param(Value::from(record.slug()));
    let id_n = q.push_param(Value::from(record.id()));
    q.sql = format!(
        "SELECT \"id\" FROM {} WHERE \"slug\" = ${} AND \"id\" <> ${} LIMIT 1",
        table, slug_n, id_n
    );
    q
}

/// Id of another row sharing `record`'s [`Record::UNIQUE_TOGETHER`] values.
/// `None` when the record declares no such group.
pub fn select_unique_taken<R: Record>(schema: &str, record: &R) -> Option<QueryBuf> {
    if R::UNIQUE_TOGETHER.is_empty() {
        return None;
    }
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, R::TABLE);
    let mut conds = Vec::with_capacity(R::UNIQUE_TOGETHER.len() + 1);
    for (col, value) in R::UNIQUE_TOGETHER.iter().zip(record.unique_key()) {
        let n = q.push_param(value);
        conds.push(format!("{} = ${}", quoted(col), n));
    }
    let id_n = q.push_param(Value::from(record.id()));
    conds.push(format!("\"id\" <> ${}", id_n));
    q.sql = format!(
        "SELECT \"id\" FROM {} WHERE {} LIMIT 1",
        table,
        conds.join(" AND ")
    );
    Some(q)
}

/// INSERT every column; the database assigns `id`. Returns the stored row.
pub fn insert<R: Record>(schema: &str, record: &R) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, R::TABLE);
    let cols: Vec<String> = R::COLUMNS.iter().map(|c| quoted(c.name)).collect();
    let placeholders: Vec<String> = record
        .column_values()
        .into_iter()
        .map(|v| format!("${}", q.push_param(v)))
        .collect();
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        table,
        cols.join(", "),
        placeholders.join(", "),
        select_column_list::<R>()
    );
    q
}

/// UPDATE every column of the row with `record`'s id. Returns the stored row.
pub fn update<R: Record>(schema: &str, record: &R) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, R::TABLE);
    let sets: Vec<String> = R::COLUMNS
        .iter()
        .zip(record.column_values())
        .map(|(c, v)| format!("{} = ${}", quoted(c.name), q.push_param(v)))
        .collect();
    let id_n = q.push_param(Value::from(record.id()));
    q.sql = format!(
        "UPDATE {} SET {} WHERE \"id\" = ${} RETURNING {}",
        table,
        sets.join(", "),
        id_n,
        select_column_list::<R>()
    );
    q
}

pub fn delete_by_id<R: Record>(schema: &str, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, R::TABLE);
    let n = q.push_param(Value::from(id));
    q.sql = format!("DELETE FROM {} WHERE \"id\" = ${}", table, n);
    q
}

pub fn delete_all<R: Record>(schema: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!("DELETE FROM {}", qualified_table(schema, R::TABLE));
    q
}

/// Rows of `dep` referencing the record with `id`.
pub fn delete_dependents(schema: &str, dep: &Dependent, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(Value::from(id));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = ${}",
        qualified_table(schema, dep.table),
        quoted(dep.column),
        n
    );
    q
}

/// Rows of `dep` referencing any row of `R`'s table.
pub fn delete_all_dependents<R: Record>(schema: &str, dep: &Dependent) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "DELETE FROM {} WHERE {} IN (SELECT \"id\" FROM {})",
        qualified_table(schema, dep.table),
        quoted(dep.column),
        qualified_table(schema, R::TABLE)
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Task, TaskDraft, User, UserDraft};

    fn user() -> User {
        User::from_draft(UserDraft {
            username: "john_doe".into(),
            firstname: "John".into(),
            lastname: "Doe".into(),
            age: 30,
        })
        .unwrap()
        .with_id(7)
    }

    #[test]
    fn select_page_binds_limit_then_offset() {
        let q = select_page::<User>("public", 20, 10);
        assert_eq!(
            q.sql,
            "SELECT \"id\", \"username\", \"firstname\", \"lastname\", \"age\", \"slug\" \
             FROM \"public\".\"users\" ORDER BY \"id\" LIMIT $1 OFFSET $2"
        );
        assert_eq!(q.params, vec![Value::from(10), Value::from(20)]);
    }

    #[test]
    fn insert_lists_columns_in_bind_order() {
        let q = insert("app", &user());
        assert!(q.sql.starts_with(
            "INSERT INTO \"app\".\"users\" (\"username\", \"firstname\", \"lastname\", \"age\", \"slug\") \
             VALUES ($1, $2, $3, $4, $5) RETURNING \"id\""
        ));
        assert_eq!(q.params.len(), 5);
        assert_eq!(q.params[4], Value::from("john-doe"));
    }

    #[test]
    fn update_binds_id_last() {
        let q = update("public", &user());
        assert!(q.sql.contains("\"slug\" = $5 WHERE \"id\" = $6"));
        assert_eq!(q.params.last(), Some(&Value::from(7)));
    }

    #[test]
    fn unique_check_only_for_records_with_a_group() {
        let q = select_unique_taken("public", &user()).unwrap();
        assert_eq!(
            q.sql,
            "SELECT \"id\" FROM \"public\".\"users\" WHERE \"username\" = $1 AND \"firstname\" = $2 \
             AND \"id\" <> $3 LIMIT 1"
        );
        let task = Task::from_draft(TaskDraft {
            title: "Test API".into(),
            content: String::new(),
            priority: 1,
            completed: false,
            owner_id: 7,
        })
        .unwrap();
        assert!(select_unique_taken("public", &task).is_none());
    }

    #[test]
    fn cascade_queries_target_dependent_table() {
        let dep = User::DEPENDENTS[0];
        let q = delete_dependents("public", &dep, 7);
        assert_eq!(q.sql, "DELETE FROM \"public\".\"tasks\" WHERE \"owner_id\" = $1");
        let q = delete_all_dependents::<User>("public", &dep);
        assert_eq!(
            q.sql,
            "DELETE FROM \"public\".\"tasks\" WHERE \"owner_id\" IN (SELECT \"id\" FROM \"public\".\"users\")"
        );
    }

    #[test]
    fn identifiers_are_escaped() {
        assert_eq!(quoted("we\"ird"), "\"we\"\"ird\"");
    }
}
