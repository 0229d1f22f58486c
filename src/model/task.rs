use super::{Column, Record};
use crate::error::AppError;
use crate::service::ValidationRule;
use crate::slug::derive_slug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const TITLE: ValidationRule = ValidationRule::length(1, 100);
const CONTENT: ValidationRule = ValidationRule::max_length(1000);
const PRIORITY: ValidationRule = ValidationRule::range(0, 10);
const OWNER: ValidationRule = ValidationRule::at_least(1);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub priority: i32,
    pub completed: bool,
    /// Id of the owning user. Not checked on write; removed with the user.
    pub owner_id: i64,
    pub slug: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub priority: i64,
    #[serde(default)]
    pub completed: bool,
    pub owner_id: i64,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub owner_id: Option<i64>,
}

impl Task {
    fn build(id: i64, draft: TaskDraft) -> Result<Self, AppError> {
        TITLE.check_str("title", &draft.title)?;
        CONTENT.check_str("content", &draft.content)?;
        let priority = PRIORITY.check_i32("priority", draft.priority)?;
        OWNER.check_int("owner_id", draft.owner_id)?;
        let slug = derive_slug("title", &draft.title)?;
        Ok(Task {
            id,
            title: draft.title,
            content: draft.content,
            priority,
            completed: draft.completed,
            owner_id: draft.owner_id,
            slug,
        })
    }
}

impl Record for Task {
    type Draft = TaskDraft;
    type Patch = TaskPatch;

    const ENTITY: &'static str = "task";
    const TABLE: &'static str = "tasks";
    const COLUMNS: &'static [Column] = &[
        Column { name: "title", pg_type: "TEXT" },
        Column { name: "content", pg_type: "TEXT" },
        Column { name: "priority", pg_type: "INTEGER" },
        Column { name: "completed", pg_type: "BOOLEAN" },
        Column { name: "owner_id", pg_type: "BIGINT" },
        Column { name: "slug", pg_type: "TEXT" },
    ];
    const OWNER_COLUMN: Option<&'static str> = Some("owner_id");

    fn id(&self) -> i64 {
        self.id
    }

    fn slug(&self) -> &str {
        &self.slug
    }

    fn owner_id(&self) -> Option<i64> {
        Some(self.owner_id)
    }

    fn from_draft(draft: TaskDraft) -> Result<Self, AppError> {
        Task::build(0, draft)
    }

    fn merge(&self, patch: TaskPatch) -> Result<Self, AppError> {
        Task::build(
            self.id,
            TaskDraft {
                title: patch.title.unwrap_or_else(|| self.title.clone()),
                content: patch.content.unwrap_or_else(|| self.content.clone()),
                priority: patch.priority.unwrap_or(i64::from(self.priority)),
                completed: patch.completed.unwrap_or(self.completed),
                owner_id: patch.owner_id.unwrap_or(self.owner_id),
            },
        )
    }

    fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::from(self.title.as_str()),
            Value::from(self.content.as_str()),
            Value::from(self.priority),
            Value::from(self.completed),
            Value::from(self.owner_id),
            Value::from(self.slug.as_str()),
        ]
    }
}
