use super::{Column, Dependent, Record};
use crate::error::AppError;
use crate::service::ValidationRule;
use crate::slug::derive_slug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const USERNAME: ValidationRule = ValidationRule::length(4, 20);
const PERSON_NAME: ValidationRule = ValidationRule::length(1, 50);
const AGE: ValidationRule = ValidationRule::range(18, 120);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub age: i32,
    pub slug: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UserDraft {
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub age: i64,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UserPatch {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub age: Option<i64>,
}

impl User {
    fn build(id: i64, draft: UserDraft) -> Result<Self, AppError> {
        USERNAME.check_str("username", &draft.username)?;
        PERSON_NAME.check_str("firstname", &draft.firstname)?;
        PERSON_NAME.check_str("lastname", &draft.lastname)?;
        let age = AGE.check_i32("age", draft.age)?;
        let slug = derive_slug("username", &draft.username)?;
        Ok(User {
            id,
            username: draft.username,
            firstname: draft.firstname,
            lastname: draft.lastname,
            age,
            slug,
        })
    }
}

impl Record for User {
    type Draft = UserDraft;
    type Patch = UserPatch;

    const ENTITY: &'static str = "user";
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [Column] = &[
        Column { name: "username", pg_type: "TEXT" },
        Column { name: "firstname", pg_type: "TEXT" },
        Column { name: "lastname", pg_type: "TEXT" },
        Column { name: "age", pg_type: "INTEGER" },
        Column { name: "slug", pg_type: "TEXT" },
    ];
    // Implied by the username slug, which is checked first; kept as a table constraint.
    const UNIQUE_TOGETHER: &'static [&'static str] = &["username", "firstname"];
    const DEPENDENTS: &'static [Dependent] = &[Dependent {
        table: "tasks",
        column: "owner_id",
    }];

    fn id(&self) -> i64 {
        self.id
    }

    fn slug(&self) -> &str {
        &self.slug
    }

    fn from_draft(draft: UserDraft) -> Result<Self, AppError> {
        User::build(0, draft)
    }

    fn merge(&self, patch: UserPatch) -> Result<Self, AppError> {
        User::build(
            self.id,
            UserDraft {
                username: patch.username.unwrap_or_else(|| self.username.clone()),
                firstname: patch.firstname.unwrap_or_else(|| self.firstname.clone()),
                lastname: patch.lastname.unwrap_or_else(|| self.lastname.clone()),
                age: patch.age.unwrap_or(i64::from(self.age)),
            },
        )
    }

    fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::from(self.username.as_str()),
            Value::from(self.firstname.as_str()),
            Value::from(self.lastname.as_str()),
            Value::from(self.age),
            Value::from(self.slug.as_str()),
        ]
    }
}
