use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

pub mod api;

/// A stored pastie, as read back from the database.
#[derive(Debug, Clone, FromRow)]
pub struct Pastie {
    uid: String,
    pub id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pastie {
    /// The database-internal key of this record.
    pub fn storage_id(&self) -> StorageId {
        StorageId(self.uid.clone())
    }
}

/// Database-internal key of a pastie, distinct from its public `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageId(String);

impl StorageId {
    pub(crate) fn generate() -> Self {
        StorageId(Uuid::new_v4().to_string())
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

/// Input for creating a pastie. Absent fields are filled in by the store.
#[derive(Debug, Clone, Default)]
pub struct NewPastie {
    pub id: Option<i64>,
    pub content: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl NewPastie {
    pub fn with_content(content: impl Into<String>) -> Self {
        NewPastie {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// Replacement values for an existing pastie.
///
/// `content` is always written. A missing `created_at` keeps the stored value
/// and a missing `updated_at` becomes the current time.
#[derive(Debug, Clone, Default)]
pub struct PastieUpdate {
    pub content: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PastieUpdate {
    pub fn with_content(content: impl Into<String>) -> Self {
        PastieUpdate {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// Conjunctive predicate for listing pasties. The default matches everything.
#[derive(Debug, Clone, Default)]
pub struct PastieFilter {
    pub content_contains: Option<String>,
    pub min_id: Option<i64>,
    pub max_id: Option<i64>,
}
