use std::time::Duration;

use chrono::Utc;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use tracing::debug;

use crate::config;
use crate::error::{StoreError, StoreResult};
use crate::types::{NewPastie, Pastie, PastieFilter, PastieUpdate, StorageId};

/// Name of the counter row that hands out pastie ids.
const PASTIE_COUNTER: &str = "pasties";

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS pastie (
        uid TEXT PRIMARY KEY NOT NULL,
        id BIGINT NOT NULL UNIQUE,
        content TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS counter (
        name TEXT PRIMARY KEY NOT NULL,
        value BIGINT NOT NULL
    )",
];

#[derive(Clone)]
pub struct Database {
    pool: AnyPool,
}

impl Database {
    /// Connect to a database using the configured URL and pool settings.
    pub async fn connect(config: &config::Database) -> anyhow::Result<Self> {
        let mut options = AnyPoolOptions::new();
        if let Some(max_connections) = config.max_connections {
            options = options.max_connections(max_connections);
        }
        if let Some(secs) = config.acquire_timeout_secs {
            options = options.acquire_timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            pool: options.connect(&config.url).await?,
        })
    }

    /// Create the tables and seed the id counter. Safe to run repeatedly.
    pub async fn init_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        sqlx::query("INSERT INTO counter (name, value) VALUES (?, 0) ON CONFLICT (name) DO NOTHING")
            .bind(PASTIE_COUNTER)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Check whether the database answers queries.
    pub async fn connected(&self) -> bool {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => true,
            Err(err) => {
                debug!("database probe failed: {err}");
                false
            }
        }
    }

    /// Number of stored pasties.
    pub async fn count(&self) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM pastie")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Advance the id counter and return its new value.
    pub async fn next_id(&self) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE counter SET value = value + 1 WHERE name = ? RETURNING value",
        )
        .bind(PASTIE_COUNTER)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::CounterMissing)
    }

    /// Get a pastie by its public id.
    pub async fn get(&self, id: i64) -> StoreResult<Option<Pastie>> {
        let pastie = sqlx::query_as::<_, Pastie>(
            "SELECT uid, id, content, created_at, updated_at FROM pastie WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(pastie)
    }

    /// Get a pastie by its internal storage key.
    pub async fn get_by_storage_id(&self, storage_id: &StorageId) -> StoreResult<Option<Pastie>> {
        let pastie = sqlx::query_as::<_, Pastie>(
            "SELECT uid, id, content, created_at, updated_at FROM pastie WHERE uid = ?",
        )
        .bind(storage_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(pastie)
    }

    /// Whether a pastie with this public id is stored.
    pub async fn exists(&self, id: i64) -> StoreResult<bool> {
        Ok(self.get(id).await?.is_some())
    }

    /// Insert a pastie, assigning an id and timestamps where none are given.
    pub async fn create(&self, new: NewPastie) -> StoreResult<Pastie> {
        let id = match new.id {
            Some(id) => id,
            None => self.next_id().await?,
        };
        let now = Utc::now();
        let created_at = new.created_at.unwrap_or(now);
        let updated_at = new.updated_at.unwrap_or(now);

        if self.exists(id).await? {
            return Err(StoreError::DuplicateId(id));
        }

        let storage_id = StorageId::generate();
        sqlx::query(
            "INSERT INTO pastie (uid, id, content, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(storage_id.as_str())
        .bind(id)
        .bind(new.content.as_str())
        .bind(created_at)
        .bind(updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| StoreError::from_insert(err, id))?;

        self.get_by_storage_id(&storage_id)
            .await?
            .ok_or(StoreError::WriteLost(id))
    }

    /// Replace the content and timestamps of an existing pastie.
    pub async fn update(&self, id: i64, update: PastieUpdate) -> StoreResult<Pastie> {
        let existing = self.get(id).await?.ok_or(StoreError::NotFound(id))?;
        let storage_id = existing.storage_id();

        let created_at = update.created_at.unwrap_or(existing.created_at);
        let updated_at = update.updated_at.unwrap_or_else(Utc::now);

        let result = sqlx::query(
            "UPDATE pastie SET content = ?, created_at = ?, updated_at = ? WHERE uid = ?",
        )
        .bind(update.content.as_str())
        .bind(created_at)
        .bind(updated_at)
        .bind(storage_id.as_str())
        .execute(&self.pool)
        .await?;

        // deleted between the lookup and the write
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }

        self.get_by_storage_id(&storage_id)
            .await?
            .ok_or(StoreError::NotFound(id))
    }

    /// Delete a pastie by id, returning whether anything was removed.
    pub async fn delete(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM pastie WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List pasties matching `filter` in ascending id order.
    pub async fn list(&self, filter: &PastieFilter, limit: Option<u32>) -> StoreResult<Vec<Pastie>> {
        let mut sql =
            String::from("SELECT uid, id, content, created_at, updated_at FROM pastie WHERE 1 = 1");
        if filter.content_contains.is_some() {
            sql.push_str(" AND content LIKE ? ESCAPE '\\'");
        }
        if filter.min_id.is_some() {
            sql.push_str(" AND id >= ?");
        }
        if filter.max_id.is_some() {
            sql.push_str(" AND id <= ?");
        }
        sql.push_str(" ORDER BY id ASC LIMIT ?");

        let pattern = filter
            .content_contains
            .as_deref()
            .map(|needle| format!("%{}%", escape_like(needle)));

        let mut query = sqlx::query_as::<_, Pastie>(&sql);
        if let Some(pattern) = &pattern {
            query = query.bind(pattern.as_str());
        }
        if let Some(min_id) = filter.min_id {
            query = query.bind(min_id);
        }
        if let Some(max_id) = filter.max_id {
            query = query.bind(max_id);
        }
        let limit = limit.map_or(i64::MAX, i64::from);

        Ok(query.bind(limit).fetch_all(&self.pool).await?)
    }
}

fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
