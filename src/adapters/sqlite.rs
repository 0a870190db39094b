// src/adapters/sqlite.rs
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{
    Row,
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
};

use crate::{Asset, LedgerError, Result, adapters::StateStore};

/// SQLite store keeping each asset as one JSON document.
///
/// Schema:
/// ```sql
/// CREATE TABLE assets (
///     seq INTEGER PRIMARY KEY AUTOINCREMENT,
///     id TEXT NOT NULL UNIQUE,
///     revision INTEGER NOT NULL,
///     data TEXT NOT NULL
/// );
/// ```
///
/// `seq` gives the stable listing order; `revision` backs the
/// compare-and-swap in `update`.
pub struct SqliteStore {
    pub(crate) pool: SqlitePool,
}

impl SqliteStore {
    /// Create a store backed by a database file, creating it if missing
    pub async fn new_file(path: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&format!("sqlite:{}?mode=rwc", path))
            .await?;

        Ok(Self { pool })
    }

    /// Create a store backed by an in-memory database
    pub async fn new_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    /// Connect by URL, as found in configuration.
    ///
    /// In-memory URLs (`sqlite::memory:`, `sqlite://:memory:`, any
    /// `mode=memory` URL) get a single connection that is never recycled;
    /// the database lives exactly as long as that connection.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?;

        let pool = if is_in_memory(url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        Ok(Self { pool })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the database schema
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS assets (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                revision INTEGER NOT NULL,
                data TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn is_in_memory(url: &str) -> bool {
    let (location, query) = url.split_once('?').unwrap_or((url, ""));
    location.ends_with(":memory:")
        || query
            .split('&')
            .any(|pair| pair.eq_ignore_ascii_case("mode=memory"))
}

fn to_db_revision(revision: u64) -> Result<i64> {
    i64::try_from(revision)
        .map_err(|_| LedgerError::Storage(format!("revision {revision} exceeds INTEGER range")))
}

#[async_trait]
impl StateStore for SqliteStore {
    async fn get(&self, id: &str) -> Result<Option<Asset>> {
        let row = sqlx::query("SELECT data FROM assets WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let data: String = row.try_get("data")?;
                Ok(Some(serde_json::from_str(&data)?))
            }
            None => Ok(None),
        }
    }

    async fn contains(&self, id: &str) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM assets WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found.is_some())
    }

    async fn insert(&self, asset: &Asset) -> Result<()> {
        let data = serde_json::to_string(asset)?;

        let result = sqlx::query("INSERT INTO assets (id, revision, data) VALUES (?, ?, ?)")
            .bind(&asset.id)
            .bind(to_db_revision(asset.revision)?)
            .bind(data)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(LedgerError::DuplicateAsset(asset.id.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn update(&self, asset: &Asset, expected_revision: u64) -> Result<()> {
        let data = serde_json::to_string(asset)?;

        let result =
            sqlx::query("UPDATE assets SET revision = ?, data = ? WHERE id = ? AND revision = ?")
                .bind(to_db_revision(asset.revision)?)
                .bind(data)
                .bind(&asset.id)
                .bind(to_db_revision(expected_revision)?)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        if self.contains(&asset.id).await? {
            Err(LedgerError::Conflict(format!(
                "{} moved past revision {}",
                asset.id, expected_revision
            )))
        } else {
            Err(LedgerError::AssetNotFound(asset.id.clone()))
        }
    }

    async fn scan(&self) -> Result<Vec<Asset>> {
        let rows = sqlx::query("SELECT data FROM assets ORDER BY seq ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| -> Result<Asset> {
                let data: String = row.try_get("data")?;
                Ok(serde_json::from_str(&data)?)
            })
            .collect()
    }
}
