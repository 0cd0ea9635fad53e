//! Persistence for anagram results.

use async_trait::async_trait;
use sqlx::{Connection, PgPool};
use std::{future::Future, time::Duration};
use thiserror::Error;
use tracing::{info_span, Instrument};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("database call timed out after {0:?}")]
    Timeout(Duration),
}

/// One memoized comparison. Strings are stored normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnagramRecord {
    pub string_one: String,
    pub string_two: String,
    pub is_anagram: bool,
}

#[async_trait]
pub trait AnagramStore: Send + Sync + 'static {
    /// Stored result for the unordered pair `(one, two)`, if any.
    async fn find_pair(&self, one: &str, two: &str) -> Result<Option<bool>, StoreError>;

    /// Append a record. Existing rows for the same pair are not checked.
    async fn insert(&self, record: &AnagramRecord) -> Result<(), StoreError>;

    /// Round-trip to the backing store, used by `/health`.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Postgres-backed store. Connections come from the pool per statement and
/// go back to it on every exit path.
#[derive(Debug, Clone)]
pub struct PgAnagramStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgAnagramStore {
    #[must_use]
    pub const fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>> + Send,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        }
    }
}

#[async_trait]
impl AnagramStore for PgAnagramStore {
    async fn find_pair(&self, one: &str, two: &str) -> Result<Option<bool>, StoreError> {
        let query = r"
            SELECT is_anagram_flag
            FROM strings
            WHERE (string_one = $1 AND string_two = $2)
               OR (string_one = $2 AND string_two = $1)
            ORDER BY id
            LIMIT 1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );

        self.bounded(
            sqlx::query_scalar::<_, bool>(query)
                .bind(one)
                .bind(two)
                .fetch_optional(&self.pool)
                .instrument(span),
        )
        .await
    }

    async fn insert(&self, record: &AnagramRecord) -> Result<(), StoreError> {
        let query = r"
            INSERT INTO strings (string_one, string_two, is_anagram_flag)
            VALUES ($1, $2, $3)
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );

        self.bounded(
            sqlx::query(query)
                .bind(&record.string_one)
                .bind(&record.string_two)
                .bind(record.is_anagram)
                .execute(&self.pool)
                .instrument(span),
        )
        .await
        .map(|_| ())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self
            .bounded(self.pool.acquire().instrument(acquire_span))
            .await?;

        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        self.bounded(conn.ping().instrument(ping_span)).await
    }
}
