//! # SQLite Result Store
//!
//! Append-only `dns_queries` table. All writes go through a single pooled
//! connection, which serializes concurrent inserts from the work units.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Executor;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use dnsprobe_common::record::{QueryRecord, SinkError};
use dnsprobe_common::scanning::ResultSink;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS dns_queries (
    timestamp TIMESTAMP,
    ip TEXT,
    domain TEXT,
    query TEXT,
    answer TEXT
)
"#;

const INSERT: &str =
    "INSERT INTO dns_queries (timestamp, ip, domain, query, answer) VALUES (?, ?, ?, ?, ?)";

type Row = (DateTime<Utc>, String, String, String, String);

#[derive(Debug, Clone)]
pub struct SqliteSink {
    pool: SqlitePool,
}

impl SqliteSink {
    /// Opens (or creates) the database file at `path` and makes sure the
    /// table exists and the insert statement prepares.
    pub async fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path: &Path = path.as_ref();
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        Self::connect(options)
            .await
            .with_context(|| format!("opening database {}", path.display()))
    }

    /// A private database that lives as long as this sink.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        Self::connect(options).await
    }

    async fn connect(options: SqliteConnectOptions) -> anyhow::Result<Self> {
        let pool: SqlitePool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await
            .context("connecting to sqlite")?;

        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .context("creating dns_queries table")?;

        pool.prepare(INSERT)
            .await
            .context("preparing insert statement")?;

        Ok(Self { pool })
    }

    pub async fn count(&self) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM dns_queries")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Every stored record, in insertion order.
    pub async fn fetch_all(&self) -> anyhow::Result<Vec<QueryRecord>> {
        let rows: Vec<Row> = sqlx::query_as(
            "SELECT timestamp, ip, domain, query, answer FROM dns_queries ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(timestamp, address, domain, question, answer)| QueryRecord {
                timestamp,
                address,
                domain,
                question,
                answer,
            })
            .collect())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl ResultSink for SqliteSink {
    async fn record(&self, entry: QueryRecord) -> Result<(), SinkError> {
        sqlx::query(INSERT)
            .bind(entry.timestamp)
            .bind(entry.address)
            .bind(entry.domain)
            .bind(entry.question)
            .bind(entry.answer)
            .execute(&self.pool)
            .await
            .map_err(|e| SinkError::Backend(Box::new(e)))?;
        Ok(())
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
