use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, Instrument};

use crate::config::DatabaseConfig;
use crate::models::{RepositoryError, RepositoryResult};
use crate::observability::DatabaseTracingMiddleware;

/// Owns the SQLite connection pool shared by every repository
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the pool described by `config`.
    ///
    /// File databases run in WAL mode and are created when missing. An in-memory
    /// database is held on a single connection that is never recycled, otherwise
    /// every new connection would see an empty schema.
    pub async fn connect(config: &DatabaseConfig) -> RepositoryResult<Self> {
        let url = config.database_url.as_str();
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| RepositoryError::ConnectionFailed {
                message: format!("Invalid database URL {}: {}", url, e),
            })?
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = if is_in_memory(url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            let options = options
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal);

            SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .connect_with(options)
                .await?
        };

        info!(
            database_url = %url,
            max_connections = config.max_connections,
            "Database connection established"
        );

        Ok(Self { pool })
    }

    /// Fresh, migrated in-memory database
    pub async fn in_memory() -> RepositoryResult<Self> {
        let config = DatabaseConfig {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
        };
        let database = Self::connect(&config).await?;
        database.migrate().await?;
        Ok(database)
    }

    pub async fn migrate(&self) -> RepositoryResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Round-trip a trivial statement to prove the pool can serve queries
    pub async fn ping(&self) -> RepositoryResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Connections currently open, idle ones included
    pub fn connections(&self) -> u32 {
        self.pool.size()
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database pool closed");
    }
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Run one statement inside a client span, recording metrics when a tracer is wired
pub(crate) async fn run_traced<F, T>(
    tracer: Option<&DatabaseTracingMiddleware>,
    operation: &'static str,
    table: &'static str,
    future: F,
) -> RepositoryResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    let span = tracing::info_span!(
        "sqlite",
        otel.name = %format!("{} {}", operation, table),
        otel.kind = "client",
        db.system = "sqlite",
        db.operation = operation,
        db.sql.table = table,
    );

    let result = match tracer {
        Some(tracer) => {
            tracer
                .trace_operation(operation, table, future)
                .instrument(span)
                .await
        }
        None => future.instrument(span).await,
    };

    result.map_err(RepositoryError::from)
}
