//! Pooled SQLite connection setup.
//!
//! Configures the pragmas each zone's SQLite file needs: WAL journaling,
//! `NORMAL` synchronous durability, and an in-memory temp store.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use super::error::Result;

/// Open (creating if necessary) a pooled SQLite connection for a zone's
/// database file at `path`, sized to `pool_size` connections.
pub async fn open(path: &Path, pool_size: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .busy_timeout(Duration::from_millis(5_000));

    let pool = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(pool_size)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
    sqlx::query("PRAGMA synchronous=NORMAL").execute(&pool).await?;
    sqlx::query("PRAGMA temp_store=MEMORY").execute(&pool).await?;
    sqlx::query("PRAGMA mmap_size=268435456").execute(&pool).await?;

    ensure_schema(&pool).await?;
    Ok(pool)
}

async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(&schema_sql("entities", false)).execute(pool).await?;
    sqlx::query(&schema_sql("entities_queue", true)).execute(pool).await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS entities_queue_order ON entities_queue (queue_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS index_seq (next_index INTEGER NOT NULL)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "INSERT INTO index_seq (next_index) \
         SELECT 0 WHERE NOT EXISTS (SELECT 1 FROM index_seq)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Shared column layout for `entities` and `entities_queue`. The queue
/// table additionally carries an autoincrement `queue_id` so writes can be
/// pulled and cleared in strict append order: `(index_id, iter)` stays a
/// `UNIQUE` constraint there (so `INSERT OR REPLACE` still collapses
/// repeated writes to the same cell/iter before a flush), while the
/// durable `entities` table keys on `(index_id, iter)` directly since it
/// holds one settled row per version.
fn schema_sql(table: &str, with_queue_id: bool) -> String {
    let (queue_id_column, key_constraint) = if with_queue_id {
        (
            "queue_id INTEGER PRIMARY KEY AUTOINCREMENT,\n            ",
            "UNIQUE (index_id, iter)",
        )
    } else {
        ("", "PRIMARY KEY (index_id, iter)")
    };
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            {queue_id_column}index_id INTEGER NOT NULL,
            iter INTEGER NOT NULL,
            uuid TEXT NOT NULL,
            state INTEGER NOT NULL,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            position_x INTEGER NOT NULL,
            position_y INTEGER NOT NULL,
            aesthetics TEXT NOT NULL,
            ownership TEXT,
            minted INTEGER NOT NULL,
            timestamp INTEGER NOT NULL,
            {key_constraint}
        )"
    )
}
