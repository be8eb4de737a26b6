//! The background flush loop that drains `entities_queue` into `entities`.
//!
//! A Tokio background task wakes on a fixed interval and flushes whenever
//! the queue is non-empty. Each flush pulls a bounded batch of rows off the
//! queue, oldest `queue_id` first, applies them to the durable table, and
//! deletes exactly those rows; forced flushes (triggered by `set` under
//! sustained write pressure) use a larger batch and repeat until a batch
//! comes back short, so a single enormous backlog drains within one call
//! instead of trickling out over many ticks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use super::error::Result;
use super::metrics::StoreMetrics;

/// Issue a `PRAGMA wal_checkpoint` every this many flushes that moved at
/// least one row.
const CHECKPOINT_EVERY: u64 = 20;

/// `batch_limit` for a normal (interval or soft-threshold) flush: twice the
/// zone's `max_queue_rows`.
pub fn normal_batch_limit(max_queue_rows: usize) -> i64 {
    (max_queue_rows * 2) as i64
}

/// `batch_limit` for a forced (backpressure) flush: ten times the zone's
/// `max_queue_rows`.
pub fn forced_batch_limit(max_queue_rows: usize) -> i64 {
    (max_queue_rows * 10) as i64
}

/// Pull up to `batch_limit` of the oldest queued rows (by `queue_id`),
/// apply them to `entities` with `INSERT OR REPLACE`, and delete exactly
/// those rows from `entities_queue`. Returns the number of rows moved.
async fn flush_batch(pool: &SqlitePool, batch_limit: i64) -> Result<usize> {
    let mut tx = pool.begin().await?;

    let rows = sqlx::query(
        "SELECT queue_id, index_id, iter, uuid, state, name, description,
                position_x, position_y, aesthetics, ownership, minted, timestamp
         FROM entities_queue
         ORDER BY queue_id
         LIMIT ?",
    )
    .bind(batch_limit)
    .fetch_all(&mut *tx)
    .await?;

    if rows.is_empty() {
        tx.commit().await?;
        return Ok(0);
    }

    let mut queue_ids = Vec::with_capacity(rows.len());
    for row in &rows {
        let queue_id: i64 = row.try_get("queue_id")?;
        queue_ids.push(queue_id);

        sqlx::query(
            "INSERT OR REPLACE INTO entities
                (index_id, iter, uuid, state, name, description,
                 position_x, position_y, aesthetics, ownership, minted, timestamp)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(row.try_get::<i64, _>("index_id")?)
        .bind(row.try_get::<i64, _>("iter")?)
        .bind(row.try_get::<String, _>("uuid")?)
        .bind(row.try_get::<i64, _>("state")?)
        .bind(row.try_get::<String, _>("name")?)
        .bind(row.try_get::<String, _>("description")?)
        .bind(row.try_get::<i64, _>("position_x")?)
        .bind(row.try_get::<i64, _>("position_y")?)
        .bind(row.try_get::<String, _>("aesthetics")?)
        .bind(row.try_get::<Option<String>, _>("ownership")?)
        .bind(row.try_get::<i64, _>("minted")?)
        .bind(row.try_get::<i64, _>("timestamp")?)
        .execute(&mut *tx)
        .await?;
    }

    let mut delete = QueryBuilder::<Sqlite>::new("DELETE FROM entities_queue WHERE queue_id IN (");
    let mut separated = delete.separated(", ");
    for id in &queue_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
    delete.build().execute(&mut *tx).await?;

    tx.commit().await?;
    Ok(queue_ids.len())
}

/// Drain the write queue. In normal mode, pulls and applies a single batch
/// of at most `normal_batch_limit(max_queue_rows)` rows. In forced mode,
/// repeats with `forced_batch_limit(max_queue_rows)` until a batch returns
/// fewer rows than requested, so the whole backlog is cleared in one call.
/// Returns the total number of rows moved.
pub async fn flush(
    pool: &SqlitePool,
    metrics: &StoreMetrics,
    flush_count: &AtomicU64,
    max_queue_rows: usize,
    forced: bool,
) -> Result<usize> {
    let batch_limit = if forced {
        forced_batch_limit(max_queue_rows)
    } else {
        normal_batch_limit(max_queue_rows)
    };

    let mut total = 0usize;
    loop {
        let moved = flush_batch(pool, batch_limit).await?;
        total += moved;

        if moved > 0 {
            metrics.record_flush();
            let count = flush_count.fetch_add(1, Ordering::Relaxed) + 1;
            if count % CHECKPOINT_EVERY == 0 {
                sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)").execute(pool).await?;
            }
        }

        if !forced || (moved as i64) < batch_limit {
            break;
        }
    }
    Ok(total)
}

/// Spawn the periodic flush task. The returned handle can be aborted on
/// shutdown; callers should also invoke a final forced [`flush`] after
/// aborting to drain whatever accumulated since the last tick.
pub fn spawn_flush_loop(
    pool: SqlitePool,
    metrics: std::sync::Arc<StoreMetrics>,
    flush_count: std::sync::Arc<AtomicU64>,
    interval_secs: f64,
    max_queue_rows: usize,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs_f64(interval_secs));
        loop {
            ticker.tick().await;
            if let Err(e) = flush(&pool, &metrics, &flush_count, max_queue_rows, false).await {
                log::error!("zone store flush failed: {e}");
            }
        }
    })
}
