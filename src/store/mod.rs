//! # Zone store (C5)
//!
//! The versioned entity storage engine for a single zone: a pooled SQLite
//! connection, an LRU cache of hot rows, a durable write-queue table that
//! decouples write acceptance from commit, and a background flush loop that
//! drains the queue into the durable table. See `DESIGN.md` for the
//! pool/queue design rationale.

pub mod cache;
pub mod entity;
pub mod error;
pub mod flush;
pub mod metrics;
pub mod pool;

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use cache::EntityCache;
use entity::Entity;
use error::{Result, StoreError};
use metrics::{StoreMetrics, StoreMetricsSnapshot};

fn row_to_entity(row: &SqliteRow, zone: i64) -> Result<Entity> {
    let aesthetics_text: String = row.try_get("aesthetics")?;
    let aesthetics = serde_json::from_str(&aesthetics_text)?;
    Ok(Entity {
        index: Some(row.try_get("index_id")?),
        iter: row.try_get("iter")?,
        uuid: row.try_get("uuid")?,
        state: row.try_get("state")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        position_x: row.try_get("position_x")?,
        position_y: row.try_get("position_y")?,
        position_z: zone,
        aesthetics,
        ownership: row.try_get("ownership")?,
        minted: row.try_get::<i64, _>("minted")? != 0,
        timestamp: row.try_get("timestamp")?,
        exists: true,
    })
}

/// A page of ownership-cursor results, plus the pagination metadata needed
/// to request the next page.
#[derive(Debug, Clone)]
pub struct OwnershipPage {
    pub entities: Vec<Entity>,
    pub has_more: bool,
    /// Total number of indexes owned by the principal, when requested.
    pub total: Option<i64>,
}

/// A single zone's storage engine. Cheaply cloneable; the pool and cache are
/// both internally shared.
#[derive(Clone)]
pub struct ZoneStore {
    zone: i64,
    pool: SqlitePool,
    cache: Arc<EntityCache>,
    metrics: Arc<StoreMetrics>,
    flush_count: Arc<AtomicU64>,
    max_queue_rows: usize,
    flush_handle: Arc<tokio::task::JoinHandle<()>>,
    opened_at: i64,
}

impl ZoneStore {
    /// Open (or create) the SQLite file for `zone` under `db_dir`, start its
    /// background flush loop, and return the ready store.
    pub async fn open(
        db_dir: &Path,
        zone: i64,
        pool_size: u32,
        lru_cache_size: usize,
        flush_interval_secs: f64,
        max_queue_rows: usize,
    ) -> Result<Self> {
        std::fs::create_dir_all(db_dir).map_err(|e| {
            StoreError::Database(sqlx::Error::Io(e))
        })?;
        let path = db_dir.join(format!("zone_{zone}.sqlite3"));
        let pool = pool::open(&path, pool_size).await?;

        let metrics = Arc::new(StoreMetrics::default());
        let flush_count = Arc::new(AtomicU64::new(0));
        let flush_handle = flush::spawn_flush_loop(
            pool.clone(),
            metrics.clone(),
            flush_count.clone(),
            flush_interval_secs,
            max_queue_rows,
        );

        Ok(Self {
            zone,
            pool,
            cache: Arc::new(EntityCache::new(lru_cache_size)),
            metrics,
            flush_count,
            max_queue_rows,
            flush_handle: Arc::new(flush_handle),
            opened_at: chrono::Utc::now().timestamp(),
        })
    }

    pub fn zone(&self) -> i64 {
        self.zone
    }

    pub fn metrics(&self) -> StoreMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Unix timestamp at which this store was opened.
    pub fn opened_at(&self) -> i64 {
        self.opened_at
    }

    /// Reserve the next index from the monotonic `index_seq` allocator,
    /// avoiding the race a naive `MAX(index)+1` query would have under
    /// concurrent writers.
    pub async fn allocate_index(&self) -> Result<i64> {
        let mut tx = self.pool.begin().await?;
        let current: i64 = sqlx::query("SELECT next_index FROM index_seq")
            .fetch_one(&mut *tx)
            .await?
            .try_get(0)?;
        sqlx::query("UPDATE index_seq SET next_index = ?")
            .bind(current + 1)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(current)
    }

    /// Enqueue `entity` for durable write. The row lands in the queue table
    /// immediately (so a concurrent `get` sees it) and the cache is updated
    /// eagerly. If the queue grows past `max_queue_rows`, a flush is forced
    /// before returning so the queue never grows unbounded under sustained
    /// write pressure.
    pub async fn set(&self, entity: &Entity) -> Result<()> {
        let index = entity.index.ok_or(StoreError::MissingIndex)?;
        let aesthetics_text = serde_json::to_string(&entity.aesthetics)?;

        sqlx::query(
            "INSERT OR REPLACE INTO entities_queue
                (index_id, iter, uuid, state, name, description,
                 position_x, position_y, aesthetics, ownership, minted, timestamp)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(index)
        .bind(entity.iter)
        .bind(&entity.uuid)
        .bind(entity.state)
        .bind(&entity.name)
        .bind(&entity.description)
        .bind(entity.position_x)
        .bind(entity.position_y)
        .bind(&aesthetics_text)
        .bind(&entity.ownership)
        .bind(entity.minted as i64)
        .bind(entity.timestamp)
        .execute(&self.pool)
        .await?;

        self.metrics.record_write();
        self.cache.put(entity.cache_key(), entity.clone());

        let depth = self.queue_depth().await?;
        if depth > self.max_queue_rows * 10 {
            log::warn!(
                "zone {} write queue depth {depth} exceeds 10x max_queue_rows ({}); forcing flush",
                self.zone,
                self.max_queue_rows
            );
            flush::flush(&self.pool, &self.metrics, &self.flush_count, self.max_queue_rows, true)
                .await?;
        } else if depth >= self.max_queue_rows {
            flush::flush(&self.pool, &self.metrics, &self.flush_count, self.max_queue_rows, false)
                .await?;
        }

        Ok(())
    }

    /// Current number of rows sitting in the write queue, awaiting flush.
    pub async fn queue_depth(&self) -> Result<usize> {
        let count: i64 = sqlx::query("SELECT COUNT(*) FROM entities_queue")
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?;
        Ok(count as usize)
    }

    /// Force an immediate flush regardless of queue depth, draining the
    /// entire backlog.
    pub async fn flush(&self) -> Result<usize> {
        flush::flush(&self.pool, &self.metrics, &self.flush_count, self.max_queue_rows, true).await
    }

    /// Resolve the newest iter recorded for `index`, checking the queue
    /// first so an unflushed write is visible immediately.
    async fn latest_iter(&self, index: i64) -> Result<Option<i64>> {
        let queue_max: Option<i64> =
            sqlx::query("SELECT MAX(iter) FROM entities_queue WHERE index_id = ?")
                .bind(index)
                .fetch_one(&self.pool)
                .await?
                .try_get(0)?;
        let table_max: Option<i64> =
            sqlx::query("SELECT MAX(iter) FROM entities WHERE index_id = ?")
                .bind(index)
                .fetch_one(&self.pool)
                .await?
                .try_get(0)?;
        Ok(queue_max.into_iter().chain(table_max).max())
    }

    /// Fetch one row by index, checking the LRU cache, then the write queue
    /// (so unflushed writes are visible), then the durable table.
    ///
    /// `iter = None` requests the latest version: the newest iter for
    /// `index` is resolved first, then looked up by that concrete iter, so
    /// the cache is always keyed and consulted by a specific version rather
    /// than a synthetic "latest" key.
    pub async fn get(&self, index: i64, iter: Option<i64>) -> Result<Option<Entity>> {
        let iter = match iter {
            Some(iter) => iter,
            None => match self.latest_iter(index).await? {
                Some(iter) => iter,
                None => return Ok(None),
            },
        };

        let key = format!("{index}:{iter}");
        if let Some(hit) = self.cache.get(&key) {
            self.metrics.record_cache_hit();
            return Ok(Some(hit));
        }
        self.metrics.record_cache_miss();

        if let Some(row) = sqlx::query(
            "SELECT * FROM entities_queue WHERE index_id = ? AND iter = ?",
        )
        .bind(index)
        .bind(iter)
        .fetch_optional(&self.pool)
        .await?
        {
            let entity = row_to_entity(&row, self.zone)?;
            self.cache.put(key, entity.clone());
            return Ok(Some(entity));
        }

        if let Some(row) = sqlx::query("SELECT * FROM entities WHERE index_id = ? AND iter = ?")
            .bind(index)
            .bind(iter)
            .fetch_optional(&self.pool)
            .await?
        {
            let entity = row_to_entity(&row, self.zone)?;
            self.cache.put(key, entity.clone());
            return Ok(Some(entity));
        }

        Ok(None)
    }

    /// Resolve the index currently occupying cell `(x, y)`, if any row
    /// exists there in either the queue or the durable table.
    pub async fn find_index_at(&self, x: i64, y: i64) -> Result<Option<i64>> {
        if let Some(row) = sqlx::query(
            "SELECT index_id FROM entities_queue WHERE position_x = ? AND position_y = ? LIMIT 1",
        )
        .bind(x)
        .bind(y)
        .fetch_optional(&self.pool)
        .await?
        {
            return Ok(Some(row.try_get(0)?));
        }
        if let Some(row) = sqlx::query(
            "SELECT index_id FROM entities WHERE position_x = ? AND position_y = ? LIMIT 1",
        )
        .bind(x)
        .bind(y)
        .fetch_optional(&self.pool)
        .await?
        {
            return Ok(Some(row.try_get(0)?));
        }
        Ok(None)
    }

    /// All iters recorded for `index`, newest last. Combines the queue and
    /// the durable table, with queue rows winning on collision.
    pub async fn get_iters_of_one(&self, index: i64) -> Result<Vec<Entity>> {
        let table_rows = sqlx::query("SELECT * FROM entities WHERE index_id = ?")
            .bind(index)
            .fetch_all(&self.pool)
            .await?;
        let queue_rows = sqlx::query("SELECT * FROM entities_queue WHERE index_id = ?")
            .bind(index)
            .fetch_all(&self.pool)
            .await?;

        let mut by_iter = std::collections::BTreeMap::new();
        for row in &table_rows {
            let entity = row_to_entity(row, self.zone)?;
            by_iter.insert(entity.iter, entity);
        }
        for row in &queue_rows {
            let entity = row_to_entity(row, self.zone)?;
            by_iter.insert(entity.iter, entity);
        }

        Ok(by_iter.into_values().collect())
    }

    /// The highest index currently known to this store (queue or table), or
    /// `None` if the zone has no rows at all.
    pub async fn get_max_index(&self) -> Result<Option<i64>> {
        let table_max: Option<i64> =
            sqlx::query("SELECT MAX(index_id) FROM entities")
                .fetch_one(&self.pool)
                .await?
                .try_get(0)?;
        let queue_max: Option<i64> =
            sqlx::query("SELECT MAX(index_id) FROM entities_queue")
                .fetch_one(&self.pool)
                .await?
                .try_get(0)?;
        Ok(table_max.into_iter().chain(queue_max).max())
    }

    /// Latest-iter-only rows within the inclusive coordinate box. Per the
    /// documented deviation (see `DESIGN.md`), this reads only the durable table; rows
    /// still sitting in the write queue are not unioned in.
    pub async fn range_query(
        &self,
        x_min: i64,
        x_max: i64,
        y_min: i64,
        y_max: i64,
        limit: i64,
    ) -> Result<Vec<Entity>> {
        let rows = sqlx::query(
            "SELECT e.* FROM entities e
             INNER JOIN (
                 SELECT index_id, MAX(iter) AS max_iter
                 FROM entities
                 WHERE position_x BETWEEN ? AND ? AND position_y BETWEEN ? AND ?
                 GROUP BY index_id
             ) latest
             ON e.index_id = latest.index_id AND e.iter = latest.max_iter
             WHERE e.position_x BETWEEN ? AND ? AND e.position_y BETWEEN ? AND ?
             LIMIT ?",
        )
        .bind(x_min)
        .bind(x_max)
        .bind(y_min)
        .bind(y_max)
        .bind(x_min)
        .bind(x_max)
        .bind(y_min)
        .bind(y_max)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|r| row_to_entity(r, self.zone)).collect()
    }

    /// Rows owned by `principal`, ordered by index, paginated with a
    /// simple index-based cursor (`after`, exclusive). `page_size` is
    /// clamped to `[1, 1000]`. Over-fetches one extra row to determine
    /// `has_more` without a second round trip; when `include_totals` is
    /// set, a second grouped-count query reports the principal's total
    /// index count.
    pub async fn get_by_ownership_cursor(
        &self,
        principal: &str,
        after: Option<i64>,
        page_size: i64,
        include_totals: bool,
    ) -> Result<OwnershipPage> {
        let page_size = page_size.clamp(1, 1000);

        let mut rows = sqlx::query(
            "SELECT e.* FROM entities e
             INNER JOIN (
                 SELECT index_id, MAX(iter) AS max_iter
                 FROM entities
                 WHERE ownership = ?
                 GROUP BY index_id
             ) latest
             ON e.index_id = latest.index_id AND e.iter = latest.max_iter
             WHERE e.ownership = ? AND e.index_id > ?
             ORDER BY e.index_id ASC
             LIMIT ?",
        )
        .bind(principal)
        .bind(principal)
        .bind(after.unwrap_or(-1))
        .bind(page_size + 1)
        .fetch_all(&self.pool)
        .await?;

        let has_more = rows.len() as i64 > page_size;
        if has_more {
            rows.truncate(page_size as usize);
        }
        let entities = rows
            .iter()
            .map(|r| row_to_entity(r, self.zone))
            .collect::<Result<Vec<_>>>()?;

        let total = if include_totals {
            let count: i64 = sqlx::query(
                "SELECT COUNT(DISTINCT index_id) FROM entities WHERE ownership = ?",
            )
            .bind(principal)
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?;
            Some(count)
        } else {
            None
        };

        Ok(OwnershipPage {
            entities,
            has_more,
            total,
        })
    }

    /// Abort the background flush task and drain whatever remains queued.
    /// Call during graceful shutdown.
    pub async fn shutdown(&self) -> Result<()> {
        self.flush_handle.abort();
        self.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_entity(index: i64, iter: i64, ownership: Option<&str>) -> Entity {
        Entity {
            index: Some(index),
            iter,
            uuid: format!("uuid-{index}-{iter}"),
            state: if iter == 0 { 1 } else { 2 },
            name: "Void".into(),
            description: "Genesis".into(),
            position_x: index,
            position_y: index,
            position_z: 0,
            aesthetics: json!({"bar": [], "glyphs": []}),
            ownership: ownership.map(|s| s.to_string()),
            minted: iter == 0,
            timestamp: 0,
            exists: true,
        }
    }

    async fn open_test_store(dir: &std::path::Path) -> ZoneStore {
        ZoneStore::open(dir, 0, 2, 64, 3600.0, 100)
            .await
            .expect("open store")
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_test_store(dir.path()).await;
        let entity = sample_entity(1, 0, Some("alice"));
        store.set(&entity).await.unwrap();

        let fetched = store.get(1, Some(0)).await.unwrap().expect("row present");
        assert_eq!(fetched.uuid, entity.uuid);
        assert_eq!(fetched.ownership.as_deref(), Some("alice"));
        store.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn get_with_no_iter_resolves_latest() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_test_store(dir.path()).await;
        store.set(&sample_entity(7, 0, Some("eve"))).await.unwrap();
        store.flush().await.unwrap();
        store.set(&sample_entity(7, 1, Some("eve"))).await.unwrap();

        let latest = store.get(7, None).await.unwrap().expect("row present");
        assert_eq!(latest.iter, 1);
        store.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn flush_moves_queue_into_durable_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_test_store(dir.path()).await;
        store.set(&sample_entity(2, 0, Some("bob"))).await.unwrap();
        assert_eq!(store.queue_depth().await.unwrap(), 1);

        let moved = store.flush().await.unwrap();
        assert_eq!(moved, 1);
        assert_eq!(store.queue_depth().await.unwrap(), 0);

        let row = store.get(2, Some(0)).await.unwrap().expect("row present");
        assert_eq!(row.ownership.as_deref(), Some("bob"));
        store.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn range_query_returns_latest_iter_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_test_store(dir.path()).await;
        store.set(&sample_entity(3, 0, Some("carl"))).await.unwrap();
        store.set(&sample_entity(3, 1, Some("carl"))).await.unwrap();
        store.flush().await.unwrap();

        let rows = store.range_query(3, 3, 3, 3, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].iter, 1);
        store.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn allocate_index_is_monotonic() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_test_store(dir.path()).await;
        let a = store.allocate_index().await.unwrap();
        let b = store.allocate_index().await.unwrap();
        assert_eq!(b, a + 1);
        store.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn get_iters_of_one_merges_queue_and_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_test_store(dir.path()).await;
        store.set(&sample_entity(4, 0, Some("dana"))).await.unwrap();
        store.flush().await.unwrap();
        store.set(&sample_entity(4, 1, Some("dana"))).await.unwrap();

        let iters = store.get_iters_of_one(4).await.unwrap();
        assert_eq!(iters.len(), 2);
        assert_eq!(iters[0].iter, 0);
        assert_eq!(iters[1].iter, 1);
        store.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn ownership_cursor_paginates_with_has_more_and_totals() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_test_store(dir.path()).await;
        for index in 10..13 {
            store.set(&sample_entity(index, 0, Some("frank"))).await.unwrap();
        }
        store.flush().await.unwrap();

        let first = store
            .get_by_ownership_cursor("frank", None, 2, true)
            .await
            .unwrap();
        assert_eq!(first.entities.len(), 2);
        assert!(first.has_more);
        assert_eq!(first.total, Some(3));

        let last_index = first.entities.last().unwrap().index;
        let second = store
            .get_by_ownership_cursor("frank", last_index, 2, false)
            .await
            .unwrap();
        assert_eq!(second.entities.len(), 1);
        assert!(!second.has_more);
        assert_eq!(second.total, None);
        store.shutdown().await.unwrap();
    }
}
