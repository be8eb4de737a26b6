//! # Zone registry (C6)
//!
//! Maps a zone id to its [`ZoneStore`](crate::store::ZoneStore) and owns
//! their lifecycle: opening every configured zone at startup, and draining
//! and stopping each flush loop on shutdown.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

use crate::store::error::StoreError;
use crate::store::ZoneStore;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("zone {0} is not registered")]
    UnknownZone(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Owns every zone's store, keyed by zone id.
pub struct ZoneRegistry {
    stores: HashMap<i64, ZoneStore>,
}

impl ZoneRegistry {
    /// Open every zone in `zones` under `db_dir` with the given pool/cache/
    /// flush tuning, failing the whole registry if any single zone fails to
    /// open.
    pub async fn open(
        db_dir: &Path,
        zones: &[i64],
        pool_size: u32,
        lru_cache_size: usize,
        flush_interval_secs: f64,
        max_queue_rows: usize,
    ) -> Result<Self, RegistryError> {
        let mut stores = HashMap::with_capacity(zones.len());
        for &zone in zones {
            let store = ZoneStore::open(
                db_dir,
                zone,
                pool_size,
                lru_cache_size,
                flush_interval_secs,
                max_queue_rows,
            )
            .await?;
            log::info!("zone {zone} store opened under {}", db_dir.display());
            stores.insert(zone, store);
        }
        Ok(Self { stores })
    }

    /// Look up the store for `zone`, or [`RegistryError::UnknownZone`] if it
    /// was never registered — the storage service maps this to a 400.
    pub fn get(&self, zone: i64) -> Result<&ZoneStore, RegistryError> {
        self.stores.get(&zone).ok_or(RegistryError::UnknownZone(zone))
    }

    /// Every currently-registered zone id, sorted.
    pub fn zone_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.stores.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Shut down every zone's flush loop, draining pending writes.
    pub async fn shutdown(&self) {
        for (zone, store) in &self.stores {
            if let Err(e) = store.shutdown().await {
                log::error!("zone {zone} failed to shut down cleanly: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_zone_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ZoneRegistry::open(dir.path(), &[0, 1], 2, 64, 3600.0, 100)
            .await
            .unwrap();

        assert!(registry.get(0).is_ok());
        assert!(matches!(registry.get(9), Err(RegistryError::UnknownZone(9))));
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn zone_ids_are_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ZoneRegistry::open(dir.path(), &[3, 1, 2], 2, 64, 3600.0, 100)
            .await
            .unwrap();
        assert_eq!(registry.zone_ids(), vec![1, 2, 3]);
        registry.shutdown().await;
    }
}
