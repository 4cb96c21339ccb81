//! Tile cache pipeline.
//!
//! Lookup order for a `(provider, zoom, x, y)` key:
//!
//! 1. in-memory LRU (bytes-bounded, avoids disk reads for tiles reused
//!    within and across renders in the same process)
//! 2. persistent store (served unconditionally when present; entries never
//!    expire)
//! 3. tile fetcher (network), then write-through to both layers
//!
//! A fetch failure with no cached copy is terminal for the caller's render.
//! Writes are idempotent and content for a key is immutable upstream, so
//! two processes racing on the same tile may both fetch and both write.

use std::num::NonZeroUsize;
use std::sync::Arc;

use bytes::Bytes;
use lru::LruCache;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::error::CacheError;
use crate::tile::{TileFetcher, TileId, TileProvider, TileStore};

/// Default in-memory capacity: 32MB of encoded tiles.
pub const DEFAULT_MEMORY_CAPACITY: usize = 32 * 1024 * 1024;

/// Entry cap to bound LRU bookkeeping.
const MAX_MEMORY_ENTRIES: usize = 4096;

/// Composite key for the memory layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MemoryKey {
    provider: Arc<str>,
    tile: TileId,
}

/// Bytes-bounded LRU over encoded tile payloads.
struct MemoryCache {
    entries: RwLock<LruCache<MemoryKey, Bytes>>,
    max_size: usize,
    current_size: RwLock<usize>,
}

impl MemoryCache {
    fn new(max_size: usize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(
                NonZeroUsize::new(MAX_MEMORY_ENTRIES).unwrap(),
            )),
            max_size,
            current_size: RwLock::new(0),
        }
    }

    async fn get(&self, key: &MemoryKey) -> Option<Bytes> {
        let mut entries = self.entries.write().await;
        entries.get(key).cloned()
    }

    async fn put(&self, key: MemoryKey, data: Bytes) {
        let data_size = data.len();
        let mut entries = self.entries.write().await;
        let mut current_size = self.current_size.write().await;

        if let Some(old) = entries.peek(&key) {
            *current_size = current_size.saturating_sub(old.len());
        }

        entries.put(key, data);
        *current_size += data_size;

        while *current_size > self.max_size {
            match entries.pop_lru() {
                Some((_, evicted)) => {
                    *current_size = current_size.saturating_sub(evicted.len());
                }
                None => break,
            }
        }
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// Disk-backed tile cache with an in-memory hot layer.
///
/// Generic over the fetcher and store seams so tests can swap in mocks.
/// Thread-safe; share across tasks via `Arc`.
pub struct TileCache<F: TileFetcher, S: TileStore> {
    fetcher: F,
    store: S,
    memory: MemoryCache,
}

impl<F: TileFetcher, S: TileStore> TileCache<F, S> {
    /// Create a cache with the default memory capacity.
    pub fn new(fetcher: F, store: S) -> Self {
        Self::with_memory_capacity(fetcher, store, DEFAULT_MEMORY_CAPACITY)
    }

    /// Create a cache with a custom memory capacity in bytes.
    pub fn with_memory_capacity(fetcher: F, store: S, capacity: usize) -> Self {
        Self {
            fetcher,
            store,
            memory: MemoryCache::new(capacity),
        }
    }

    /// Get a tile's encoded bytes, fetching and persisting on first access.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the tile is not cached and the fetch
    /// fails, or when the persistent store cannot be read or written.
    pub async fn get(&self, provider: &TileProvider, tile: TileId) -> Result<Bytes, CacheError> {
        let key = MemoryKey {
            provider: Arc::from(provider.id.as_str()),
            tile,
        };

        if let Some(data) = self.memory.get(&key).await {
            trace!(%tile, provider = %provider.id, "memory hit");
            return Ok(data);
        }

        if let Some(data) = self.store.read(&provider.id, tile).await? {
            trace!(%tile, provider = %provider.id, "disk hit");
            self.memory.put(key, data.clone()).await;
            return Ok(data);
        }

        let url = provider.tile_url(tile);
        debug!(%tile, provider = %provider.id, %url, "fetching tile");
        let data = self.fetcher.fetch(&url).await?;

        self.store.write(&provider.id, tile, data.clone()).await?;
        self.memory.put(key, data.clone()).await;

        Ok(data)
    }

    /// Number of entries currently held in the memory layer.
    pub async fn memory_len(&self) -> usize {
        self.memory.len().await
    }
}

// =============================================================================
// Tests
// =============================================================================
