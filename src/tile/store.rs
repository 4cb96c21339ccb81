//! Persistent tile storage.
//!
//! Cached tiles live indefinitely: there is no eviction, no freshness check
//! and no pruning. Tile content for a given key is assumed immutable
//! upstream, so concurrent writers racing on the same key are benign
//! (last-writer-wins). The trait keeps the no-eviction policy isolated so a
//! bounded backend could be swapped in without touching the pipeline.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreError;
use crate::tile::TileId;

/// Trait for the persistent tile store.
///
/// Keys are `(provider, zoom, x, y)`; different providers never collide
/// because the provider id namespaces the key.
#[async_trait]
pub trait TileStore: Send + Sync {
    /// Read a cached entry, or `None` if the key has never been written.
    async fn read(&self, provider: &str, tile: TileId) -> Result<Option<Bytes>, StoreError>;

    /// Persist an entry, creating any missing namespace directories.
    async fn write(&self, provider: &str, tile: TileId, data: Bytes) -> Result<(), StoreError>;
}

/// Filesystem-backed tile store.
///
/// Layout: `{root}/{provider}/{zoom}/{x}/{y}.png`. Directories are created
/// lazily on first write; creation is idempotent.
#[derive(Debug, Clone)]
pub struct FsTileStore {
    root: PathBuf,
}

impl FsTileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Storage path for one cache key.
    pub fn tile_path(&self, provider: &str, tile: TileId) -> PathBuf {
        self.root
            .join(provider)
            .join(tile.zoom.to_string())
            .join(tile.x.to_string())
            .join(format!("{}.png", tile.y))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl TileStore for FsTileStore {
    async fn read(&self, provider: &str, tile: TileId) -> Result<Option<Bytes>, StoreError> {
        let path = self.tile_path(provider, tile);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Read { path, source: e }),
        }
    }

    async fn write(&self, provider: &str, tile: TileId, data: Bytes) -> Result<(), StoreError> {
        let path = self.tile_path(provider, tile);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Write {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| StoreError::Write { path, source: e })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_path_layout() {
        let store = FsTileStore::new("/var/cache/tiles");
        let path = store.tile_path("OSM", TileId::new(13, 4180, 2955));
        assert_eq!(
            path,
            PathBuf::from("/var/cache/tiles/OSM/13/4180/2955.png")
        );
    }

    #[tokio::test]
    async fn test_read_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsTileStore::new(dir.path());
        let result = store.read("OSM", TileId::new(1, 0, 0)).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_write_then_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsTileStore::new(dir.path());
        let tile = TileId::new(13, 4180, 2955);
        let data = Bytes::from_static(b"\x89PNG fake tile");

        store.write("OSM", tile, data.clone()).await.unwrap();

        let read_back = store.read("OSM", tile).await.unwrap();
        assert_eq!(read_back, Some(data));

        // Directory layout matches the documented contract
        assert!(dir.path().join("OSM/13/4180/2955.png").is_file());
    }

    #[tokio::test]
    async fn test_providers_are_namespaced() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsTileStore::new(dir.path());
        let tile = TileId::new(5, 2, 3);

        store
            .write("OSM", tile, Bytes::from_static(b"base"))
            .await
            .unwrap();
        store
            .write("overlay", tile, Bytes::from_static(b"over"))
            .await
            .unwrap();

        assert_eq!(
            store.read("OSM", tile).await.unwrap(),
            Some(Bytes::from_static(b"base"))
        );
        assert_eq!(
            store.read("overlay", tile).await.unwrap(),
            Some(Bytes::from_static(b"over"))
        );
    }

    #[tokio::test]
    async fn test_rewrite_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsTileStore::new(dir.path());
        let tile = TileId::new(2, 1, 1);

        store
            .write("OSM", tile, Bytes::from_static(b"first"))
            .await
            .unwrap();
        store
            .write("OSM", tile, Bytes::from_static(b"second"))
            .await
            .unwrap();

        // Last writer wins
        assert_eq!(
            store.read("OSM", tile).await.unwrap(),
            Some(Bytes::from_static(b"second"))
        );
    }
}
