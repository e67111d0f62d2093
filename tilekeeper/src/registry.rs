//! In-memory registry of dirty tiles.
//!
//! The registry is the single source of truth for "this tile needs to be
//! re-rendered". It is written by the dirty marker and the startup scanner,
//! read by the prerender scheduler, and cleared by the renderer once a tile
//! has been rendered successfully.
//!
//! # Lifecycle
//!
//! The registry is in-memory only:
//! - Seeded from disk on startup by [`crate::scanner::InitialScanner`]
//! - Kept current by [`crate::marker::DirtyMarker`] passes
//! - Persistence comes from the `.dirty` marker files written next to each
//!   cached image before the registry entry is inserted
//!
//! Uses `DashMap` so writers and the scheduler's snapshot reads never block
//! each other for longer than a single shard lock.

use dashmap::DashMap;

use crate::coord::{TileCoord, TileKey};

/// A tile waiting to be re-rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirtyRecord {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
    /// Milliseconds since the Unix epoch when the tile became dirty.
    ///
    /// `0` means the tile was never rendered or its age is unknown.
    pub ts: u64,
}

impl DirtyRecord {
    pub fn new(tile: TileCoord, ts: u64) -> Self {
        Self {
            zoom: tile.zoom,
            x: tile.x,
            y: tile.y,
            ts,
        }
    }

    #[inline]
    pub fn tile(&self) -> TileCoord {
        TileCoord::new(self.zoom, self.x, self.y)
    }

    #[inline]
    pub fn key(&self) -> TileKey {
        self.tile().key()
    }
}

/// Thread-safe map from tile key to its dirty record.
///
/// At most one record exists per key; inserting again replaces the previous
/// record wholesale.
#[derive(Debug, Default)]
pub struct DirtyRegistry {
    entries: DashMap<TileKey, DirtyRecord>,
}

impl DirtyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the record stored under `key`.
    ///
    /// Returns the record that was replaced, if any.
    pub fn set(&self, key: TileKey, record: DirtyRecord) -> Option<DirtyRecord> {
        self.entries.insert(key, record)
    }

    /// Insert or overwrite a record under its own tile key.
    pub fn mark(&self, record: DirtyRecord) -> Option<DirtyRecord> {
        self.set(record.key(), record)
    }

    /// Remove the record stored under `key`.
    ///
    /// Safe to call while another thread is taking a snapshot.
    pub fn delete(&self, key: &TileKey) -> Option<DirtyRecord> {
        self.entries.remove(key).map(|(_, record)| record)
    }

    /// Remove `record` only if the registry still holds exactly that record.
    ///
    /// A tile dirtied again while it was rendering keeps its newer entry.
    /// Returns `true` if the entry was removed.
    pub fn remove_if_unchanged(&self, record: &DirtyRecord) -> bool {
        self.entries
            .remove_if(&record.key(), |_, current| current.ts == record.ts)
            .is_some()
    }

    /// Look up the record for a tile.
    pub fn get(&self, tile: &TileCoord) -> Option<DirtyRecord> {
        self.entries.get(&tile.key()).map(|entry| *entry.value())
    }

    /// Whether the tile is currently dirty.
    pub fn contains(&self, tile: &TileCoord) -> bool {
        self.entries.contains_key(&tile.key())
    }

    /// Point-in-time copy of all records, in no particular order.
    ///
    /// Records are copied whole under their shard lock, so a snapshot never
    /// contains a partially written record. Mutations after the call are not
    /// reflected in the returned vector.
    pub fn values(&self) -> Vec<DirtyRecord> {
        self.entries.iter().map(|entry| *entry.value()).collect()
    }

    /// Number of dirty tiles.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dirty tile count per zoom level, ordered by zoom.
    pub fn counts_by_zoom(&self) -> Vec<(u8, usize)> {
        let mut counts = std::collections::BTreeMap::new();
        for entry in self.entries.iter() {
            *counts.entry(entry.value().zoom).or_insert(0usize) += 1;
        }
        counts.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn record(zoom: u8, x: u32, y: u32, ts: u64) -> DirtyRecord {
        DirtyRecord::new(TileCoord::new(zoom, x, y), ts)
    }

    #[test]
    fn test_set_same_key_keeps_single_latest_entry() {
        let registry = DirtyRegistry::new();
        let first = record(12, 5, 5, 10);
        let second = record(12, 5, 5, 20);

        assert!(registry.set(first.key(), first).is_none());
        assert_eq!(registry.set(second.key(), second), Some(first));

        assert_eq!(registry.size(), 1);
        assert_eq!(registry.values(), vec![second]);
    }

    #[test]
    fn test_delete_removes_entry() {
        let registry = DirtyRegistry::new();
        let r = record(3, 1, 1, 0);
        registry.mark(r);

        assert_eq!(registry.delete(&r.key()), Some(r));
        assert!(registry.is_empty());
        assert_eq!(registry.delete(&r.key()), None);
    }

    #[test]
    fn test_remove_if_unchanged_keeps_newer_record() {
        let registry = DirtyRegistry::new();
        let rendered = record(14, 100, 200, 5);
        registry.mark(rendered);
        registry.mark(record(14, 100, 200, 6));

        assert!(!registry.remove_if_unchanged(&rendered));
        assert_eq!(registry.get(&rendered.tile()).map(|r| r.ts), Some(6));

        let current = registry.get(&rendered.tile()).unwrap();
        assert!(registry.remove_if_unchanged(&current));
        assert!(!registry.contains(&rendered.tile()));
    }

    #[test]
    fn test_counts_by_zoom() {
        let registry = DirtyRegistry::new();
        registry.mark(record(12, 0, 0, 0));
        registry.mark(record(12, 0, 1, 0));
        registry.mark(record(14, 0, 0, 0));

        assert_eq!(registry.counts_by_zoom(), vec![(12, 2), (14, 1)]);
    }

    #[test]
    fn test_concurrent_writers_and_snapshots() {
        let registry = Arc::new(DirtyRegistry::new());

        let writers: Vec<_> = (0..4u32)
            .map(|w| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for i in 0..500u32 {
                        let r = record(16, w, i, u64::from(i));
                        registry.mark(r);
                        if i % 3 == 0 {
                            registry.delete(&r.key());
                        }
                    }
                })
            })
            .collect();

        let reader = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for _ in 0..50 {
                    for r in registry.values() {
                        // A torn record would break the y/ts correlation.
                        assert_eq!(u64::from(r.y), r.ts);
                    }
                }
            })
        };

        for w in writers {
            w.join().unwrap();
        }
        reader.join().unwrap();

        // 500 inserts per writer, every third one deleted again
        assert_eq!(registry.size(), 4 * (500 - 167));
    }
}
