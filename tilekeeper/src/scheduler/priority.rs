//! Dispatch ordering for dirty tiles.

use crate::registry::{DirtyRecord, DirtyRegistry};

/// Zoom-level priority list.
///
/// Zooms earlier in the list render first. Zooms missing from the list
/// render after every listed zoom, coarsest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoomPriority {
    order: Vec<u8>,
}

impl ZoomPriority {
    pub fn new(order: Vec<u8>) -> Self {
        Self { order }
    }

    /// Configured zoom order.
    pub fn order(&self) -> &[u8] {
        &self.order
    }

    /// Sort rank of a zoom level; lower renders first.
    pub fn rank(&self, zoom: u8) -> usize {
        match self.order.iter().position(|&z| z == zoom) {
            Some(index) => index,
            None => self.order.len() + usize::from(zoom),
        }
    }

    /// Sort records into dispatch order: by zoom rank, then newest `ts` first.
    pub fn sort(&self, records: &mut [DirtyRecord]) {
        records.sort_by(|a, b| {
            self.rank(a.zoom)
                .cmp(&self.rank(b.zoom))
                .then_with(|| b.ts.cmp(&a.ts))
        });
    }

    /// Snapshot the registry and sort it into dispatch order.
    pub fn view(&self, registry: &DirtyRegistry) -> Vec<DirtyRecord> {
        let mut records = registry.values();
        self.sort(&mut records);
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TileCoord;

    fn record(zoom: u8, ts: u64) -> DirtyRecord {
        DirtyRecord::new(TileCoord::new(zoom, 0, 0), ts)
    }

    #[test]
    fn test_listed_zooms_precede_unlisted_regardless_of_ts() {
        let prio = ZoomPriority::new(vec![12, 14]);
        let mut records = vec![record(14, 5), record(12, 1), record(16, 100)];

        prio.sort(&mut records);

        let zooms: Vec<_> = records.iter().map(|r| r.zoom).collect();
        assert_eq!(zooms, vec![12, 14, 16]);
    }

    #[test]
    fn test_newer_ts_first_within_zoom() {
        let prio = ZoomPriority::new(vec![12]);
        let mut records = vec![record(12, 1), record(12, 10)];

        prio.sort(&mut records);

        assert_eq!(records[0].ts, 10);
        assert_eq!(records[1].ts, 1);
    }

    #[test]
    fn test_list_order_not_numeric_order() {
        let prio = ZoomPriority::new(vec![14, 10]);
        let mut records = vec![record(10, 0), record(14, 0)];
        prio.sort(&mut records);
        assert_eq!(records[0].zoom, 14);
    }

    #[test]
    fn test_unlisted_zooms_keep_deterministic_order() {
        let prio = ZoomPriority::new(vec![5]);
        let mut a = vec![record(18, 1), record(17, 2), record(5, 0), record(18, 3)];
        let mut b = a.clone();
        b.reverse();

        prio.sort(&mut a);
        prio.sort(&mut b);

        assert_eq!(a, b);
        let zooms: Vec<_> = a.iter().map(|r| r.zoom).collect();
        assert_eq!(zooms, vec![5, 17, 18, 18]);
        assert_eq!(a[2].ts, 3);
    }

    #[test]
    fn test_empty_priority_list_orders_by_zoom() {
        let prio = ZoomPriority::default();
        assert!(prio.rank(3) < prio.rank(4));
    }

    #[test]
    fn test_view_sorts_registry_snapshot() {
        let registry = DirtyRegistry::new();
        registry.mark(DirtyRecord::new(TileCoord::new(16, 1, 1), 9));
        registry.mark(DirtyRecord::new(TileCoord::new(12, 1, 1), 0));

        let view = ZoomPriority::new(vec![12]).view(&registry);
        assert_eq!(view.len(), 2);
        assert_eq!(view[0].zoom, 12);
    }
}
