//! Read-mostly stock catalog (SPEC_FULL.md §5, shared-resource note).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::ids::StockId;
use crate::model::Stock;

#[derive(Debug, Default, Clone)]
struct Snapshot {
    by_id: HashMap<StockId, Arc<Stock>>,
    by_symbol: HashMap<String, StockId>,
}

/// A snapshot-replace catalog: readers never block on writers and never
/// observe a partially updated view, mirroring the teacher's
/// snapshot-replace pattern for enriched book snapshots.
#[derive(Debug, Default)]
pub struct StockCatalog {
    snapshot: RwLock<Arc<Snapshot>>,
}

impl StockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: StockId) -> Option<Arc<Stock>> {
        self.snapshot.read().by_id.get(&id).cloned()
    }

    pub fn get_by_symbol(&self, symbol: &str) -> Option<Arc<Stock>> {
        let snap = self.snapshot.read();
        let id = snap.by_symbol.get(symbol)?;
        snap.by_id.get(id).cloned()
    }

    pub fn contains(&self, id: StockId) -> bool {
        self.snapshot.read().by_id.contains_key(&id)
    }

    /// Adds or replaces one stock, atomically swapping in a new snapshot.
    pub fn upsert(&self, stock: Stock) {
        let mut guard = self.snapshot.write();
        let mut next = (**guard).clone();
        next.by_symbol.insert(stock.symbol.clone(), stock.id);
        next.by_id.insert(stock.id, Arc::new(stock));
        *guard = Arc::new(next);
    }

    /// Replaces the whole catalog with a freshly loaded set, e.g. after a
    /// bulk reload from persistence.
    pub fn refresh(&self, stocks: Vec<Stock>) {
        let mut next = Snapshot::default();
        for stock in stocks {
            next.by_symbol.insert(stock.symbol.clone(), stock.id);
            next.by_id.insert(stock.id, Arc::new(stock));
        }
        *self.snapshot.write() = Arc::new(next);
    }

    pub fn len(&self) -> usize {
        self.snapshot.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock(id: i64, symbol: &str) -> Stock {
        Stock {
            id: StockId(id),
            symbol: symbol.to_string(),
            company_name: format!("{symbol} Inc."),
        }
    }

    #[test]
    fn upsert_then_lookup_by_id_and_symbol() {
        let catalog = StockCatalog::new();
        catalog.upsert(stock(1, "ACME"));
        assert!(catalog.contains(StockId(1)));
        assert_eq!(catalog.get_by_symbol("ACME").unwrap().id, StockId(1));
    }

    #[test]
    fn refresh_replaces_whole_snapshot() {
        let catalog = StockCatalog::new();
        catalog.upsert(stock(1, "ACME"));
        catalog.refresh(vec![stock(2, "FOO")]);
        assert!(!catalog.contains(StockId(1)));
        assert!(catalog.contains(StockId(2)));
    }
}
