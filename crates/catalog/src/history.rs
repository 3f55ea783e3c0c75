//! History log: append-only record of unit snapshots taken on every import.
//!
//! The catalog keeps two logs of the same shape: offer price sets, and
//! category versions written whenever an import rebuilds a derived price.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use market_core::{Timestamp, UnitId};

use crate::unit::{ShopUnit, UnitKind};

/// A unit's state right after a batch touched it.
///
/// `price` is always set for offers; for a category it is the derived
/// average at that moment, `None` while the category has no offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub unit_id: UnitId,
    pub name: String,
    pub parent_id: Option<UnitId>,
    #[serde(rename = "type")]
    pub kind: UnitKind,
    pub price: Option<u64>,
    pub timestamp: Timestamp,
}

impl HistoryEntry {
    /// Capture `unit` as it is now, stamped with its own `updated_at`.
    pub fn of(unit: &ShopUnit) -> Self {
        Self {
            unit_id: unit.id().clone(),
            name: unit.name().to_string(),
            parent_id: unit.parent_id().cloned(),
            kind: unit.kind(),
            price: unit.price(),
            timestamp: unit.updated_at(),
        }
    }
}

/// Append-only, timestamp-ordered log of [`HistoryEntry`] records.
///
/// Entries with equal timestamps keep their insertion order. The only way to
/// drop entries is [`HistoryLog::remove_units`], used when offers are deleted.
pub trait HistoryLog: Send + Sync {
    fn append(&mut self, entry: HistoryEntry);

    /// Entries with `from <= timestamp < to`, ascending.
    fn range(&self, from: Timestamp, to: Timestamp) -> Vec<HistoryEntry>;

    /// Like [`HistoryLog::range`], restricted to the given units.
    fn range_for(&self, units: &HashSet<UnitId>, from: Timestamp, to: Timestamp)
    -> Vec<HistoryEntry>;

    /// Drop every entry of the given units; returns how many were removed.
    fn remove_units(&mut self, units: &HashSet<UnitId>) -> usize;

    /// Every entry, ascending.
    fn entries(&self) -> Vec<HistoryEntry>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ordering key: timestamp first, insertion sequence as tie-break.
type EntryKey = (Timestamp, u64);

#[derive(Debug, Default, Clone)]
pub struct InMemoryHistoryLog {
    entries: BTreeMap<EntryKey, HistoryEntry>,
    by_unit: HashMap<UnitId, Vec<EntryKey>>,
    next_seq: u64,
}

impl InMemoryHistoryLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryLog for InMemoryHistoryLog {
    fn append(&mut self, entry: HistoryEntry) {
        let key = (entry.timestamp, self.next_seq);
        self.next_seq += 1;
        self.by_unit.entry(entry.unit_id.clone()).or_default().push(key);
        self.entries.insert(key, entry);
    }

    fn range(&self, from: Timestamp, to: Timestamp) -> Vec<HistoryEntry> {
        if from >= to {
            return vec![];
        }
        self.entries
            .range((from, 0)..(to, 0))
            .map(|(_, e)| e.clone())
            .collect()
    }

    fn range_for(
        &self,
        units: &HashSet<UnitId>,
        from: Timestamp,
        to: Timestamp,
    ) -> Vec<HistoryEntry> {
        if from >= to {
            return vec![];
        }
        let mut keys: Vec<EntryKey> = units
            .iter()
            .filter_map(|id| self.by_unit.get(id))
            .flatten()
            .filter(|(ts, _)| *ts >= from && *ts < to)
            .copied()
            .collect();
        keys.sort_unstable();
        keys.iter()
            .filter_map(|k| self.entries.get(k).cloned())
            .collect()
    }

    fn remove_units(&mut self, units: &HashSet<UnitId>) -> usize {
        let mut removed = 0;
        for id in units {
            if let Some(keys) = self.by_unit.remove(id) {
                for key in keys {
                    if self.entries.remove(&key).is_some() {
                        removed += 1;
                    }
                }
            }
        }
        removed
    }

    fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
