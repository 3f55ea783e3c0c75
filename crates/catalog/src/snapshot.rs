//! Persistable catalog state.
//!
//! A snapshot carries every unit's own fields, the parent edges (as
//! `parent_id`), the offer history and the category versions. Current category
//! prices are *not* stored; they are rebuilt on restore, which reproduces
//! exactly what was saved.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use market_core::{DomainError, DomainResult, Timestamp, UnitId, ValidationReason};

use crate::aggregate::Aggregator;
use crate::catalog::Catalog;
use crate::history::{HistoryEntry, HistoryLog};
use crate::import::UnitImport;
use crate::store::UnitStore;
use crate::unit::{UnitBody, UnitKind};
use crate::validation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotUnit {
    pub id: UnitId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: UnitKind,
    pub parent_id: Option<UnitId>,
    /// Offer price; always `None` for categories.
    pub price: Option<u64>,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub units: Vec<SnapshotUnit>,
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub category_versions: Vec<HistoryEntry>,
}

fn malformed(msg: impl Into<String>) -> DomainError {
    DomainError::validation(ValidationReason::MalformedRecord, msg)
}

impl<S, H> Catalog<S, H>
where
    S: UnitStore,
    H: HistoryLog,
{
    /// Capture the current state, units in id order.
    pub fn snapshot(&self) -> DomainResult<CatalogSnapshot> {
        let store = self.store();
        let mut units = Vec::with_capacity(store.len());
        for id in store.ids() {
            let unit = store.get(&id)?;
            let price = match unit.body() {
                UnitBody::Offer { price } => Some(*price),
                UnitBody::Category { .. } => None,
            };
            units.push(SnapshotUnit {
                id,
                name: unit.name().to_string(),
                kind: unit.kind(),
                parent_id: unit.parent_id().cloned(),
                price,
                updated_at: unit.updated_at(),
            });
        }
        Ok(CatalogSnapshot {
            units,
            history: self.history().entries(),
            category_versions: self.versions().entries(),
        })
    }
}

impl<S, H> Catalog<S, H>
where
    S: UnitStore + Default,
    H: HistoryLog + Default,
{
    /// Rebuild a catalog from a snapshot, re-validating its structure and
    /// recomputing every derived category value.
    pub fn restore(snapshot: CatalogSnapshot) -> DomainResult<Self> {
        let mut catalog = Self::new(S::default(), H::default(), H::default());

        let mut stamps: HashMap<UnitId, Timestamp> = HashMap::with_capacity(snapshot.units.len());
        let mut items = Vec::with_capacity(snapshot.units.len());
        for unit in snapshot.units {
            let price = unit
                .price
                .map(i64::try_from)
                .transpose()
                .map_err(|_| malformed(format!("price of {} is out of range", unit.id)))?;
            stamps.insert(unit.id.clone(), unit.updated_at);
            items.push(UnitImport {
                id: unit.id,
                name: unit.name,
                kind: unit.kind,
                parent_id: unit.parent_id,
                price,
            });
        }

        let (store, history, versions) = catalog.parts_mut();
        let records = validation::validate_records(&*store, items)?;
        for record in &records {
            let at = stamps
                .get(&record.id)
                .copied()
                .ok_or_else(|| malformed(format!("no timestamp for {}", record.id)))?;
            store.upsert(record, at)?;
        }

        for (entries, kind, log) in [
            (snapshot.history, UnitKind::Offer, history),
            (snapshot.category_versions, UnitKind::Category, versions),
        ] {
            for entry in entries {
                match store.get(&entry.unit_id) {
                    Ok(unit) if unit.kind() == kind && entry.kind == kind => log.append(entry),
                    _ => {
                        return Err(malformed(format!(
                            "history entry refers to unknown {} {}",
                            kind.as_str().to_lowercase(),
                            entry.unit_id
                        )));
                    }
                }
            }
        }

        let mut aggregator = Aggregator::new();
        aggregator.mark_all(&*store)?;
        aggregator.recompute(store, None)?;

        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::ImportBatch;
    use chrono::{TimeZone, Utc};

    fn t(hour: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2022, 2, 1, hour, 0, 0).unwrap()
    }

    fn populated() -> Catalog {
        let mut catalog = Catalog::in_memory();
        catalog
            .import_batch(ImportBatch::new(
                vec![
                    UnitImport::category("root", "root", None),
                    UnitImport::category("phones", "phones", Some("root")),
                    UnitImport::offer("p1", "p1", Some("phones"), 100),
                    UnitImport::offer("p2", "p2", Some("phones"), 250),
                ],
                t(1),
            ))
            .unwrap();
        catalog
            .import_batch(ImportBatch::new(
                vec![UnitImport::offer("tv", "tv", Some("root"), 999)],
                t(2),
            ))
            .unwrap();
        catalog
    }

    #[test]
    fn restore_reproduces_derived_values() {
        let original = populated();
        let snapshot = original.snapshot().unwrap();
        let json = serde_json::to_string(&snapshot).unwrap();
        let decoded: CatalogSnapshot = serde_json::from_str(&json).unwrap();
        let restored: Catalog = Catalog::restore(decoded).unwrap();

        let root = UnitId::new("root");
        assert_eq!(restored.get_subtree(&root).unwrap(), original.get_subtree(&root).unwrap());
        assert_eq!(restored.history().entries(), original.history().entries());
        assert_eq!(restored.versions().entries(), original.versions().entries());
        assert_eq!(
            restored.get_statistics(Some(&root), t(0), t(9)).unwrap(),
            original.get_statistics(Some(&root), t(0), t(9)).unwrap()
        );
    }

    #[test]
    fn snapshot_without_versions_still_restores() {
        let mut value = serde_json::to_value(populated().snapshot().unwrap()).unwrap();
        value.as_object_mut().unwrap().remove("category_versions");
        let decoded: CatalogSnapshot = serde_json::from_value(value).unwrap();
        let restored: Catalog = Catalog::restore(decoded).unwrap();
        assert!(restored.versions().is_empty());
        assert_eq!(restored.get_subtree(&UnitId::new("root")).unwrap().price, Some(449));
    }

    #[test]
    fn restore_rejects_versions_of_offers() {
        let mut snapshot = populated().snapshot().unwrap();
        snapshot.category_versions[0].unit_id = UnitId::new("tv");
        let err = Catalog::<crate::InMemoryUnitStore, crate::InMemoryHistoryLog>::restore(snapshot)
            .unwrap_err();
        assert_eq!(err.reason(), Some(ValidationReason::MalformedRecord));
    }

    #[test]
    fn category_prices_are_not_persisted() {
        let snapshot = populated().snapshot().unwrap();
        let root = snapshot.units.iter().find(|u| u.id == UnitId::new("root")).unwrap();
        assert_eq!(root.price, None);
        assert_eq!(root.updated_at, t(2));
    }

    #[test]
    fn restore_rejects_orphaned_history() {
        let mut snapshot = populated().snapshot().unwrap();
        snapshot.history[0].unit_id = UnitId::new("ghost");
        let err = Catalog::<crate::InMemoryUnitStore, crate::InMemoryHistoryLog>::restore(snapshot)
            .unwrap_err();
        assert_eq!(err.reason(), Some(ValidationReason::MalformedRecord));
    }

    #[test]
    fn restore_rejects_cycles() {
        let mut snapshot = populated().snapshot().unwrap();
        for unit in &mut snapshot.units {
            if unit.id == UnitId::new("root") {
                unit.parent_id = Some(UnitId::new("phones"));
            }
        }
        let err = Catalog::<crate::InMemoryUnitStore, crate::InMemoryHistoryLog>::restore(snapshot)
            .unwrap_err();
        assert_eq!(err.reason(), Some(ValidationReason::CyclicParent));
    }
}
