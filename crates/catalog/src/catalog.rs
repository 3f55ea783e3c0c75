//! The catalog engine: the four public operations over store + history.
//!
//! Two history logs are kept: `history` holds offer price sets and feeds
//! sales and catalog-wide statistics; `versions` holds one entry per
//! category rebuilt by an import, carrying its derived price at that moment.
//!
//! Every mutating operation validates first and only then touches state, so a
//! returned error always means nothing changed. The type takes `&mut self` for
//! writes; callers that share it across threads wrap it in a single lock.

use std::collections::HashSet;

use chrono::Duration;

use market_core::{DomainResult, Timestamp, UnitId};

use crate::aggregate::Aggregator;
use crate::history::{HistoryEntry, HistoryLog, InMemoryHistoryLog};
use crate::import::{ImportBatch, UnitContent};
use crate::query::{self, UnitTree};
use crate::store::{InMemoryUnitStore, UnitStore};
use crate::unit::UnitKind;
use crate::validation;

/// What an accepted import batch did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    pub moved: usize,
    pub history_appended: usize,
    /// Also the number of category versions recorded.
    pub categories_recomputed: usize,
}

/// What a delete removed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeleteSummary {
    pub removed_units: usize,
    pub removed_offers: usize,
    pub removed_history: usize,
    pub categories_recomputed: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog<S = InMemoryUnitStore, H = InMemoryHistoryLog> {
    store: S,
    history: H,
    versions: H,
}

impl Catalog {
    pub fn in_memory() -> Self {
        Self::default()
    }
}

impl<S, H> Catalog<S, H>
where
    S: UnitStore,
    H: HistoryLog,
{
    pub fn new(store: S, history: H, versions: H) -> Self {
        Self {
            store,
            history,
            versions,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Offer price history.
    pub fn history(&self) -> &H {
        &self.history
    }

    /// Category versions, one per rebuild of a category's derived price.
    pub fn versions(&self) -> &H {
        &self.versions
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut S, &mut H, &mut H) {
        (&mut self.store, &mut self.history, &mut self.versions)
    }

    /// Validate and apply a batch atomically.
    pub fn import_batch(&mut self, batch: ImportBatch) -> DomainResult<ImportSummary> {
        let validated = validation::validate_batch(&self.store, batch)?;
        let at = validated.timestamp();
        let mut summary = ImportSummary::default();
        let mut aggregator = Aggregator::new();

        // Old chains first: a moved unit leaves its former ancestors stale.
        for record in validated.records() {
            if self.store.contains(&record.id) {
                aggregator.mark_ancestors(&self.store, &record.id)?;
            }
        }

        for record in validated.records() {
            let outcome = self.store.upsert(record, at)?;
            if outcome.created {
                summary.created += 1;
            } else {
                summary.updated += 1;
            }
            if outcome.previous_parent.is_some() {
                summary.moved += 1;
            }

            match record.content {
                UnitContent::Offer { .. } => {
                    self.history.append(HistoryEntry::of(self.store.get(&record.id)?));
                    summary.history_appended += 1;
                }
                UnitContent::Category => aggregator.mark(&record.id),
            }
        }

        for record in validated.records() {
            aggregator.mark_ancestors(&self.store, &record.id)?;
        }

        let recomputed = aggregator.recompute(&mut self.store, Some(at))?;
        for id in &recomputed.categories {
            self.versions.append(HistoryEntry::of(self.store.get(id)?));
        }
        summary.categories_recomputed = recomputed.len();
        Ok(summary)
    }

    /// Remove a unit with its subtree and the history of every removed unit.
    ///
    /// Former ancestors get their derived price rebuilt; their `updated_at`
    /// is left as is and no version is recorded, since a delete carries no
    /// timestamp.
    pub fn delete_unit(&mut self, id: &UnitId) -> DomainResult<DeleteSummary> {
        let ancestors = self.store.ancestors_of(id)?;
        let removed = self.store.delete(id)?;

        let removed_offers = removed
            .iter()
            .filter(|u| u.kind() == UnitKind::Offer)
            .count();
        let removed_ids: HashSet<UnitId> = removed.iter().map(|u| u.id().clone()).collect();
        let removed_history =
            self.history.remove_units(&removed_ids) + self.versions.remove_units(&removed_ids);

        let mut aggregator = Aggregator::new();
        for ancestor in &ancestors {
            aggregator.mark(ancestor);
        }
        let recomputed = aggregator.recompute(&mut self.store, None)?;

        Ok(DeleteSummary {
            removed_units: removed.len(),
            removed_offers,
            removed_history,
            categories_recomputed: recomputed.len(),
        })
    }

    pub fn get_subtree(&self, id: &UnitId) -> DomainResult<UnitTree> {
        query::subtree(&self.store, id)
    }

    /// History in `[from, to)`: every offer's price history, or with `unit`
    /// the versions of that one unit (price sets for an offer, derived-price
    /// rebuilds for a category).
    pub fn get_statistics(
        &self,
        unit: Option<&UnitId>,
        from: Timestamp,
        to: Timestamp,
    ) -> DomainResult<Vec<HistoryEntry>> {
        query::statistics(&self.store, &self.history, &self.versions, unit, from, to)
    }

    /// History in `[date - window, date]`.
    pub fn sales(&self, date: Timestamp, window: Duration) -> Vec<HistoryEntry> {
        query::sales(&self.history, date, window)
    }
}
