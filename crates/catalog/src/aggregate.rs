//! Derived-value propagation for categories.
//!
//! Mutations mark categories dirty; [`Aggregator::recompute`] then processes
//! the dirty set deepest-first, so every category is rebuilt from children
//! whose cached values are already final. Each dirty category is visited once
//! per batch no matter how many of its descendants changed.

use std::collections::HashSet;

use market_core::{DomainResult, Timestamp, UnitId};

use crate::store::UnitStore;
use crate::unit::PriceStats;

/// Worklist of categories whose derived price / timestamp must be rebuilt.
#[derive(Debug, Default, Clone)]
pub struct Aggregator {
    dirty: HashSet<UnitId>,
    /// Units whose full ancestor chain is already in `dirty`.
    chains: HashSet<UnitId>,
}

/// Result of a recompute pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Recomputed {
    /// Rebuilt categories, deepest first.
    pub categories: Vec<UnitId>,
}

impl Recomputed {
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark one unit (typically a category touched by the batch itself).
    pub fn mark(&mut self, id: &UnitId) {
        self.dirty.insert(id.clone());
    }

    /// Mark every ancestor of `id`, stopping early at chains already marked.
    pub fn mark_ancestors<S>(&mut self, store: &S, id: &UnitId) -> DomainResult<()>
    where
        S: UnitStore + ?Sized,
    {
        let mut current = store.get(id)?.parent_id().cloned();
        while let Some(parent) = current {
            let first_visit = self.chains.insert(parent.clone());
            self.dirty.insert(parent.clone());
            if !first_visit {
                break;
            }
            current = store.get(&parent)?.parent_id().cloned();
        }
        Ok(())
    }

    /// Mark every category currently in the store (used after a restore).
    pub fn mark_all<S>(&mut self, store: &S) -> DomainResult<()>
    where
        S: UnitStore + ?Sized,
    {
        for id in store.ids() {
            if store.get(&id)?.is_category() {
                self.dirty.insert(id);
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.dirty.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirty.is_empty()
    }

    /// Rebuild every dirty category from its direct children.
    ///
    /// With `touched_at = Some(ts)` each category's `updated_at` becomes
    /// `max(ts, newest child)`; with `None` timestamps are left alone.
    /// Ids that are no longer in the store (or are offers) are skipped.
    pub fn recompute<S>(self, store: &mut S, touched_at: Option<Timestamp>) -> DomainResult<Recomputed>
    where
        S: UnitStore + ?Sized,
    {
        let mut work: Vec<(usize, UnitId)> = Vec::with_capacity(self.dirty.len());
        for id in self.dirty {
            match store.get(&id) {
                Ok(unit) if unit.is_category() => {}
                _ => continue,
            }
            let depth = store.ancestors_of(&id)?.len();
            work.push((depth, id));
        }
        // Deepest first; id order keeps runs reproducible.
        work.sort_unstable_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        for (_, id) in &work {
            let mut stats = PriceStats::default();
            let mut newest: Option<Timestamp> = None;
            for child in store.children(id)? {
                let child = store.get(&child)?;
                stats = stats.merge(child.stats());
                newest = newest.max(Some(child.updated_at()));
            }
            let updated_at = touched_at.map(|ts| newest.map_or(ts, |n| n.max(ts)));
            store.set_derived(id, stats, updated_at)?;
        }

        Ok(Recomputed {
            categories: work.into_iter().map(|(_, id)| id).collect(),
        })
    }
}
