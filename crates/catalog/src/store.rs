//! Unit store: the arena owning every unit and its parent/child edges.
//!
//! The store only maintains structure. Derived category values are written
//! back explicitly by the [`Aggregator`](crate::aggregate::Aggregator).

use std::collections::HashMap;

use market_core::{DomainError, DomainResult, Timestamp, UnitId, ValidationReason};

use crate::import::{UnitContent, UnitRecord};
use crate::unit::{PriceStats, ShopUnit};

/// What an upsert changed structurally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub created: bool,
    /// Former parent, when the unit was moved to a different parent.
    pub previous_parent: Option<UnitId>,
}

/// Storage boundary for units.
///
/// Implementations must keep parent pointers and child sets consistent with
/// each other; callers rely on that to walk the tree in either direction.
pub trait UnitStore: Send + Sync {
    fn get(&self, id: &UnitId) -> DomainResult<&ShopUnit>;

    fn contains(&self, id: &UnitId) -> bool;

    /// Insert a unit or replace its mutable fields, re-linking it under a new
    /// parent if `parent_id` changed. Sets the unit's own `updated_at`.
    fn upsert(&mut self, record: &UnitRecord, at: Timestamp) -> DomainResult<UpsertOutcome>;

    /// Direct children (empty for offers).
    fn children(&self, id: &UnitId) -> DomainResult<Vec<UnitId>>;

    /// Remove a unit and its whole subtree; returns the removed units, root first.
    fn delete(&mut self, id: &UnitId) -> DomainResult<Vec<ShopUnit>>;

    /// Ancestor ids, immediate parent first, root last.
    fn ancestors_of(&self, id: &UnitId) -> DomainResult<Vec<UnitId>>;

    /// Write derived values onto a category. `updated_at: None` keeps the current one.
    fn set_derived(
        &mut self,
        id: &UnitId,
        stats: PriceStats,
        updated_at: Option<Timestamp>,
    ) -> DomainResult<()>;

    /// All ids, in ascending order.
    fn ids(&self) -> Vec<UnitId>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory arena keyed by id.
#[derive(Debug, Default, Clone)]
pub struct InMemoryUnitStore {
    units: HashMap<UnitId, ShopUnit>,
}

impl InMemoryUnitStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn attach(&mut self, parent: &UnitId, child: &UnitId) -> DomainResult<()> {
        let parent_unit = self
            .units
            .get_mut(parent)
            .ok_or_else(|| invalid_parent(child, parent, "does not exist"))?;
        let children = parent_unit
            .children_mut()
            .ok_or_else(|| invalid_parent(child, parent, "is an offer"))?;
        children.insert(child.clone());
        Ok(())
    }

    fn detach(&mut self, parent: &UnitId, child: &UnitId) {
        if let Some(children) = self.units.get_mut(parent).and_then(|p| p.children_mut()) {
            children.remove(child);
        }
    }
}

fn invalid_parent(child: &UnitId, parent: &UnitId, why: &str) -> DomainError {
    DomainError::validation(
        ValidationReason::InvalidParent,
        format!("parent {parent} of {child} {why}"),
    )
}

impl UnitStore for InMemoryUnitStore {
    fn get(&self, id: &UnitId) -> DomainResult<&ShopUnit> {
        self.units.get(id).ok_or_else(|| DomainError::not_found(id))
    }

    fn contains(&self, id: &UnitId) -> bool {
        self.units.contains_key(id)
    }

    fn upsert(&mut self, record: &UnitRecord, at: Timestamp) -> DomainResult<UpsertOutcome> {
        let Some(existing) = self.units.get(&record.id) else {
            let unit = match record.content {
                UnitContent::Offer { price } => ShopUnit::offer(
                    record.id.clone(),
                    record.name.clone(),
                    record.parent_id.clone(),
                    price,
                    at,
                ),
                UnitContent::Category => ShopUnit::category(
                    record.id.clone(),
                    record.name.clone(),
                    record.parent_id.clone(),
                    at,
                ),
            };
            if let Some(parent) = &record.parent_id {
                self.attach(parent, &record.id)?;
            }
            self.units.insert(record.id.clone(), unit);
            return Ok(UpsertOutcome {
                created: true,
                previous_parent: None,
            });
        };

        if existing.kind() != record.kind() {
            return Err(DomainError::validation(
                ValidationReason::KindMismatch,
                format!(
                    "{} is a {}, cannot become a {}",
                    record.id,
                    existing.kind(),
                    record.kind()
                ),
            ));
        }

        let old_parent = existing.parent_id().cloned();
        let moved = old_parent != record.parent_id;
        if moved {
            if let Some(new_parent) = &record.parent_id {
                self.attach(new_parent, &record.id)?;
            }
            if let Some(old) = &old_parent {
                self.detach(old, &record.id);
            }
        }

        let unit = self
            .units
            .get_mut(&record.id)
            .ok_or_else(|| DomainError::not_found(&record.id))?;
        unit.set_name(record.name.clone());
        unit.set_parent(record.parent_id.clone());
        unit.set_updated_at(at);
        if let UnitContent::Offer { price } = record.content {
            unit.set_offer_price(price);
        }

        Ok(UpsertOutcome {
            created: false,
            previous_parent: if moved { old_parent } else { None },
        })
    }

    fn children(&self, id: &UnitId) -> DomainResult<Vec<UnitId>> {
        Ok(self.get(id)?.children().cloned().collect())
    }

    fn delete(&mut self, id: &UnitId) -> DomainResult<Vec<ShopUnit>> {
        let root = self.get(id)?;
        if let Some(parent) = root.parent_id().cloned() {
            self.detach(&parent, id);
        }

        let mut removed = Vec::new();
        let mut pending = vec![id.clone()];
        while let Some(next) = pending.pop() {
            if let Some(unit) = self.units.remove(&next) {
                pending.extend(unit.children().cloned());
                removed.push(unit);
            }
        }
        Ok(removed)
    }

    fn ancestors_of(&self, id: &UnitId) -> DomainResult<Vec<UnitId>> {
        let mut ancestors = Vec::new();
        let mut current = self.get(id)?.parent_id();
        while let Some(parent) = current {
            // A chain longer than the store can only be a cycle.
            if ancestors.len() >= self.units.len() {
                return Err(DomainError::validation(
                    ValidationReason::CyclicParent,
                    format!("ancestor chain of {id} does not terminate"),
                ));
            }
            ancestors.push(parent.clone());
            current = self.get(parent)?.parent_id();
        }
        Ok(ancestors)
    }

    fn set_derived(
        &mut self,
        id: &UnitId,
        stats: PriceStats,
        updated_at: Option<Timestamp>,
    ) -> DomainResult<()> {
        let unit = self
            .units
            .get_mut(id)
            .ok_or_else(|| DomainError::not_found(id))?;
        unit.set_stats(stats);
        if let Some(at) = updated_at {
            unit.set_updated_at(at);
        }
        Ok(())
    }

    fn ids(&self) -> Vec<UnitId> {
        let mut ids: Vec<UnitId> = self.units.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn len(&self) -> usize {
        self.units.len()
    }
}
