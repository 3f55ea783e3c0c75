//! Read side: subtree snapshots and history windows.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use market_core::{DomainError, DomainResult, Timestamp, UnitId};

use crate::history::{HistoryEntry, HistoryLog};
use crate::store::UnitStore;
use crate::unit::{ShopUnit, UnitKind};

/// A unit together with its nested descendants.
///
/// `children` is `None` for offers and `Some` (possibly empty) for categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitTree {
    pub id: UnitId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: UnitKind,
    pub parent_id: Option<UnitId>,
    pub price: Option<u64>,
    pub updated_at: Timestamp,
    pub children: Option<Vec<UnitTree>>,
}

impl UnitTree {
    fn leaf(unit: &ShopUnit) -> Self {
        Self {
            id: unit.id().clone(),
            name: unit.name().to_string(),
            kind: unit.kind(),
            parent_id: unit.parent_id().cloned(),
            price: unit.price(),
            updated_at: unit.updated_at(),
            children: if unit.is_category() { Some(Vec::new()) } else { None },
        }
    }

    /// Number of nodes in this tree, including the root.
    pub fn size(&self) -> usize {
        1 + self
            .children
            .iter()
            .flatten()
            .map(UnitTree::size)
            .sum::<usize>()
    }
}

/// Build the nested tree rooted at `id`; children in ascending id order.
///
/// Uses an explicit stack, so tree depth is not limited by the call stack.
pub fn subtree<S>(store: &S, id: &UnitId) -> DomainResult<UnitTree>
where
    S: UnitStore + ?Sized,
{
    struct Frame {
        node: UnitTree,
        pending: Vec<UnitId>,
    }

    let frame = |unit: &ShopUnit| {
        let mut pending: Vec<UnitId> = unit.children().cloned().collect();
        pending.reverse();
        Frame {
            node: UnitTree::leaf(unit),
            pending,
        }
    };

    let mut stack = vec![frame(store.get(id)?)];
    loop {
        let next = stack.last_mut().and_then(|top| top.pending.pop());
        if let Some(child) = next {
            stack.push(frame(store.get(&child)?));
            continue;
        }
        let Some(done) = stack.pop() else {
            return Err(DomainError::not_found(id));
        };
        match stack.last_mut() {
            Some(parent) => parent.node.children.get_or_insert_with(Vec::new).push(done.node),
            None => return Ok(done.node),
        }
    }
}

/// Ids of all offers in the subtree rooted at `id` (the unit itself if it is an offer).
pub fn subtree_offers<S>(store: &S, id: &UnitId) -> DomainResult<HashSet<UnitId>>
where
    S: UnitStore + ?Sized,
{
    let mut offers = HashSet::new();
    let mut pending = vec![id.clone()];
    while let Some(next) = pending.pop() {
        let unit = store.get(&next)?;
        match unit.kind() {
            UnitKind::Offer => {
                offers.insert(next);
            }
            UnitKind::Category => pending.extend(unit.children().cloned()),
        }
    }
    Ok(offers)
}

/// Entries in `[from, to)`.
///
/// Without `unit` this is the offer price history of the whole catalog. With
/// `unit` it is that unit's own history: its price sets for an offer, its
/// recorded `versions` for a category.
pub fn statistics<S, H>(
    store: &S,
    history: &H,
    versions: &H,
    unit: Option<&UnitId>,
    from: Timestamp,
    to: Timestamp,
) -> DomainResult<Vec<HistoryEntry>>
where
    S: UnitStore + ?Sized,
    H: HistoryLog + ?Sized,
{
    if from > to {
        return Err(DomainError::InvalidRange { from, to });
    }
    let Some(id) = unit else {
        return Ok(history.range(from, to));
    };
    let only: HashSet<UnitId> = HashSet::from([id.clone()]);
    match store.get(id)?.kind() {
        UnitKind::Offer => Ok(history.range_for(&only, from, to)),
        UnitKind::Category => Ok(versions.range_for(&only, from, to)),
    }
}

/// Entries in the closed window `[date - window, date]`: offers updated recently.
///
/// Bounds that fall outside the representable time range are clamped to it.
pub fn sales<H>(history: &H, date: Timestamp, window: Duration) -> Vec<HistoryEntry>
where
    H: HistoryLog + ?Sized,
{
    let from = date
        .checked_sub_signed(window)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let to = date
        .checked_add_signed(Duration::nanoseconds(1))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    history.range(from, to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::InMemoryHistoryLog;
    use crate::import::{UnitContent, UnitRecord};
    use crate::store::InMemoryUnitStore;
    use chrono::{TimeZone, Utc};

    fn t(hour: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2022, 2, 1, hour, 0, 0).unwrap()
    }

    fn record(id: &str, parent: Option<&str>, price: Option<u64>) -> UnitRecord {
        UnitRecord {
            id: UnitId::new(id),
            name: id.to_string(),
            parent_id: parent.map(UnitId::from),
            content: price.map_or(UnitContent::Category, |price| UnitContent::Offer { price }),
        }
    }

    fn seeded() -> (InMemoryUnitStore, InMemoryHistoryLog, InMemoryHistoryLog) {
        let mut store = InMemoryUnitStore::new();
        let mut history = InMemoryHistoryLog::new();
        let mut versions = InMemoryHistoryLog::new();
        for (r, at) in [
            (record("root", None, None), t(1)),
            (record("b", Some("root"), None), t(1)),
            (record("a", Some("root"), Some(10)), t(1)),
            (record("b1", Some("b"), Some(20)), t(2)),
            (record("solo", None, Some(5)), t(3)),
        ] {
            store.upsert(&r, at).unwrap();
            let entry = HistoryEntry::of(store.get(&r.id).unwrap());
            match r.content {
                UnitContent::Offer { .. } => history.append(entry),
                UnitContent::Category => versions.append(entry),
            }
        }
        (store, history, versions)
    }

    #[test]
    fn subtree_is_nested_and_sorted() {
        let (store, _, _) = seeded();
        let tree = subtree(&store, &UnitId::new("root")).unwrap();

        assert_eq!(tree.size(), 4);
        let children = tree.children.as_ref().unwrap();
        assert_eq!(children[0].id, UnitId::new("a"));
        assert_eq!(children[0].children, None);
        assert_eq!(children[1].id, UnitId::new("b"));
        assert_eq!(children[1].children.as_ref().unwrap()[0].id, UnitId::new("b1"));
    }

    #[test]
    fn subtree_of_offer_is_a_leaf() {
        let (store, _, _) = seeded();
        let tree = subtree(&store, &UnitId::new("solo")).unwrap();
        assert_eq!(tree.kind, UnitKind::Offer);
        assert_eq!(tree.price, Some(5));
        assert!(tree.children.is_none());
    }

    #[test]
    fn subtree_of_missing_unit_is_not_found() {
        let (store, _, _) = seeded();
        assert_eq!(
            subtree(&store, &UnitId::new("x")).unwrap_err(),
            DomainError::NotFound(UnitId::new("x"))
        );
    }

    #[test]
    fn deep_chains_do_not_recurse() {
        let mut store = InMemoryUnitStore::new();
        store.upsert(&record("c0", None, None), t(1)).unwrap();
        for i in 1..5_000 {
            let parent = format!("c{}", i - 1);
            store
                .upsert(&record(&format!("c{i}"), Some(&parent), None), t(1))
                .unwrap();
        }
        assert_eq!(subtree(&store, &UnitId::new("c0")).unwrap().size(), 5_000);
    }

    #[test]
    fn statistics_for_category_reads_its_versions() {
        let (store, history, versions) = seeded();
        let root = UnitId::new("root");
        let entries = statistics(&store, &history, &versions, Some(&root), t(0), t(9)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].unit_id, root);
        assert_eq!(entries[0].kind, UnitKind::Category);
    }

    #[test]
    fn statistics_for_offer_reads_its_price_history() {
        let (store, history, versions) = seeded();
        let b1 = UnitId::new("b1");
        let entries = statistics(&store, &history, &versions, Some(&b1), t(0), t(9)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].price, Some(20));
    }

    #[test]
    fn statistics_without_unit_cover_offers_only() {
        let (store, history, versions) = seeded();
        let entries = statistics(&store, &history, &versions, None, t(0), t(9)).unwrap();
        let ids: Vec<&str> = entries.iter().map(|e| e.unit_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b1", "solo"]);
    }

    #[test]
    fn statistics_rejects_inverted_range_and_allows_empty() {
        let (store, history, versions) = seeded();
        assert!(matches!(
            statistics(&store, &history, &versions, None, t(5), t(1)),
            Err(DomainError::InvalidRange { .. })
        ));
        assert!(statistics(&store, &history, &versions, None, t(2), t(2)).unwrap().is_empty());
    }

    #[test]
    fn statistics_for_unknown_unit_is_not_found() {
        let (store, history, versions) = seeded();
        assert!(matches!(
            statistics(&store, &history, &versions, Some(&UnitId::new("x")), t(0), t(9)),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn sales_window_clamps_instead_of_overflowing() {
        let (_, history, _) = seeded();
        assert_eq!(sales(&history, t(3), Duration::MAX).len(), 3);
        assert_eq!(sales(&history, DateTime::<Utc>::MIN_UTC, Duration::hours(1)).len(), 0);
        assert_eq!(sales(&history, DateTime::<Utc>::MAX_UTC, Duration::MAX).len(), 3);
    }

    #[test]
    fn sales_window_is_closed_on_both_ends() {
        let (_, history, _) = seeded();
        let entries = sales(&history, t(3), Duration::hours(1));
        let ids: Vec<&str> = entries.iter().map(|e| e.unit_id.as_str()).collect();
        assert_eq!(ids, vec!["b1", "solo"]);
    }
}
