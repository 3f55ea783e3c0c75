use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use market_core::{Timestamp, UnitId};

/// The two kinds of shop unit. Immutable once a unit exists.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UnitKind {
    Offer,
    Category,
}

impl UnitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Offer => "OFFER",
            UnitKind::Category => "CATEGORY",
        }
    }
}

impl core::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sum and count of the offer prices in a subtree.
///
/// Categories cache this so that a recompute only needs their direct children.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PriceStats {
    pub total: u128,
    pub offers: u64,
}

impl PriceStats {
    pub fn offer(price: u64) -> Self {
        Self {
            total: u128::from(price),
            offers: 1,
        }
    }

    pub fn merge(self, other: PriceStats) -> Self {
        Self {
            total: self.total + other.total,
            offers: self.offers + other.offers,
        }
    }

    /// Floor of the mean offer price; `None` when the subtree holds no offers.
    pub fn average(&self) -> Option<u64> {
        if self.offers == 0 {
            return None;
        }
        // Mean of u64 values always fits in u64.
        Some((self.total / u128::from(self.offers)) as u64)
    }
}

/// Kind-specific part of a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitBody {
    Offer {
        price: u64,
    },
    Category {
        children: BTreeSet<UnitId>,
        stats: PriceStats,
    },
}

/// A node of the catalog tree, owned by the unit store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopUnit {
    id: UnitId,
    name: String,
    parent_id: Option<UnitId>,
    updated_at: Timestamp,
    body: UnitBody,
}

impl ShopUnit {
    pub fn offer(
        id: UnitId,
        name: impl Into<String>,
        parent_id: Option<UnitId>,
        price: u64,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            parent_id,
            updated_at,
            body: UnitBody::Offer { price },
        }
    }

    pub fn category(
        id: UnitId,
        name: impl Into<String>,
        parent_id: Option<UnitId>,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            parent_id,
            updated_at,
            body: UnitBody::Category {
                children: BTreeSet::new(),
                stats: PriceStats::default(),
            },
        }
    }

    pub fn id(&self) -> &UnitId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent_id(&self) -> Option<&UnitId> {
        self.parent_id.as_ref()
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn body(&self) -> &UnitBody {
        &self.body
    }

    pub fn kind(&self) -> UnitKind {
        match self.body {
            UnitBody::Offer { .. } => UnitKind::Offer,
            UnitBody::Category { .. } => UnitKind::Category,
        }
    }

    pub fn is_category(&self) -> bool {
        self.kind() == UnitKind::Category
    }

    /// Offer price, or the derived average for a category.
    pub fn price(&self) -> Option<u64> {
        match &self.body {
            UnitBody::Offer { price } => Some(*price),
            UnitBody::Category { stats, .. } => stats.average(),
        }
    }

    /// Contribution of this unit to its ancestors' averages.
    pub fn stats(&self) -> PriceStats {
        match &self.body {
            UnitBody::Offer { price } => PriceStats::offer(*price),
            UnitBody::Category { stats, .. } => *stats,
        }
    }

    /// Direct children; always empty for offers.
    pub fn children(&self) -> impl Iterator<Item = &UnitId> {
        match &self.body {
            UnitBody::Offer { .. } => None,
            UnitBody::Category { children, .. } => Some(children.iter()),
        }
        .into_iter()
        .flatten()
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_parent(&mut self, parent_id: Option<UnitId>) {
        self.parent_id = parent_id;
    }

    pub(crate) fn set_updated_at(&mut self, at: Timestamp) {
        self.updated_at = at;
    }

    pub(crate) fn set_offer_price(&mut self, new_price: u64) {
        if let UnitBody::Offer { price } = &mut self.body {
            *price = new_price;
        }
    }

    pub(crate) fn set_stats(&mut self, new_stats: PriceStats) {
        if let UnitBody::Category { stats, .. } = &mut self.body {
            *stats = new_stats;
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut BTreeSet<UnitId>> {
        match &mut self.body {
            UnitBody::Offer { .. } => None,
            UnitBody::Category { children, .. } => Some(children),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2022, 2, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn average_floors_and_handles_empty() {
        assert_eq!(PriceStats::default().average(), None);
        let stats = PriceStats::offer(100)
            .merge(PriceStats::offer(101))
            .merge(PriceStats::offer(0));
        assert_eq!(stats.average(), Some(67));
    }

    #[test]
    fn average_does_not_overflow_on_large_prices() {
        let stats = PriceStats::offer(u64::MAX).merge(PriceStats::offer(u64::MAX));
        assert_eq!(stats.average(), Some(u64::MAX));
    }

    #[test]
    fn offers_have_no_children_and_report_own_price() {
        let offer = ShopUnit::offer(UnitId::new("o"), "phone", None, 500, t0());
        assert_eq!(offer.kind(), UnitKind::Offer);
        assert_eq!(offer.price(), Some(500));
        assert_eq!(offer.children().count(), 0);
        assert_eq!(offer.stats(), PriceStats::offer(500));
    }

    #[test]
    fn empty_category_has_no_price() {
        let cat = ShopUnit::category(UnitId::new("c"), "goods", None, t0());
        assert!(cat.is_category());
        assert_eq!(cat.price(), None);
    }

    #[test]
    fn kind_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&UnitKind::Category).unwrap(), "\"CATEGORY\"");
        let kind: UnitKind = serde_json::from_str("\"OFFER\"").unwrap();
        assert_eq!(kind, UnitKind::Offer);
    }
}
