//! Import batches: raw client records and their validated form.

use serde::{Deserialize, Serialize};

use market_core::{Timestamp, UnitId};

use crate::unit::UnitKind;

/// One incoming unit record, exactly as submitted (not yet validated).
///
/// `price` is signed so that negative input can be reported as a validation
/// failure rather than a decoding error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UnitImport {
    pub id: UnitId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: UnitKind,
    #[serde(default)]
    pub parent_id: Option<UnitId>,
    #[serde(default)]
    pub price: Option<i64>,
}

impl UnitImport {
    pub fn offer(
        id: impl Into<UnitId>,
        name: impl Into<String>,
        parent_id: Option<&str>,
        price: i64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: UnitKind::Offer,
            parent_id: parent_id.map(UnitId::from),
            price: Some(price),
        }
    }

    pub fn category(
        id: impl Into<UnitId>,
        name: impl Into<String>,
        parent_id: Option<&str>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: UnitKind::Category,
            parent_id: parent_id.map(UnitId::from),
            price: None,
        }
    }
}

/// A group of records applied atomically under one timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImportBatch {
    pub items: Vec<UnitImport>,
    pub update_date: Timestamp,
}

impl ImportBatch {
    pub fn new(items: Vec<UnitImport>, update_date: Timestamp) -> Self {
        Self { items, update_date }
    }
}

/// Kind-specific payload of a validated record.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UnitContent {
    Offer { price: u64 },
    Category,
}

/// A record that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitRecord {
    pub id: UnitId,
    pub name: String,
    pub parent_id: Option<UnitId>,
    pub content: UnitContent,
}

impl UnitRecord {
    pub fn kind(&self) -> UnitKind {
        match self.content {
            UnitContent::Offer { .. } => UnitKind::Offer,
            UnitContent::Category => UnitKind::Category,
        }
    }
}

/// Output of the validator: records ordered so that every parent created or
/// moved by the batch precedes its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedBatch {
    records: Vec<UnitRecord>,
    timestamp: Timestamp,
}

impl ValidatedBatch {
    pub(crate) fn new(records: Vec<UnitRecord>, timestamp: Timestamp) -> Self {
        Self { records, timestamp }
    }

    pub fn records(&self) -> &[UnitRecord] {
        &self.records
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_wire_shape() {
        let json = r#"{
            "items": [
                {"id": "a", "name": "root", "type": "CATEGORY", "parentId": null},
                {"id": "b", "name": "x", "type": "OFFER", "parentId": "a", "price": 100}
            ],
            "updateDate": "2022-02-01T12:00:00Z"
        }"#;
        let batch: ImportBatch = serde_json::from_str(json).unwrap();
        assert_eq!(batch.items.len(), 2);
        assert_eq!(batch.items[0], UnitImport::category("a", "root", None));
        assert_eq!(batch.items[1], UnitImport::offer("b", "x", Some("a"), 100));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let json = r#"{"id": "a", "name": "n", "type": "OFFER", "price": 1, "color": "red"}"#;
        assert!(serde_json::from_str::<UnitImport>(json).is_err());
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let json = r#"{"id": "a", "name": "n", "type": "SERVICE"}"#;
        assert!(serde_json::from_str::<UnitImport>(json).is_err());
    }
}
