//! Wire shapes of the HTTP API and their mapping to engine types.

use serde::{Deserialize, Serialize};

use market_catalog::{HistoryEntry, ImportBatch, UnitImport, UnitKind, UnitTree};
use market_core::{DomainError, DomainResult, Timestamp, UnitId, format_timestamp, parse_timestamp};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImportRequest {
    pub items: Vec<ImportItem>,
    pub update_date: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImportItem {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: UnitKind,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub price: Option<i64>,
}

impl ImportRequest {
    /// Check wire-level formats (UUID ids, ISO-8601 date). Catalog rules are
    /// left to the engine.
    pub fn into_batch(self) -> DomainResult<ImportBatch> {
        let update_date = parse_timestamp(&self.update_date)?;
        let items = self
            .items
            .into_iter()
            .map(ImportItem::into_unit)
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(ImportBatch::new(items, update_date))
    }
}

impl ImportItem {
    fn into_unit(self) -> DomainResult<UnitImport> {
        Ok(UnitImport {
            id: parse_unit_id(&self.id)?,
            name: self.name,
            kind: self.kind,
            parent_id: self.parent_id.as_deref().map(parse_unit_id).transpose()?,
            price: self.price,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SalesQuery {
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticQuery {
    pub date_start: Option<String>,
    pub date_end: Option<String>,
}

impl StatisticQuery {
    pub fn range(&self) -> DomainResult<(Timestamp, Timestamp)> {
        Ok((
            required_timestamp(self.date_start.as_deref(), "dateStart")?,
            required_timestamp(self.date_end.as_deref(), "dateEnd")?,
        ))
    }
}

pub fn required_timestamp(raw: Option<&str>, field: &str) -> DomainResult<Timestamp> {
    match raw {
        Some(raw) => parse_timestamp(raw),
        None => Err(DomainError::invalid_timestamp(format!("missing {field}"))),
    }
}

/// Unit ids on the wire are UUID strings. The key is the lowercase hyphenated
/// form, so every spelling of one UUID addresses the same unit.
pub fn parse_unit_id(raw: &str) -> DomainResult<UnitId> {
    uuid::Uuid::parse_str(raw)
        .map(|uuid| UnitId::new(uuid.hyphenated().to_string()))
        .map_err(|_| DomainError::invalid_id(format!("not a UUID: {raw}")))
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeResponse {
    pub id: UnitId,
    pub name: String,
    pub date: String,
    pub parent_id: Option<UnitId>,
    #[serde(rename = "type")]
    pub kind: UnitKind,
    pub price: Option<u64>,
    pub children: Option<Vec<NodeResponse>>,
}

impl From<UnitTree> for NodeResponse {
    fn from(tree: UnitTree) -> Self {
        Self {
            date: format_timestamp(&tree.updated_at),
            id: tree.id,
            name: tree.name,
            parent_id: tree.parent_id,
            kind: tree.kind,
            price: tree.price,
            children: tree
                .children
                .map(|children| children.into_iter().map(NodeResponse::from).collect()),
        }
    }
}

/// One historical unit state, in the same shape as a node without children.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticUnit {
    pub id: UnitId,
    pub name: String,
    pub date: String,
    pub parent_id: Option<UnitId>,
    #[serde(rename = "type")]
    pub kind: UnitKind,
    pub price: Option<u64>,
}

impl From<HistoryEntry> for StatisticUnit {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            date: format_timestamp(&entry.timestamp),
            id: entry.unit_id,
            name: entry.name,
            parent_id: entry.parent_id,
            kind: entry.kind,
            price: entry.price,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ItemsResponse<T> {
    pub items: Vec<T>,
}

pub fn statistic_items(entries: Vec<HistoryEntry>) -> ItemsResponse<StatisticUnit> {
    ItemsResponse {
        items: entries.into_iter().map(StatisticUnit::from).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ID: &str = "069cb8d7-bbdd-47d3-ad8f-82ef4c269df1";
    const PARENT: &str = "d515e43f-f3f6-4471-bb77-6b455017a2d2";

    #[test]
    fn import_request_maps_to_batch() {
        let body = json!({
            "items": [
                { "id": PARENT, "name": "Phones", "type": "CATEGORY" },
                { "id": ID, "name": "jPhone", "type": "OFFER", "parentId": PARENT, "price": 79999 }
            ],
            "updateDate": "2022-02-02T12:00:00.000Z"
        });
        let req: ImportRequest = serde_json::from_value(body).unwrap();
        let batch = req.into_batch().unwrap();

        assert_eq!(batch.items.len(), 2);
        assert_eq!(batch.items[1].parent_id, Some(UnitId::new(PARENT)));
        assert_eq!(batch.items[1].price, Some(79999));
        assert_eq!(format_timestamp(&batch.update_date), "2022-02-02T12:00:00.000Z");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let body = json!({
            "items": [{ "id": ID, "name": "x", "type": "OFFER", "price": 1, "color": "red" }],
            "updateDate": "2022-02-02T12:00:00.000Z"
        });
        assert!(serde_json::from_value::<ImportRequest>(body).is_err());

        let body = json!({ "items": [], "updateDate": "2022-02-02T12:00:00.000Z", "extra": 1 });
        assert!(serde_json::from_value::<ImportRequest>(body).is_err());
    }

    #[test]
    fn non_uuid_ids_and_bad_dates_are_rejected() {
        let bad_id = ImportRequest {
            items: vec![ImportItem {
                id: "not-a-uuid".into(),
                name: "x".into(),
                kind: UnitKind::Category,
                parent_id: None,
                price: None,
            }],
            update_date: "2022-02-02T12:00:00.000Z".into(),
        };
        assert!(matches!(bad_id.into_batch(), Err(DomainError::InvalidId(_))));

        let bad_date = ImportRequest {
            items: vec![],
            update_date: "yesterday".into(),
        };
        assert!(matches!(bad_date.into_batch(), Err(DomainError::InvalidTimestamp(_))));
    }

    #[test]
    fn uuid_spellings_share_one_key() {
        let upper = parse_unit_id(&ID.to_uppercase()).unwrap();
        let lower = parse_unit_id(ID).unwrap();
        let simple = parse_unit_id(&ID.replace('-', "")).unwrap();
        assert_eq!(upper, lower);
        assert_eq!(simple, lower);
        assert_eq!(lower.as_str(), ID);
    }

    #[test]
    fn import_ids_are_canonicalised() {
        let body = json!({
            "items": [
                { "id": PARENT.to_uppercase(), "name": "Phones", "type": "CATEGORY" },
                { "id": ID, "name": "jPhone", "type": "OFFER", "parentId": PARENT.to_uppercase(), "price": 1 }
            ],
            "updateDate": "2022-02-02T12:00:00.000Z"
        });
        let batch = serde_json::from_value::<ImportRequest>(body).unwrap().into_batch().unwrap();
        assert_eq!(batch.items[0].id, UnitId::new(PARENT));
        assert_eq!(batch.items[1].parent_id, Some(UnitId::new(PARENT)));
    }

    #[test]
    fn missing_statistic_bounds_are_rejected() {
        let q = StatisticQuery {
            date_start: Some("2022-02-01T00:00:00.000Z".into()),
            date_end: None,
        };
        assert!(matches!(q.range(), Err(DomainError::InvalidTimestamp(_))));
    }
}
