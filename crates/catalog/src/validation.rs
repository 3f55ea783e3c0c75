//! Batch validation.
//!
//! A batch is checked as a whole against the graph it *would* produce (store
//! edges overridden by batch edges), so forward references inside a batch are
//! fine and record order never matters. Nothing is mutated here.

use std::collections::HashMap;

use market_core::{DomainError, DomainResult, UnitId, ValidationReason};

use crate::import::{ImportBatch, UnitContent, UnitImport, UnitRecord, ValidatedBatch};
use crate::store::UnitStore;
use crate::unit::UnitKind;

/// Validate a batch against the current store contents.
pub fn validate_batch<S>(store: &S, batch: ImportBatch) -> DomainResult<ValidatedBatch>
where
    S: UnitStore + ?Sized,
{
    let records = validate_records(store, batch.items)?;
    Ok(ValidatedBatch::new(records, batch.update_date))
}

/// Validate raw records; returns them ordered parents-before-children.
pub fn validate_records<S>(store: &S, items: Vec<UnitImport>) -> DomainResult<Vec<UnitRecord>>
where
    S: UnitStore + ?Sized,
{
    let mut records: HashMap<UnitId, UnitRecord> = HashMap::with_capacity(items.len());
    let mut submitted: Vec<UnitId> = Vec::with_capacity(items.len());

    for item in items {
        let record = check_record(store, item)?;
        if records.contains_key(&record.id) {
            return Err(DomainError::validation(
                ValidationReason::DuplicateId,
                format!("{} appears more than once in the batch", record.id),
            ));
        }
        submitted.push(record.id.clone());
        records.insert(record.id.clone(), record);
    }

    for id in &submitted {
        check_parent(store, &records, &records[id])?;
    }

    let order = parent_first_order(store, &records, &submitted)?;
    Ok(order
        .into_iter()
        .filter_map(|id| records.remove(&id))
        .collect())
}

/// Per-record checks that need no knowledge of other batch records.
fn check_record<S>(store: &S, item: UnitImport) -> DomainResult<UnitRecord>
where
    S: UnitStore + ?Sized,
{
    if item.name.trim().is_empty() {
        return Err(DomainError::validation(
            ValidationReason::EmptyName,
            format!("{} has an empty name", item.id),
        ));
    }

    let content = match (item.kind, item.price) {
        (UnitKind::Offer, Some(price)) if price >= 0 => UnitContent::Offer {
            price: price as u64,
        },
        (UnitKind::Offer, Some(price)) => {
            return Err(DomainError::validation(
                ValidationReason::InvalidPrice,
                format!("offer {} has negative price {price}", item.id),
            ));
        }
        (UnitKind::Offer, None) => {
            return Err(DomainError::validation(
                ValidationReason::InvalidPrice,
                format!("offer {} has no price", item.id),
            ));
        }
        (UnitKind::Category, Some(_)) => {
            return Err(DomainError::validation(
                ValidationReason::InvalidPrice,
                format!("category {} must not carry a price", item.id),
            ));
        }
        (UnitKind::Category, None) => UnitContent::Category,
    };

    if let Ok(existing) = store.get(&item.id) {
        if existing.kind() != item.kind {
            return Err(DomainError::validation(
                ValidationReason::KindMismatch,
                format!(
                    "{} is a {}, cannot become a {}",
                    item.id,
                    existing.kind(),
                    item.kind
                ),
            ));
        }
    }

    if item.parent_id.as_ref() == Some(&item.id) {
        return Err(DomainError::validation(
            ValidationReason::CyclicParent,
            format!("{} is its own parent", item.id),
        ));
    }

    Ok(UnitRecord {
        id: item.id,
        name: item.name,
        parent_id: item.parent_id,
        content,
    })
}

/// The parent must exist (in the batch or the store) and be a category.
fn check_parent<S>(
    store: &S,
    records: &HashMap<UnitId, UnitRecord>,
    record: &UnitRecord,
) -> DomainResult<()>
where
    S: UnitStore + ?Sized,
{
    let Some(parent) = &record.parent_id else {
        return Ok(());
    };
    let parent_kind = match records.get(parent) {
        Some(r) => Some(r.kind()),
        None => store.get(parent).ok().map(|u| u.kind()),
    };
    match parent_kind {
        Some(UnitKind::Category) => Ok(()),
        Some(UnitKind::Offer) => Err(DomainError::validation(
            ValidationReason::InvalidParent,
            format!("parent {parent} of {} is an offer", record.id),
        )),
        None => Err(DomainError::validation(
            ValidationReason::InvalidParent,
            format!("parent {parent} of {} does not exist", record.id),
        )),
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Mark {
    OnPath,
    Done,
}

/// Walk every submitted unit up the resulting parent graph, detecting cycles
/// and emitting batch ids root-most first. Each unit is visited once overall.
fn parent_first_order<S>(
    store: &S,
    records: &HashMap<UnitId, UnitRecord>,
    submitted: &[UnitId],
) -> DomainResult<Vec<UnitId>>
where
    S: UnitStore + ?Sized,
{
    let resulting_parent = |id: &UnitId| -> Option<UnitId> {
        match records.get(id) {
            Some(r) => r.parent_id.clone(),
            None => store.get(id).ok().and_then(|u| u.parent_id().cloned()),
        }
    };

    let mut marks: HashMap<UnitId, Mark> = HashMap::new();
    let mut order = Vec::with_capacity(submitted.len());

    for start in submitted {
        let mut path: Vec<UnitId> = Vec::new();
        let mut current = Some(start.clone());

        while let Some(id) = current {
            match marks.get(&id) {
                Some(Mark::Done) => break,
                Some(Mark::OnPath) => {
                    return Err(DomainError::validation(
                        ValidationReason::CyclicParent,
                        format!("parent chain of {start} loops back to {id}"),
                    ));
                }
                None => {}
            }
            marks.insert(id.clone(), Mark::OnPath);
            current = resulting_parent(&id);
            path.push(id);
        }

        for id in path.into_iter().rev() {
            marks.insert(id.clone(), Mark::Done);
            if records.contains_key(&id) {
                order.push(id);
            }
        }
    }

    debug_assert_eq!(order.len(), records.len());
    Ok(order)
}
