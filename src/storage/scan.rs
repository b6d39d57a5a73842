//! Translates adjacency queries into store scans.

use crate::types::{Direction, VertexId};

use super::adjacency::{prefix_successor, ReadKey, CREATED_AT};
use super::index::{IndexPlan, PropertyPredicate};
use super::kv::{RowFilter, ScanSpec};

/// Scan covering every key that starts with `prefix`.
pub fn prefix_scan(prefix: Vec<u8>) -> ScanSpec {
    match prefix_successor(&prefix) {
        Some(stop) => ScanSpec {
            start: prefix,
            stop: Some(stop),
            filter: None,
        },
        None => ScanSpec {
            start: prefix.clone(),
            stop: None,
            filter: Some(RowFilter::Prefix(prefix)),
        },
    }
}

/// Scan over the primary rows of `vertex` for the given direction and labels.
///
/// With no labels the scan covers the whole vertex/direction prefix and the
/// caller skips secondary rows. One label in one direction is a contiguous
/// range. Anything else keeps the outer range and adds a must-pass-one
/// filter of per-(direction, label) prefixes, evaluated by the store.
pub fn labels_scan(vertex: VertexId, direction: Direction, labels: &[String]) -> ScanSpec {
    let outer = ReadKey::vertex(vertex, direction).encode();
    match (direction, labels) {
        (_, []) => prefix_scan(outer),
        (Direction::Out | Direction::In, [label]) => prefix_scan(
            ReadKey::vertex(vertex, direction)
                .label(label)
                .key(CREATED_AT)
                .encode(),
        ),
        _ => {
            let mut any = Vec::with_capacity(labels.len() * direction.concrete().len());
            for label in labels {
                for dir in direction.concrete() {
                    any.push(RowFilter::Prefix(
                        ReadKey::vertex(vertex, *dir)
                            .label(label)
                            .key(CREATED_AT)
                            .encode(),
                    ));
                }
            }
            let mut spec = prefix_scan(outer.clone());
            let labels_filter = RowFilter::Any(any);
            spec.filter = Some(match spec.filter.take() {
                Some(existing) => existing.and(labels_filter),
                None => RowFilter::Prefix(outer).and(labels_filter),
            });
            spec
        }
    }
}

/// Scans for a single-label property query, one per concrete direction.
///
/// Value ranges cannot span two directions contiguously, so `Both` yields
/// two scans that are read back to back.
pub fn plan_scans(
    vertex: VertexId,
    direction: Direction,
    label: &str,
    plan: &IndexPlan,
) -> Vec<ScanSpec> {
    direction
        .concrete()
        .iter()
        .map(|dir| plan_scan(vertex, *dir, label, plan))
        .collect()
}

fn plan_scan(vertex: VertexId, dir: Direction, label: &str, plan: &IndexPlan) -> ScanSpec {
    let base = ReadKey::vertex(vertex, dir).label(label);
    match plan {
        IndexPlan::Primary | IndexPlan::Fallback { .. } => prefix_scan(base.key(CREATED_AT).encode()),
        IndexPlan::CreatedAt(predicate) => bounded(base.key(CREATED_AT), predicate),
        IndexPlan::Secondary { index, predicate } => {
            bounded(base.key(&index.property_key), predicate)
        }
    }
}

fn bounded(base: ReadKey<'_>, predicate: &PropertyPredicate) -> ScanSpec {
    match predicate {
        PropertyPredicate::Equals(value) => prefix_scan(base.value(value).encode()),
        PropertyPredicate::Range { from, to } => ScanSpec {
            start: base.value(from).encode(),
            stop: Some(base.value(to).encode()),
            filter: None,
        },
    }
}
