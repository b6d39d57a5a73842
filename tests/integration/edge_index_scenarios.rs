#![allow(missing_docs)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use edgeidx::storage::{
    CounterMetrics, Edge, EdgeRecord, Graph, GraphOptions, IndexCatalog, IndexKey,
    MemElementStore, MemStore, PropValue,
};
use edgeidx::types::{Direction, EdgeId, Result, VertexId};
use proptest::prelude::*;

const A: VertexId = VertexId(1);
const B: VertexId = VertexId(2);
const C: VertexId = VertexId(3);

struct Harness {
    store: Arc<MemStore>,
    elements: Arc<MemElementStore>,
    catalog: Arc<IndexCatalog>,
    metrics: Arc<CounterMetrics>,
    graph: Graph,
}

fn harness(opts: GraphOptions) -> Harness {
    let store = Arc::new(MemStore::new());
    let elements = Arc::new(MemElementStore::new());
    for v in [A, B, C] {
        elements.add_vertex(v);
    }
    let catalog = Arc::new(IndexCatalog::new());
    let metrics = Arc::new(CounterMetrics::default());
    let graph = Graph::open(store.clone(), elements.clone(), catalog.clone(), opts)
        .with_metrics(metrics.clone());
    Harness {
        store,
        elements,
        catalog,
        metrics,
        graph,
    }
}

fn edge(id: u64, label: &str, out: VertexId, inn: VertexId, since: Option<i64>) -> EdgeRecord {
    let mut props = BTreeMap::new();
    if let Some(since) = since {
        props.insert("since".to_owned(), PropValue::Int(since));
    }
    EdgeRecord {
        id: EdgeId(id),
        label: label.to_owned(),
        out_vertex: out,
        in_vertex: inn,
        created_at: 1_700_000_000 + id as i64,
        props,
    }
}

fn collect(iter: impl Iterator<Item = Result<Edge>>) -> Result<Vec<u64>> {
    iter.map(|e| e.map(|e| e.id().0)).collect()
}

#[test]
fn range_query_on_since() -> Result<()> {
    let h = harness(GraphOptions::default());
    h.graph.add_edge(edge(1, "knows", A, B, Some(2020)))?;
    let a = h.graph.vertex(A);

    let hits = h.graph.edges_in_range(
        &a,
        Direction::Out,
        "knows",
        "since",
        &PropValue::Int(2019),
        &PropValue::Int(2021),
    )?;
    assert_eq!(collect(hits)?, vec![1]);

    let misses = h.graph.edges_in_range(
        &a,
        Direction::Out,
        "knows",
        "since",
        &PropValue::Int(2021),
        &PropValue::Int(2030),
    )?;
    assert!(collect(misses)?.is_empty());
    Ok(())
}

#[test]
fn both_directions_over_two_labels() -> Result<()> {
    let h = harness(GraphOptions::default());
    h.graph.add_edge(edge(1, "knows", A, B, None))?;
    h.graph.add_edge(edge(2, "likes", A, C, None))?;
    let a = h.graph.vertex(A);

    let got = collect(h.graph.edges(&a, Direction::Both, &["knows", "likes"])?)?;
    let unique: BTreeSet<u64> = got.iter().copied().collect();
    assert_eq!(unique.len(), got.len(), "duplicates in {got:?}");
    assert_eq!(unique, BTreeSet::from([1, 2]));

    let reversed = collect(h.graph.edges(&a, Direction::Both, &["likes", "knows"])?)?;
    assert_eq!(reversed, got);
    Ok(())
}

#[test]
fn late_index_needs_explicit_backfill() -> Result<()> {
    let h = harness(GraphOptions::default());
    let e1 = h.graph.add_edge(edge(1, "knows", A, B, Some(2020)))?;
    let index = IndexKey::edge("knows", "since");
    h.catalog.declare(index.clone());
    let a = h.graph.vertex(A);

    let before = h
        .graph
        .edges_by_value(&a, Direction::Out, "knows", "since", &PropValue::Int(2020))?;
    assert!(collect(before)?.is_empty());

    h.graph.write_edge_index(&e1, &index)?;
    let after = h
        .graph
        .edges_by_value(&a, Direction::Out, "knows", "since", &PropValue::Int(2020))?;
    assert_eq!(collect(after)?, vec![1]);
    Ok(())
}

#[test]
fn deleting_endpoints_is_complete() -> Result<()> {
    let h = harness(GraphOptions::default());
    h.catalog.declare(IndexKey::edge("knows", "since"));
    let e1 = h.graph.add_edge(edge(1, "knows", A, B, Some(2020)))?;
    assert_eq!(h.store.len(), 4);

    h.graph.delete_edge_endpoints(&e1)?;
    assert!(h.store.is_empty());

    let a = h.graph.vertex(A);
    assert!(collect(h.graph.edges(&a, Direction::Out, &[])?)?.is_empty());
    assert_eq!(h.metrics.stale_detected.load(Ordering::Relaxed), 0);
    assert_eq!(h.metrics.repairs_issued.load(Ordering::Relaxed), 0);
    Ok(())
}

#[test]
fn identical_query_scans_once() -> Result<()> {
    let h = harness(GraphOptions::default());
    h.graph.add_edge(edge(1, "knows", A, B, None))?;
    h.graph.add_edge(edge(2, "knows", A, C, None))?;
    let a = h.graph.vertex(A);

    let first = collect(h.graph.edges(&a, Direction::Out, &["knows"])?)?;
    let scans = h.store.scan_count();
    let second = collect(h.graph.edges(&a, Direction::Out, &["knows"])?)?;

    assert_eq!(first, second);
    assert_eq!(h.store.scan_count(), scans);
    assert_eq!(h.metrics.cache_hits.load(Ordering::Relaxed), 1);
    Ok(())
}

#[test]
fn dropped_sequence_leaves_cache_cold() -> Result<()> {
    let h = harness(GraphOptions::default());
    h.graph.add_edge(edge(1, "knows", A, B, None))?;
    h.graph.add_edge(edge(2, "knows", A, C, None))?;
    let a = h.graph.vertex(A);

    let mut iter = h.graph.edges(&a, Direction::Out, &[])?;
    assert!(iter.next().transpose()?.is_some());
    drop(iter);
    assert_eq!(a.cached_queries(), 0);

    assert_eq!(collect(h.graph.edges(&a, Direction::Out, &[])?)?.len(), 2);
    assert_eq!(a.cached_queries(), 1);
    Ok(())
}

#[test]
fn decoded_edges_are_canonical() -> Result<()> {
    let h = harness(GraphOptions::default().lazy_loading(true));
    let writer = Graph::open(
        h.store.clone(),
        h.elements.clone(),
        h.catalog.clone(),
        GraphOptions::default(),
    );
    writer.add_edge(edge(1, "knows", A, B, Some(2020)))?;
    let a = h.graph.vertex(A);
    let b = h.graph.vertex(B);

    let from_a: Vec<Edge> = h.graph.edges(&a, Direction::Out, &[])?.collect::<Result<_>>()?;
    let from_b: Vec<Edge> = h.graph.edges(&b, Direction::In, &[])?.collect::<Result<_>>()?;
    assert_eq!(from_a, from_b);
    assert_eq!(from_a[0].label().as_deref(), Some("knows"));
    assert!(!from_a[0].is_loaded());

    h.graph.hydrate_edge(&from_b[0])?;
    assert!(from_a[0].is_loaded());
    assert_eq!(from_a[0].property("since"), Some(PropValue::Int(2020)));
    Ok(())
}

fn lazy_reader_over(writer: &Harness) -> Graph {
    Graph::open(
        writer.store.clone(),
        writer.elements.clone(),
        writer.catalog.clone(),
        GraphOptions::default().lazy_loading(true),
    )
}

#[test]
fn lazy_edges_load_properties_on_first_read() -> Result<()> {
    let h = harness(GraphOptions::default());
    h.graph.add_edge(edge(1, "knows", A, B, Some(2020)))?;
    let reader = lazy_reader_over(&h);
    let a = reader.vertex(A);

    let edges: Vec<Edge> = reader.edges(&a, Direction::Out, &[])?.collect::<Result<_>>()?;
    assert!(!edges[0].is_loaded());
    assert_eq!(edges[0].property("since"), Some(PropValue::Int(2020)));
    assert!(edges[0].is_loaded());
    assert_eq!(edges[0].properties().len(), 1);
    Ok(())
}

#[test]
fn deleting_a_lazily_read_edge_drops_its_secondary_rows() -> Result<()> {
    let h = harness(GraphOptions::default());
    h.catalog.declare(IndexKey::edge("knows", "since"));
    h.graph.add_edge(edge(1, "knows", A, B, Some(2020)))?;
    assert_eq!(h.store.len(), 4);

    let reader = lazy_reader_over(&h);
    let a = reader.vertex(A);
    let e1 = reader
        .edges(&a, Direction::Out, &[])?
        .next()
        .transpose()?
        .expect("decoded edge");
    assert!(!e1.is_loaded());

    reader.delete_edge_endpoints(&e1)?;
    assert!(h.store.is_empty());
    let hits = reader.edges_by_value(&a, Direction::Out, "knows", "since", &PropValue::Int(2020))?;
    assert!(collect(hits)?.is_empty());
    Ok(())
}

#[test]
fn write_during_open_scan_is_not_cached_stale() -> Result<()> {
    let h = harness(GraphOptions::default());
    h.graph.add_edge(edge(1, "knows", A, B, None))?;
    h.graph.add_edge(edge(2, "knows", A, C, None))?;
    let a = h.graph.vertex(A);

    let mut open = h.graph.edges(&a, Direction::Out, &[])?;
    assert!(open.next().transpose()?.is_some());
    h.graph.add_edge(edge(3, "knows", A, B, None))?;
    for e in open {
        e?;
    }
    assert_eq!(a.cached_queries(), 0);

    let mut ids = collect(h.graph.edges(&a, Direction::Out, &[])?)?;
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3]);
    Ok(())
}

#[test]
fn vertices_project_opposite_endpoints() -> Result<()> {
    let h = harness(GraphOptions::default());
    h.graph.add_edge(edge(1, "knows", A, B, None))?;
    h.graph.add_edge(edge(2, "knows", C, A, None))?;
    let a = h.graph.vertex(A);

    let mut ends: Vec<u64> = h
        .graph
        .vertices(&a, Direction::Both, &["knows"])?
        .map(|v| v.map(|v| v.id().0))
        .collect::<Result<_>>()?;
    ends.sort_unstable();
    assert_eq!(ends, vec![2, 3]);
    Ok(())
}

fn run_range(graph: &Graph, lo: i64, hi: i64) -> Result<BTreeSet<u64>> {
    let a = graph.vertex(A);
    let iter = graph.edges_in_range(
        &a,
        Direction::Both,
        "knows",
        "since",
        &PropValue::Int(lo),
        &PropValue::Int(hi),
    )?;
    Ok(collect(iter)?.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn index_selection_does_not_change_results(
        edges in proptest::collection::vec((0u8..4, -5i64..40, any::<bool>()), 0..16),
        lo in -10i64..45,
        span in 0i64..30,
    ) {
        let hi = lo + span;
        let plain = harness(GraphOptions::default());
        let indexed = harness(GraphOptions::default());
        indexed.catalog.declare(IndexKey::edge("knows", "since"));

        let mut expected = BTreeSet::new();
        for (i, (target, since, outgoing)) in edges.iter().enumerate() {
            let id = i as u64 + 1;
            let other = [A, B, C, VertexId(1)][*target as usize];
            let (out, inn) = if *outgoing { (A, other) } else { (other, A) };
            let label = if id % 5 == 0 { "likes" } else { "knows" };
            let record = edge(id, label, out, inn, Some(*since));
            if label == "knows" && (lo..hi).contains(since) {
                expected.insert(id);
            }
            plain.graph.add_edge(record.clone()).map_err(|e| TestCaseError::fail(e.to_string()))?;
            indexed.graph.add_edge(record).map_err(|e| TestCaseError::fail(e.to_string()))?;
        }

        let via_fallback = run_range(&plain.graph, lo, hi).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let via_index = run_range(&indexed.graph, lo, hi).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(&via_fallback, &expected);
        prop_assert_eq!(&via_index, &expected);
        prop_assert_eq!(indexed.metrics.scans_fallback.load(Ordering::Relaxed), 0);
    }
}
