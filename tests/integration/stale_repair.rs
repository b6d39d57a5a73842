#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use edgeidx::storage::adjacency::{EdgeRowKey, RowValue};
use edgeidx::storage::{
    CounterMetrics, EdgeRecord, ElementStore, Graph, GraphOptions, IndexCatalog, IndexKey,
    MemElementStore, MemStore, Mutation, OrderedStore, PropValue, CREATED_AT,
};
use edgeidx::types::{Direction, EdgeId, GraphError, Result, VertexId};

const A: VertexId = VertexId(10);
const B: VertexId = VertexId(20);
const C: VertexId = VertexId(30);

struct Setup {
    store: Arc<MemStore>,
    elements: Arc<MemElementStore>,
    catalog: Arc<IndexCatalog>,
    metrics: Arc<CounterMetrics>,
    graph: Graph,
}

fn setup() -> Setup {
    setup_with(GraphOptions::default())
}

fn setup_with(opts: GraphOptions) -> Setup {
    let store = Arc::new(MemStore::new());
    let elements = Arc::new(MemElementStore::new());
    for v in [A, B, C] {
        elements.add_vertex(v);
    }
    let catalog = Arc::new(IndexCatalog::new());
    let metrics = Arc::new(CounterMetrics::default());
    let graph = Graph::open(
        store.clone(),
        elements.clone(),
        catalog.clone(),
        opts,
    )
    .with_metrics(metrics.clone());
    Setup {
        store,
        elements,
        catalog,
        metrics,
        graph,
    }
}

fn knows(id: u64, out: VertexId, inn: VertexId, since: i64) -> EdgeRecord {
    EdgeRecord {
        id: EdgeId(id),
        label: "knows".to_owned(),
        out_vertex: out,
        in_vertex: inn,
        created_at: 500 + id as i64,
        props: BTreeMap::from([("since".to_owned(), PropValue::Int(since))]),
    }
}

fn keys_of(store: &MemStore) -> Vec<EdgeRowKey> {
    store
        .rows()
        .iter()
        .filter_map(|row| EdgeRowKey::decode(&row.key).ok())
        .collect()
}

#[test]
fn orphaned_rows_are_excluded_and_repaired_once() -> Result<()> {
    let s = setup();
    s.graph.add_edge(knows(1, A, B, 2020))?;
    s.graph.add_edge(knows(2, A, C, 2021))?;
    assert!(s.elements.delete_edge(EdgeId(1))?);

    let a = s.graph.vertex(A);
    let got: Vec<u64> = s
        .graph
        .edges(&a, Direction::Out, &["knows"])?
        .map(|e| e.map(|e| e.id().0))
        .collect::<Result<_>>()?;
    assert_eq!(got, vec![2]);
    assert_eq!(s.metrics.stale_detected.load(Ordering::Relaxed), 1);
    assert_eq!(s.metrics.repairs_issued.load(Ordering::Relaxed), 1);

    let left = keys_of(&s.store);
    assert!(left.iter().all(|row| row.edge == EdgeId(2)), "{left:?}");
    assert!(s.graph.identity().edge(EdgeId(1)).is_none());

    let again: Vec<u64> = s
        .graph
        .edges(&a, Direction::Out, &["knows"])?
        .map(|e| e.map(|e| e.id().0))
        .collect::<Result<_>>()?;
    assert_eq!(again, vec![2]);
    assert_eq!(s.metrics.repairs_issued.load(Ordering::Relaxed), 1);
    Ok(())
}

#[test]
fn leftover_secondary_row_is_repaired_on_value_query() -> Result<()> {
    let s = setup();
    s.catalog.declare(IndexKey::edge("knows", "since"));
    s.graph.add_edge(knows(1, A, B, 2020))?;

    // Crash after the primary rows and the record were removed.
    let primaries: Vec<_> = keys_of(&s.store)
        .into_iter()
        .filter(|row| row.key == CREATED_AT)
        .map(|row| row.encode().map(|key| Mutation::Delete { key, up_to: None }))
        .collect::<Result<_>>()?;
    s.store.apply(primaries)?;
    s.elements.delete_edge(EdgeId(1))?;
    assert_eq!(s.store.len(), 2);

    let a = s.graph.vertex(A);
    let hits = s
        .graph
        .edges_by_value(&a, Direction::Out, "knows", "since", &PropValue::Int(2020))?
        .count();
    assert_eq!(hits, 0);
    assert_eq!(s.metrics.repairs_issued.load(Ordering::Relaxed), 1);
    assert!(s.store.is_empty());
    Ok(())
}

#[test]
fn repair_targets_the_row_read_not_the_known_value() -> Result<()> {
    let s = setup_with(GraphOptions::default().lazy_loading(true));
    s.catalog.declare(IndexKey::edge("knows", "since"));
    let writer = Graph::open(
        s.store.clone(),
        s.elements.clone(),
        s.catalog.clone(),
        GraphOptions::default(),
    );
    writer.add_edge(knows(1, A, B, 2020))?;

    // Rows left over from an earlier value of `since`.
    let value = RowValue { created_at: 501 }.encode();
    let leftovers = [Direction::Out, Direction::In]
        .into_iter()
        .map(|dir| {
            EdgeRowKey::for_edge(EdgeId(1), "knows", A, B, dir, "since", PropValue::Int(1999))
                .encode()
                .map(|key| Mutation::Put {
                    key,
                    value: value.clone(),
                })
        })
        .collect::<Result<Vec<_>>>()?;
    s.store.apply(leftovers)?;
    assert_eq!(s.store.len(), 6);

    let a = s.graph.vertex(A);
    let current: Vec<_> = s
        .graph
        .edges_by_value(&a, Direction::Out, "knows", "since", &PropValue::Int(2020))?
        .collect::<Result<_>>()?;
    assert_eq!(current.len(), 1);
    s.elements.delete_edge(EdgeId(1))?;

    let old: Vec<_> = s
        .graph
        .edges_by_value(&a, Direction::Out, "knows", "since", &PropValue::Int(1999))?
        .collect::<Result<_>>()?;
    assert_eq!(old, current);
    assert!(old[0].properties().contains_key("since"));

    assert_eq!(s.metrics.repairs_issued.load(Ordering::Relaxed), 1);
    let left = keys_of(&s.store);
    assert_eq!(left.len(), 4, "{left:?}");
    assert!(left.iter().all(|row| row.value != PropValue::Int(1999)));
    Ok(())
}

#[test]
fn deleted_counterpart_vertex_is_skipped() -> Result<()> {
    let s = setup();
    s.graph.add_edge(knows(1, A, B, 2020))?;
    s.graph.add_edge(knows(2, A, C, 2020))?;
    assert!(s.elements.remove_vertex(C));

    let a = s.graph.vertex(A);
    let ends: Vec<u64> = s
        .graph
        .vertices(&a, Direction::Out, &[])?
        .map(|v| v.map(|v| v.id().0))
        .collect::<Result<_>>()?;
    assert_eq!(ends, vec![B.0]);
    assert_eq!(s.metrics.stale_detected.load(Ordering::Relaxed), 1);
    assert!(keys_of(&s.store).iter().all(|row| row.edge == EdgeId(1)));
    Ok(())
}

#[test]
fn failed_repair_does_not_fail_the_query() -> Result<()> {
    let s = setup();
    s.graph.add_edge(knows(1, A, B, 2020))?;
    s.elements.delete_edge(EdgeId(1))?;
    s.store.fail_deletes(true);

    let a = s.graph.vertex(A);
    assert_eq!(s.graph.edges(&a, Direction::Out, &[])?.count(), 0);
    assert_eq!(s.metrics.repairs_failed.load(Ordering::Relaxed), 1);
    assert_eq!(s.store.len(), 2);

    s.store.fail_deletes(false);
    assert_eq!(s.graph.edges(&a, Direction::Out, &["knows"])?.count(), 0);
    assert!(s.store.is_empty());
    Ok(())
}

#[test]
fn store_errors_reach_the_caller() -> Result<()> {
    let s = setup();
    s.graph.add_edge(knows(1, A, B, 2020))?;
    s.store.fail_scans(true);

    let a = s.graph.vertex(A);
    let err = s.graph.edges(&a, Direction::Out, &[]).err();
    assert!(matches!(err, Some(GraphError::Store(_))), "{err:?}");
    assert_eq!(a.cached_queries(), 0);
    assert_eq!(s.metrics.repairs_issued.load(Ordering::Relaxed), 0);
    Ok(())
}
