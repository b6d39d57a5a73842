use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::trace;

use crate::types::{GraphError, Result};

use super::{Mutation, OrderedStore, Row, RowStream, ScanSpec};

const SCAN_BATCH: usize = 128;

#[derive(Clone, Debug)]
struct Cell {
    value: Vec<u8>,
    ts: u64,
}

/// In-memory ordered store backed by a `BTreeMap`.
///
/// Scans read in batches and drop the lock between batches, so a long scan
/// observes writes committed after it started, like a real region scanner.
/// Failure switches let tests exercise the error paths of the layer above.
#[derive(Default)]
pub struct MemStore {
    rows: RwLock<BTreeMap<Vec<u8>, Cell>>,
    clock: AtomicU64,
    scans: AtomicU64,
    fail_scans: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MemStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of scans started so far.
    pub fn scan_count(&self) -> u64 {
        self.scans.load(Ordering::Relaxed)
    }

    /// Number of rows currently stored.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Returns true when the store holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Snapshot of every row in key order.
    pub fn rows(&self) -> Vec<Row> {
        self.rows
            .read()
            .iter()
            .map(|(key, cell)| Row {
                key: key.clone(),
                value: cell.value.clone(),
                ts: cell.ts,
            })
            .collect()
    }

    /// Makes subsequent scans fail with a store error.
    pub fn fail_scans(&self, fail: bool) {
        self.fail_scans.store(fail, Ordering::Relaxed);
    }

    /// Makes subsequent batches containing deletes fail with a store error.
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::Relaxed);
    }

    fn next_ts(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn injected(what: &str) -> GraphError {
        GraphError::store(io::Error::other(format!("injected {what} failure")))
    }
}

impl OrderedStore for MemStore {
    fn scan(&self, spec: &ScanSpec) -> Result<RowStream<'_>> {
        if self.fail_scans.load(Ordering::Relaxed) {
            return Err(Self::injected("scan"));
        }
        self.scans.fetch_add(1, Ordering::Relaxed);
        let empty = matches!(&spec.stop, Some(stop) if stop <= &spec.start);
        Ok(Box::new(MemScan {
            store: self,
            spec: spec.clone(),
            lower: Bound::Included(spec.start.clone()),
            buffer: VecDeque::new(),
            done: empty,
        }))
    }

    fn get(&self, key: &[u8]) -> Result<Option<Row>> {
        Ok(self.rows.read().get(key).map(|cell| Row {
            key: key.to_vec(),
            value: cell.value.clone(),
            ts: cell.ts,
        }))
    }

    fn apply(&self, mutations: Vec<Mutation>) -> Result<()> {
        let fail_deletes = self.fail_deletes.load(Ordering::Relaxed);
        let ts = self.next_ts();
        for mutation in mutations {
            match mutation {
                Mutation::Put { key, value } => {
                    trace!(ts, len = key.len(), "mem_store.put");
                    self.rows.write().insert(key, Cell { value, ts });
                }
                Mutation::Delete { key, up_to } => {
                    if fail_deletes {
                        return Err(Self::injected("delete"));
                    }
                    let mut rows = self.rows.write();
                    let remove = match (rows.get(&key), up_to) {
                        (Some(cell), Some(bound)) => cell.ts <= bound,
                        (Some(_), None) => true,
                        (None, _) => false,
                    };
                    if remove {
                        rows.remove(&key);
                    }
                    trace!(removed = remove, ?up_to, "mem_store.delete");
                }
            }
        }
        Ok(())
    }
}

struct MemScan<'a> {
    store: &'a MemStore,
    spec: ScanSpec,
    lower: Bound<Vec<u8>>,
    buffer: VecDeque<Row>,
    done: bool,
}

impl MemScan<'_> {
    fn fill(&mut self) {
        let rows = self.store.rows.read();
        let upper = match &self.spec.stop {
            Some(stop) => Bound::Excluded(stop.clone()),
            None => Bound::Unbounded,
        };
        let mut examined = 0usize;
        let mut last = None;
        for (key, cell) in rows.range((self.lower.clone(), upper)) {
            examined += 1;
            last = Some(key.clone());
            if self.spec.filter.as_ref().map_or(true, |f| f.matches(key)) {
                self.buffer.push_back(Row {
                    key: key.clone(),
                    value: cell.value.clone(),
                    ts: cell.ts,
                });
            }
            if examined >= SCAN_BATCH {
                break;
            }
        }
        match last {
            Some(key) if examined >= SCAN_BATCH => self.lower = Bound::Excluded(key),
            _ => self.done = true,
        }
    }
}

impl Iterator for MemScan<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.buffer.pop_front() {
                return Some(Ok(row));
            }
            if self.done {
                return None;
            }
            self.fill();
        }
    }
}
