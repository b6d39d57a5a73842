use tracing::{debug, warn};

use crate::storage::adjacency::EdgeRowKey;
use crate::storage::kv::Mutation;
use crate::types::Result;

use super::edge_ops::StaleRow;
use super::Core;

impl Core {
    /// Removes the rows of a stale index entry, bounded by the timestamp they
    /// were read at so a newer write of the same key survives.
    ///
    /// Cleanup is advisory: failures are logged and counted, never returned.
    pub(super) fn repair(&self, stale: &StaleRow) {
        self.metrics.stale_detected();
        debug!(
            edge = %stale.edge,
            missing = %stale.missing,
            missing_id = stale.missing_id,
            ts = stale.ts,
            "edge_index.stale"
        );
        self.metrics.repair_issued();
        match self.delete_rows(&stale.rows, Some(stale.ts)) {
            Ok(()) => debug!(edge = %stale.edge, rows = stale.rows.len(), "edge_index.repair"),
            Err(err) => {
                self.metrics.repair_failed();
                warn!(edge = %stale.edge, error = %err, "edge_index.repair.failed");
            }
        }
    }

    pub(super) fn delete_rows(&self, rows: &[EdgeRowKey], up_to: Option<u64>) -> Result<()> {
        let mut mutations = Vec::with_capacity(rows.len());
        let mut owners = Vec::with_capacity(rows.len());
        for row in rows {
            mutations.push(Mutation::Delete {
                key: row.encode()?,
                up_to,
            });
            owners.push(row.owner);
        }
        self.store.apply(mutations)?;
        self.invalidate(&owners);
        Ok(())
    }
}
