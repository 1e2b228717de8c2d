//! Batch mutator — chunked alarm deletion under the per-call name limit.

use tracing::debug;

use instalarm_core::config::MAX_DELETE_BATCH;
use instalarm_core::{AlarmError, AlarmResult};

use crate::backend::AlarmBackend;

/// Deletes alarms in chunks of at most `max_names` names per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchDeleter {
    max_names: usize,
}

impl Default for BatchDeleter {
    fn default() -> Self {
        Self {
            max_names: MAX_DELETE_BATCH,
        }
    }
}

impl BatchDeleter {
    pub fn new(max_names: usize) -> AlarmResult<Self> {
        if max_names == 0 || max_names > MAX_DELETE_BATCH {
            return Err(AlarmError::invalid(format!(
                "delete batch size must be in 1..={MAX_DELETE_BATCH}, got {max_names}"
            )));
        }
        Ok(Self { max_names })
    }

    pub fn max_names(&self) -> usize {
        self.max_names
    }

    /// Delete every name, one call per chunk, in input order.
    ///
    /// The first failing chunk aborts the whole operation; earlier chunks
    /// stay deleted. Returns the number of calls made.
    pub async fn delete(&self, backend: &dyn AlarmBackend, names: &[String]) -> AlarmResult<usize> {
        let mut calls = 0;
        for chunk in names.chunks(self.max_names) {
            debug!(size = chunk.len(), call = calls + 1, "deleting alarm batch");
            backend.delete_alarms(chunk).await?;
            calls += 1;
        }
        Ok(calls)
    }
}
