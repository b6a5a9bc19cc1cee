use crate::archive::TraceArchive;
use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use rdee_types::{Trace, TraceId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// In-memory trace archive for tests and embedding.
///
/// Keeps persist order, so traces of one tree come back in DFS order.
#[derive(Clone, Default)]
pub struct InMemoryTraceArchive {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    traces: Vec<Trace>,
    index: HashMap<TraceId, usize>,
}

impl InMemoryTraceArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored traces in persist order.
    pub fn traces(&self) -> StorageResult<Vec<Trace>> {
        let inner = self
            .inner
            .read()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;
        Ok(inner.traces.clone())
    }

    pub fn get(&self, id: &TraceId) -> StorageResult<Option<Trace>> {
        let inner = self
            .inner
            .read()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;
        Ok(inner.index.get(id).map(|&i| inner.traces[i].clone()))
    }

    /// Traces of one recursion tree, in persist order.
    pub fn by_root(&self, root_seed: u64) -> StorageResult<Vec<Trace>> {
        let inner = self
            .inner
            .read()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;
        Ok(inner
            .traces
            .iter()
            .filter(|t| t.root_seed == root_seed)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TraceArchive for InMemoryTraceArchive {
    async fn persist(&self, trace: &Trace) -> StorageResult<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;
        if inner.index.contains_key(&trace.trace_id) {
            return Err(StorageError::AlreadyExists(trace.trace_id.clone()));
        }
        let position = inner.traces.len();
        inner.index.insert(trace.trace_id.clone(), position);
        inner.traces.push(trace.clone());
        Ok(())
    }

    async fn count(&self) -> StorageResult<usize> {
        let inner = self
            .inner
            .read()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;
        Ok(inner.traces.len())
    }
}
