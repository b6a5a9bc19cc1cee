use crate::error::StorageResult;
use async_trait::async_trait;
use rdee_types::Trace;

/// Sink for finalized traces.
///
/// Implementations must be safe to share between workers; the batch runner
/// calls `persist` from many tasks.
#[async_trait]
pub trait TraceArchive: Send + Sync {
    /// Store one finalized trace. Fails if a trace with the same id exists.
    async fn persist(&self, trace: &Trace) -> StorageResult<()>;

    /// Number of traces stored so far.
    async fn count(&self) -> StorageResult<usize>;
}
