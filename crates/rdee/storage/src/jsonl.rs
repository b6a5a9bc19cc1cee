use crate::archive::TraceArchive;
use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use rdee_types::{Trace, TraceId};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

/// Append-only archive writing one JSON trace per line.
pub struct JsonLinesArchive {
    path: PathBuf,
    state: Mutex<WriterState>,
}

struct WriterState {
    file: File,
    ids: HashSet<TraceId>,
}

impl JsonLinesArchive {
    /// Create (or truncate) the archive file at `path`.
    pub async fn create(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).await?;
        tracing::debug!(path = %path.display(), "created trace archive");
        Ok(Self {
            path,
            state: Mutex::new(WriterState {
                file,
                ids: HashSet::new(),
            }),
        })
    }

    /// Open an existing archive for appending, indexing the ids already in it.
    pub async fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let ids = Self::load(&path)
            .await?
            .into_iter()
            .map(|t| t.trace_id)
            .collect();
        let file = OpenOptions::new().append(true).open(&path).await?;
        Ok(Self {
            path,
            state: Mutex::new(WriterState { file, ids }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every trace from an archive file, in the order written.
    ///
    /// Blank lines are skipped. A line that does not decode is reported with
    /// its 1-based line number.
    pub async fn load(path: impl AsRef<Path>) -> StorageResult<Vec<Trace>> {
        let file = File::open(path.as_ref()).await?;
        let mut lines = BufReader::new(file).lines();
        let mut traces = Vec::new();
        let mut line_no = 0;
        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let trace: Trace =
                serde_json::from_str(&line).map_err(|e| StorageError::Corrupt {
                    line: line_no,
                    reason: e.to_string(),
                })?;
            traces.push(trace);
        }
        Ok(traces)
    }
}

#[async_trait]
impl TraceArchive for JsonLinesArchive {
    async fn persist(&self, trace: &Trace) -> StorageResult<()> {
        let mut line = serde_json::to_vec(trace)?;
        line.push(b'\n');

        let mut state = self.state.lock().await;
        if state.ids.contains(&trace.trace_id) {
            return Err(StorageError::AlreadyExists(trace.trace_id.clone()));
        }
        state.file.write_all(&line).await?;
        state.file.flush().await?;
        state.ids.insert(trace.trace_id.clone());
        Ok(())
    }

    async fn count(&self) -> StorageResult<usize> {
        Ok(self.state.lock().await.ids.len())
    }
}
