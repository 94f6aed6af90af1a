//! JSON-lines file store.
//!
//! # File Format
//!
//! One [`PersistedClusterRecord`] per line, serialized as JSON:
//!
//! ```text
//! {"cell":{"x":229,"y":406},"params":{"eps":0.00025,"minPoints":2,"gridSize":0.1},"clusters":[...],"createdAt":"2026-01-01T00:00:00Z"}
//! ```
//!
//! The file is only ever appended to. On open the whole file is read back
//! into an in-memory index; lines that fail to parse (for example a torn
//! final write after a crash) are skipped with a warning. A torn line, left
//! by a crash or by a failed append, is terminated before the next record is
//! written so that record is not lost with it.
//!
//! Floats are written in shortest round-trip form and parsed with
//! `serde_json`'s `float_roundtrip`, so eps, grid size and centroids read back
//! bit-identical and records keep their cell key across restarts.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::traits::{ClusterStore, StoreError};
use crate::cache::BoxFuture;
use crate::cluster::{CellKey, ClusterQueryParams, PersistedClusterRecord};
use crate::coord::GridCell;

/// Append-only store backed by a JSON-lines file.
pub struct FileClusterStore {
    path: PathBuf,
    index: RwLock<HashMap<String, Vec<PersistedClusterRecord>>>,
    writer: Mutex<AppendLog>,
}

/// The open file plus whether it currently ends mid-line.
struct AppendLog {
    file: File,
    needs_newline: bool,
}

impl FileClusterStore {
    /// Opens (or creates) a store file and loads its records.
    ///
    /// Parent directories are created as needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let (index, torn_tail) = if fs::try_exists(&path).await? {
            load_index(&path).await?
        } else {
            (HashMap::new(), false)
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        let loaded: usize = index.values().map(Vec::len).sum();
        info!(path = %path.display(), records = loaded, "Cluster store opened");

        Ok(Self {
            path,
            index: RwLock::new(index),
            writer: Mutex::new(AppendLog {
                file,
                needs_newline: torn_tail,
            }),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Appends one newline-terminated line, first terminating any torn line.
///
/// `needs_newline` stays raised until `line` is fully written and flushed.
async fn append_line<W>(writer: &mut W, needs_newline: &mut bool, line: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    if *needs_newline {
        writer.write_all(b"\n").await?;
    }
    *needs_newline = true;
    writer.write_all(line).await?;
    writer.flush().await?;
    *needs_newline = false;
    Ok(())
}

/// Reads every parseable record and reports whether the file ends mid-line.
async fn load_index(
    path: &Path,
) -> Result<(HashMap<String, Vec<PersistedClusterRecord>>, bool), StoreError> {
    let contents = fs::read_to_string(path).await?;
    let mut index: HashMap<String, Vec<PersistedClusterRecord>> = HashMap::new();

    for (line_no, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<PersistedClusterRecord>(line) {
            Ok(record) => index.entry(record.key().to_key()).or_default().push(record),
            Err(e) => {
                warn!(path = %path.display(), line = line_no + 1, error = %e, "Skipping corrupt store record");
            }
        }
    }

    let torn_tail = !contents.is_empty() && !contents.ends_with('\n');
    Ok((index, torn_tail))
}

impl ClusterStore for FileClusterStore {
    fn query(
        &self,
        cell: GridCell,
        params: ClusterQueryParams,
    ) -> BoxFuture<'_, Result<Vec<PersistedClusterRecord>, StoreError>> {
        let key = CellKey::new(cell, params).to_key();
        let found = self.index.read().get(&key).cloned().unwrap_or_default();
        Box::pin(async move { Ok(found) })
    }

    fn insert(&self, record: PersistedClusterRecord) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            let mut line = serde_json::to_string(&record)?;
            line.push('\n');

            // Index only after the line is durable so readers never see a
            // record the file does not hold
            {
                let mut log = self.writer.lock().await;
                let AppendLog {
                    file,
                    needs_newline,
                } = &mut *log;
                append_line(file, needs_newline, line.as_bytes()).await?;
            }

            self.index
                .write()
                .entry(record.key().to_key())
                .or_default()
                .push(record);
            Ok(())
        })
    }

    fn record_count(&self) -> usize {
        self.index.read().values().map(Vec::len).sum()
    }

    fn flush(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            let log = self.writer.lock().await;
            log.file.sync_all().await?;
            Ok(())
        })
    }
}
