use crate::config::AssemblerConfig;
use crate::workspace::{EntryKind, FileQuery, Workspace};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Failure-tolerant access to workspace files.
///
/// Every method degrades to "nothing found": read, decode and stat failures
/// skip the file, searches that fail or miss their deadline return no hits.
#[derive(Clone)]
pub struct FileScanner {
    workspace: Arc<dyn Workspace>,
    max_file_bytes: u64,
    search_timeout: Duration,
}

impl FileScanner {
    pub fn new(workspace: Arc<dyn Workspace>, config: &AssemblerConfig) -> Self {
        Self {
            workspace,
            max_file_bytes: config.max_file_bytes,
            search_timeout: config.search_timeout(),
        }
    }

    pub fn workspace(&self) -> &Arc<dyn Workspace> {
        &self.workspace
    }

    /// Visible regular files directly inside `dir`, in listing order.
    pub async fn list_files(&self, dir: &Path) -> Vec<PathBuf> {
        let entries = match self.workspace.list_directory(dir).await {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Failed to list {}: {e}", dir.display());
                return Vec::new();
            }
        };
        entries
            .into_iter()
            .filter(|entry| !entry.is_hidden() && entry.kind == EntryKind::File)
            .map(|entry| dir.join(entry.name))
            .collect()
    }

    /// Decoded text of `uri`, or `None` when empty, over the size cap or unreadable.
    pub async fn read_text(&self, uri: &Path) -> Option<String> {
        let stat = match self.workspace.stat_file(uri).await {
            Ok(stat) => stat,
            Err(e) => {
                log::warn!("Failed to stat {}: {e}", uri.display());
                return None;
            }
        };
        if stat.size == 0 || stat.size > self.max_file_bytes {
            log::debug!(
                "Skipping {} ({} bytes, cap {})",
                uri.display(),
                stat.size,
                self.max_file_bytes
            );
            return None;
        }
        let bytes = match self.workspace.read_file(uri).await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("Failed to read {}: {e}", uri.display());
                return None;
            }
        };
        match String::from_utf8(bytes) {
            Ok(text) => Some(text),
            Err(e) => {
                log::warn!("Failed to decode {}: {e}", uri.display());
                None
            }
        }
    }

    /// [`Self::read_text`] for many files at once; results line up with `uris`.
    pub async fn read_texts(&self, uris: &[PathBuf]) -> Vec<Option<String>> {
        let mut results = vec![None; uris.len()];
        let mut reads = JoinSet::new();
        for (idx, uri) in uris.iter().cloned().enumerate() {
            let scanner = self.clone();
            reads.spawn(async move { (idx, scanner.read_text(&uri).await) });
        }
        while let Some(joined) = reads.join_next().await {
            match joined {
                Ok((idx, text)) => results[idx] = text,
                Err(e) => log::warn!("File read task failed: {e}"),
            }
        }
        results
    }

    /// Editor text of an open document, or `None` when it cannot be read.
    pub async fn read_open_document(&self, uri: &Path) -> Option<String> {
        match self.workspace.open_document(uri).await {
            Ok(text) => Some(text),
            Err(e) => {
                log::warn!("Failed to open {}: {e}", uri.display());
                None
            }
        }
    }

    /// Run `query` under the search deadline; errors and timeouts yield `[]`.
    pub async fn find_files(&self, query: &FileQuery) -> Vec<PathBuf> {
        let cancel = CancellationToken::new();
        let search = self.workspace.find_files(query, cancel.clone());
        match tokio::time::timeout(self.search_timeout, search).await {
            Ok(Ok(mut hits)) => {
                hits.truncate(query.max_results);
                hits
            }
            Ok(Err(e)) => {
                log::warn!("File search {} failed: {e}", query.include);
                Vec::new()
            }
            Err(_) => {
                cancel.cancel();
                log::warn!(
                    "File search {} timed out after {:?}",
                    query.include,
                    self.search_timeout
                );
                Vec::new()
            }
        }
    }
}
