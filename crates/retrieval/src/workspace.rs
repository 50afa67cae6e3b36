use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
    pub kind: EntryKind,
}

/// A workspace-wide file search.
///
/// Patterns are globs relative to the workspace root where `*` stops at `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileQuery {
    pub include: String,
    pub exclude: Vec<String>,
    pub max_results: usize,
}

impl FileQuery {
    pub fn new(include: impl Into<String>, max_results: usize) -> Self {
        Self {
            include: include.into(),
            exclude: Vec::new(),
            max_results,
        }
    }

    #[must_use]
    pub fn excluding(mut self, patterns: impl IntoIterator<Item = String>) -> Self {
        self.exclude.extend(patterns);
        self
    }
}

/// Editor/workspace capabilities consumed by the scanner.
///
/// Implementations must honour `cancel` in [`Workspace::find_files`] by
/// returning early; callers apply their own deadline on top.
#[async_trait]
pub trait Workspace: Send + Sync {
    async fn read_file(&self, uri: &Path) -> Result<Vec<u8>>;

    async fn stat_file(&self, uri: &Path) -> Result<FileStat>;

    /// Entries in listing order.
    async fn list_directory(&self, uri: &Path) -> Result<Vec<DirEntry>>;

    async fn find_files(&self, query: &FileQuery, cancel: CancellationToken)
        -> Result<Vec<PathBuf>>;

    /// Text of a document, including unsaved editor state where there is one.
    async fn open_document(&self, uri: &Path) -> Result<String>;

    /// Documents currently open in the editor, most recent first.
    async fn open_documents(&self) -> Vec<PathBuf>;

    /// Workspace-relative display path with `/` separators.
    fn relative_path(&self, uri: &Path) -> String;

    fn repo_name(&self, _uri: &Path) -> Option<String> {
        None
    }
}
