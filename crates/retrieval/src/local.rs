use crate::error::{Result, RetrievalError};
use crate::workspace::{DirEntry, EntryKind, FileQuery, FileStat, Workspace};
use async_trait::async_trait;
use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::fs::FileType;
use std::path::{Component, Path, PathBuf};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// [`Workspace`] backed by the local filesystem.
///
/// Searches walk the tree `.gitignore`-aware, skip hidden entries and prune
/// tool/vendor directories.
pub struct LocalWorkspace {
    root: PathBuf,
    repo_name: Option<String>,
    open: RwLock<Vec<PathBuf>>,
}

impl LocalWorkspace {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            repo_name: None,
            open: RwLock::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_repo_name(mut self, repo_name: impl Into<String>) -> Self {
        self.repo_name = Some(repo_name.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Record `uri` as open in the editor (moves it to the front).
    pub async fn open(&self, uri: impl AsRef<Path>) {
        let uri = self.resolve(uri.as_ref());
        let mut open = self.open.write().await;
        open.retain(|existing| existing != &uri);
        open.insert(0, uri);
    }

    pub async fn close(&self, uri: impl AsRef<Path>) {
        let uri = self.resolve(uri.as_ref());
        self.open.write().await.retain(|existing| existing != &uri);
    }

    fn resolve(&self, uri: &Path) -> PathBuf {
        if uri.is_absolute() {
            uri.to_path_buf()
        } else {
            self.root.join(uri)
        }
    }

    fn is_ignored_scope(path: &Path, root: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(root) else {
            return false;
        };
        relative.components().any(|component| {
            let Component::Normal(name) = component else {
                return false;
            };
            let lowered = name.to_string_lossy().to_lowercase();
            IGNORED_SCOPES.iter().any(|ignored| ignored == &lowered)
        })
    }

    fn walk(
        root: &Path,
        include: &GlobMatcher,
        exclude: &GlobSet,
        max_results: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        if max_results == 0 {
            return Ok(files);
        }

        let scope_root = root.to_path_buf();
        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .sort_by_file_name(|a, b| a.cmp(b));
        builder.filter_entry(move |entry| !Self::is_ignored_scope(entry.path(), &scope_root));

        for result in builder.build() {
            if cancel.is_cancelled() {
                log::debug!("find_files cancelled after {} hits", files.len());
                return Err(RetrievalError::SearchCancelled);
            }
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Failed to read entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            if !include.is_match(relative) || exclude.is_match(relative) {
                continue;
            }
            files.push(entry.path().to_path_buf());
            if files.len() >= max_results {
                break;
            }
        }
        Ok(files)
    }
}

fn compile_glob(pattern: &str) -> Result<GlobMatcher> {
    Ok(GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()?
        .compile_matcher())
}

fn compile_glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(GlobBuilder::new(pattern).literal_separator(true).build()?);
    }
    Ok(builder.build()?)
}

fn entry_kind(file_type: FileType) -> EntryKind {
    if file_type.is_file() {
        EntryKind::File
    } else if file_type.is_dir() {
        EntryKind::Directory
    } else if file_type.is_symlink() {
        EntryKind::Symlink
    } else {
        EntryKind::Other
    }
}

#[async_trait]
impl Workspace for LocalWorkspace {
    async fn read_file(&self, uri: &Path) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(self.resolve(uri)).await?)
    }

    async fn stat_file(&self, uri: &Path) -> Result<FileStat> {
        let meta = tokio::fs::metadata(self.resolve(uri)).await?;
        Ok(FileStat {
            size: meta.len(),
            kind: entry_kind(meta.file_type()),
        })
    }

    async fn list_directory(&self, uri: &Path) -> Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(self.resolve(uri)).await?;
        while let Some(entry) = dir.next_entry().await? {
            let kind = match entry.file_type().await {
                Ok(file_type) => entry_kind(file_type),
                Err(e) => {
                    log::debug!("Failed to stat {}: {e}", entry.path().display());
                    EntryKind::Other
                }
            };
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind,
            });
        }
        Ok(entries)
    }

    async fn find_files(
        &self,
        query: &FileQuery,
        cancel: CancellationToken,
    ) -> Result<Vec<PathBuf>> {
        let include = compile_glob(&query.include)?;
        let exclude = compile_glob_set(&query.exclude)?;
        let root = self.root.clone();
        let max_results = query.max_results;
        tokio::task::spawn_blocking(move || {
            Self::walk(&root, &include, &exclude, max_results, &cancel)
        })
        .await
        .map_err(|e| RetrievalError::Other(format!("find_files task failed: {e}")))?
    }

    async fn open_document(&self, uri: &Path) -> Result<String> {
        Ok(tokio::fs::read_to_string(self.resolve(uri)).await?)
    }

    async fn open_documents(&self) -> Vec<PathBuf> {
        self.open.read().await.clone()
    }

    fn relative_path(&self, uri: &Path) -> String {
        let path = uri.strip_prefix(&self.root).unwrap_or(uri);
        path.to_string_lossy().replace('\\', "/")
    }

    fn repo_name(&self, uri: &Path) -> Option<String> {
        if uri.is_relative() || uri.starts_with(&self.root) {
            self.repo_name.clone()
        } else {
            None
        }
    }
}

const IGNORED_SCOPES: &[&str] = &[
    // VCS / tooling
    ".git",
    ".hg",
    ".svn",
    ".idea",
    ".vscode",
    // caches / builds
    ".cache",
    "node_modules",
    ".next",
    ".turbo",
    "dist",
    "coverage",
    "target",
    ".venv",
    "__pycache__",
    // vendored dependencies
    "vendor",
    "third_party",
    "third-party",
];

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[tokio::test]
    async fn find_files_matches_relative_globs_and_skips_vendor() {
        let temp = tempdir().unwrap();
        write(temp.path(), "src/parser_test.rs", "#[test] fn t() {}");
        write(temp.path(), "src/parser.rs", "fn p() {}");
        write(temp.path(), "vendor/dep/dep_test.rs", "");
        write(temp.path(), "node_modules/pkg/a_test.rs", "");

        let workspace = LocalWorkspace::new(temp.path());
        let hits = workspace
            .find_files(&FileQuery::new("**/*test*.rs", 10), CancellationToken::new())
            .await
            .unwrap();
        let rel: Vec<String> = hits.iter().map(|p| workspace.relative_path(p)).collect();
        assert_eq!(rel, vec!["src/parser_test.rs".to_string()]);
    }

    #[tokio::test]
    async fn find_files_applies_exclude_and_max_results() {
        let temp = tempdir().unwrap();
        write(temp.path(), "a/one_test.rs", "");
        write(temp.path(), "b/two_test.rs", "");
        write(temp.path(), "e2e/three_test.rs", "");

        let workspace = LocalWorkspace::new(temp.path());
        let query = FileQuery::new("**/*_test.rs", 10).excluding(["**/e2e/**".to_string()]);
        let hits = workspace
            .find_files(&query, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|p| !p.to_string_lossy().contains("e2e")));

        let capped = workspace
            .find_files(&FileQuery::new("**/*_test.rs", 1), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(capped.len(), 1);
    }

    #[tokio::test]
    async fn cancelled_search_reports_cancellation() {
        let temp = tempdir().unwrap();
        write(temp.path(), "a_test.rs", "");
        let workspace = LocalWorkspace::new(temp.path());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = workspace
            .find_files(&FileQuery::new("**/*.rs", 10), cancel)
            .await;
        assert!(matches!(result, Err(RetrievalError::SearchCancelled)));
    }

    #[tokio::test]
    async fn lists_directory_entries_with_kinds() {
        let temp = tempdir().unwrap();
        write(temp.path(), "lib.rs", "");
        fs::create_dir_all(temp.path().join("nested")).unwrap();

        let workspace = LocalWorkspace::new(temp.path());
        let mut entries = workspace.list_directory(Path::new("")).await.unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(
            entries,
            vec![DirEntry::file("lib.rs"), DirEntry::directory("nested")]
        );
    }

    #[tokio::test]
    async fn tracks_open_documents_most_recent_first() {
        let temp = tempdir().unwrap();
        let workspace = LocalWorkspace::new(temp.path());
        workspace.open("a.rs").await;
        workspace.open("b.rs").await;
        workspace.open("a.rs").await;
        assert_eq!(
            workspace.open_documents().await,
            vec![temp.path().join("a.rs"), temp.path().join("b.rs")]
        );
        workspace.close("a.rs").await;
        assert_eq!(workspace.open_documents().await, vec![temp.path().join("b.rs")]);
    }
}
