use crate::config::AssemblerConfig;
use crate::scanner::FileScanner;
use crate::test_files::{
    generic_test_search_pattern, is_test_file, is_test_file_for, unit_test_exclude_patterns,
};
use crate::truncate::truncate_text;
use crate::workspace::{FileQuery, Workspace};
use context_protocol::{ContextFile, ContextFragment, ContextSource, IgnoreFilter};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What [`ContextAssembler::assemble`] should gather for a target file
#[derive(Debug, Clone)]
pub struct AssembleRequest {
    pub target: PathBuf,
    pub unit_test_only: bool,
    pub include_directory: bool,
}

impl AssembleRequest {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            unit_test_only: false,
            include_directory: true,
        }
    }

    #[must_use]
    pub fn unit_test_only(mut self, enabled: bool) -> Self {
        self.unit_test_only = enabled;
        self
    }

    #[must_use]
    pub fn include_directory(mut self, enabled: bool) -> Self {
        self.include_directory = enabled;
        self
    }
}

/// Builds ordered, truncated context fragments from a workspace
///
/// Fragment order follows listing/search order; reads run concurrently but
/// are collected positionally.
pub struct ContextAssembler {
    scanner: FileScanner,
    config: AssemblerConfig,
    ignore: Option<Arc<IgnoreFilter>>,
}

impl ContextAssembler {
    pub fn new(workspace: Arc<dyn Workspace>, config: AssemblerConfig) -> Self {
        Self {
            scanner: FileScanner::new(workspace, &config),
            config,
            ignore: None,
        }
    }

    /// Drop ignored files at the source instead of at read time.
    #[must_use]
    pub fn with_ignore_filter(mut self, ignore: Arc<IgnoreFilter>) -> Self {
        self.ignore = Some(ignore);
        self
    }

    /// Fragments for the visible files of `directory`.
    ///
    /// `current_file` is never emitted; a sibling whose stem starts or ends
    /// with its base name ends the scan right after being emitted.
    pub async fn build_directory_context(
        &self,
        directory: &Path,
        current_file: Option<&Path>,
        max_fragments: usize,
    ) -> Vec<ContextFragment> {
        let companion_base = current_file.and_then(base_name);
        let candidates: Vec<PathBuf> = self
            .scanner
            .list_files(directory)
            .await
            .into_iter()
            .filter(|path| current_file.map_or(true, |current| !same_file(path, current)))
            .collect();

        let mut fragments = Vec::new();
        let mut cursor = 0usize;
        while fragments.len() < max_fragments && cursor < candidates.len() {
            let window = (max_fragments - fragments.len()).min(candidates.len() - cursor);
            let batch = &candidates[cursor..cursor + window];
            let texts = self.scanner.read_texts(batch).await;
            cursor += window;

            for (uri, text) in batch.iter().zip(texts) {
                let Some(text) = text else {
                    continue;
                };
                let Some(fragment) = self.fragment(uri, &text, ContextSource::FileScan) else {
                    continue;
                };
                fragments.push(fragment);

                if companion_base
                    .as_deref()
                    .is_some_and(|base| is_companion(uri, base))
                {
                    log::debug!("Found companion file {}, stopping scan", uri.display());
                    return fragments;
                }
                if fragments.len() >= max_fragments {
                    break;
                }
            }
        }
        fragments
    }

    /// Fragments for the tests associated with `file`.
    ///
    /// An open editor document named after `file` wins on its own; otherwise
    /// a codebase-wide test search supplies up to `max_test_results` hits.
    pub async fn build_test_file_context(
        &self,
        file: &Path,
        unit_test_only: bool,
    ) -> Vec<ContextFragment> {
        if let Some(fragment) = self.open_test_file_fragment(file).await {
            return vec![fragment];
        }

        let mut query = FileQuery::new(
            generic_test_search_pattern(file),
            self.config.max_test_results,
        );
        if unit_test_only {
            query = query.excluding(unit_test_exclude_patterns());
        }

        let hits: Vec<PathBuf> = self
            .scanner
            .find_files(&query)
            .await
            .into_iter()
            .filter(|hit| !same_file(hit, file) && is_test_file(hit))
            .take(self.config.max_test_results)
            .collect();
        log::debug!("Test search for {} kept {} hits", file.display(), hits.len());

        let texts = self.scanner.read_texts(&hits).await;
        hits.iter()
            .zip(texts)
            .filter_map(|(uri, text)| {
                let text = text?;
                self.fragment(uri, &text, ContextSource::FileScan)
            })
            .collect()
    }

    /// Fragment for the whole target file.
    pub async fn build_current_file_context(&self, file: &Path) -> Option<ContextFragment> {
        let is_open = self
            .scanner
            .workspace()
            .open_documents()
            .await
            .iter()
            .any(|open| same_file(open, file));
        let text = if is_open {
            self.scanner.read_open_document(file).await?
        } else {
            self.scanner.read_text(file).await?
        };
        self.fragment(file, &text, ContextSource::Editor)
    }

    /// Fragment for an explicit selection inside `file`.
    pub fn build_selection_context(&self, file: &Path, selected: &str) -> Option<ContextFragment> {
        if selected.trim().is_empty() {
            return None;
        }
        self.fragment(file, selected, ContextSource::Selection)
    }

    /// Current file, then its tests, then directory siblings; each file once.
    pub async fn assemble(&self, request: &AssembleRequest) -> Vec<ContextFragment> {
        let target = request.target.as_path();
        let mut fragments = Vec::new();
        fragments.extend(self.build_current_file_context(target).await);
        fragments.extend(
            self.build_test_file_context(target, request.unit_test_only)
                .await,
        );
        if request.include_directory {
            if let Some(directory) = target.parent() {
                fragments.extend(
                    self.build_directory_context(
                        directory,
                        Some(target),
                        self.config.max_directory_fragments,
                    )
                    .await,
                );
            }
        }

        let mut seen = HashSet::new();
        fragments.retain(|fragment| {
            fragment
                .file()
                .map_or(true, |file| seen.insert(file.uri.clone()))
        });
        log::info!(
            "Assembled {} context fragments for {}",
            fragments.len(),
            target.display()
        );
        fragments
    }

    async fn open_test_file_fragment(&self, file: &Path) -> Option<ContextFragment> {
        let open = self.scanner.workspace().open_documents().await;
        let test_file = open
            .into_iter()
            .find(|candidate| !same_file(candidate, file) && is_test_file_for(file, candidate))?;
        let text = self.scanner.read_open_document(&test_file).await?;
        self.fragment(&test_file, &text, ContextSource::Editor)
    }

    fn fragment(&self, uri: &Path, text: &str, source: ContextSource) -> Option<ContextFragment> {
        if self.ignore.as_ref().is_some_and(|ignore| ignore.is_ignored(uri)) {
            log::debug!("Skipping ignored file {}", uri.display());
            return None;
        }
        let workspace = self.scanner.workspace();
        let file_name = workspace.relative_path(uri);
        let mut file = ContextFile::new(uri, file_name.clone()).with_source(source);
        if let Some(repo) = workspace.repo_name(uri) {
            file = file.with_repo_name(repo);
        }
        let truncated = truncate_text(text, self.config.max_fragment_tokens);
        Some(ContextFragment::new(
            code_snippet_text(&file_name, truncated),
            file,
            self.config.assistant_response.clone(),
        ))
    }
}

fn code_snippet_text(file_name: &str, text: &str) -> String {
    let lang = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    format!("Use the following code snippet from file `{file_name}`:\n```{lang}\n{text}\n```")
}

/// File name without its last extension.
fn base_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    (!stem.is_empty()).then(|| stem.to_string())
}

fn is_companion(candidate: &Path, target_base: &str) -> bool {
    base_name(candidate).is_some_and(|stem| {
        stem.starts_with(target_base) || stem.ends_with(target_base)
    })
}

fn same_file(a: &Path, b: &Path) -> bool {
    a == b || (a.file_name() == b.file_name() && (a.ends_with(b) || b.ends_with(a)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn companion_matches_prefix_or_suffix_of_stem() {
        assert!(is_companion(Path::new("src/foo.test.ts"), "foo"));
        assert!(is_companion(Path::new("src/test_foo.py"), "foo"));
        assert!(!is_companion(Path::new("src/bar.ts"), "foo"));
        assert!(!is_companion(Path::new("src/afoob.ts"), "foo"));
    }

    #[test]
    fn base_name_strips_last_extension() {
        assert_eq!(base_name(Path::new("a/foo.test.ts")).as_deref(), Some("foo.test"));
        assert_eq!(base_name(Path::new("Makefile")).as_deref(), Some("Makefile"));
    }

    #[test]
    fn same_file_accepts_relative_and_absolute_forms() {
        assert!(same_file(Path::new("/repo/src/a.rs"), Path::new("src/a.rs")));
        assert!(!same_file(Path::new("/repo/src/a.rs"), Path::new("src/b.rs")));
    }

    #[test]
    fn snippet_text_names_file_and_language() {
        let text = code_snippet_text("src/a.rs", "fn a() {}");
        assert!(text.starts_with("Use the following code snippet from file `src/a.rs`:"));
        assert!(text.contains("```rs\nfn a() {}\n```"));
    }
}
