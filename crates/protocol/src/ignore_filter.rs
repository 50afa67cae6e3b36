use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Per-repository rule file, gitignore syntax.
pub const IGNORE_FILE_NAME: &str = ".contextignore";

#[derive(Error, Debug)]
pub enum IgnoreRulesError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid ignore rule for repo {repo}: {source}")]
    InvalidRule {
        repo: String,
        #[source]
        source: ignore::Error,
    },
}

#[derive(Debug, Clone)]
struct RepoRules {
    name: String,
    root: PathBuf,
    matcher: Gitignore,
}

impl RepoRules {
    fn matches(&self, rel_path: &str) -> bool {
        let rel_path = normalize_rel_path(rel_path);
        if rel_path.is_empty() {
            return false;
        }
        self.matcher
            .matched_path_or_any_parents(Path::new(&rel_path), false)
            .is_ignore()
    }
}

/// Excludes files from ever being surfaced as context.
///
/// Holds one gitignore-style rule set per repository. Without any rule set
/// nothing is ignored.
#[derive(Debug, Clone, Default)]
pub struct IgnoreFilter {
    repos: Vec<RepoRules>,
}

impl IgnoreFilter {
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    /// Add a rule set for `repo_name` rooted at `root`.
    pub fn with_repo_rules(
        mut self,
        repo_name: impl Into<String>,
        root: impl AsRef<Path>,
        rules: &str,
    ) -> Result<Self, IgnoreRulesError> {
        let repo = repo_name.into();
        let root = root.as_ref().to_path_buf();
        let mut builder = GitignoreBuilder::new(&root);
        for line in rules.lines() {
            builder
                .add_line(None, line)
                .map_err(|source| IgnoreRulesError::InvalidRule {
                    repo: repo.clone(),
                    source,
                })?;
        }
        let matcher = builder
            .build()
            .map_err(|source| IgnoreRulesError::InvalidRule {
                repo: repo.clone(),
                source,
            })?;
        log::debug!(
            "Loaded {} ignore rules for repo {repo} at {}",
            matcher.num_ignores() + matcher.num_whitelists(),
            root.display()
        );
        self.repos.retain(|existing| existing.name != repo);
        self.repos.push(RepoRules {
            name: repo,
            root,
            matcher,
        });
        Ok(self)
    }

    /// Load `<root>/.contextignore`; a missing file yields an empty rule set.
    pub fn from_workspace_root(
        repo_name: impl Into<String>,
        root: impl AsRef<Path>,
    ) -> Result<Self, IgnoreRulesError> {
        let root = root.as_ref();
        let path = root.join(IGNORE_FILE_NAME);
        let rules = match std::fs::read_to_string(&path) {
            Ok(rules) => rules,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(source) => return Err(IgnoreRulesError::Io { path, source }),
        };
        Self::allow_all().with_repo_rules(repo_name, root, &rules)
    }

    /// True when `uri` lies under a known repository and matches its rules.
    pub fn is_ignored(&self, uri: &Path) -> bool {
        self.repos.iter().any(|repo| {
            uri.strip_prefix(&repo.root)
                .ok()
                .is_some_and(|rel| repo.matches(&rel.to_string_lossy()))
        })
    }

    /// True when the repo-relative `file_name` matches the rules of `repo_name`.
    pub fn is_ignored_path(&self, repo_name: &str, file_name: &str) -> bool {
        self.repos
            .iter()
            .filter(|repo| repo.name == repo_name)
            .any(|repo| repo.matches(file_name))
    }
}

fn normalize_rel_path(raw: &str) -> String {
    let mut value = raw.trim().replace('\\', "/");
    while let Some(rest) = value.strip_prefix("./") {
        value = rest.to_string();
    }
    let value = value.trim_matches('/');
    if value == "." {
        return String::new();
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn filter() -> IgnoreFilter {
        IgnoreFilter::allow_all()
            .with_repo_rules("acme/app", "/work/app", "secrets/\n*.env\n!public.env\n")
            .unwrap()
    }

    #[test]
    fn empty_filter_ignores_nothing() {
        let filter = IgnoreFilter::allow_all();
        assert!(filter.is_empty());
        assert!(!filter.is_ignored(Path::new("/work/app/secrets/key.txt")));
        assert!(!filter.is_ignored_path("acme/app", "secrets/key.txt"));
    }

    #[test]
    fn uri_under_repo_root_uses_repo_rules() {
        let filter = filter();
        assert!(filter.is_ignored(Path::new("/work/app/secrets/key.txt")));
        assert!(filter.is_ignored(Path::new("/work/app/config/prod.env")));
        assert!(!filter.is_ignored(Path::new("/work/app/config/public.env")));
        assert!(!filter.is_ignored(Path::new("/work/app/src/main.rs")));
        assert!(!filter.is_ignored(Path::new("/elsewhere/secrets/key.txt")));
    }

    #[test]
    fn repo_relative_paths_are_normalized() {
        let filter = filter();
        assert!(filter.is_ignored_path("acme/app", "./secrets/key.txt"));
        assert!(filter.is_ignored_path("acme/app", "secrets\\key.txt"));
        assert!(!filter.is_ignored_path("acme/other", "secrets/key.txt"));
        assert!(!filter.is_ignored_path("acme/app", "."));
    }

    #[test]
    fn loads_rules_from_workspace_root() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join(IGNORE_FILE_NAME), "generated/\n").unwrap();

        let filter = IgnoreFilter::from_workspace_root("local", temp.path()).unwrap();
        assert!(filter.is_ignored(&temp.path().join("generated/schema.rs")));
        assert!(!filter.is_ignored(&temp.path().join("src/lib.rs")));
    }

    #[test]
    fn missing_rule_file_is_not_an_error() {
        let temp = tempdir().unwrap();
        let filter = IgnoreFilter::from_workspace_root("local", temp.path()).unwrap();
        assert!(!filter.is_ignored(&temp.path().join("src/lib.rs")));
    }
}
