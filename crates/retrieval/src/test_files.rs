//! Test file naming conventions.
//!
//! A test file for `bar.ts` shares the extension and wraps the base name with
//! one of [`TEST_PREFIXES`] or [`TEST_SUFFIXES`]: `test_bar.ts`, `bar.test.ts`,
//! `barTest.ts`, and so on. [`test_file_search_pattern`] turns the list into a
//! glob; [`is_test_file`] recognizes any name built from it, whatever the base.
//! A `test` token in the middle of a name (`foo.test.helper.ts`) or in a
//! directory name does not count, since no search pattern produces it.

use std::path::Path;

pub const TEST_PREFIXES: &[&str] = &["test_", "test."];

pub const TEST_SUFFIXES: &[&str] = &[
    "_test", ".test", "-test", "Test", "_spec", ".spec", "-spec", "Spec",
];

/// Where a test file search is rooted.
#[derive(Debug, Clone, Copy)]
pub enum SearchScope<'a> {
    /// Anywhere below the workspace root.
    Workspace,
    /// Directly inside the given directory (workspace-relative).
    Directory(&'a Path),
}

/// Glob matching test files named after `file` (same base name and extension).
///
/// Returns `None` when `file` has no usable base name.
pub fn test_file_search_pattern(file: &Path, scope: SearchScope<'_>) -> Option<String> {
    let (base, ext) = split_name(file.file_name()?.to_str()?);
    if base.is_empty() {
        return None;
    }
    let base = escape_glob(base);
    let alternatives: Vec<String> = TEST_PREFIXES
        .iter()
        .map(|prefix| format!("{prefix}{base}"))
        .chain(TEST_SUFFIXES.iter().map(|suffix| format!("{base}{suffix}")))
        .collect();
    Some(format!(
        "{}{{{}}}{}",
        scope_root(scope),
        alternatives.join(","),
        escape_glob(ext)
    ))
}

/// Broad glob for anything that looks test-related with the extension of `file`.
///
/// Hits are expected to be post-filtered with [`is_test_file`].
pub fn generic_test_search_pattern(file: &Path) -> String {
    let ext = file
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| split_name(name).1)
        .unwrap_or_default();
    format!("**/*{{test,Test,spec,Spec}}*{}", escape_glob(ext))
}

/// Paths a unit-test-only search leaves out.
pub fn unit_test_exclude_patterns() -> Vec<String> {
    vec![
        "**/*{e2e,integration}*/**".to_string(),
        "**/*{e2e,integration}*".to_string(),
        "**/{node_modules,vendor,third_party,.venv,target}/**".to_string(),
    ]
}

/// Whether the file name of `path` follows a test naming convention.
pub fn is_test_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    let (stem, _) = split_name(name);

    let prefixed = TEST_PREFIXES
        .iter()
        .any(|prefix| stem.len() > prefix.len() && stem.starts_with(prefix));
    let suffixed = TEST_SUFFIXES
        .iter()
        .any(|suffix| stem.len() > suffix.len() && stem.ends_with(suffix));
    prefixed || suffixed
}

/// Whether `path` is a test file for `source` specifically.
pub fn is_test_file_for(source: &Path, path: &Path) -> bool {
    let (Some(source_name), Some(name)) = (
        source.file_name().and_then(|n| n.to_str()),
        path.file_name().and_then(|n| n.to_str()),
    ) else {
        return false;
    };
    let (base, ext) = split_name(source_name);
    let (stem, candidate_ext) = split_name(name);
    if base.is_empty() || ext != candidate_ext {
        return false;
    }
    TEST_PREFIXES
        .iter()
        .any(|prefix| stem.strip_prefix(prefix) == Some(base))
        || TEST_SUFFIXES
            .iter()
            .any(|suffix| stem.strip_suffix(suffix) == Some(base))
}

/// Split `foo.test.ts` into (`foo.test`, `.ts`); dotfiles have no extension.
fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

fn scope_root(scope: SearchScope<'_>) -> String {
    match scope {
        SearchScope::Workspace => "**/".to_string(),
        SearchScope::Directory(dir) => {
            let dir = dir.to_string_lossy().replace('\\', "/");
            let dir = dir.trim_matches('/');
            if dir.is_empty() || dir == "." {
                String::new()
            } else {
                format!("{}/", escape_glob(dir))
            }
        }
    }
}

fn escape_glob(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '*' | '?' | '[' | ']' | '{' | '}' | ',' => {
                out.push('[');
                out.push(ch);
                out.push(']');
            }
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use globset::{Glob, GlobBuilder};

    fn matcher(pattern: &str) -> globset::GlobMatcher {
        GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .unwrap()
            .compile_matcher()
    }

    #[test]
    fn search_pattern_matches_every_convention() {
        let pattern = test_file_search_pattern(Path::new("src/bar.ts"), SearchScope::Workspace)
            .unwrap();
        let glob = matcher(&pattern);
        for name in [
            "bar.test.ts",
            "bar_test.ts",
            "test_bar.ts",
            "test.bar.ts",
            "barTest.ts",
            "bar.spec.ts",
        ] {
            assert!(glob.is_match(format!("src/{name}")), "{name} vs {pattern}");
            assert!(is_test_file(Path::new(name)), "{name}");
            assert!(is_test_file_for(Path::new("bar.ts"), Path::new(name)), "{name}");
        }
        assert!(!glob.is_match("src/barTester.ts"));
        assert!(!glob.is_match("src/bar.test.js"));
        assert!(!glob.is_match("src/foo.test.ts"));
    }

    #[test]
    fn directory_scope_roots_pattern() {
        let pattern = test_file_search_pattern(
            Path::new("bar.rs"),
            SearchScope::Directory(Path::new("crates/core/src/")),
        )
        .unwrap();
        assert!(pattern.starts_with("crates/core/src/{"));
        let glob = matcher(&pattern);
        assert!(glob.is_match("crates/core/src/bar_test.rs"));
        assert!(!glob.is_match("crates/core/src/nested/bar_test.rs"));
        assert!(!glob.is_match("other/bar_test.rs"));
    }

    #[test]
    fn recognizer_rejects_lookalikes() {
        for name in [
            "barTester.ts",
            "latest.ts",
            "contest.rs",
            "test.ts",
            "Test.java",
            "testing.py",
            ".test",
        ] {
            assert!(!is_test_file(Path::new(name)), "{name}");
        }
        assert!(!is_test_file_for(Path::new("bar.ts"), Path::new("foo.test.ts")));
        assert!(!is_test_file_for(Path::new("bar.ts"), Path::new("bar.test.js")));
    }

    #[test]
    fn recognizer_ignores_directories() {
        assert!(is_test_file(Path::new("tests/unit/parser_test.rs")));
        assert!(!is_test_file(Path::new("tests/unit/parser.rs")));
    }

    #[test]
    fn recognized_names_come_from_some_search_pattern() {
        let candidates = [
            "parser_test.rs",
            "test_parser.py",
            "WidgetSpec.kt",
            "a.b.test.ts",
            "foo.test.helper.ts",
            "foo_test_utils.rs",
            "helpers.ts",
        ];
        let mut recognized = Vec::new();
        for name in candidates {
            if !is_test_file(Path::new(name)) {
                continue;
            }
            let (stem, ext) = split_name(name);
            let base = TEST_PREFIXES
                .iter()
                .find_map(|prefix| stem.strip_prefix(prefix))
                .or_else(|| TEST_SUFFIXES.iter().find_map(|suffix| stem.strip_suffix(suffix)))
                .unwrap();
            let source = format!("{base}{ext}");
            let pattern =
                test_file_search_pattern(Path::new(&source), SearchScope::Workspace).unwrap();
            assert!(matcher(&pattern).is_match(format!("src/{name}")), "{name} vs {pattern}");
            recognized.push(name);
        }
        assert_eq!(
            recognized,
            vec!["parser_test.rs", "test_parser.py", "WidgetSpec.kt", "a.b.test.ts"]
        );
    }

    #[test]
    fn glob_metacharacters_in_names_are_escaped() {
        let pattern =
            test_file_search_pattern(Path::new("[id].tsx"), SearchScope::Workspace).unwrap();
        let glob = matcher(&pattern);
        assert!(glob.is_match("pages/[id].test.tsx"));
        assert!(!glob.is_match("pages/i.test.tsx"));
    }

    #[test]
    fn generic_pattern_catches_all_conventions() {
        let pattern = generic_test_search_pattern(Path::new("src/bar.ts"));
        let glob = Glob::new(&pattern).unwrap().compile_matcher();
        assert!(glob.is_match("web/src/barTest.ts"));
        assert!(glob.is_match("web/src/test_bar.ts"));
        assert!(!glob.is_match("web/src/bar.ts"));
    }

    #[test]
    fn names_without_base_yield_no_pattern() {
        assert!(test_file_search_pattern(Path::new(""), SearchScope::Workspace).is_none());
    }
}
