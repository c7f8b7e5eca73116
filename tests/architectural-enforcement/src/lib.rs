//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - The engine has no UI dependencies
//! - No blocking sleeps, only waiting on I/O
//! - No `unwrap()` in production engine code
//!
//! The helpers here find source files and strip the parts of them that are
//! allowed to break the rules (comments and `#[cfg(test)]` modules).

use std::fs;
use std::path::{Path, PathBuf};

/// Workspace root (two levels above this package)
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Every `.rs` file under `dir` (relative to the workspace root)
#[must_use]
pub fn rust_files(dir: &str) -> Vec<PathBuf> {
    let root = workspace_root().join(dir);
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(walkdir::DirEntry::into_path)
        .collect();
    files.sort();
    files
}

/// One line of production code
#[derive(Debug)]
pub struct CodeLine {
    /// 1-based line number
    pub number: usize,
    /// Line text with any trailing `//` comment removed
    pub code: String,
}

/// Production lines of a source file
///
/// Stops at the first `#[cfg(test)]` and drops comment-only lines.
#[must_use]
pub fn production_lines(content: &str) -> Vec<CodeLine> {
    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| line.trim() != "#[cfg(test)]")
        .filter(|(_, line)| !line.trim_start().starts_with("//"))
        .map(|(idx, line)| CodeLine {
            number: idx + 1,
            code: line.split("//").next().unwrap_or(line).to_string(),
        })
        .collect()
}

/// Scan the production code under `dir` for lines matching `is_violation`
///
/// Returns `path:line - code` descriptions.
pub fn find_violations(dir: &str, is_violation: impl Fn(&str) -> bool) -> Vec<String> {
    let mut violations = Vec::new();
    for path in rust_files(dir) {
        let Ok(content) = fs::read_to_string(&path) else {
            continue;
        };
        for line in production_lines(&content) {
            if is_violation(&line.code) {
                violations.push(format!(
                    "{}:{} - {}",
                    path.display(),
                    line.number,
                    line.code.trim()
                ));
            }
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let source = "fn a() {}\n// note\nlet x = y; // trailing\n#[cfg(test)]\nmod tests {}\n";
        let lines = production_lines(source);
        let numbers: Vec<_> = lines.iter().map(|l| l.number).collect();
        assert_eq!(numbers, [1, 3]);
        assert_eq!(lines[1].code.trim(), "let x = y;");
    }

    #[test]
    fn test_workspace_root_contains_core() {
        assert!(workspace_root().join("conductor/core/Cargo.toml").exists());
    }
}
