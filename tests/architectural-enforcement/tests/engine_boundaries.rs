//! Integration Test: Engine Boundaries
//!
//! **Policy**: The session engine is headless and never blocks.
//! - No UI crates in `zelf-conductor`
//! - No sleep calls in production code (the engine only waits on I/O)
//! - No `unwrap()` in production engine code; errors propagate
//!
//! **Exceptions**: test code (`#[cfg(test)]` modules and `tests/` dirs)

use std::fs;

use architectural_enforcement::{find_violations, rust_files, workspace_root};

const UI_CRATES: [&str; 4] = ["ratatui", "crossterm", "textwrap", "tui"];

const BINARY_ONLY_CRATES: [&str; 3] = ["anyhow", "clap", "tracing-subscriber"];

fn report(kind: &str, violations: &[String]) {
    if violations.is_empty() {
        return;
    }
    eprintln!("\n❌ {kind} found in production code!\n");
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    panic!(
        "\nFound {} {kind} violation(s).\nFix these before merging!",
        violations.len()
    );
}

fn core_dependencies() -> Vec<String> {
    let manifest = fs::read_to_string(workspace_root().join("conductor/core/Cargo.toml"))
        .expect("core manifest must exist");
    let mut in_deps = false;
    let mut names = Vec::new();
    for line in manifest.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_deps = line == "[dependencies]";
            continue;
        }
        if in_deps {
            if let Some((name, _)) = line.split_once('=') {
                names.push(name.trim().to_string());
            }
        }
    }
    names
}

#[test]
fn test_core_has_no_ui_dependencies() {
    let deps = core_dependencies();
    assert!(deps.contains(&"tokio".to_string()), "manifest scan found nothing");

    let violations: Vec<String> = deps
        .iter()
        .filter(|dep| UI_CRATES.contains(&dep.as_str()))
        .map(|dep| format!("conductor/core/Cargo.toml - {dep}"))
        .collect();
    report("UI dependency", &violations);

    let violations = find_violations("conductor/core/src", |code| {
        UI_CRATES
            .iter()
            .any(|krate| code.contains(&format!("use {krate}::")))
    });
    report("UI import", &violations);
}

#[test]
fn test_core_keeps_binary_crates_out() {
    let violations: Vec<String> = core_dependencies()
        .iter()
        .filter(|dep| BINARY_ONLY_CRATES.contains(&dep.as_str()))
        .map(|dep| format!("conductor/core/Cargo.toml - {dep}"))
        .collect();
    report("binary-only dependency", &violations);
}

#[test]
fn test_no_sleep_in_production_code() {
    assert!(!rust_files("conductor/core/src").is_empty());

    let is_sleep = |code: &str| code.contains("::sleep(") || code.contains(".sleep(");
    let mut violations = find_violations("conductor/core/src", is_sleep);
    violations.extend(find_violations("conductor/cli/src", is_sleep));
    report("sleep", &violations);
}

#[test]
fn test_no_unwrap_in_engine() {
    let violations = find_violations("conductor/core/src", |code| code.contains(".unwrap()"));
    report("unwrap()", &violations);
}

#[test]
fn test_no_expect_in_engine() {
    let violations = find_violations("conductor/core/src", |code| code.contains(".expect("));
    report("expect()", &violations);
}
