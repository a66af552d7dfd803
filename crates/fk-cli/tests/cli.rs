//! CLI end-to-end tests against a temporary state file.

use std::path::{Path, PathBuf};
use std::process::Command;

struct Sandbox {
    _dir: tempfile::TempDir,
    store: PathBuf,
    config: PathBuf,
}

impl Sandbox {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = dir.path().join("state.json");
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "exemption_amount = 2\nexemption_unit = \"minutes\"\n").expect("config");
        Self { _dir: dir, store, config }
    }

    /// Run the CLI and return (stdout, stderr, exit code).
    fn run(&self, args: &[&str]) -> (String, String, i32) {
        run_with(&self.store, &self.config, args)
    }
}

fn run_with(store: &Path, config: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_fokus"))
        .arg("--store")
        .arg(store)
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn test_block_list_unblock() {
    let sandbox = Sandbox::new();

    let (out, _, code) = sandbox.run(&["list"]);
    assert_eq!(code, 0);
    assert_eq!(out.trim(), "No blocked hosts.");

    let (out, _, _) = sandbox.run(&["block", "https://www.reddit.com/r/rust"]);
    assert_eq!(out.trim(), "reddit.com added to blocked hosts.");
    let (out, _, _) = sandbox.run(&["block", "reddit.com"]);
    assert_eq!(out.trim(), "reddit.com is already in the blocked hosts list.");

    let (out, _, _) = sandbox.run(&["list"]);
    assert_eq!(out.trim(), "reddit.com");

    let (out, _, _) = sandbox.run(&["unblock", "reddit.com"]);
    assert_eq!(out.trim(), "reddit.com removed from blocked hosts.");
    let (out, _, _) = sandbox.run(&["unblock", "reddit.com"]);
    assert_eq!(out.trim(), "reddit.com is not in the blocked hosts list.");
}

#[test]
fn test_visit_blocks_only_when_enabled() {
    let sandbox = Sandbox::new();
    sandbox.run(&["block", "reddit.com"]);

    let (out, _, code) = sandbox.run(&["visit", "https://old.reddit.com/"]);
    assert_eq!(code, 0);
    assert!(out.contains("old.reddit.com: allowed"), "{out}");

    let (out, _, _) = sandbox.run(&["toggle"]);
    assert_eq!(out.trim(), "Blocking is now enabled.");

    let (out, _, _) = sandbox.run(&["visit", "https://old.reddit.com/"]);
    assert!(out.contains("Blocked: old.reddit.com"), "{out}");
    assert!(out.contains("[Enable for 2 minutes]"), "{out}");
    assert!(out.contains("old.reddit.com: blocked"), "{out}");

    let (out, _, _) = sandbox.run(&["stats"]);
    assert!(out.contains("Total blocks:       1"), "{out}");
}

#[test]
fn test_exempt_and_dismiss() {
    let sandbox = Sandbox::new();
    sandbox.run(&["block", "reddit.com"]);
    sandbox.run(&["toggle"]);

    let (out, _, code) = sandbox.run(&["exempt", "reddit.com", "--seconds", "90"]);
    assert_eq!(code, 0);
    assert!(out.contains("Blocking paused until"), "{out}");

    let (out, _, _) = sandbox.run(&["status", "example.org"]);
    assert!(out.contains("Blocking:      enabled"), "{out}");
    assert!(out.contains("example.org: exempt"), "{out}");

    let (out, _, _) = sandbox.run(&["stats"]);
    assert!(out.contains("Exemptions granted: 1"), "{out}");

    sandbox.run(&["dismiss"]);
    let (out, _, _) = sandbox.run(&["status", "reddit.com"]);
    assert!(out.contains("Exemption:     none"), "{out}");
    assert!(out.contains("reddit.com: blocked"), "{out}");
}

#[test]
fn test_exempt_rejects_unusable_lengths() {
    let sandbox = Sandbox::new();
    sandbox.run(&["block", "reddit.com"]);
    sandbox.run(&["toggle"]);

    for args in [
        &["exempt", "--seconds", "9223372036854775807"][..],
        &["exempt", "reddit.com", "--seconds", "9000000000000"],
        &["exempt", "reddit.com", "--seconds", "0"],
        &["exempt", "--seconds=-5"],
    ] {
        let (out, err, code) = sandbox.run(args);
        assert_eq!(code, 1, "{args:?}");
        assert!(out.is_empty(), "{out}");
        assert!(err.contains("Error: Invalid exemption duration"), "{err}");
        assert!(!err.contains("panicked"), "{err}");
    }

    let (out, _, _) = sandbox.run(&["status", "reddit.com"]);
    assert!(out.contains("Exemption:     none"), "{out}");
    assert!(out.contains("reddit.com: blocked"), "{out}");

    let (out, _, _) = sandbox.run(&["stats"]);
    assert!(out.contains("Exemptions granted: 0"), "{out}");
}

#[test]
fn test_menu_lists_and_runs_entries() {
    let sandbox = Sandbox::new();

    let (out, _, _) = sandbox.run(&["menu", "news.ycombinator.com"]);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(
        lines,
        [
            "1. Enable for 2 minutes",
            "2. Enable Blocking",
            "3. Block news.ycombinator.com"
        ]
    );

    let (out, _, _) = sandbox.run(&["menu", "news.ycombinator.com", "--run", "block"]);
    assert!(out.contains("news.ycombinator.com added to blocked hosts."), "{out}");
    let (out, _, _) = sandbox.run(&["menu", "news.ycombinator.com", "--run", "toggle"]);
    assert!(out.contains("Blocking is now enabled."), "{out}");

    let (out, _, _) = sandbox.run(&["menu", "news.ycombinator.com"]);
    assert!(out.contains("2. Disable Blocking"), "{out}");
    assert!(out.contains("3. Unblock news.ycombinator.com"), "{out}");
}

#[test]
fn test_invalid_config_fails() {
    let sandbox = Sandbox::new();
    std::fs::write(&sandbox.config, "tick_period_ms = 0").expect("config");

    let (_, err, code) = sandbox.run(&["list"]);
    assert_eq!(code, 1);
    assert!(err.contains("Error:"), "{err}");
    assert!(err.contains("tick_period_ms must be positive"), "{err}");
}
