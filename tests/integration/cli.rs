use assert_cmd::Command;
use chrono::Utc;
use groundwork::cache::ResourceManager;
use groundwork::registry::{CachedRepoMeta, ResourceRegistry};
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn groundwork(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("groundwork").unwrap();
    cmd.env("HOME", home).env_remove("RUST_LOG");
    cmd
}

/// Register a checkout in the cache's registry and create its directory.
fn seed_checkout(cache_dir: &Path, name: &str, version: &str) {
    let key = format!("{name}@{version}");
    let mut registry = ResourceRegistry::load(cache_dir).unwrap();
    registry.update_repo(
        &key,
        CachedRepoMeta {
            url: format!("https://github.com/example/{name}"),
            tag: Some(format!("v{version}")),
            version: version.to_string(),
            commit: "a".repeat(40),
            last_sync: Utc::now(),
            size: 1024,
        },
    );
    registry.save().unwrap();
    std::fs::create_dir_all(ResourceManager::with_git(cache_dir).checkout_path(&key)).unwrap();
}

#[test]
fn test_help_lists_commands() {
    let temp = TempDir::new().unwrap();
    groundwork(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("consult"))
        .stdout(predicate::str::contains("cache"));
}

#[test]
fn test_cache_status_json() {
    let temp = TempDir::new().unwrap();
    let cache_dir = temp.path().join("cache");
    seed_checkout(&cache_dir, "react", "18.3.1");

    let output = groundwork(temp.path())
        .args(["cache", "status", "--format", "json", "--cache-dir"])
        .arg(&cache_dir)
        .output()
        .unwrap();
    assert!(output.status.success());

    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["repos"], 1);
    assert_eq!(status["total_size"], 1024);
    assert_eq!(status["unresolvable"], 0);
    assert_eq!(status["consultations"], 0);
}

#[test]
fn test_consult_dry_run_prints_selection() {
    let temp = TempDir::new().unwrap();
    let cache_dir = temp.path().join("cache");
    seed_checkout(&cache_dir, "react", "18.3.1");
    seed_checkout(&cache_dir, "lodash", "4.17.21");

    let story = temp.path().join("story.json");
    std::fs::write(
        &story,
        r#"{"id": "US-2", "title": "Profile page", "description": "Avatar component with props", "tags": ["ui"]}"#,
    )
    .unwrap();

    groundwork(temp.path())
        .args(["consult", "--dry-run", "--story"])
        .arg(&story)
        .arg("--cache-dir")
        .arg(&cache_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("react 18.3.1"))
        .stdout(predicate::str::contains("lodash").not());
}

#[test]
fn test_invalid_story_fails() {
    let temp = TempDir::new().unwrap();
    let story = temp.path().join("story.json");
    std::fs::write(&story, "not json").unwrap();

    groundwork(temp.path())
        .args(["consult", "--story"])
        .arg(&story)
        .arg("--cache-dir")
        .arg(temp.path().join("cache"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_invalid_config_fails() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.toml");
    std::fs::write(&config, "max_frameworks = 0\n").unwrap();

    groundwork(temp.path())
        .args(["cache", "status", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_frameworks"));
}

#[test]
fn test_resolve_without_dependencies_fails() {
    let temp = TempDir::new().unwrap();
    groundwork(temp.path())
        .args(["resolve", "-e", "node", "--cache-dir"])
        .arg(temp.path().join("cache"))
        .assert()
        .failure();
}
