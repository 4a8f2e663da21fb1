use groundwork::cache::{ResourceManager, SyncOutcome};
use groundwork::models::ResolvedDependency;
use groundwork::registry::ResourceRegistry;
use groundwork::test_utils::{TestGit, init_test_logging};
use tempfile::TempDir;

fn dep(name: &str, version: &str, url: &str) -> ResolvedDependency {
    ResolvedDependency {
        name: name.to_string(),
        version: version.to_string(),
        repo_url: url.to_string(),
        tag: None,
    }
}

fn outcomes(reports: &[groundwork::cache::SyncReport]) -> Vec<(&str, &SyncOutcome)> {
    reports.iter().map(|r| (r.key.as_str(), &r.outcome)).collect()
}

/// Tagged checkouts are immutable; default-branch checkouts follow the
/// remote.
#[tokio::test]
async fn test_create_skip_then_update() {
    init_test_logging(None);
    let temp = TempDir::new().unwrap();
    let origin = TestGit::init_origin(temp.path().join("origin")).unwrap();
    origin.commit_file("src/lib.rs", "pub fn one() {}\n", "one").unwrap();
    origin.tag("v1.0.0").unwrap();
    let tagged_commit = origin.head().unwrap();

    let cache_dir = temp.path().join("cache");
    let deps = vec![dep("lib", "1.0.0", &origin.url()), dep("lib-edge", "latest", &origin.url())];
    let mut registry = ResourceRegistry::load(&cache_dir).unwrap();
    let mut manager = ResourceManager::with_git(&cache_dir);

    let first = manager.sync_all(&deps, &mut registry).await;
    assert_eq!(
        outcomes(&first),
        vec![("lib@1.0.0", &SyncOutcome::Created), ("lib-edge@latest", &SyncOutcome::Created)]
    );
    let tagged = registry.get_repo("lib@1.0.0").unwrap();
    assert_eq!(tagged.tag.as_deref(), Some("v1.0.0"));
    assert_eq!(tagged.commit, tagged_commit);
    assert!(tagged.size > 0);
    assert_eq!(registry.get_repo("lib-edge@latest").unwrap().tag, None);

    let second = manager.sync_all(&deps, &mut registry).await;
    assert!(second.iter().all(|r| r.outcome == SyncOutcome::Skipped));

    origin.commit_file("src/lib.rs", "pub fn two() {}\n", "two").unwrap();
    let new_head = origin.head().unwrap();

    let third = manager.sync_all(&deps, &mut registry).await;
    assert_eq!(
        outcomes(&third),
        vec![("lib@1.0.0", &SyncOutcome::Skipped), ("lib-edge@latest", &SyncOutcome::Updated)]
    );
    assert_eq!(registry.get_repo("lib@1.0.0").unwrap().commit, tagged_commit);
    assert_eq!(registry.get_repo("lib-edge@latest").unwrap().commit, new_head);

    let edge = manager.checkout_path("lib-edge@latest");
    let content = std::fs::read_to_string(edge.join("src/lib.rs")).unwrap();
    assert!(content.contains("two"));
}

/// A registry saved by one run lets a later run list the cache without
/// re-resolving anything.
#[tokio::test]
async fn test_registry_survives_restart() {
    let temp = TempDir::new().unwrap();
    let origin = TestGit::init_origin(temp.path().join("origin")).unwrap();
    origin.tag("v2.0.0").unwrap();
    let cache_dir = temp.path().join("cache");

    {
        let mut registry = ResourceRegistry::load(&cache_dir).unwrap();
        let mut manager = ResourceManager::with_git(&cache_dir);
        manager.sync_all(&[dep("widget", "2.0.0", &origin.url())], &mut registry).await;
        registry.save().unwrap();
    }

    let registry = ResourceRegistry::load(&cache_dir).unwrap();
    let mut manager = ResourceManager::with_git(&cache_dir);
    manager.detect_from_registry(&registry);
    let cached = manager.get_cached_resources(&registry);

    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].name, "widget");
    assert_eq!(cached[0].version, "2.0.0");
    assert_eq!(cached[0].ref_name.as_deref(), Some("v2.0.0"));
    assert_eq!(cached[0].commit, origin.head().unwrap());
    assert!(cached[0].path.join("README.md").is_file());
}

/// One bad remote does not stop the others and leaves nothing behind.
#[tokio::test]
async fn test_failed_clone_is_reported_and_cleaned() {
    let temp = TempDir::new().unwrap();
    let origin = TestGit::init_origin(temp.path().join("origin")).unwrap();
    let missing = format!("file://{}", temp.path().join("does-not-exist").display());
    let cache_dir = temp.path().join("cache");

    let mut registry = ResourceRegistry::load(&cache_dir).unwrap();
    let mut manager = ResourceManager::with_git(&cache_dir);
    let deps = vec![dep("ghost", "0.1.0", &missing), dep("real", "latest", &origin.url())];
    let reports = manager.sync_all(&deps, &mut registry).await;

    assert!(matches!(reports[0].outcome, SyncOutcome::Failed(_)));
    assert_eq!(reports[1].outcome, SyncOutcome::Created);
    assert!(!manager.checkout_path("ghost@0.1.0").exists());
    assert!(registry.get_repo("ghost@0.1.0").is_none());

    let names: Vec<String> =
        manager.get_cached_resources(&registry).into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["real"]);
}
