use groundwork::models::{Dependency, Ecosystem, ResolvedDependency};
use groundwork::registry::ResourceRegistry;
use groundwork::resolver::DependencyResolver;
use groundwork::resolvers::{RegistryClient, RegistryEndpoints};
use groundwork::test_utils::init_test_logging;
use tempfile::TempDir;

fn resolver_for(server: &mockito::Server) -> DependencyResolver {
    let client = RegistryClient::with_endpoints(RegistryEndpoints::all_at(&server.url())).unwrap();
    DependencyResolver::new(client).with_workers(3)
}

/// A 404 from the registry marks the package unresolvable, the marker
/// survives a save/load cycle and the next run skips the network.
#[tokio::test]
async fn test_not_found_is_remembered_across_runs() {
    init_test_logging(None);
    let mut server = mockito::Server::new_async().await;
    let missing = server
        .mock("GET", "/pkg-x/latest")
        .with_status(404)
        .expect(1)
        .create_async()
        .await;
    let _next = server
        .mock("GET", "/next/latest")
        .with_status(200)
        .with_body(r#"{"repository":{"type":"git","url":"git+https://github.com/vercel/next.js.git"}}"#)
        .create_async()
        .await;

    let cache = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    let deps = vec![Dependency::new("pkg-x", "^1.0.0"), Dependency::new("next", "14.1.0")];

    let mut registry = ResourceRegistry::load(cache.path()).unwrap();
    let resolved = resolver_for(&server)
        .resolve_all(&deps, Ecosystem::Node, project.path(), &mut registry)
        .await;
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].key(), "next@14.1.0");
    assert_eq!(resolved[0].repo_url, "https://github.com/vercel/next.js");
    registry.save().unwrap();

    let mut registry = ResourceRegistry::load(cache.path()).unwrap();
    assert!(registry.is_unresolvable("pkg-x"));
    let again = resolver_for(&server)
        .resolve_all(&deps, Ecosystem::Node, project.path(), &mut registry)
        .await;
    assert_eq!(again.len(), 1);

    missing.assert_async().await;
}

/// Versions come from the lock file; range specifiers are only a fallback.
#[tokio::test]
async fn test_python_versions_pinned_from_poetry_lock() {
    let mut server = mockito::Server::new_async().await;
    let _fastapi = server
        .mock("GET", mockito::Matcher::Regex(r"^/pypi/[Ff]ast[Aa][Pp][Ii](/0\.110\.0)?/json$".to_string()))
        .with_status(200)
        .with_body(
            r#"{"info":{"project_urls":{"Source":"https://github.com/tiangolo/fastapi"},"home_page":null}}"#,
        )
        .create_async()
        .await;

    let project = TempDir::new().unwrap();
    std::fs::write(
        project.path().join("poetry.lock"),
        "[[package]]\nname = \"fastapi\"\nversion = \"0.110.0\"\n",
    )
    .unwrap();

    let mut registry = ResourceRegistry::default();
    let deps = vec![Dependency::new("FastAPI", ">=0.100")];
    let resolved = resolver_for(&server)
        .resolve_all(&deps, Ecosystem::Python, project.path(), &mut registry)
        .await;

    let keys: Vec<String> = resolved.iter().map(ResolvedDependency::key).collect();
    assert_eq!(keys, vec!["FastAPI@0.110.0"]);
    assert_eq!(resolved[0].repo_url, "https://github.com/tiangolo/fastapi");
}

/// A server error drops the dependency from this run and marks the name, so
/// a failing registry is not asked again until the marker expires.
#[tokio::test]
async fn test_server_error_drops_dependency() {
    let mut server = mockito::Server::new_async().await;
    let _flaky = server.mock("GET", "/left-pad/latest").with_status(503).create_async().await;

    let project = TempDir::new().unwrap();
    let mut registry = ResourceRegistry::default();
    let deps = vec![Dependency::new("left-pad", "1.3.0")];
    let resolved = resolver_for(&server)
        .resolve_all(&deps, Ecosystem::Node, project.path(), &mut registry)
        .await;

    assert!(resolved.is_empty());
    assert!(registry.get_resolved_url("left-pad").is_none());
    assert!(registry.is_unresolvable("left-pad"));
}
