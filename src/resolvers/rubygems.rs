//! RubyGems lookups.

use serde_json::Value;

use super::{RegistryClient, ResolveError, pick_repo_url};

pub(super) async fn resolve(client: &RegistryClient, name: &str) -> Result<String, ResolveError> {
    let url = format!("{}/api/v1/gems/{name}.json", client.endpoints().rubygems);
    let doc = client.get_json(&url).await.map_err(|e| e.for_package(name))?;
    repo_from_gem(&doc).ok_or_else(|| ResolveError::not_found(name))
}

pub(super) fn repo_from_gem(doc: &Value) -> Option<String> {
    let field = |key: &str| doc.get(key).and_then(Value::as_str);
    pick_repo_url(
        field("source_code_uri"),
        ["homepage_uri", "bug_tracker_uri", "changelog_uri", "documentation_uri"]
            .into_iter()
            .filter_map(field),
    )
}
