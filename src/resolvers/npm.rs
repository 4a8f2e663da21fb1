//! npm registry lookups.

use serde_json::Value;

use super::{RegistryClient, ResolveError, pick_repo_url};

pub(super) async fn resolve(client: &RegistryClient, name: &str) -> Result<String, ResolveError> {
    let url = format!("{}/{}/latest", client.endpoints().npm, encode_package_name(name));
    let doc = client.get_json(&url).await.map_err(|e| e.for_package(name))?;
    repo_from_manifest(&doc).ok_or_else(|| ResolveError::not_found(name))
}

/// Scoped names keep their `@` but the separator slash is escaped.
fn encode_package_name(name: &str) -> String {
    name.replacen('/', "%2F", 1)
}

/// `repository` (string or `{ url }`) wins; `homepage` and `bugs.url` count
/// only when they point at a forge.
pub(super) fn repo_from_manifest(doc: &Value) -> Option<String> {
    let repository = match doc.get("repository") {
        Some(Value::String(s)) => Some(s.as_str()),
        Some(Value::Object(obj)) => obj.get("url").and_then(Value::as_str),
        _ => None,
    };
    let homepage = doc.get("homepage").and_then(Value::as_str);
    let bugs = match doc.get("bugs") {
        Some(Value::String(s)) => Some(s.as_str()),
        Some(Value::Object(obj)) => obj.get("url").and_then(Value::as_str),
        _ => None,
    };

    pick_repo_url(repository, homepage.into_iter().chain(bugs))
}
