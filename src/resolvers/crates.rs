//! crates.io lookups.

use serde_json::Value;

use super::{RegistryClient, ResolveError, pick_repo_url};

pub(super) async fn resolve(client: &RegistryClient, name: &str) -> Result<String, ResolveError> {
    let url = format!("{}/api/v1/crates/{name}", client.endpoints().crates);
    let doc = client.get_json(&url).await.map_err(|e| e.for_package(name))?;
    repo_from_crate(&doc).ok_or_else(|| ResolveError::not_found(name))
}

pub(super) fn repo_from_crate(doc: &Value) -> Option<String> {
    let krate = doc.get("crate")?;
    let repository = krate.get("repository").and_then(Value::as_str);
    let homepage = krate.get("homepage").and_then(Value::as_str);
    pick_repo_url(repository, homepage)
}
