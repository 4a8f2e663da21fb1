//! PyPI JSON API lookups.

use serde_json::{Map, Value};

use super::{RegistryClient, ResolveError, pick_repo_url};

/// `project_urls` keys that name the source repository, in preference order.
const SOURCE_KEYS: [&str; 5] = ["Source", "Source Code", "Repository", "Code", "GitHub"];

pub(super) async fn resolve(
    client: &RegistryClient,
    name: &str,
    version: Option<&str>,
) -> Result<String, ResolveError> {
    let base = &client.endpoints().pypi;
    let url = match version {
        Some(version) => format!("{base}/pypi/{name}/{version}/json"),
        None => format!("{base}/pypi/{name}/json"),
    };

    let doc = match client.get_json(&url).await {
        Ok(doc) => doc,
        // Yanked or mistyped pins still resolve through the project document
        Err(ResolveError::NotFound { .. }) if version.is_some() => client
            .get_json(&format!("{base}/pypi/{name}/json"))
            .await
            .map_err(|e| e.for_package(name))?,
        Err(e) => return Err(e.for_package(name)),
    };

    repo_from_info(&doc).ok_or_else(|| ResolveError::not_found(name))
}

pub(super) fn repo_from_info(doc: &Value) -> Option<String> {
    let info = doc.get("info")?;
    let project_urls = info.get("project_urls").and_then(Value::as_object);

    // Only the source-like keys are trusted without a forge check
    let preferred: Vec<&str> =
        SOURCE_KEYS.iter().filter_map(|key| project_url(project_urls, key)).collect();
    let mut fallbacks: Vec<&str> = Vec::new();
    if let Some(urls) = project_urls {
        fallbacks.extend(urls.values().filter_map(Value::as_str));
    }
    fallbacks.extend(info.get("home_page").and_then(Value::as_str));

    pick_repo_url(preferred, fallbacks)
}

/// Case-insensitive `project_urls` lookup.
fn project_url<'a>(urls: Option<&'a Map<String, Value>>, key: &str) -> Option<&'a str> {
    urls?.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)).and_then(|(_, v)| v.as_str())
}
