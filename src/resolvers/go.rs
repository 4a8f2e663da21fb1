//! Go module path resolution.
//!
//! Module paths on the big forges already are repository paths, so no
//! request is made for them. `golang.org/x/*` and `gopkg.in` have fixed
//! mirrors. Anything else is a vanity import path and goes through the
//! `?go-get=1` discovery protocol.

use regex::Regex;
use std::sync::LazyLock;

use super::{RegistryClient, ResolveError, normalize_repo_url};

const SHORTCUT_HOSTS: [&str; 4] = ["github.com", "gitlab.com", "bitbucket.org", "codeberg.org"];

static META_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\s[^>]*>").expect("valid regex"));
static GO_IMPORT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)name\s*=\s*["']go-import["']"#).expect("valid regex"));
static CONTENT_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)content\s*=\s*["']([^"']*)["']"#).expect("valid regex"));

pub(super) async fn resolve(client: &RegistryClient, module: &str) -> Result<String, ResolveError> {
    if let Some(url) = shortcut(module) {
        tracing::trace!(target: "resolver", "Go module '{}' maps to {} without a lookup", module, url);
        return Ok(url);
    }

    let url = match &client.endpoints().go_discovery_base {
        Some(base) => format!("{base}/{module}?go-get=1"),
        None => format!("https://{module}?go-get=1"),
    };
    let html = client.get_text(&url).await.map_err(|e| e.for_package(module))?;

    repo_from_go_import(&html, module).ok_or_else(|| ResolveError::not_found(module))
}

/// Repository URL derivable from the module path alone.
pub(super) fn shortcut(module: &str) -> Option<String> {
    let segments: Vec<&str> = module.split('/').collect();

    if SHORTCUT_HOSTS.contains(&segments[0]) && segments.len() >= 3 {
        return normalize_repo_url(&format!("https://{}", segments[..3].join("/")));
    }

    match segments.as_slice() {
        ["golang.org", "x", repo, ..] => Some(format!("https://github.com/golang/{repo}")),
        ["gopkg.in", package] => {
            let package = strip_gopkg_version(package)?;
            Some(format!("https://github.com/go-{package}/{package}"))
        }
        ["gopkg.in", user, package, ..] => {
            let package = strip_gopkg_version(package)?;
            Some(format!("https://github.com/{user}/{package}"))
        }
        _ => None,
    }
}

/// `yaml.v3` → `yaml`
fn strip_gopkg_version(segment: &str) -> Option<&str> {
    let (name, version) = segment.rsplit_once(".v")?;
    (!name.is_empty() && version.chars().all(|c| c.is_ascii_digit())).then_some(name)
}

/// Pick the repo root of the longest `go-import` prefix that covers `module`.
pub(super) fn repo_from_go_import(html: &str, module: &str) -> Option<String> {
    META_TAG
        .find_iter(html)
        .map(|m| m.as_str())
        .filter(|tag| GO_IMPORT_NAME.is_match(tag))
        .filter_map(|tag| CONTENT_ATTR.captures(tag).map(|c| c[1].to_string()))
        .filter_map(|content| {
            let fields: Vec<&str> = content.split_whitespace().collect();
            let [prefix, _vcs, root] = fields.as_slice() else {
                return None;
            };
            let covers = module == *prefix || module.starts_with(&format!("{prefix}/"));
            covers.then(|| (prefix.len(), root.to_string()))
        })
        .max_by_key(|(len, _)| *len)
        .and_then(|(_, root)| normalize_repo_url(&root))
}
