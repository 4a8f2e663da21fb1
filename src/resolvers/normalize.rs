//! Repository URL normalization.
//!
//! Registries hand back repository URLs in every shape imaginable:
//! `git+https://...git`, `git@github.com:owner/repo.git`, `github:owner/repo`,
//! deep links into `/tree/main/packages/foo`, URLs with credentials or
//! fragments. Everything is reduced to `https://host/owner/repo`.

use regex::Regex;
use std::sync::LazyLock;

/// Hosts whose first two path segments identify a repository.
const FORGE_HOSTS: [&str; 4] = ["github.com", "gitlab.com", "bitbucket.org", "codeberg.org"];

/// Path markers after which a forge URL stops naming the repository.
const DEEP_LINK_MARKERS: [&str; 5] = ["/-/", "/tree/", "/blob/", "/src/", "/issues"];

static OWNER_REPO_SHORTHAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_.\-]+/[A-Za-z0-9_.\-]+$").expect("valid regex")
});

/// Normalize a raw repository reference to `https://host/path`.
///
/// Returns `None` when the input does not name a repository at all (empty,
/// unknown scheme, or no path).
pub fn normalize_repo_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let raw = raw.strip_prefix("git+").unwrap_or(raw);

    let with_scheme = expand_shorthand(raw)?;
    let rest = with_scheme.strip_prefix("https://")?;

    let rest = rest.split(['?', '#']).next().unwrap_or(rest);
    let (authority, path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
    };
    let host = authority.rsplit('@').next().unwrap_or(authority).to_ascii_lowercase();
    if host.is_empty() {
        return None;
    }

    let path = trim_repo_path(&host, path)?;
    Some(format!("https://{host}{path}"))
}

/// True when `url` points at a repository on a recognized forge.
pub fn is_forge_url(url: &str) -> bool {
    let Some(rest) = url.strip_prefix("https://") else {
        return false;
    };
    let mut parts = rest.split('/');
    let host = parts.next().unwrap_or_default();
    FORGE_HOSTS.contains(&host) && parts.filter(|s| !s.is_empty()).count() >= 2
}

/// Rewrite shorthand and non-https schemes into an `https://` URL.
fn expand_shorthand(raw: &str) -> Option<String> {
    for (prefix, host) in [
        ("github:", "github.com"),
        ("gitlab:", "gitlab.com"),
        ("bitbucket:", "bitbucket.org"),
    ] {
        if let Some(path) = raw.strip_prefix(prefix) {
            return Some(format!("https://{host}/{path}"));
        }
    }

    if let Some(rest) = raw.strip_prefix("https://") {
        return Some(format!("https://{rest}"));
    }
    for scheme in ["http://", "git://", "ssh://"] {
        if let Some(rest) = raw.strip_prefix(scheme) {
            // ssh://git@host:port/owner/repo keeps only host and path
            let rest = match rest.split_once('/') {
                Some((authority, path)) => {
                    let host = authority.rsplit('@').next().unwrap_or(authority);
                    let host = host.split(':').next().unwrap_or(host);
                    format!("{host}/{path}")
                }
                None => rest.to_string(),
            };
            return Some(format!("https://{rest}"));
        }
    }

    // scp-like: git@github.com:owner/repo.git
    if let Some((user_host, path)) = raw.split_once(':')
        && let Some((_, host)) = user_host.split_once('@')
        && !path.starts_with("//")
    {
        return Some(format!("https://{host}/{}", path.trim_start_matches('/')));
    }

    if OWNER_REPO_SHORTHAND.is_match(raw) {
        return Some(format!("https://github.com/{raw}"));
    }

    None
}

/// Cut deep links, the `.git` suffix and trailing slashes from `path`.
fn trim_repo_path(host: &str, path: &str) -> Option<String> {
    let mut path = path.to_string();

    for marker in DEEP_LINK_MARKERS {
        if let Some(idx) = path.find(marker) {
            path.truncate(idx);
        }
    }

    if FORGE_HOSTS.contains(&host) && host != "gitlab.com" {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).take(2).collect();
        path = format!("/{}", segments.join("/"));
    }

    let trimmed = path.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    let trimmed = trimmed.trim_end_matches('/');

    if trimmed.is_empty() || trimmed == "/" {
        return None;
    }
    if FORGE_HOSTS.contains(&host) && trimmed.split('/').filter(|s| !s.is_empty()).count() < 2 {
        return None;
    }
    Some(trimmed.to_string())
}
