//! `package-lock.json` reader.
//!
//! Lockfile v2/v3 key installed packages by install path
//! (`node_modules/react`, `node_modules/@scope/pkg`). Paths that contain a
//! second `node_modules/` segment are nested copies and are ignored. v1
//! lockfiles only carry the top-level `dependencies` map, which is used as a
//! fallback when `packages` is absent.

use super::{LockedVersions, is_protocol_reference};

const INSTALL_PREFIX: &str = "node_modules/";

pub(super) fn parse(content: &str) -> LockedVersions {
    let mut versions = LockedVersions::new();

    let Ok(root) = serde_json::from_str::<serde_json::Value>(content) else {
        tracing::debug!(target: "lockfile", "package-lock.json is not valid JSON, ignoring");
        return versions;
    };

    if let Some(packages) = root.get("packages").and_then(|p| p.as_object()) {
        for (path, entry) in packages {
            let Some(name) = path.strip_prefix(INSTALL_PREFIX) else {
                continue;
            };
            if name.is_empty() || name.contains("/node_modules/") {
                continue;
            }
            if entry.get("link").and_then(|l| l.as_bool()).unwrap_or(false) {
                continue;
            }
            if let Some(version) = entry.get("version").and_then(|v| v.as_str())
                && !is_protocol_reference(version)
            {
                versions.insert(name.to_string(), version.to_string());
            }
        }
        return versions;
    }

    if let Some(deps) = root.get("dependencies").and_then(|d| d.as_object()) {
        for (name, entry) in deps {
            if let Some(version) = entry.get("version").and_then(|v| v.as_str())
                && !is_protocol_reference(version)
            {
                versions.insert(name.clone(), version.to_string());
            }
        }
    }

    versions
}
