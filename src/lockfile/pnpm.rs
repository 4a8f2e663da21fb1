//! `pnpm-lock.yaml` reader.
//!
//! Only the top-level `packages:` section is read, line by line. Package
//! keys sit at two (or, in some schemas, four) spaces of indentation:
//!
//! ```text
//! packages:
//!   /react@18.2.0:                       # v6, leading slash
//!   '@tanstack/react-query@5.17.0':      # v9, quoted scoped name
//!   next@14.1.0(react-dom@18.2.0)(react@18.2.0):   # peer qualifier
//!   /lodash/4.17.21:                     # v5 path form
//! ```
//!
//! The leading `/` and any parenthesized peer-dependency qualifier are
//! stripped before the name/version split.

use super::{LockedVersions, is_protocol_reference, split_name_version};

pub(super) fn parse(content: &str) -> LockedVersions {
    let mut versions = LockedVersions::new();
    let mut in_packages = false;

    for line in content.lines() {
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        if !line.starts_with(' ') {
            in_packages = line.trim_end() == "packages:";
            continue;
        }
        if !in_packages {
            continue;
        }

        let indent = line.len() - line.trim_start_matches(' ').len();
        if indent != 2 && indent != 4 {
            continue;
        }
        let Some(key) = line.trim().strip_suffix(':') else {
            continue;
        };
        if let Some((name, version)) = parse_package_key(key) {
            versions.entry(name).or_insert(version);
        }
    }

    versions
}

fn parse_package_key(key: &str) -> Option<(String, String)> {
    let key = key.trim_matches(|c| c == '\'' || c == '"');
    let key = key.strip_prefix('/').unwrap_or(key);
    let key = match key.find('(') {
        Some(idx) => &key[..idx],
        None => key,
    };

    let (name, version) = split_name_version(key)
        .filter(|(name, _)| is_package_name(name))
        .or_else(|| split_v5_path(key))?;
    if name.contains(':') || is_protocol_reference(&version) {
        return None;
    }
    Some((name, version))
}

/// Unscoped names have no `/`, scoped names exactly one.
fn is_package_name(name: &str) -> bool {
    let slashes = name.matches('/').count();
    if name.starts_with('@') {
        slashes == 1
    } else {
        slashes == 0
    }
}

/// v5 keys use `name/version` (`@scope/name/1.0.0`), with `_peer` suffixes.
fn split_v5_path(key: &str) -> Option<(String, String)> {
    let idx = key.rfind('/')?;
    let (name, version) = (&key[..idx], &key[idx + 1..]);
    if name.is_empty() || !version.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let version = version.split('_').next().unwrap_or(version);
    Some((name.to_string(), version.to_string()))
}
