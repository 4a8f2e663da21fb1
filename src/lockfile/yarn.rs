//! `yarn.lock` reader for both classic (v1) and berry lockfiles.
//!
//! A package block starts with an unindented header listing one or more
//! comma-separated specifiers that share one physical version:
//!
//! ```text
//! "@babel/core@^7.0.0", "@babel/core@^7.12.3":
//!   version "7.23.9"
//!
//! "react@npm:^18.2.0":
//!   version: 18.2.0
//! ```
//!
//! Classic lockfiles quote the version (`version "x"`), berry uses the
//! colon form (`version: x`). Berry headers wrap the range in an `npm:`
//! protocol, which is unwrapped before splitting name from range. Blocks for
//! other protocols (`workspace:`, `patch:`, `file:` ...) are skipped.

use super::{LockedVersions, split_name_version};

pub(super) fn parse(content: &str) -> LockedVersions {
    let mut versions = LockedVersions::new();
    let mut current: Option<String> = None;

    for line in content.lines() {
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        if !line.starts_with(' ') {
            current = line
                .trim_end()
                .strip_suffix(':')
                .and_then(package_name_from_header);
            continue;
        }

        let Some(name) = current.as_ref() else {
            continue;
        };
        // Only the block's own fields sit at two spaces; nested maps are deeper.
        if line.starts_with("   ") {
            continue;
        }
        let field = line.trim();
        let version = if let Some(rest) = field.strip_prefix("version:") {
            rest.trim().trim_matches('"')
        } else if let Some(rest) = field.strip_prefix("version ") {
            rest.trim().trim_matches('"')
        } else {
            continue;
        };
        if !version.is_empty() {
            versions.entry(name.clone()).or_insert_with(|| version.to_string());
        }
        current = None;
    }

    versions
}

/// Extract the package name from a block header, or `None` for metadata and
/// non-registry blocks.
fn package_name_from_header(header: &str) -> Option<String> {
    let first = header.split(',').next()?.trim().trim_matches('"');
    if first.is_empty() || first == "__metadata" {
        return None;
    }

    if let Some(idx) = first.find("@npm:")
        && idx > 0
    {
        return Some(first[..idx].to_string());
    }

    let (name, range) = split_name_version(first)?;
    if name.contains(':') || range.contains(':') {
        return None;
    }
    Some(name)
}
