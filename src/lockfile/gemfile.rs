//! `Gemfile.lock` reader.
//!
//! Resolved gems are listed under a `specs:` block at four spaces of
//! indentation as `name (version)`; their own requirements sit deeper and
//! are ignored. Platform suffixes (`1.16.2-x86_64-linux`) are dropped.

use regex::Regex;
use std::sync::LazyLock;

use super::LockedVersions;

static SPEC_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^    ([A-Za-z0-9_.\-]+) \(([^)\s]+)\)$").expect("valid regex")
});

pub(super) fn parse(content: &str) -> LockedVersions {
    let mut versions = LockedVersions::new();
    let mut in_specs = false;

    for line in content.lines() {
        if !line.starts_with(' ') {
            in_specs = false;
            continue;
        }
        if line.trim_end() == "  specs:" {
            in_specs = true;
            continue;
        }
        if !in_specs {
            continue;
        }
        if let Some(caps) = SPEC_LINE.captures(line.trim_end()) {
            let version = caps[2].split('-').next().unwrap_or(&caps[2]);
            versions.entry(caps[1].to_string()).or_insert_with(|| version.to_string());
        }
    }

    versions
}
