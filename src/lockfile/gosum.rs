//! `go.sum` reader.
//!
//! Each line is `module version hash`. Lines whose version ends in
//! `/go.mod` only record a manifest checksum and do not mean the module was
//! downloaded; they are ignored. When a module appears at several versions
//! the highest one wins, matching minimal version selection.

use std::cmp::Ordering;

use super::LockedVersions;

pub(super) fn parse(content: &str) -> LockedVersions {
    let mut versions = LockedVersions::new();

    for line in content.lines() {
        let mut fields = line.split_whitespace();
        let (Some(module), Some(version), Some(_hash)) = (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        if version.ends_with("/go.mod") || !version.starts_with('v') {
            continue;
        }
        let version = version.trim_end_matches("+incompatible");

        match versions.get(module) {
            Some(existing) if compare_versions(existing, version) != Ordering::Less => {}
            _ => {
                versions.insert(module.to_string(), version.to_string());
            }
        }
    }

    versions
}

/// Compare `vMAJOR.MINOR.PATCH[-pre]` strings numerically.
///
/// A release sorts above any prerelease of the same core version.
fn compare_versions(a: &str, b: &str) -> Ordering {
    let (a_core, a_pre) = split_prerelease(a);
    let (b_core, b_pre) = split_prerelease(b);

    let a_parts = a_core.split('.').map(|p| p.parse::<u64>().unwrap_or(0));
    let b_parts = b_core.split('.').map(|p| p.parse::<u64>().unwrap_or(0));
    match a_parts.cmp(b_parts) {
        Ordering::Equal => match (a_pre, b_pre) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(x), Some(y)) => x.cmp(y),
        },
        other => other,
    }
}

fn split_prerelease(version: &str) -> (&str, Option<&str>) {
    let version = version.trim_start_matches('v');
    match version.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (version, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_go_sum() {
        let content = "\
github.com/gin-gonic/gin v1.9.0 h1:aaa=
github.com/gin-gonic/gin v1.9.0/go.mod h1:bbb=
github.com/gin-gonic/gin v1.9.1 h1:ccc=
github.com/gin-gonic/gin v1.9.1/go.mod h1:ddd=
golang.org/x/net v0.20.0/go.mod h1:eee=
github.com/docker/docker v24.0.7+incompatible h1:fff=
malformed-line
";
        let versions = parse(content);
        assert_eq!(versions.len(), 2);
        assert_eq!(versions["github.com/gin-gonic/gin"], "v1.9.1");
        assert_eq!(versions["github.com/docker/docker"], "v24.0.7");
        assert!(!versions.contains_key("golang.org/x/net"));
    }

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("v1.10.0", "v1.9.9"), Ordering::Greater);
        assert_eq!(compare_versions("v1.0.0-rc.1", "v1.0.0"), Ordering::Less);
        assert_eq!(compare_versions("v2.0.0", "v2.0.0"), Ordering::Equal);
    }
}
