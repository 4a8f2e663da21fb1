//! `bun.lock` reader.
//!
//! The text lock is JSON with `//` line comments and trailing commas. Each
//! entry under `packages` is an array whose first element is the
//! `name@version` identity, e.g. `"react": ["react@18.2.0", "", {...}, "sha512-..."]`.
//! Keys with a parent path (`next/postcss`) describe nested copies and are
//! skipped so they cannot shadow the top-level version.

use super::{LockedVersions, is_protocol_reference, split_name_version};

pub(super) fn parse(content: &str) -> LockedVersions {
    let mut versions = LockedVersions::new();

    let cleaned = strip_trailing_commas(&strip_line_comments(content));
    let Ok(root) = serde_json::from_str::<serde_json::Value>(&cleaned) else {
        tracing::debug!(target: "lockfile", "bun.lock is not valid JSONC, ignoring");
        return versions;
    };
    let Some(packages) = root.get("packages").and_then(|p| p.as_object()) else {
        return versions;
    };

    for (key, entry) in packages {
        if is_nested_key(key) {
            continue;
        }
        let identity = entry
            .as_array()
            .and_then(|items| items.first())
            .and_then(|first| first.as_str())
            .unwrap_or(key);
        let Some((name, version)) = split_name_version(identity) else {
            continue;
        };
        if is_protocol_reference(&version) {
            continue;
        }
        versions.entry(name).or_insert(version);
    }

    versions
}

/// `a/b` and `@s/a/b` are nested; `a` and `@s/a` are top-level.
fn is_nested_key(key: &str) -> bool {
    let rest = match key.strip_prefix('@') {
        Some(scoped) => match scoped.split_once('/') {
            Some((_, leaf)) => leaf,
            None => return false,
        },
        None => key,
    };
    rest.contains('/')
}

/// Remove `//` comments outside string literals.
fn strip_line_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Remove commas that directly precede `}` or `]` (ignoring whitespace).
fn strip_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        if c == '"' {
            in_string = true;
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
            if matches!(next, Some('}') | Some(']') | None) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
  // bun lockfile
  "lockfileVersion": 1,
  "workspaces": {
    "": {
      "name": "app",
      "dependencies": { "react": "^18.2.0", },
    },
  },
  "packages": {
    "react": ["react@18.2.0", "", { "dependencies": { "loose-envify": "^1.1.0" } }, "sha512-abc"],
    "@tanstack/react-query": ["@tanstack/react-query@5.17.0", "", {}, "sha512-def"],
    "loose-envify": ["loose-envify@1.4.0", "https://registry.npmjs.org/loose-envify/-/loose-envify-1.4.0.tgz", {}, "sha512-ghi"],
    "my-lib": ["my-lib@workspace:packages/lib"],
    "next/postcss": ["postcss@8.4.31", "", {}, "sha512-jkl"],
    "postcss": ["postcss@8.4.35", "", {}, "sha512-mno"], // trailing comment
  },
}
"#;

    #[test]
    fn test_parse_bun_lock() {
        let versions = parse(SAMPLE);
        assert_eq!(versions.len(), 4);
        assert_eq!(versions["react"], "18.2.0");
        assert_eq!(versions["@tanstack/react-query"], "5.17.0");
        assert_eq!(versions["loose-envify"], "1.4.0");
        assert_eq!(versions["postcss"], "8.4.35");
    }

    #[test]
    fn test_workspace_references_are_not_versions() {
        let versions = parse(SAMPLE);
        assert!(!versions.contains_key("my-lib"));
    }

    #[test]
    fn test_urls_inside_strings_survive_comment_stripping() {
        let stripped = strip_line_comments(r#"{"a": "https://x.dev/y"} // c"#);
        assert_eq!(stripped.trim(), r#"{"a": "https://x.dev/y"}"#);
    }

    #[test]
    fn test_garbage_yields_empty() {
        assert!(parse("not json at all {").is_empty());
    }

    #[test]
    fn test_nested_key_detection() {
        assert!(!is_nested_key("react"));
        assert!(!is_nested_key("@scope/pkg"));
        assert!(is_nested_key("next/postcss"));
        assert!(is_nested_key("@scope/pkg/dep"));
    }
}
