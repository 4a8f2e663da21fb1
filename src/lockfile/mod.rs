//! Lock-file readers recovering exact installed versions.
//!
//! Each reader turns the text of one lock-file format into a mapping from
//! package name to exact version. Readers are pure and forgiving:
//!
//! - a missing file yields `None`, never an error
//! - malformed lines or entries are skipped silently
//! - local references (`workspace:`, `file:`, `link:` ...) are not versions
//!   and never appear in the result
//!
//! When several lock files coexist in one project, [`read_locked_versions`]
//! walks a fixed priority order for the ecosystem and returns the first
//! format that yields any entries. Formats are never merged.
//!
//! # Supported formats
//!
//! | Ecosystem | Files (priority order) |
//! |---|---|
//! | node | `bun.lock`, `package-lock.json`, `yarn.lock`, `pnpm-lock.yaml` |
//! | go | `go.sum` |
//! | python | `poetry.lock`, `uv.lock` |
//! | rust | `Cargo.lock` |
//! | ruby | `Gemfile.lock` |

mod bun;
mod cargo;
mod gemfile;
mod gosum;
mod npm;
mod pnpm;
mod python;
mod yarn;

use std::collections::HashMap;
use std::path::Path;

use crate::models::Ecosystem;

/// Package name → exact installed version.
pub type LockedVersions = HashMap<String, String>;

/// A lock-file format known to groundwork.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockFormat {
    /// `bun.lock` (JSON with line comments and trailing commas)
    Bun,
    /// `package-lock.json` (npm v2/v3 `packages`, v1 `dependencies`)
    PackageLock,
    /// `yarn.lock` (classic `version "x"` and berry `version: x`)
    Yarn,
    /// `pnpm-lock.yaml`
    Pnpm,
    /// `go.sum`
    GoSum,
    /// `poetry.lock`
    Poetry,
    /// `uv.lock`
    Uv,
    /// `Cargo.lock`
    Cargo,
    /// `Gemfile.lock`
    Gemfile,
}

impl LockFormat {
    /// File name the format is stored under in the project root.
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Bun => "bun.lock",
            Self::PackageLock => "package-lock.json",
            Self::Yarn => "yarn.lock",
            Self::Pnpm => "pnpm-lock.yaml",
            Self::GoSum => "go.sum",
            Self::Poetry => "poetry.lock",
            Self::Uv => "uv.lock",
            Self::Cargo => "Cargo.lock",
            Self::Gemfile => "Gemfile.lock",
        }
    }

    /// Fixed priority order of formats for an ecosystem.
    pub const fn priority(ecosystem: Ecosystem) -> &'static [Self] {
        match ecosystem {
            Ecosystem::Node => &[Self::Bun, Self::PackageLock, Self::Yarn, Self::Pnpm],
            Ecosystem::Go => &[Self::GoSum],
            Ecosystem::Python => &[Self::Poetry, Self::Uv],
            Ecosystem::Rust => &[Self::Cargo],
            Ecosystem::Ruby => &[Self::Gemfile],
        }
    }

    /// Parse lock-file text in this format.
    pub fn parse_str(self, content: &str) -> LockedVersions {
        match self {
            Self::Bun => bun::parse(content),
            Self::PackageLock => npm::parse(content),
            Self::Yarn => yarn::parse(content),
            Self::Pnpm => pnpm::parse(content),
            Self::GoSum => gosum::parse(content),
            Self::Poetry | Self::Uv => python::parse(content),
            Self::Cargo => cargo::parse(content),
            Self::Gemfile => gemfile::parse(content),
        }
    }

    /// Read and parse this format from `project_root`.
    ///
    /// Returns `None` when the file does not exist or cannot be read.
    pub fn read(self, project_root: &Path) -> Option<LockedVersions> {
        let path = project_root.join(self.file_name());
        match std::fs::read_to_string(&path) {
            Ok(content) => Some(self.parse_str(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(target: "lockfile", "Cannot read {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Read exact versions for `ecosystem` from the first lock file that yields entries.
///
/// Returns `None` when no lock file exists or every present one is empty.
pub fn read_locked_versions(project_root: &Path, ecosystem: Ecosystem) -> Option<LockedVersions> {
    for format in LockFormat::priority(ecosystem) {
        if let Some(versions) = format.read(project_root) {
            if versions.is_empty() {
                tracing::debug!(
                    target: "lockfile",
                    "{} present but yielded no entries, trying next format",
                    format.file_name()
                );
                continue;
            }
            tracing::debug!(
                target: "lockfile",
                "Using {} ({} packages)",
                format.file_name(),
                versions.len()
            );
            return Some(versions);
        }
    }
    None
}

/// Split `name@version` at the last `@` that is not at position 0.
///
/// Handles scoped names: `@scope/pkg@1.0.0` → `("@scope/pkg", "1.0.0")`.
/// Returns `None` when there is no separator or either side is empty.
pub fn split_name_version(spec: &str) -> Option<(String, String)> {
    let idx = spec.rfind('@')?;
    if idx == 0 {
        return None;
    }
    let (name, version) = (&spec[..idx], &spec[idx + 1..]);
    if name.is_empty() || version.is_empty() {
        return None;
    }
    Some((name.to_string(), version.to_string()))
}

/// Whether a "version" is really a protocol reference (`workspace:*`, `file:../x`).
pub(crate) fn is_protocol_reference(version: &str) -> bool {
    version.contains(':')
}

/// Normalize a package name for lock-file lookups.
///
/// Python distribution names compare case-insensitively with `-`, `_` and
/// `.` treated as equal; every other ecosystem compares names verbatim.
pub fn lookup_name(ecosystem: Ecosystem, name: &str) -> String {
    match ecosystem {
        Ecosystem::Python => name.to_ascii_lowercase().replace(['_', '.'], "-"),
        _ => name.to_string(),
    }
}
