//! Shared data models for groundwork operations
//!
//! These types flow through the whole pipeline: declared [`Dependency`]
//! values come in from a manifest reader, the resolver turns them into
//! [`ResolvedDependency`] values, the cache manager tracks them as
//! [`Resource`]s and exposes the ones present on disk as
//! [`CachedResource`]s, and the relevance scorer picks among those for a
//! [`UnitOfWork`]. Consulting the picked frameworks yields a
//! [`ConsultationBatch`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::consult::ConsultError;
use crate::core::GroundworkError;

/// A package-management universe with its own naming and registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    /// npm-style registry (`package.json`)
    Node,
    /// Go modules (`go.mod`)
    Go,
    /// PyPI (`pyproject.toml`, `requirements.txt`)
    Python,
    /// crates.io (`Cargo.toml`)
    Rust,
    /// RubyGems (`Gemfile`)
    Ruby,
}

impl Ecosystem {
    /// All supported ecosystems, in display order.
    pub const ALL: [Self; 5] = [Self::Node, Self::Go, Self::Python, Self::Rust, Self::Ruby];

    /// Canonical identifier used in config, logs and the CLI.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Go => "go",
            Self::Python => "python",
            Self::Rust => "rust",
            Self::Ruby => "ruby",
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Ecosystem {
    type Err = GroundworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "node" | "npm" | "javascript" | "typescript" | "js" | "ts" => Ok(Self::Node),
            "go" | "golang" => Ok(Self::Go),
            "python" | "pypi" | "py" => Ok(Self::Python),
            "rust" | "cargo" | "crates" => Ok(Self::Rust),
            "ruby" | "gem" | "gems" | "rubygems" => Ok(Self::Ruby),
            other => Err(GroundworkError::UnknownEcosystem {
                name: other.to_string(),
            }),
        }
    }
}

/// A declared package reference as read from a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Package name as the ecosystem spells it
    pub name: String,
    /// Raw version specifier (`^1.2.0`, `>=2`, `workspace:*`, ...)
    #[serde(default)]
    pub version: String,
    /// Development-only dependency
    #[serde(default)]
    pub is_dev: bool,
}

impl Dependency {
    /// Create a runtime dependency.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            is_dev: false,
        }
    }

    /// Mark the dependency as development-only.
    #[must_use]
    pub const fn dev(mut self) -> Self {
        self.is_dev = true;
        self
    }

    /// Parse a `name[@specifier]` argument as accepted by the CLI.
    ///
    /// Scoped names keep their leading `@`: `@scope/pkg@^1.0` yields
    /// `("@scope/pkg", "^1.0")`.
    pub fn parse_arg(arg: &str) -> Self {
        match crate::lockfile::split_name_version(arg) {
            Some((name, version)) => Self::new(name, version),
            None => Self::new(arg, ""),
        }
    }
}

/// A dependency mapped to an exact version and a source repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDependency {
    /// Package name
    pub name: String,
    /// Exact version (from a lock file, or the cleaned specifier)
    pub version: String,
    /// Normalized `https://` repository URL
    pub repo_url: String,
    /// Version-control tag matching `version`, when one was found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl ResolvedDependency {
    /// Identity key `name@version` used for dedup, checkouts and the registry.
    pub fn key(&self) -> String {
        package_key(&self.name, &self.version)
    }
}

/// Build the `name@version` identity key.
pub fn package_key(name: &str, version: &str) -> String {
    format!("{name}@{version}")
}

/// A dependency the cache manager has been asked to keep a checkout for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Package name
    pub name: String,
    /// Exact version
    pub version: String,
    /// Repository URL
    pub url: String,
    /// Tag pinned for the checkout, `None` for the default branch
    pub ref_name: Option<String>,
    /// Absolute checkout location
    pub path: PathBuf,
}

impl Resource {
    /// Identity key `name@version`.
    pub fn key(&self) -> String {
        package_key(&self.name, &self.version)
    }
}

/// A resource whose checkout is verified present on disk.
///
/// Recomputed on every query and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedResource {
    /// Package name
    pub name: String,
    /// Exact version
    pub version: String,
    /// Absolute checkout location
    pub path: PathBuf,
    /// Repository URL
    pub url: String,
    /// Tag the checkout is pinned to, if any
    pub ref_name: Option<String>,
    /// Commit currently checked out (empty when unknown)
    pub commit: String,
}

/// The unit of work (story) guidance is requested for.
///
/// Only these fields are read; everything else about a story belongs to
/// the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOfWork {
    /// Stable identifier, part of the guidance cache key
    pub id: String,
    /// Short title
    #[serde(default)]
    pub title: String,
    /// Free-text description
    #[serde(default)]
    pub description: String,
    /// Acceptance criteria, one per entry
    #[serde(default, alias = "acceptanceCriteria")]
    pub acceptance_criteria: Vec<String>,
    /// Free-form tags (`ui`, `database`, ...)
    #[serde(default)]
    pub tags: Vec<String>,
}

impl UnitOfWork {
    /// Lowercased concatenation of title, description and acceptance criteria.
    pub fn search_text(&self) -> String {
        let mut text = String::with_capacity(
            self.title.len() + self.description.len() + self.acceptance_criteria.len() * 32,
        );
        text.push_str(&self.title);
        text.push('\n');
        text.push_str(&self.description);
        for criterion in &self.acceptance_criteria {
            text.push('\n');
            text.push_str(criterion);
        }
        text.to_lowercase()
    }

    /// Text identifying what the guidance is about, hashed into the cache key.
    pub fn descriptive_text(&self) -> String {
        format!("{}\n{}", self.title, self.description)
    }
}

/// One framework's guidance for a unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceConsultation {
    /// Framework (package) name
    pub name: String,
    /// Version of the consulted checkout
    pub version: String,
    /// Extracted guidance text, trimmed
    pub guidance: String,
    /// Wall-clock time spent (zero for cache hits)
    pub duration: Duration,
    /// Whether the guidance came from the consultation cache
    pub cached: bool,
    /// `None` on success
    pub error: Option<ConsultError>,
}

/// A framework whose consultation failed; the caller may inspect the
/// checkout by hand instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackPath {
    /// Framework (package) name
    pub name: String,
    /// Version of the checkout
    pub version: String,
    /// Absolute checkout location
    pub path: PathBuf,
    /// Why the consultation failed
    pub error: ConsultError,
}

/// Partitioned outcome of consulting several frameworks, each side sorted
/// by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsultationBatch {
    /// Successful consultations
    pub consultations: Vec<ResourceConsultation>,
    /// Failed consultations
    pub fallback_paths: Vec<FallbackPath>,
}

impl ConsultationBatch {
    /// Nothing was consulted at all.
    pub fn is_empty(&self) -> bool {
        self.consultations.is_empty() && self.fallback_paths.is_empty()
    }
}
