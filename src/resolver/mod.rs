//! Dependency resolution: declared dependencies → resolved repositories.
//!
//! [`DependencyResolver::resolve_all`] runs in three phases:
//!
//! 1. **Pin** every dependency to an exact version without touching the
//!    network, using the project's lock file and falling back to stripping
//!    range operators from the declared specifier.
//! 2. **Filter** out what should never be resolved: `@types/*` declarations,
//!    Go `// indirect` entries, local references (`file:`, `workspace:`,
//!    relative paths ...) and names marked unresolvable within the last 7
//!    days.
//! 3. **Look up** repository URLs in a bounded pool
//!    (`buffer_unordered(workers)`). Names with a fresh URL memo in the
//!    registry skip the network. When tag lookup is enabled each task also
//!    asks the remote for the tag matching the pinned version.
//!
//! The pool tasks only read; every registry write (new URL memos,
//! unresolvable markers) is applied serially after the pool has joined.
//! A failed lookup marks that package unresolvable and is otherwise
//! swallowed, so one bad package never aborts the batch. Results are
//! deduplicated by `name@version` and returned sorted by key.

use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use crate::cache::RepoSync;
use crate::constants::DEFAULT_RESOLVER_WORKERS;
use crate::lockfile::{LockedVersions, lookup_name, read_locked_versions};
use crate::models::{Dependency, Ecosystem, ResolvedDependency, package_key};
use crate::registry::ResourceRegistry;
use crate::resolvers::{RegistryClient, ResolveError};

/// Version used when neither a lock file nor the specifier names one.
pub const UNPINNED_VERSION: &str = "latest";

/// Specifier prefixes that point at local code rather than a registry.
const LOCAL_PREFIXES: [&str; 9] =
    ["file:", "link:", "workspace:", "portal:", "path:", "./", "../", "/", "~/"];

/// Resolves dependency lists against the public registries.
pub struct DependencyResolver {
    client: RegistryClient,
    tag_lookup: Option<Arc<dyn RepoSync>>,
    workers: usize,
}

/// A dependency that survived pinning and filtering.
#[derive(Debug, Clone)]
struct Candidate {
    name: String,
    version: String,
    memo_url: Option<String>,
}

/// What one pool task found out.
struct LookupOutcome {
    candidate: Candidate,
    result: Result<(String, Option<String>), ResolveError>,
}

impl DependencyResolver {
    /// Resolver with the default pool width and no tag lookup.
    pub fn new(client: RegistryClient) -> Self {
        Self {
            client,
            tag_lookup: None,
            workers: DEFAULT_RESOLVER_WORKERS,
        }
    }

    /// Set the pool width (at least 1).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Look up the tag matching each pinned version through `sync`.
    #[must_use]
    pub fn with_tag_lookup(mut self, sync: Arc<dyn RepoSync>) -> Self {
        self.tag_lookup = Some(sync);
        self
    }

    /// Resolve `deps` of `ecosystem` declared in the project at `project_root`.
    ///
    /// Never fails: unresolvable packages are recorded in `registry` and
    /// left out of the result.
    pub async fn resolve_all(
        &self,
        deps: &[Dependency],
        ecosystem: Ecosystem,
        project_root: &Path,
        registry: &mut ResourceRegistry,
    ) -> Vec<ResolvedDependency> {
        let locked = read_locked_versions(project_root, ecosystem).unwrap_or_default();
        let candidates = self.candidates(deps, ecosystem, &locked, registry);

        tracing::info!(
            target: "resolver",
            "Resolving {} of {} {} dependencies ({} memoized)",
            candidates.len(),
            deps.len(),
            ecosystem,
            candidates.iter().filter(|c| c.memo_url.is_some()).count()
        );

        let outcomes: Vec<LookupOutcome> = stream::iter(candidates)
            .map(|candidate| self.lookup(ecosystem, candidate))
            .buffer_unordered(self.workers)
            .collect()
            .await;

        // Join barrier passed; apply registry writes serially
        let mut resolved = Vec::new();
        let mut seen = HashSet::new();
        for outcome in outcomes {
            let Candidate {
                name,
                version,
                memo_url,
            } = outcome.candidate;
            match outcome.result {
                Ok((url, tag)) => {
                    if memo_url.is_none() {
                        registry.set_resolved_url(&name, &url);
                    }
                    if seen.insert(package_key(&name, &version)) {
                        resolved.push(ResolvedDependency {
                            name,
                            version,
                            repo_url: url,
                            tag,
                        });
                    }
                }
                Err(e) => {
                    match &e {
                        ResolveError::NotFound { .. } => {
                            tracing::debug!(target: "resolver", "{}: {}", name, e);
                        }
                        _ => tracing::warn!(target: "resolver", "Could not resolve {}: {}", name, e),
                    }
                    registry.mark_unresolvable(&name);
                }
            }
        }

        resolved.sort_by_key(ResolvedDependency::key);
        tracing::info!(target: "resolver", "Resolved {} repositories", resolved.len());
        resolved
    }

    /// Pin, filter and dedup `deps`, attaching memoized URLs.
    fn candidates(
        &self,
        deps: &[Dependency],
        ecosystem: Ecosystem,
        locked: &LockedVersions,
        registry: &mut ResourceRegistry,
    ) -> Vec<Candidate> {
        let mut by_key = BTreeMap::new();

        for dep in deps {
            if let Some(reason) = skip_reason(ecosystem, dep) {
                tracing::trace!(target: "resolver", "Skipping {}: {}", dep.name, reason);
                continue;
            }
            if registry.is_unresolvable(&dep.name) {
                tracing::debug!(target: "resolver", "Skipping {}: recently unresolvable", dep.name);
                continue;
            }

            let version = pin_version(ecosystem, dep, locked);
            let key = package_key(&dep.name, &version);
            if by_key.contains_key(&key) {
                continue;
            }
            let memo_url = registry.get_resolved_url(&dep.name);
            by_key.insert(
                key,
                Candidate {
                    name: dep.name.clone(),
                    version,
                    memo_url,
                },
            );
        }

        by_key.into_values().collect()
    }

    async fn lookup(&self, ecosystem: Ecosystem, candidate: Candidate) -> LookupOutcome {
        let url = match &candidate.memo_url {
            Some(url) => Ok(url.clone()),
            None => {
                let version_hint =
                    (candidate.version != UNPINNED_VERSION).then_some(candidate.version.as_str());
                self.client.resolve(ecosystem, &candidate.name, version_hint).await
            }
        };

        let result = match url {
            Ok(url) => {
                let tag = self.find_tag(&url, &candidate).await;
                Ok((url, tag))
            }
            Err(e) => Err(e),
        };

        LookupOutcome {
            candidate,
            result,
        }
    }

    async fn find_tag(&self, url: &str, candidate: &Candidate) -> Option<String> {
        let sync = self.tag_lookup.as_ref()?;
        if candidate.version == UNPINNED_VERSION {
            return None;
        }
        match sync.find_tag(url, &candidate.name, &candidate.version).await {
            Ok(tag) => tag,
            Err(e) => {
                tracing::debug!(target: "resolver", "Tag lookup for {} failed: {:#}", candidate.name, e);
                None
            }
        }
    }
}

/// Why `dep` must never be resolved, if it must not.
fn skip_reason(ecosystem: Ecosystem, dep: &Dependency) -> Option<&'static str> {
    let spec = dep.version.trim();

    if dep.name.trim().is_empty() {
        return Some("empty name");
    }
    if ecosystem == Ecosystem::Node && dep.name.starts_with("@types/") {
        return Some("type declarations only");
    }
    if ecosystem == Ecosystem::Go && (spec.ends_with("indirect") || spec.contains("+indirect")) {
        return Some("indirect dependency");
    }
    if LOCAL_PREFIXES.iter().any(|prefix| spec.starts_with(prefix)) {
        return Some("local reference");
    }
    None
}

/// Exact version for `dep`: the lock file's, else the cleaned specifier.
fn pin_version(ecosystem: Ecosystem, dep: &Dependency, locked: &LockedVersions) -> String {
    if let Some(version) = locked.get(&lookup_name(ecosystem, &dep.name)) {
        return version.clone();
    }
    clean_specifier(&dep.version).unwrap_or_else(|| UNPINNED_VERSION.to_string())
}

/// Strip range operators (`^ ~ >= <= == != > < =`, plus `~=` and `~>`) and
/// keep the first version in a compound range.
///
/// Returns `None` for wildcards and empty specifiers.
pub fn clean_specifier(spec: &str) -> Option<String> {
    let first = spec
        .split([',', '|'])
        .next()
        .unwrap_or_default()
        .trim()
        .trim_start_matches(['^', '~', '>', '<', '=', '!', ' ']);
    let version = first.split_whitespace().next().unwrap_or_default();

    match version {
        "" | "*" | "x" | "X" | "latest" => None,
        v => Some(v.to_string()),
    }
}
