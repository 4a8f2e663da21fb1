//! Global constants used throughout the groundwork codebase.
//!
//! This module contains timeout durations, expiry windows, pool widths and
//! other numeric constants that are used across multiple modules. Defining
//! them centrally makes magic numbers more discoverable.

use std::time::Duration;

/// Name of the registry file inside the cache directory.
pub const REGISTRY_FILE_NAME: &str = "registry.json";

/// Directory (under the cache root) holding one checkout per `name@version`.
pub const REPOS_DIR_NAME: &str = "repos";

/// Directory (under the cache root) holding cached guidance documents.
pub const CONSULTATIONS_DIR_NAME: &str = "consultations";

/// Resolved repository URLs are reused for 30 days.
pub const RESOLVED_URL_TTL_DAYS: i64 = 30;

/// Packages that failed to resolve are not retried for 7 days.
pub const UNRESOLVABLE_TTL_DAYS: i64 = 7;

/// Width of the dependency resolution worker pool.
pub const DEFAULT_RESOLVER_WORKERS: usize = 5;

/// Upper bound on any registry response body (1 MiB).
///
/// Bodies larger than this are rejected as `BadResponse` rather than
/// buffered in full.
pub const MAX_RESPONSE_BYTES: usize = 1024 * 1024;

/// Per-request timeout for registry HTTP calls (15 seconds).
pub const REGISTRY_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// User agent sent to package registries.
pub const USER_AGENT: &str = concat!("groundwork/", env!("CARGO_PKG_VERSION"));

/// Timeout for Git clone operations (120 seconds).
///
/// Clone operations may take longer than fetch, especially
/// for large framework repositories.
pub const GIT_CLONE_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for Git fetch and ls-remote operations (60 seconds).
pub const GIT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Default wall-clock budget for a single consultation subprocess.
pub const DEFAULT_CONSULT_TIMEOUT_SECS: u64 = 120;

/// Grace period for draining output pipes after the consultation process
/// exits or is killed.
pub const PIPE_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Sentinel line opening the guidance block in consultation output.
pub const GUIDANCE_START_MARKER: &str = "<<<GROUNDWORK_GUIDANCE_START>>>";

/// Sentinel line closing the guidance block in consultation output.
pub const GUIDANCE_END_MARKER: &str = "<<<GROUNDWORK_GUIDANCE_END>>>";

/// Token whose presence (case-insensitive) proves the guidance cites source.
pub const CITATION_TOKEN: &str = "source:";

/// Default number of frameworks consulted per unit of work.
pub const DEFAULT_MAX_FRAMEWORKS: usize = 3;

/// Minimum relevance score a resource needs to be consulted.
pub const DEFAULT_MIN_RELEVANCE_SCORE: u32 = 2;

/// Points contributed by a tag-derived candidate match.
pub const TAG_MATCH_POINTS: u32 = 2;

/// Points contributed by each keyword or name-variant hit.
pub const KEYWORD_MATCH_POINTS: u32 = 1;

/// Requested guidance length, lower bound in words.
pub const DEFAULT_GUIDANCE_MIN_WORDS: u32 = 200;

/// Requested guidance length, upper bound in words.
pub const DEFAULT_GUIDANCE_MAX_WORDS: u32 = 400;
