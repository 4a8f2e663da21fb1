//! Ecosystem resolvers: package name → source repository URL.
//!
//! Each ecosystem is resolved against its public, unauthenticated registry
//! API. Resolvers only know how to find a repository URL in their
//! registry's metadata shape; everything they find is funnelled through
//! [`normalize_repo_url`] so that callers always see a plain
//! `https://host/owner/repo` form.
//!
//! | Ecosystem | Source of truth |
//! |---|---|
//! | node | `GET {npm}/{name}/latest` → `repository`, then forge `homepage`/`bugs` |
//! | go | module path itself for forge hosts; otherwise `?go-get=1` meta tag |
//! | python | `GET {pypi}/pypi/{name}[/{version}]/json` → `project_urls` |
//! | rust | `GET {crates}/api/v1/crates/{name}` → `repository`, forge `homepage` |
//! | ruby | `GET {rubygems}/api/v1/gems/{name}.json` → `source_code_uri` ... |
//!
//! Response bodies are read incrementally and rejected once they exceed
//! [`MAX_RESPONSE_BYTES`].

mod crates;
mod go;
mod normalize;
mod npm;
mod pypi;
mod rubygems;

pub use normalize::{is_forge_url, normalize_repo_url};

use anyhow::{Context, Result};
use std::sync::Arc;
use thiserror::Error;

use crate::constants::{MAX_RESPONSE_BYTES, REGISTRY_REQUEST_TIMEOUT, USER_AGENT};
use crate::models::Ecosystem;

/// Why a single package could not be resolved.
///
/// These never abort a batch; the resolver records the package as
/// unresolvable and moves on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The registry has no such package, or it declares no usable repository
    #[error("package '{name}' not found or has no repository")]
    NotFound {
        /// Package that was looked up
        name: String,
    },

    /// The registry refused the request for rate or abuse limits
    #[error("registry rate limited the request (HTTP {status})")]
    RateLimited {
        /// HTTP status returned
        status: u16,
    },

    /// Transport failure, unexpected status, oversize or undecodable body
    #[error("bad registry response: {reason}")]
    BadResponse {
        /// Human-readable cause
        reason: String,
    },
}

impl ResolveError {
    /// Attribute a `NotFound` to the package being resolved rather than
    /// the last URL segment.
    pub(crate) fn for_package(self, name: &str) -> Self {
        match self {
            Self::NotFound { .. } => Self::NotFound {
                name: name.to_string(),
            },
            other => other,
        }
    }

    /// Shorthand for a package with no usable repository.
    pub(crate) fn not_found(name: &str) -> Self {
        Self::NotFound {
            name: name.to_string(),
        }
    }
}

/// Base URLs of the public registries.
///
/// Overridable so tests can point every ecosystem at a local mock server.
#[derive(Debug, Clone)]
pub struct RegistryEndpoints {
    /// npm registry root
    pub npm: String,
    /// PyPI root
    pub pypi: String,
    /// crates.io root
    pub crates: String,
    /// RubyGems root
    pub rubygems: String,
    /// When set, Go vanity discovery fetches `{base}/{module}?go-get=1`
    /// instead of `https://{module}?go-get=1`.
    pub go_discovery_base: Option<String>,
}

impl Default for RegistryEndpoints {
    fn default() -> Self {
        Self {
            npm: "https://registry.npmjs.org".to_string(),
            pypi: "https://pypi.org".to_string(),
            crates: "https://crates.io".to_string(),
            rubygems: "https://rubygems.org".to_string(),
            go_discovery_base: None,
        }
    }
}

impl RegistryEndpoints {
    /// Point every registry at one base URL (used with mock servers).
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            npm: base.clone(),
            pypi: base.clone(),
            crates: base.clone(),
            rubygems: base.clone(),
            go_discovery_base: Some(base),
        }
    }
}

/// HTTP client shared by all ecosystem resolvers.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct RegistryClient {
    http: reqwest::Client,
    endpoints: Arc<RegistryEndpoints>,
}

impl RegistryClient {
    /// Client against the public registries.
    pub fn new() -> Result<Self> {
        Self::with_endpoints(RegistryEndpoints::default())
    }

    /// Client against custom registry endpoints.
    pub fn with_endpoints(endpoints: RegistryEndpoints) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REGISTRY_REQUEST_TIMEOUT)
            .build()
            .context("Failed to build registry HTTP client")?;
        Ok(Self {
            http,
            endpoints: Arc::new(endpoints),
        })
    }

    /// Endpoints this client talks to.
    pub fn endpoints(&self) -> &RegistryEndpoints {
        &self.endpoints
    }

    /// Resolve `name` in `ecosystem` to a normalized repository URL.
    ///
    /// `version` is only a hint; registries that expose a cheaper
    /// version-specific document use it.
    pub async fn resolve(
        &self,
        ecosystem: Ecosystem,
        name: &str,
        version: Option<&str>,
    ) -> Result<String, ResolveError> {
        tracing::debug!(target: "resolver", "Looking up {} package '{}'", ecosystem, name);
        match ecosystem {
            Ecosystem::Node => npm::resolve(self, name).await,
            Ecosystem::Go => go::resolve(self, name).await,
            Ecosystem::Python => pypi::resolve(self, name, version).await,
            Ecosystem::Rust => crates::resolve(self, name).await,
            Ecosystem::Ruby => rubygems::resolve(self, name).await,
        }
    }

    pub(crate) async fn get_json(&self, url: &str) -> Result<serde_json::Value, ResolveError> {
        let body = self.get_capped(url).await?;
        serde_json::from_slice(&body).map_err(|e| ResolveError::BadResponse {
            reason: format!("invalid JSON from {url}: {e}"),
        })
    }

    pub(crate) async fn get_text(&self, url: &str) -> Result<String, ResolveError> {
        let body = self.get_capped(url).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// GET `url`, mapping status codes and capping the body size.
    async fn get_capped(&self, url: &str) -> Result<Vec<u8>, ResolveError> {
        let mut response = self.http.get(url).send().await.map_err(|e| {
            ResolveError::BadResponse {
                reason: format!("request to {url} failed: {e}"),
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
            return Err(ResolveError::NotFound {
                name: url.rsplit('/').next().unwrap_or(url).to_string(),
            });
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ResolveError::RateLimited {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(ResolveError::BadResponse {
                reason: format!("HTTP {} from {url}", status.as_u16()),
            });
        }

        if let Some(len) = response.content_length()
            && len as usize > MAX_RESPONSE_BYTES
        {
            return Err(ResolveError::BadResponse {
                reason: format!("response from {url} exceeds {MAX_RESPONSE_BYTES} bytes"),
            });
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| ResolveError::BadResponse {
            reason: format!("reading body from {url} failed: {e}"),
        })? {
            if body.len() + chunk.len() > MAX_RESPONSE_BYTES {
                return Err(ResolveError::BadResponse {
                    reason: format!("response from {url} exceeds {MAX_RESPONSE_BYTES} bytes"),
                });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

/// Pick the first plausible repository URL from candidate metadata values.
///
/// `preferred` values are accepted whenever they normalize to a URL; the
/// remaining `fallbacks` only when they point at a recognized forge.
pub(crate) fn pick_repo_url<'a>(
    preferred: impl IntoIterator<Item = &'a str>,
    fallbacks: impl IntoIterator<Item = &'a str>,
) -> Option<String> {
    preferred
        .into_iter()
        .filter_map(normalize_repo_url)
        .find(|url| url.starts_with("https://"))
        .or_else(|| {
            fallbacks
                .into_iter()
                .filter_map(normalize_repo_url)
                .find(|url| is_forge_url(url))
        })
}
