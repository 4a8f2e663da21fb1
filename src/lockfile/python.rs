//! `poetry.lock` and `uv.lock` reader.
//!
//! Both are TOML files with a `[[package]]` array of `name`/`version`
//! tables. uv marks the project itself and path installs with an
//! `editable`, `virtual` or `directory` source; those are skipped. Names
//! are normalized the way PyPI compares them.

use serde::Deserialize;

use super::{LockedVersions, lookup_name};
use crate::models::Ecosystem;

#[derive(Deserialize)]
struct PythonLock {
    #[serde(default)]
    package: Vec<LockedPackage>,
}

#[derive(Deserialize)]
struct LockedPackage {
    name: String,
    version: Option<String>,
    #[serde(default)]
    source: Option<toml::Table>,
}

const LOCAL_SOURCE_KEYS: [&str; 4] = ["editable", "virtual", "directory", "path"];

pub(super) fn parse(content: &str) -> LockedVersions {
    let lock: PythonLock = match toml::from_str(content) {
        Ok(lock) => lock,
        Err(e) => {
            tracing::debug!(target: "lockfile", "Python lock parse failed: {}", e);
            return LockedVersions::new();
        }
    };

    let mut versions = LockedVersions::new();
    for package in lock.package {
        let is_local = package
            .source
            .as_ref()
            .is_some_and(|source| LOCAL_SOURCE_KEYS.iter().any(|key| source.contains_key(*key)));
        if is_local {
            continue;
        }
        if let Some(version) = package.version {
            versions.entry(lookup_name(Ecosystem::Python, &package.name)).or_insert(version);
        }
    }
    versions
}
