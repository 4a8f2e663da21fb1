//! `Cargo.lock` reader.
//!
//! Registry and git packages carry a `source`; workspace members do not and
//! are skipped.

use serde::Deserialize;

use super::LockedVersions;

#[derive(Deserialize)]
struct CargoLock {
    #[serde(default)]
    package: Vec<LockedPackage>,
}

#[derive(Deserialize)]
struct LockedPackage {
    name: String,
    version: String,
    source: Option<String>,
}

pub(super) fn parse(content: &str) -> LockedVersions {
    let lock: CargoLock = match toml::from_str(content) {
        Ok(lock) => lock,
        Err(e) => {
            tracing::debug!(target: "lockfile", "Cargo.lock parse failed: {}", e);
            return LockedVersions::new();
        }
    };

    let mut versions = LockedVersions::new();
    for package in lock.package {
        if package.source.is_none() {
            continue;
        }
        versions.entry(package.name).or_insert(package.version);
    }
    versions
}
