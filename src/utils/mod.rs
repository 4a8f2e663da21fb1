//! Filesystem helpers shared by the registry, the cache manager and the
//! consultation cache.
//!
//! - [`fs`] - atomic writes, directory sizes, path-safe directory names

pub mod fs;

pub use fs::{atomic_write, dir_size, ensure_dir, remove_dir_all, safe_dir_name};
