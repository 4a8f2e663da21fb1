//! Test utilities for groundwork.
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration suite.
//!
//! ```rust,no_run
//! use groundwork::test_utils::{init_test_logging, story};
//!
//! init_test_logging(None);
//! let story = story("US-1", "Settings page", &["ui"]);
//! assert_eq!(story.tags, vec!["ui"]);
//! ```

pub mod git_helper;

pub use git_helper::TestGit;

use std::path::Path;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::models::{CachedResource, UnitOfWork};

static INIT_LOGGING: Once = Once::new();

/// Initialize tracing for tests, once per process.
///
/// Uses `level` when given, otherwise `RUST_LOG`; with neither, tests run
/// without a subscriber.
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// A unit of work with only an id, a title and tags.
pub fn story(id: &str, title: &str, tags: &[&str]) -> UnitOfWork {
    UnitOfWork {
        id: id.to_string(),
        title: title.to_string(),
        tags: tags.iter().map(|t| (*t).to_string()).collect(),
        ..Default::default()
    }
}

/// A cached resource at `<root>/<name>@<version>`, directory created.
pub fn cached_resource(root: &Path, name: &str, version: &str) -> CachedResource {
    let path = root.join(crate::utils::safe_dir_name(&format!("{name}@{version}")));
    let _ = std::fs::create_dir_all(&path);
    CachedResource {
        name: name.to_string(),
        version: version.to_string(),
        path,
        url: format!("https://github.com/example/{name}"),
        ref_name: Some(format!("v{version}")),
        commit: "1".repeat(40),
    }
}
