//! Integration tests for groundwork.
//!
//! These exercise the pipeline stages together through the public library
//! API, using local stand-ins for everything external:
//!
//! - `resolve_pipeline`: registries served by a `mockito` server
//! - `sync_pipeline`: framework remotes are local repositories built with
//!   [`groundwork::test_utils::TestGit`]
//! - `selection`: relevance scoring over cached checkouts
//! - `consultation`: `sh` scripts standing in for the reasoning process
//! - `cli`: the `groundwork` binary via `assert_cmd`
//!
//! Run with `cargo test --test integration`. Set `RUST_LOG=debug` to see the
//! pipeline's tracing output.

mod cli;
#[cfg(unix)]
mod consultation;
mod resolve_pipeline;
mod selection;
mod sync_pipeline;
