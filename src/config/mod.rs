//! Configuration management for groundwork.
//!
//! groundwork has a single, optional, user-wide configuration file
//! (`~/.groundwork/config.toml`, overridable with `--config`). It controls
//! where the cache lives, how wide the resolver pool is, the relevance
//! threshold, and which command answers consultations. See [`GlobalConfig`]
//! for the full schema.

pub mod global;

pub use global::{ConsultConfig, GlobalConfig, RelevanceConfig, ResolverConfig};
