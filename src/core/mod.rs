//! Core error types and user-facing error reporting.

pub mod error;

pub use error::{ErrorContext, GroundworkError, user_friendly_error};
