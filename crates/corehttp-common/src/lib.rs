//! Shared error handling for the corehttp workspace.

pub mod error;

pub use error::{Error, ErrorCode, ErrorContext, Http2ErrorCode, Result};
