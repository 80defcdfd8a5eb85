//! reqscope core: metric primitives, text exposition, and the shared error type.
//!
//! This crate holds the parts of the service that must stay bit-compatible
//! with existing dashboards: metric names, bucket layout, label encoding and
//! the scrape text format. It carries no transport or runtime dependencies.
//!
//! Panics, `unwrap`, and `expect` are compile-denied here. All fallible paths
//! surface as `ReqScopeError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod metrics;

/// Shared result type.
pub use error::{Result, ReqScopeError};
