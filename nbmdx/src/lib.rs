//! Expose nbmdx's internal API for use in unit testing. While it *could* be
//! useful, we do not recommend using this API in production code; depend on
//! the `nbmdx-convert` crate instead.
pub mod batch;
pub mod cli;
pub mod config;
pub mod manifest;
