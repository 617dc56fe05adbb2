//! campus-core: shared infrastructure for the campus CMS backend.
//!
//! Typed application errors with HTTP mappings, base configuration,
//! observability bootstrap, and generic middleware shared by services.

pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
