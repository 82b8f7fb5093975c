//! Logging and metrics plumbing shared by the workspace.
//!
//! Binaries call [`tracing::initialize`] once at startup, tests use
//! [`tracing::initialize_reentrant`]. Metrics live in the global registry of
//! [`metrics`].

pub mod config;
pub mod metrics;
pub mod tracing;

pub use config::{Config, Format};
