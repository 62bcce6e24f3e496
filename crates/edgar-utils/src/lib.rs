//! Shared utilities for edgar-analyst
//!
//! Logging setup and small helpers for reading configuration from the
//! environment.

pub mod env;
pub mod logging;

pub use env::{env_opt, env_or, env_parse};
pub use logging::{LogFormat, init_tracing};
