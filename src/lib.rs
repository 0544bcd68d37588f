//! flatcms - a small flat-file content manager.
//!
//! Documents are plain files in one directory; accounts live in an
//! append-only YAML credential file.
//!
//! - [`cms`]: the framework-agnostic core (validation, storage, rendering,
//!   credentials, sign-in gate)
//! - [`server`]: the axum HTTP layer on top of it
//! - [`config`]: configuration loading

pub mod cms;
pub mod config;
pub mod server;

pub use config::{Config, ConfigError};
