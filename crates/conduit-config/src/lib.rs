//! Configuration loading for the Conduit infrastructure.
//!
//! This crate handles:
//! - The resolved `Config` threaded through every unit constructor
//! - KDL configuration files (conduit.kdl)
//! - `.env` files and process environment overrides
//! - Validation of account, region and repository settings

pub mod env;
pub mod error;
pub mod file;
pub mod loader;
pub mod settings;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use settings::{AwsConfig, Config, GithubConfig, GithubRepository, NodeEnv, PartialConfig};
