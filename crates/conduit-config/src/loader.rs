//! Configuration loading from all sources.
//!
//! Precedence, lowest first: the KDL file, the `.env` file, then the
//! process environment. The `.env` file is read into a map and never
//! written into the process environment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::env::{EnvSource, ProcessEnv, read_env};
use crate::file::parse_config;
use crate::settings::{Config, PartialConfig};
use crate::{ConfigError, ConfigResult};

pub const DEFAULT_CONFIG_FILE: &str = "conduit.kdl";

/// Where configuration comes from.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    /// Explicit config file. When unset, `conduit.kdl` is used if present.
    config_file: Option<PathBuf>,
    /// Explicit env file. When unset, `.env` is read if present.
    env_file: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    pub fn with_env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_file = Some(path.into());
        self
    }

    /// Resolve configuration from the file, `.env` and the process environment.
    pub fn load(&self) -> ConfigResult<Config> {
        self.load_with_env(&ProcessEnv)
    }

    /// Resolve configuration from the file, `.env` and the given environment.
    pub fn load_with_env<E: EnvSource>(&self, env: &E) -> ConfigResult<Config> {
        let from_file = self.read_file()?;
        let from_env_file = read_env(&self.read_env_file()?)?;
        let from_env = read_env(env)?;
        let config = from_file.merge(from_env_file).merge(from_env).resolve()?;

        info!(
            node_env = %config.node_env,
            region = %config.aws.region,
            account = %config.aws.account_id,
            "Configuration resolved"
        );
        Ok(config)
    }

    fn read_file(&self) -> ConfigResult<PartialConfig> {
        let (path, explicit) = match &self.config_file {
            Some(path) => (path.as_path(), true),
            None => (Path::new(DEFAULT_CONFIG_FILE), false),
        };

        if !explicit && !path.exists() {
            debug!(path = %path.display(), "No config file, using environment only");
            return Ok(PartialConfig::default());
        }

        let content = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "Read config file");
        parse_config(&content)
    }

    fn read_env_file(&self) -> ConfigResult<HashMap<String, String>> {
        let iter = match &self.env_file {
            Some(path) => dotenvy::from_path_iter(path)?,
            None => match dotenvy::dotenv_iter() {
                Ok(iter) => iter,
                Err(err) if err.not_found() => return Ok(HashMap::new()),
                Err(err) => return Err(ConfigError::EnvFile(err)),
            },
        };

        let vars = iter.collect::<Result<HashMap<_, _>, _>>()?;
        debug!(variables = vars.len(), "Read env file");
        Ok(vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{AWS_REGION, NODE_ENV};
    use crate::settings::NodeEnv;
    use std::io::Write;

    const FILE: &str = r#"
        node-env "develop"
        aws {
            region "us-east-1"
            account-id "111111111111"
        }
        github {
            infra owner="acme" repository="conduit-infra"
            conduit-server owner="acme" repository="conduit-server"
        }
    "#;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_file_only() {
        let file = write_config(FILE);
        let config = ConfigLoader::new()
            .with_config_file(file.path())
            .load_with_env(&HashMap::new())
            .unwrap();
        assert_eq!(config.node_env, NodeEnv::Develop);
        assert_eq!(config.aws.region, "us-east-1");
    }

    #[test]
    fn test_env_overrides_file() {
        let file = write_config(FILE);
        let env: HashMap<String, String> = [
            (NODE_ENV.to_string(), "master".to_string()),
            (AWS_REGION.to_string(), "eu-west-1".to_string()),
        ]
        .into_iter()
        .collect();

        let config = ConfigLoader::new()
            .with_config_file(file.path())
            .load_with_env(&env)
            .unwrap();
        assert_eq!(config.node_env, NodeEnv::Master);
        assert_eq!(config.aws.region, "eu-west-1");
        assert_eq!(config.aws.account_id, "111111111111");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = ConfigLoader::new()
            .with_config_file("/nonexistent/conduit.kdl")
            .load_with_env(&HashMap::new());
        assert!(matches!(result.unwrap_err(), ConfigError::Io(_)));
    }

    #[test]
    fn test_missing_explicit_env_file_is_an_error() {
        let file = write_config(FILE);
        let result = ConfigLoader::new()
            .with_config_file(file.path())
            .with_env_file("/nonexistent/.env")
            .load_with_env(&HashMap::new());
        assert!(matches!(result.unwrap_err(), ConfigError::EnvFile(_)));
    }

    #[test]
    fn test_env_file_sits_between_file_and_environment() {
        let file = write_config(FILE);
        let env_file = write_config("AWS_REGION=eu-west-2\nNODE_ENV=master\n");
        let env: HashMap<String, String> = [(NODE_ENV.to_string(), "develop".to_string())]
            .into_iter()
            .collect();

        let config = ConfigLoader::new()
            .with_config_file(file.path())
            .with_env_file(env_file.path())
            .load_with_env(&env)
            .unwrap();
        // .env overrides the file, the environment overrides .env
        assert_eq!(config.aws.region, "eu-west-2");
        assert_eq!(config.node_env, NodeEnv::Develop);
    }

    #[test]
    fn test_env_file_does_not_touch_process_environment() {
        let file = write_config(FILE);
        let env_file = write_config("CONDUIT_LOADER_MARKER=present\n");

        ConfigLoader::new()
            .with_config_file(file.path())
            .with_env_file(env_file.path())
            .load_with_env(&HashMap::new())
            .unwrap();
        assert!(std::env::var("CONDUIT_LOADER_MARKER").is_err());
    }
}
