//! Environment-variable overrides.

use std::collections::HashMap;

use crate::ConfigResult;
use crate::settings::{NodeEnv, PartialConfig};

pub const NODE_ENV: &str = "NODE_ENV";
pub const APP_DOMAIN: &str = "APP_DOMAIN";
pub const AWS_REGION: &str = "AWS_REGION";
pub const AWS_ACCOUNT_ID: &str = "AWS_ACCOUNT_ID";
pub const AWS_CERTIFICATE_ARN: &str = "AWS_CERTIFICATE_ARN";
pub const GITHUB_INFRA_OWNER: &str = "GITHUB_INFRA_OWNER";
pub const GITHUB_INFRA_REPOSITORY: &str = "GITHUB_INFRA_REPOSITORY";
pub const GITHUB_CONDUIT_SERVER_OWNER: &str = "GITHUB_CONDUIT_SERVER_OWNER";
pub const GITHUB_CONDUIT_SERVER_REPOSITORY: &str = "GITHUB_CONDUIT_SERVER_REPOSITORY";

/// Abstraction over environment-variable lookups so tests can supply
/// their own values instead of mutating the process environment.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Read every recognised variable. Empty values count as unset.
pub fn read_env<E: EnvSource>(env: &E) -> ConfigResult<PartialConfig> {
    let get = |key: &str| env.get(key).filter(|v| !v.trim().is_empty());

    let node_env = match get(NODE_ENV) {
        Some(value) => Some(value.parse::<NodeEnv>()?),
        None => None,
    };

    Ok(PartialConfig {
        node_env,
        app_domain: get(APP_DOMAIN),
        region: get(AWS_REGION),
        account_id: get(AWS_ACCOUNT_ID),
        certificate_arn: get(AWS_CERTIFICATE_ARN),
        infra_owner: get(GITHUB_INFRA_OWNER),
        infra_repository: get(GITHUB_INFRA_REPOSITORY),
        conduit_server_owner: get(GITHUB_CONDUIT_SERVER_OWNER),
        conduit_server_repository: get(GITHUB_CONDUIT_SERVER_REPOSITORY),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_read_all_variables() {
        let vars = env(&[
            (NODE_ENV, "develop"),
            (AWS_REGION, "us-east-1"),
            (AWS_ACCOUNT_ID, "111111111111"),
            (GITHUB_INFRA_OWNER, "acme"),
            (GITHUB_INFRA_REPOSITORY, "conduit-infra"),
            (GITHUB_CONDUIT_SERVER_OWNER, "acme"),
            (GITHUB_CONDUIT_SERVER_REPOSITORY, "conduit-server"),
        ]);

        let config = read_env(&vars).unwrap().resolve().unwrap();
        assert_eq!(config.node_env, NodeEnv::Develop);
        assert_eq!(config.github.conduit_server.owner, "acme");
        assert!(config.app_domain.is_none());
    }

    #[test]
    fn test_empty_values_are_unset() {
        let vars = env(&[(AWS_REGION, ""), (APP_DOMAIN, "  ")]);
        let partial = read_env(&vars).unwrap();
        assert!(partial.region.is_none());
        assert!(partial.app_domain.is_none());
    }

    #[test]
    fn test_invalid_node_env() {
        let vars = env(&[(NODE_ENV, "production")]);
        assert!(read_env(&vars).is_err());
    }
}
