//! Resolved configuration.

use conduit_core::{Environment, Names};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::LazyLock;

use crate::{ConfigError, ConfigResult};

static ACCOUNT_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{12}$").unwrap());

static REGION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}(-[a-z]+)+-\d+$").unwrap());

/// Runtime environment. Also the branch every pipeline tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeEnv {
    Develop,
    Master,
}

impl NodeEnv {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeEnv::Develop => "develop",
            NodeEnv::Master => "master",
        }
    }
}

impl std::fmt::Display for NodeEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NodeEnv {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s {
            "develop" => Ok(NodeEnv::Develop),
            "master" => Ok(NodeEnv::Master),
            other => Err(ConfigError::invalid(
                "node-env",
                format!("expected 'develop' or 'master', got '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsConfig {
    pub region: String,
    pub account_id: String,
    pub certificate_arn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubRepository {
    pub owner: String,
    pub repository: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Repository holding this infrastructure code.
    pub infra: GithubRepository,
    /// Repository holding the application server.
    pub conduit_server: GithubRepository,
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub node_env: NodeEnv,
    pub app_domain: Option<String>,
    pub aws: AwsConfig,
    pub github: GithubConfig,
}

impl Config {
    /// Every resource name for this environment and account.
    pub fn names(&self) -> Names {
        Names::conduit(self.node_env.as_str(), &self.aws.account_id)
    }

    /// Deployment target of every stack.
    pub fn environment(&self) -> Environment {
        Environment::new(&self.aws.account_id, &self.aws.region)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !ACCOUNT_ID_REGEX.is_match(&self.aws.account_id) {
            return Err(ConfigError::invalid(
                "aws.account-id",
                format!("expected 12 digits, got '{}'", self.aws.account_id),
            ));
        }
        if !REGION_REGEX.is_match(&self.aws.region) {
            return Err(ConfigError::invalid(
                "aws.region",
                format!("'{}' is not a region name", self.aws.region),
            ));
        }
        if let Some(arn) = &self.aws.certificate_arn {
            if !arn.starts_with("arn:") {
                return Err(ConfigError::invalid(
                    "aws.certificate-arn",
                    format!("'{arn}' is not an ARN"),
                ));
            }
        }
        if let Some(domain) = &self.app_domain {
            if domain.trim().is_empty() || domain.contains(char::is_whitespace) {
                return Err(ConfigError::invalid("app-domain", "must be a host name"));
            }
        }
        validate_repository("github.infra", &self.github.infra)?;
        validate_repository("github.conduit-server", &self.github.conduit_server)?;
        Ok(())
    }
}

fn validate_repository(field: &str, repo: &GithubRepository) -> ConfigResult<()> {
    if repo.owner.trim().is_empty() {
        return Err(ConfigError::invalid(field, "owner must not be empty"));
    }
    if repo.repository.trim().is_empty() {
        return Err(ConfigError::invalid(field, "repository must not be empty"));
    }
    Ok(())
}

/// Configuration as read from one source. Later sources override earlier
/// ones field by field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialConfig {
    pub node_env: Option<NodeEnv>,
    pub app_domain: Option<String>,
    pub region: Option<String>,
    pub account_id: Option<String>,
    pub certificate_arn: Option<String>,
    pub infra_owner: Option<String>,
    pub infra_repository: Option<String>,
    pub conduit_server_owner: Option<String>,
    pub conduit_server_repository: Option<String>,
}

impl PartialConfig {
    /// Overlay `other` on top of `self`.
    pub fn merge(mut self, other: PartialConfig) -> Self {
        self.node_env = other.node_env.or(self.node_env);
        self.app_domain = other.app_domain.or(self.app_domain);
        self.region = other.region.or(self.region);
        self.account_id = other.account_id.or(self.account_id);
        self.certificate_arn = other.certificate_arn.or(self.certificate_arn);
        self.infra_owner = other.infra_owner.or(self.infra_owner);
        self.infra_repository = other.infra_repository.or(self.infra_repository);
        self.conduit_server_owner = other.conduit_server_owner.or(self.conduit_server_owner);
        self.conduit_server_repository = other
            .conduit_server_repository
            .or(self.conduit_server_repository);
        self
    }

    /// Resolve into a validated `Config`.
    pub fn resolve(self) -> ConfigResult<Config> {
        fn required(value: Option<String>, field: &str) -> ConfigResult<String> {
            value.ok_or_else(|| ConfigError::MissingField(field.to_string()))
        }

        let config = Config {
            node_env: self
                .node_env
                .ok_or_else(|| ConfigError::MissingField("node-env".to_string()))?,
            app_domain: self.app_domain,
            aws: AwsConfig {
                region: required(self.region, "aws.region")?,
                account_id: required(self.account_id, "aws.account-id")?,
                certificate_arn: self.certificate_arn,
            },
            github: GithubConfig {
                infra: GithubRepository {
                    owner: required(self.infra_owner, "github.infra.owner")?,
                    repository: required(self.infra_repository, "github.infra.repository")?,
                },
                conduit_server: GithubRepository {
                    owner: required(self.conduit_server_owner, "github.conduit-server.owner")?,
                    repository: required(
                        self.conduit_server_repository,
                        "github.conduit-server.repository",
                    )?,
                },
            },
        };
        config.validate()?;
        Ok(config)
    }
}
