//! Shared fixtures for stack tests.

use async_trait::async_trait;
use conduit_config::{AwsConfig, Config, GithubConfig, GithubRepository, NodeEnv};
use std::path::Path;

use crate::diagram::{DiagramError, DiagramFormat, Renderer};

pub fn config() -> Config {
    config_for(NodeEnv::Develop, "111111111111")
}

pub fn config_for(node_env: NodeEnv, account_id: &str) -> Config {
    Config {
        node_env,
        app_domain: None,
        aws: AwsConfig {
            region: "us-east-1".to_string(),
            account_id: account_id.to_string(),
            certificate_arn: None,
        },
        github: GithubConfig {
            infra: GithubRepository {
                owner: "acme".to_string(),
                repository: "conduit-infra".to_string(),
            },
            conduit_server: GithubRepository {
                owner: "acme".to_string(),
                repository: "conduit-server".to_string(),
            },
        },
    }
}

/// Renderer that always fails, as when graphviz is broken.
pub struct FailingRenderer;

#[async_trait]
impl Renderer for FailingRenderer {
    async fn render(&self, _: &Path, _: DiagramFormat, _: &Path) -> Result<(), DiagramError> {
        Err(DiagramError::RendererFailed("boom".to_string()))
    }
}
