//! KDL configuration files.
//!
//! ```kdl
//! node-env "develop"
//! app-domain "conduit.example.com"
//!
//! aws {
//!     region "us-east-1"
//!     account-id "111111111111"
//!     certificate-arn "arn:aws:acm:us-east-1:111111111111:certificate/abc"
//! }
//!
//! github {
//!     infra owner="acme" repository="conduit-infra"
//!     conduit-server owner="acme" repository="conduit-server"
//! }
//! ```

use kdl::{KdlDocument, KdlNode};

use crate::settings::{NodeEnv, PartialConfig};
use crate::{ConfigError, ConfigResult};

/// Parse a configuration file. Fields absent from the file stay unset.
pub fn parse_config(kdl: &str) -> ConfigResult<PartialConfig> {
    let doc: KdlDocument = kdl.parse()?;
    let mut partial = PartialConfig::default();

    for node in doc.nodes() {
        match node.name().value() {
            "node-env" => {
                let value = required_string_arg(node, "node-env")?;
                partial.node_env = Some(value.parse::<NodeEnv>()?);
            }
            "app-domain" => {
                partial.app_domain = Some(required_string_arg(node, "app-domain")?);
            }
            "aws" => parse_aws(node, &mut partial)?,
            "github" => parse_github(node, &mut partial)?,
            _ => {} // Ignore unknown nodes
        }
    }

    Ok(partial)
}

fn parse_aws(node: &KdlNode, partial: &mut PartialConfig) -> ConfigResult<()> {
    let Some(children) = node.children() else {
        return Ok(());
    };

    for child in children.nodes() {
        match child.name().value() {
            "region" => partial.region = Some(required_string_arg(child, "aws.region")?),
            "account-id" => {
                partial.account_id = Some(required_string_arg(child, "aws.account-id")?)
            }
            "certificate-arn" => {
                partial.certificate_arn =
                    Some(required_string_arg(child, "aws.certificate-arn")?)
            }
            _ => {}
        }
    }
    Ok(())
}

fn parse_github(node: &KdlNode, partial: &mut PartialConfig) -> ConfigResult<()> {
    let Some(children) = node.children() else {
        return Ok(());
    };

    for child in children.nodes() {
        match child.name().value() {
            "infra" => {
                partial.infra_owner = get_string_prop(child, "owner");
                partial.infra_repository = get_string_prop(child, "repository");
            }
            "conduit-server" => {
                partial.conduit_server_owner = get_string_prop(child, "owner");
                partial.conduit_server_repository = get_string_prop(child, "repository");
            }
            _ => {}
        }
    }
    Ok(())
}

// Helper functions for extracting values from KDL nodes

fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn required_string_arg(node: &KdlNode, field: &str) -> ConfigResult<String> {
    get_first_string_arg(node).ok_or_else(|| ConfigError::invalid(field, "expected a string value"))
}

fn get_string_prop(node: &KdlNode, name: &str) -> Option<String> {
    node.get(name)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
        node-env "master"
        app-domain "conduit.example.com"

        aws {
            region "eu-west-1"
            account-id "222222222222"
            certificate-arn "arn:aws:acm:eu-west-1:222222222222:certificate/abc"
        }

        github {
            infra owner="acme" repository="conduit-infra"
            conduit-server owner="acme" repository="conduit-server"
        }
    "#;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(FULL).unwrap().resolve().unwrap();
        assert_eq!(config.node_env, NodeEnv::Master);
        assert_eq!(config.app_domain.as_deref(), Some("conduit.example.com"));
        assert_eq!(config.aws.region, "eu-west-1");
        assert_eq!(config.aws.account_id, "222222222222");
        assert!(config.aws.certificate_arn.is_some());
        assert_eq!(config.github.infra.repository, "conduit-infra");
        assert_eq!(config.github.conduit_server.repository, "conduit-server");
    }

    #[test]
    fn test_partial_file_leaves_fields_unset() {
        let partial = parse_config(r#"node-env "develop""#).unwrap();
        assert_eq!(partial.node_env, Some(NodeEnv::Develop));
        assert!(partial.region.is_none());
        assert!(matches!(
            partial.resolve().unwrap_err(),
            ConfigError::MissingField(_)
        ));
    }

    #[test]
    fn test_invalid_node_env() {
        let result = parse_config(r#"node-env "staging""#);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue { .. }
        ));
    }

    #[test]
    fn test_unknown_nodes_ignored() {
        let kdl = r#"
            node-env "develop"
            dashboard "enabled"
            aws {
                region "us-east-1"
                profile "default"
            }
            github {
                website owner="acme" repository="site"
                infra owner="acme" repository="conduit-infra"
            }
        "#;
        let partial = parse_config(kdl).unwrap();
        assert_eq!(partial.region.as_deref(), Some("us-east-1"));
        assert_eq!(partial.infra_repository.as_deref(), Some("conduit-infra"));
        assert!(partial.conduit_server_owner.is_none());
    }

    #[test]
    fn test_malformed_kdl() {
        let result = parse_config("aws {");
        assert!(matches!(result.unwrap_err(), ConfigError::Parse(_)));
    }
}
