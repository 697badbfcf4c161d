//! Role unit: the identities assumed by the pipeline, build and compute services.

use conduit_config::Config;
use conduit_core::reference::Role;
use conduit_core::template::Output;
use conduit_core::{ExportedArn, Reference, Result, Stack, Token};
use serde_json::{Value, json};
use tracing::info;

pub const LAMBDA_PRINCIPAL: &str = "lambda.amazonaws.com";
pub const CODEBUILD_PRINCIPAL: &str = "codebuild.amazonaws.com";
pub const CODEPIPELINE_PRINCIPAL: &str = "codepipeline.amazonaws.com";

pub const DEFAULT_LAMBDA_ROLE_OUTPUT: &str = "DefaultLambdaRoleArn";

/// The service that may assume a role and the managed policies it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleGrant {
    pub principal: &'static str,
    pub managed_policies: &'static [&'static str],
}

pub const LAMBDA_DEFAULT_EXECUTION_GRANT: RoleGrant = RoleGrant {
    principal: LAMBDA_PRINCIPAL,
    managed_policies: &["service-role/AWSLambdaBasicExecutionRole"],
};

pub const CODEBUILD_GRANT: RoleGrant = RoleGrant {
    principal: CODEBUILD_PRINCIPAL,
    managed_policies: &[
        "AmazonS3FullAccess",
        "AWSCodeBuildDeveloperAccess",
        "AmazonSSMReadOnlyAccess",
        "AWSCodeBuildAdminAccess",
        "IAMFullAccess",
        "AWSCloudFormationFullAccess",
    ],
};

pub const CODEPIPELINE_GRANT: RoleGrant = RoleGrant {
    principal: CODEPIPELINE_PRINCIPAL,
    managed_policies: &["AWSCodePipeline_FullAccess"],
};

pub struct RoleStack {
    stack: Stack,
    default_lambda_role: Reference<Role>,
    code_build_role: Reference<Role>,
    code_pipeline_role: Reference<Role>,
}

impl RoleStack {
    pub fn new(config: &Config) -> Result<Self> {
        let names = config.names();
        let mut stack = Stack::new(&names.stacks.role, config.environment());
        stack.set_description("Conduit service roles");

        let default_lambda_role = create_role(
            &mut stack,
            &names.roles.lambda_default_execution,
            LAMBDA_DEFAULT_EXECUTION_GRANT,
        )?;
        stack.add_output(
            DEFAULT_LAMBDA_ROLE_OUTPUT,
            Output::new(default_lambda_role.arn()),
        )?;

        let code_build_role = create_role(&mut stack, &names.roles.code_build, CODEBUILD_GRANT)?;
        let code_pipeline_role =
            create_role(&mut stack, &names.roles.code_pipeline, CODEPIPELINE_GRANT)?;

        info!(stack = %stack.name(), roles = 3, "Role stack declared");
        Ok(Self {
            stack,
            default_lambda_role,
            code_build_role,
            code_pipeline_role,
        })
    }

    pub fn default_lambda_role(&self) -> &Reference<Role> {
        &self.default_lambda_role
    }

    pub fn code_build_role(&self) -> &Reference<Role> {
        &self.code_build_role
    }

    pub fn code_pipeline_role(&self) -> &Reference<Role> {
        &self.code_pipeline_role
    }

    pub fn export_code_build_role_arn(&mut self) -> Result<ExportedArn<Role>> {
        self.stack.export_arn(&self.code_build_role)
    }

    pub fn export_code_pipeline_role_arn(&mut self) -> Result<ExportedArn<Role>> {
        self.stack.export_arn(&self.code_pipeline_role)
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn into_stack(self) -> Stack {
        self.stack
    }
}

fn create_role(stack: &mut Stack, construct_id: &str, grant: RoleGrant) -> Result<Reference<Role>> {
    let policy_arns: Vec<Token> = grant
        .managed_policies
        .iter()
        .map(|name| Token::managed_policy_arn(name))
        .collect();

    stack.add_resource(
        construct_id,
        json!({
            "AssumeRolePolicyDocument": assume_role_policy(grant.principal),
            "ManagedPolicyArns": policy_arns
        }),
    )
}

/// Trust policy allowing exactly one service principal.
fn assume_role_policy(principal: &str) -> Value {
    json!({
        "Statement": [{
            "Action": "sts:AssumeRole",
            "Effect": "Allow",
            "Principal": { "Service": principal }
        }],
        "Version": "2012-10-17"
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::config;

    fn principals(stack: &Stack, role: &Reference<Role>) -> Vec<String> {
        let resource = &stack.template().resources[role.logical_id().as_str()];
        resource.properties["AssumeRolePolicyDocument"]["Statement"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["Principal"]["Service"].as_str().unwrap().to_string())
            .collect()
    }

    fn policy_count(stack: &Stack, role: &Reference<Role>) -> usize {
        let resource = &stack.template().resources[role.logical_id().as_str()];
        resource.properties["ManagedPolicyArns"]
            .as_array()
            .unwrap()
            .len()
    }

    #[test]
    fn test_each_role_has_exactly_one_principal() {
        let roles = RoleStack::new(&config()).unwrap();
        let stack = roles.stack();

        assert_eq!(principals(stack, roles.default_lambda_role()), vec![LAMBDA_PRINCIPAL]);
        assert_eq!(principals(stack, roles.code_build_role()), vec![CODEBUILD_PRINCIPAL]);
        assert_eq!(
            principals(stack, roles.code_pipeline_role()),
            vec![CODEPIPELINE_PRINCIPAL]
        );
    }

    #[test]
    fn test_three_distinct_roles() {
        let roles = RoleStack::new(&config()).unwrap();
        assert_eq!(roles.stack().template().resources.len(), 3);
        assert_ne!(roles.code_build_role(), roles.code_pipeline_role());
        assert_ne!(roles.code_build_role(), roles.default_lambda_role());
    }

    #[test]
    fn test_managed_policies() {
        let roles = RoleStack::new(&config()).unwrap();
        let stack = roles.stack();
        assert_eq!(policy_count(stack, roles.default_lambda_role()), 1);
        assert_eq!(policy_count(stack, roles.code_build_role()), 6);
        assert_eq!(policy_count(stack, roles.code_pipeline_role()), 1);

        let resource = &stack.template().resources[roles.code_pipeline_role().logical_id().as_str()];
        assert_eq!(
            resource.properties["ManagedPolicyArns"][0]["Fn::Join"][1][2],
            ":iam::aws:policy/AWSCodePipeline_FullAccess"
        );
    }

    #[test]
    fn test_default_lambda_role_output_is_not_exported() {
        let roles = RoleStack::new(&config()).unwrap();
        let output = &roles.stack().template().outputs[DEFAULT_LAMBDA_ROLE_OUTPUT];
        assert!(output.export.is_none());
        assert_eq!(output.value, roles.default_lambda_role().arn());
    }

    #[test]
    fn test_exports_only_the_roles_asked_for() {
        let mut roles = RoleStack::new(&config()).unwrap();
        roles.export_code_build_role_arn().unwrap();
        roles.export_code_pipeline_role_arn().unwrap();

        let exported = roles
            .stack()
            .template()
            .outputs
            .values()
            .filter(|o| o.export.is_some())
            .count();
        assert_eq!(exported, 2);
    }
}
