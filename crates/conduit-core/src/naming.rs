//! Resource naming.
//!
//! Every declared name hangs off a single prefix built from the application
//! name, the runtime environment and the account id, so two environments
//! (or two accounts) never collide without any manual coordination.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Literal application name at the root of every prefix.
pub const APP_NAME: &str = "conduit";

/// `<app>-<environment>-<account>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
pub struct ResourcePrefix(String);

impl ResourcePrefix {
    pub fn new(app: &str, environment: &str, account_id: &str) -> Self {
        Self(format!("{app}-{environment}-{account_id}"))
    }

    /// Prefix for the Conduit application itself.
    pub fn conduit(environment: &str, account_id: &str) -> Self {
        Self::new(APP_NAME, environment, account_id)
    }

    /// `<prefix>-<suffix>`
    pub fn scoped(&self, suffix: &str) -> String {
        format!("{}-{}", self.0, suffix)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Stack names, one per deployable unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackNames {
    pub api: String,
    pub storage: String,
    pub role: String,
    pub cicd: String,
    pub lambda: String,
    pub queue: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleNames {
    pub lambda_default_execution: String,
    pub code_pipeline: String,
    pub code_build: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketNames {
    pub artifact_bucket: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueNames {
    pub task: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineNames {
    pub build_config: String,
    pub app_deploy: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineProjectNames {
    pub build_config: String,
    pub app_deploy: String,
}

/// Logical names of secrets that are managed outside this repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretNames {
    pub github_token: String,
    pub database_config: String,
    pub jwt_secret: String,
}

/// All names derived from one prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Names {
    pub prefix: ResourcePrefix,
    pub stacks: StackNames,
    pub roles: RoleNames,
    pub buckets: BucketNames,
    pub queues: QueueNames,
    pub pipelines: PipelineNames,
    pub pipeline_projects: PipelineProjectNames,
    pub secrets: SecretNames,
}

impl Names {
    pub fn new(prefix: ResourcePrefix) -> Self {
        let p = &prefix;
        Self {
            stacks: StackNames {
                api: p.scoped("api-stack"),
                storage: p.scoped("storage-stack"),
                role: p.scoped("role-stack"),
                cicd: p.scoped("cicd-stack"),
                lambda: p.scoped("lambda-stack"),
                queue: p.scoped("queue-stack"),
            },
            roles: RoleNames {
                lambda_default_execution: p.scoped("default-lambda-execution-role"),
                code_pipeline: p.scoped("codepipeline-role"),
                code_build: p.scoped("codebuild-role"),
            },
            buckets: BucketNames {
                artifact_bucket: p.scoped("artifact-bucket"),
            },
            queues: QueueNames {
                task: p.scoped("task-queue"),
            },
            pipelines: PipelineNames {
                build_config: p.scoped("build-config-pipeline"),
                app_deploy: p.scoped("app-deploy-pipeline"),
            },
            pipeline_projects: PipelineProjectNames {
                build_config: p.scoped("build-config-pipeline-project"),
                app_deploy: p.scoped("app-deploy-pipeline-project"),
            },
            secrets: SecretNames {
                github_token: format!("{p}/github-token"),
                database_config: format!("{p}/database-config"),
                jwt_secret: format!("{p}/jwt-secret"),
            },
            prefix,
        }
    }

    /// Names for the Conduit application in one environment and account.
    pub fn conduit(environment: &str, account_id: &str) -> Self {
        Self::new(ResourcePrefix::conduit(environment, account_id))
    }
}
