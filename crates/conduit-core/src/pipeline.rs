//! Pipeline and build project definitions.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::buildspec::BuildSpec;
use crate::{Result, Token};

pub const SOURCE_STAGE: &str = "Source";
pub const BUILD_STAGE: &str = "Build";

/// Standard Linux build image, version 7.0.
pub const STANDARD_7_0_IMAGE: &str = "aws/codebuild/standard:7.0";

/// When the source action starts the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GitHubTrigger {
    /// Never started by repository changes; runs only when started externally.
    None,
    /// The pipeline polls the repository for changes.
    Poll,
}

impl GitHubTrigger {
    pub fn poll_for_source_changes(&self) -> bool {
        matches!(self, GitHubTrigger::Poll)
    }

    pub fn is_automatic(&self) -> bool {
        !matches!(self, GitHubTrigger::None)
    }
}

impl std::fmt::Display for GitHubTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitHubTrigger::None => write!(f, "none"),
            GitHubTrigger::Poll => write!(f, "poll"),
        }
    }
}

/// Fetch a branch from a GitHub repository.
#[derive(Debug, Clone, PartialEq)]
pub struct GitHubSourceAction {
    pub action_name: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    /// Dynamic reference to the access token.
    pub oauth_token: String,
    pub output: String,
    pub trigger: GitHubTrigger,
}

/// Run a build project over an input artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeBuildAction {
    pub action_name: String,
    pub project: Token,
    pub input: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    GitHubSource(GitHubSourceAction),
    CodeBuild(CodeBuildAction),
}

impl Action {
    pub fn name(&self) -> &str {
        match self {
            Action::GitHubSource(a) => &a.action_name,
            Action::CodeBuild(a) => &a.action_name,
        }
    }

    fn to_properties(&self) -> Value {
        match self {
            Action::GitHubSource(a) => json!({
                "ActionTypeId": {
                    "Category": "Source",
                    "Owner": "ThirdParty",
                    "Provider": "GitHub",
                    "Version": "1"
                },
                "Configuration": {
                    "Owner": a.owner,
                    "Repo": a.repo,
                    "Branch": a.branch,
                    "OAuthToken": a.oauth_token,
                    "PollForSourceChanges": a.trigger.poll_for_source_changes()
                },
                "Name": a.action_name,
                "OutputArtifacts": [{ "Name": a.output }],
                "RunOrder": 1
            }),
            Action::CodeBuild(a) => json!({
                "ActionTypeId": {
                    "Category": "Build",
                    "Owner": "AWS",
                    "Provider": "CodeBuild",
                    "Version": "1"
                },
                "Configuration": {
                    "ProjectName": a.project
                },
                "InputArtifacts": [{ "Name": a.input }],
                "Name": a.action_name,
                "RunOrder": 1
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub name: String,
    pub actions: Vec<Action>,
}

/// A pipeline: named stages run in sequence, storing artifacts in a bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineDefinition {
    pub name: String,
    pub role_arn: Token,
    pub artifact_bucket: Token,
    pub stages: Vec<Stage>,
}

impl PipelineDefinition {
    /// Name of the artifact an action produces, unique within the pipeline.
    pub fn artifact_name(stage: &str, action: &str) -> String {
        format!("Artifact_{stage}_{action}")
    }

    /// Whether any source action starts the pipeline on repository changes.
    pub fn triggers_automatically(&self) -> bool {
        self.source_actions().any(|a| a.trigger.is_automatic())
    }

    pub fn source_actions(&self) -> impl Iterator<Item = &GitHubSourceAction> {
        self.stages
            .iter()
            .flat_map(|s| s.actions.iter())
            .filter_map(|a| match a {
                Action::GitHubSource(source) => Some(source),
                Action::CodeBuild(_) => None,
            })
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn to_properties(&self) -> Value {
        let stages: Vec<Value> = self
            .stages
            .iter()
            .map(|stage| {
                json!({
                    "Actions": stage.actions.iter().map(Action::to_properties).collect::<Vec<_>>(),
                    "Name": stage.name
                })
            })
            .collect();

        json!({
            "ArtifactStore": {
                "Location": self.artifact_bucket,
                "Type": "S3"
            },
            "Name": self.name,
            "RoleArn": self.role_arn,
            "Stages": stages
        })
    }
}

/// Build environment of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildEnvironment {
    pub image: String,
    pub compute_type: String,
    pub privileged: bool,
}

impl Default for BuildEnvironment {
    fn default() -> Self {
        Self {
            image: STANDARD_7_0_IMAGE.to_string(),
            compute_type: "BUILD_GENERAL1_SMALL".to_string(),
            privileged: false,
        }
    }
}

/// A build project driven by a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildProjectDefinition {
    pub environment: BuildEnvironment,
    pub service_role: Token,
    pub buildspec: BuildSpec,
}

impl BuildProjectDefinition {
    pub fn to_properties(&self) -> Result<Value> {
        Ok(json!({
            "Artifacts": { "Type": "CODEPIPELINE" },
            "EncryptionKey": "alias/aws/s3",
            "Environment": {
                "ComputeType": self.environment.compute_type,
                "Image": self.environment.image,
                "ImagePullCredentialsType": "CODEBUILD",
                "PrivilegedMode": self.environment.privileged,
                "Type": "LINUX_CONTAINER"
            },
            "ServiceRole": self.service_role,
            "Source": {
                "BuildSpec": self.buildspec.to_json()?,
                "Type": "CODEPIPELINE"
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildspec::PhaseKind;

    fn source(trigger: GitHubTrigger) -> Action {
        Action::GitHubSource(GitHubSourceAction {
            action_name: "GitHubSource".to_string(),
            owner: "acme".to_string(),
            repo: "infra".to_string(),
            branch: "develop".to_string(),
            oauth_token: "{{resolve:secretsmanager:token:SecretString:::}}".to_string(),
            output: PipelineDefinition::artifact_name(SOURCE_STAGE, "GitHubSource"),
            trigger,
        })
    }

    fn pipeline(trigger: GitHubTrigger) -> PipelineDefinition {
        PipelineDefinition {
            name: "deploy".to_string(),
            role_arn: Token::import_value("role:Arn"),
            artifact_bucket: Token::literal("bucket"),
            stages: vec![
                Stage {
                    name: SOURCE_STAGE.to_string(),
                    actions: vec![source(trigger)],
                },
                Stage {
                    name: BUILD_STAGE.to_string(),
                    actions: vec![Action::CodeBuild(CodeBuildAction {
                        action_name: "Build".to_string(),
                        project: Token::Ref("Project".to_string()),
                        input: PipelineDefinition::artifact_name(SOURCE_STAGE, "GitHubSource"),
                    })],
                },
            ],
        }
    }

    #[test]
    fn test_manual_trigger_disables_polling() {
        let p = pipeline(GitHubTrigger::None);
        assert!(!p.triggers_automatically());

        let props = p.to_properties();
        let config = &props["Stages"][0]["Actions"][0]["Configuration"];
        assert_eq!(config["PollForSourceChanges"], false);
        assert_eq!(config["Branch"], "develop");
    }

    #[test]
    fn test_poll_trigger_is_automatic() {
        let p = pipeline(GitHubTrigger::Poll);
        assert!(p.triggers_automatically());
        let props = p.to_properties();
        assert_eq!(
            props["Stages"][0]["Actions"][0]["Configuration"]["PollForSourceChanges"],
            true
        );
    }

    #[test]
    fn test_build_action_consumes_source_output() {
        let props = pipeline(GitHubTrigger::None).to_properties();
        let source_out = &props["Stages"][0]["Actions"][0]["OutputArtifacts"][0]["Name"];
        let build_in = &props["Stages"][1]["Actions"][0]["InputArtifacts"][0]["Name"];
        assert_eq!(source_out, build_in);
        assert_eq!(build_in, "Artifact_Source_GitHubSource");
        assert_eq!(props["RoleArn"], json!({"Fn::ImportValue": "role:Arn"}));
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(pipeline(GitHubTrigger::None).stage_names(), vec!["Source", "Build"]);
    }

    #[test]
    fn test_build_project_embeds_buildspec() {
        let project = BuildProjectDefinition {
            environment: BuildEnvironment::default(),
            service_role: Token::import_value("role:Arn"),
            buildspec: BuildSpec::new().with_phase(PhaseKind::Build, ["yarn build"]),
        };
        let props = project.to_properties().unwrap();
        assert_eq!(props["Environment"]["Image"], "aws/codebuild/standard:7.0");
        assert_eq!(props["Environment"]["PrivilegedMode"], false);

        let embedded: BuildSpec =
            serde_json::from_str(props["Source"]["BuildSpec"].as_str().unwrap()).unwrap();
        assert_eq!(embedded, project.buildspec);
    }
}
