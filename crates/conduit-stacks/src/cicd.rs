//! CI/CD unit: the config-deploy and app-deploy pipelines.
//!
//! Both pipelines share one shape: a GitHub source stage that never starts
//! on its own, followed by a build stage running a fixed command list.
//! They differ only in the repository they track and what they deploy.
//! The config pipeline redeploys this stack; the app pipeline deploys the
//! lambda and api stacks.

use conduit_config::{Config, GithubRepository};
use conduit_core::buildspec::{BuildSpec, PhaseKind};
use conduit_core::naming::Names;
use conduit_core::pipeline::{
    Action, BUILD_STAGE, BuildEnvironment, BuildProjectDefinition, CodeBuildAction, GitHubSourceAction,
    GitHubTrigger, PipelineDefinition, SOURCE_STAGE, Stage,
};
use conduit_core::reference::{Bucket, BuildProject, Pipeline, Role};
use conduit_core::secret::SecretRef;
use conduit_core::template::Output;
use conduit_core::{ExportedArn, Reference, Result, Stack, Token};
use tracing::{debug, info};

pub const SOURCE_ACTION: &str = "GitHubSource";
pub const BUILD_ACTION: &str = "Build";

pub const BUILD_CONFIG_PIPELINE_OUTPUT: &str = "BuildConfigPipelineArn";
pub const APP_DEPLOY_PIPELINE_OUTPUT: &str = "AppDeployPipelineArn";

const DEPLOY_COMMAND: &str = "yarn deploy";

/// References the CI/CD stack needs from upstream stacks.
#[derive(Debug, Clone)]
pub struct CicdStackProps {
    pub artifact_bucket_arn: ExportedArn<Bucket>,
    pub code_build_role_arn: ExportedArn<Role>,
    pub code_pipeline_role_arn: ExportedArn<Role>,
}

/// Upstream references after import into this stack.
struct ImportedRefs {
    artifact_bucket_name: Token,
    code_build_role_arn: Token,
    pipeline_role_arn: Token,
}

/// A declared pipeline together with its build project.
#[derive(Debug, Clone)]
pub struct DeployPipeline {
    pub pipeline: Reference<Pipeline>,
    pub project: Reference<BuildProject>,
    pub definition: PipelineDefinition,
    pub buildspec: BuildSpec,
}

impl DeployPipeline {
    /// Stacks this pipeline deploys, in command order.
    pub fn deploy_targets(&self) -> Vec<String> {
        deploy_targets(&self.buildspec)
    }
}

pub struct CicdStack {
    stack: Stack,
    build_config_pipeline: DeployPipeline,
    app_deploy_pipeline: DeployPipeline,
}

impl CicdStack {
    pub fn new(config: &Config, props: CicdStackProps) -> Result<Self> {
        let names = config.names();
        let mut stack = Stack::new(&names.stacks.cicd, config.environment());
        stack.set_description("Conduit CI/CD pipelines");

        let imported = convert_exports(&mut stack, &props)?;

        // Updates this infrastructure
        let build_config_pipeline = setup_build_config_pipeline(&mut stack, config, &names, &imported)?;
        // Deploys the application
        let app_deploy_pipeline = setup_app_deploy_pipeline(&mut stack, config, &names, &imported)?;

        info!(
            stack = %stack.name(),
            pipelines = ?[&names.pipelines.build_config, &names.pipelines.app_deploy],
            "CI/CD stack declared"
        );
        Ok(Self {
            stack,
            build_config_pipeline,
            app_deploy_pipeline,
        })
    }

    pub fn build_config_pipeline(&self) -> &DeployPipeline {
        &self.build_config_pipeline
    }

    pub fn app_deploy_pipeline(&self) -> &DeployPipeline {
        &self.app_deploy_pipeline
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn into_stack(self) -> Stack {
        self.stack
    }
}

fn convert_exports(stack: &mut Stack, props: &CicdStackProps) -> Result<ImportedRefs> {
    let artifact_bucket_arn = stack.import_arn(&props.artifact_bucket_arn)?;
    Ok(ImportedRefs {
        artifact_bucket_name: Token::bucket_name_from_arn(artifact_bucket_arn),
        code_build_role_arn: stack.import_arn(&props.code_build_role_arn)?,
        pipeline_role_arn: stack.import_arn(&props.code_pipeline_role_arn)?,
    })
}

fn base_buildspec(config: &Config) -> BuildSpec {
    BuildSpec::new()
        .with_variable("NODE_ENV", config.node_env.as_str())
        .with_variable("AWS_REGION", &config.aws.region)
        .with_variable("AWS_ACCOUNT_ID", &config.aws.account_id)
        .with_artifact_files(["**/*"])
}

fn setup_build_config_pipeline(
    stack: &mut Stack,
    config: &Config,
    names: &Names,
    imported: &ImportedRefs,
) -> Result<DeployPipeline> {
    let buildspec = base_buildspec(config)
        .with_phase(PhaseKind::Install, ["yarn global add aws-cdk", "yarn install"])
        .with_phase(PhaseKind::Build, [deploy_command(&names.stacks.cicd, false)]);

    let pipeline = declare_pipeline(
        stack,
        PipelineSpec {
            pipeline_name: &names.pipelines.build_config,
            project_id: &names.pipeline_projects.build_config,
            repository: &config.github.infra,
            branch: config.node_env.as_str(),
            github_token: SecretRef::from_name(&names.secrets.github_token),
            buildspec,
        },
        imported,
    )?;

    stack.add_output(
        BUILD_CONFIG_PIPELINE_OUTPUT,
        Output::new(pipeline.pipeline.arn()),
    )?;
    Ok(pipeline)
}

fn setup_app_deploy_pipeline(
    stack: &mut Stack,
    config: &Config,
    names: &Names,
    imported: &ImportedRefs,
) -> Result<DeployPipeline> {
    let database_config = SecretRef::from_name(&names.secrets.database_config);
    let jwt_secret = SecretRef::from_name(&names.secrets.jwt_secret);

    let buildspec = base_buildspec(config)
        .with_secret("DATABASE_HOST", &database_config, "host")
        .with_secret("DATABASE_NAME", &database_config, "dbname")
        .with_secret("DATABASE_USER", &database_config, "username")
        .with_secret("DATABASE_PASSWORD", &database_config, "password")
        .with_secret("DATABASE_PORT", &database_config, "port")
        .with_secret("AUTH_JWT_SECRET", &jwt_secret, "")
        .with_phase(
            PhaseKind::Install,
            [
                "yarn global add turbo aws-cdk",
                "yarn install",
                "cd ./infra",
                "yarn install",
                "cd ..",
            ],
        )
        .with_phase(
            PhaseKind::PreBuild,
            ["cd ./packages/core", "yarn db:migrate", "cd ../.."],
        )
        .with_phase(
            PhaseKind::Build,
            ["yarn build", "yarn install --production --frozen-lockfile"],
        )
        .with_phase(
            PhaseKind::PostBuild,
            [
                "cd ./infra".to_string(),
                deploy_command(&names.stacks.lambda, true),
                deploy_command(&names.stacks.api, true),
            ],
        );

    let pipeline = declare_pipeline(
        stack,
        PipelineSpec {
            pipeline_name: &names.pipelines.app_deploy,
            project_id: &names.pipeline_projects.app_deploy,
            repository: &config.github.conduit_server,
            branch: config.node_env.as_str(),
            github_token: SecretRef::from_name(&names.secrets.github_token),
            buildspec,
        },
        imported,
    )?;

    stack.add_output(
        APP_DEPLOY_PIPELINE_OUTPUT,
        Output::new(pipeline.pipeline.arn()),
    )?;
    Ok(pipeline)
}

/// What differs between the two pipelines.
struct PipelineSpec<'a> {
    pipeline_name: &'a str,
    project_id: &'a str,
    repository: &'a GithubRepository,
    branch: &'a str,
    github_token: SecretRef,
    buildspec: BuildSpec,
}

fn declare_pipeline(
    stack: &mut Stack,
    spec: PipelineSpec<'_>,
    imported: &ImportedRefs,
) -> Result<DeployPipeline> {
    let project_definition = BuildProjectDefinition {
        // No Docker builds are needed for deployment
        environment: BuildEnvironment::default(),
        service_role: imported.code_build_role_arn.clone(),
        buildspec: spec.buildspec,
    };
    let project: Reference<BuildProject> =
        stack.add_resource(spec.project_id, project_definition.to_properties()?)?;

    let source_output = PipelineDefinition::artifact_name(SOURCE_STAGE, SOURCE_ACTION);
    let definition = PipelineDefinition {
        name: spec.pipeline_name.to_string(),
        role_arn: imported.pipeline_role_arn.clone(),
        artifact_bucket: imported.artifact_bucket_name.clone(),
        stages: vec![
            Stage {
                name: SOURCE_STAGE.to_string(),
                actions: vec![Action::GitHubSource(GitHubSourceAction {
                    action_name: SOURCE_ACTION.to_string(),
                    owner: spec.repository.owner.clone(),
                    repo: spec.repository.repository.clone(),
                    branch: spec.branch.to_string(),
                    oauth_token: spec.github_token.value(),
                    output: source_output.clone(),
                    trigger: GitHubTrigger::None,
                })],
            },
            Stage {
                name: BUILD_STAGE.to_string(),
                actions: vec![Action::CodeBuild(CodeBuildAction {
                    action_name: BUILD_ACTION.to_string(),
                    project: project.ref_token(),
                    input: source_output,
                })],
            },
        ],
    };
    let pipeline: Reference<Pipeline> =
        stack.add_resource(spec.pipeline_name, definition.to_properties())?;
    debug!(
        pipeline = %definition.name,
        stages = ?definition.stage_names(),
        automatic = definition.triggers_automatically(),
        "Declared pipeline"
    );

    Ok(DeployPipeline {
        pipeline,
        project,
        definition,
        buildspec: project_definition.buildspec,
    })
}

fn deploy_command(stack_name: &str, exclusively: bool) -> String {
    if exclusively {
        format!("{DEPLOY_COMMAND} --exclusively {stack_name}")
    } else {
        format!("{DEPLOY_COMMAND} {stack_name}")
    }
}

/// Stack names named by `yarn deploy` commands, in command order.
pub fn deploy_targets(buildspec: &BuildSpec) -> Vec<String> {
    buildspec
        .commands()
        .into_iter()
        .filter_map(|(_, command)| command.strip_prefix(DEPLOY_COMMAND))
        .filter_map(|args| args.split_whitespace().rev().find(|a| !a.starts_with("--")))
        .map(str::to_string)
        .collect()
}
