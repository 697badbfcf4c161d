//! Composition root: instantiates every unit and wires their references.

use conduit_config::Config;
use conduit_core::Result;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::app::{App, CloudAssembly};
use crate::cicd::{CicdStack, CicdStackProps};
use crate::diagram::{DiagramConfig, Renderer, report_best_effort};
use crate::queue::QueueStack;
use crate::role::RoleStack;
use crate::storage::StorageStack;

/// The composed app and the order units were instantiated in.
#[derive(Debug)]
pub struct Composition {
    pub app: App,
    /// Stack names, in instantiation order.
    pub instantiation_log: Vec<String>,
}

/// Instantiate storage, role, queue and CI/CD, in that order.
///
/// Only the exports the CI/CD unit consumes are created.
pub fn compose(config: &Config) -> Result<Composition> {
    let mut app = App::new();
    let mut instantiation_log = Vec::new();

    let mut storage = StorageStack::new(config)?;
    let artifact_bucket_arn = storage.export_artifact_bucket_arn()?;
    instantiation_log.push(storage.stack().name().to_string());

    let mut roles = RoleStack::new(config)?;
    let code_build_role_arn = roles.export_code_build_role_arn()?;
    let code_pipeline_role_arn = roles.export_code_pipeline_role_arn()?;
    instantiation_log.push(roles.stack().name().to_string());

    let queue = QueueStack::new(config)?;
    instantiation_log.push(queue.stack().name().to_string());

    let cicd = CicdStack::new(
        config,
        CicdStackProps {
            artifact_bucket_arn,
            code_build_role_arn,
            code_pipeline_role_arn,
        },
    )?;
    instantiation_log.push(cicd.stack().name().to_string());

    app.add_stack(storage.into_stack())?;
    app.add_stack(roles.into_stack())?;
    app.add_stack(queue.into_stack())?;
    app.add_stack(cicd.into_stack())?;

    info!(stacks = ?instantiation_log, "Composition complete");
    Ok(Composition {
        app,
        instantiation_log,
    })
}

/// Output of [`synthesize`].
#[derive(Debug)]
pub struct Synthesis {
    pub assembly: CloudAssembly,
    /// The diagram file, when the report ran and succeeded.
    pub diagram: Option<PathBuf>,
}

/// Synthesize the app into `out_dir`, then run the diagram report.
///
/// A failed report is logged and leaves the assembly untouched.
pub async fn synthesize(
    app: &App,
    out_dir: &Path,
    diagram: Option<&DiagramConfig>,
    renderer: &dyn Renderer,
) -> Result<Synthesis> {
    let assembly = app.synth(out_dir)?;

    let diagram = match diagram {
        Some(config) => report_best_effort(app, config, out_dir, renderer).await,
        None => None,
    };

    Ok(Synthesis { assembly, diagram })
}
