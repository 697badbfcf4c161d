//! Diagram command.

use anyhow::{Context, Result};
use conduit_config::ConfigLoader;
use conduit_stacks::compose;
use conduit_stacks::diagram::{DiagramConfig, GraphvizRenderer, report_best_effort};
use std::path::Path;

pub async fn run(loader: &ConfigLoader, output: &Path, diagram_config: DiagramConfig) -> Result<()> {
    let config = loader.load().context("failed to load configuration")?;
    let composition = compose(&config).context("failed to compose stacks")?;

    let renderer = GraphvizRenderer::new();
    if let Some(path) = report_best_effort(&composition.app, &diagram_config, output, &renderer).await {
        println!("{}", path.display());
    }
    Ok(())
}
