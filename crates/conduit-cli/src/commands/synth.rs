//! Synthesis command.

use anyhow::{Context, Result};
use conduit_config::ConfigLoader;
use conduit_stacks::diagram::{DiagramConfig, GraphvizRenderer};
use conduit_stacks::{compose, synthesize};
use std::path::Path;
use tracing::info;

pub async fn run(loader: &ConfigLoader, output: &Path, with_diagram: bool) -> Result<()> {
    let config = loader.load().context("failed to load configuration")?;
    let composition = compose(&config).context("failed to compose stacks")?;

    let diagram_config = DiagramConfig::default();
    let synthesis = synthesize(
        &composition.app,
        output,
        with_diagram.then_some(&diagram_config),
        &GraphvizRenderer::new(),
    )
    .await
    .with_context(|| format!("failed to synthesize into {}", output.display()))?;

    for name in synthesis.assembly.stack_names() {
        if let Some(path) = synthesis.assembly.template_path(name) {
            println!("{}", path.display());
        }
    }
    if let Some(path) = synthesis.diagram {
        info!(path = %path.display(), "Diagram report complete");
    }

    Ok(())
}
