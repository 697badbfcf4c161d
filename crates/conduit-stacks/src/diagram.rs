//! Stack diagram report.
//!
//! Renders the composed app as a Graphviz graph: one cluster per stack,
//! one node per resource, and edges for stack dependencies and cross-stack
//! imports. Image formats are produced by the `dot` executable.
//!
//! The report is best-effort. Callers log its errors and carry on.

use async_trait::async_trait;
use conduit_core::template::Template;
use conduit_core::{Stack, Token};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::app::App;

pub const DEFAULT_DIAGRAM_NAME: &str = "conduit-stack-diagram";
pub const DEFAULT_DIAGRAM_TITLE: &str = "Conduit Stack Diagram";

#[derive(Debug, Error)]
pub enum DiagramError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("renderer not found: {0}")]
    RendererNotFound(String),

    #[error("renderer failed: {0}")]
    RendererFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramFormat {
    Dot,
    Png,
    Svg,
}

impl DiagramFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            DiagramFormat::Dot => "dot",
            DiagramFormat::Png => "png",
            DiagramFormat::Svg => "svg",
        }
    }
}

impl std::fmt::Display for DiagramFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for DiagramFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dot" => Ok(DiagramFormat::Dot),
            "png" => Ok(DiagramFormat::Png),
            "svg" => Ok(DiagramFormat::Svg),
            other => Err(format!("unknown diagram format '{}' (expected dot, png or svg)", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

struct Palette {
    background: &'static str,
    cluster: &'static str,
    node: &'static str,
    font: &'static str,
    edge: &'static str,
}

impl std::str::FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme '{}' (expected light or dark)", other)),
        }
    }
}

impl Theme {
    fn palette(&self) -> Palette {
        match self {
            Theme::Light => Palette {
                background: "#ffffff",
                cluster: "#eef2f7",
                node: "#ffffff",
                font: "#222222",
                edge: "#555555",
            },
            Theme::Dark => Palette {
                background: "#1e1e1e",
                cluster: "#2b2b2b",
                node: "#3a3a3a",
                font: "#eeeeee",
                edge: "#aaaaaa",
            },
        }
    }
}

/// Which template elements are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterPreset {
    /// Resources only.
    #[default]
    Compact,
    /// Resources and outputs.
    None,
}

impl FilterPreset {
    fn shows_outputs(&self) -> bool {
        matches!(self, FilterPreset::None)
    }
}

impl std::str::FromStr for FilterPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(FilterPreset::Compact),
            "none" => Ok(FilterPreset::None),
            other => Err(format!("unknown filter preset '{}' (expected compact or none)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramConfig {
    pub name: String,
    pub title: String,
    pub format: DiagramFormat,
    pub theme: Theme,
    pub filter: FilterPreset,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_DIAGRAM_NAME.to_string(),
            title: DEFAULT_DIAGRAM_TITLE.to_string(),
            format: DiagramFormat::Png,
            theme: Theme::Light,
            filter: FilterPreset::Compact,
        }
    }
}

/// Turns a `.dot` file into an image.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(
        &self,
        dot_file: &Path,
        format: DiagramFormat,
        output: &Path,
    ) -> Result<(), DiagramError>;
}

/// Renders through the Graphviz `dot` executable.
pub struct GraphvizRenderer {
    /// Path to dot binary
    dot_bin: String,
}

impl Default for GraphvizRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphvizRenderer {
    pub fn new() -> Self {
        Self::with_binary(std::env::var("DOT_BIN").unwrap_or_else(|_| "dot".to_string()))
    }

    pub fn with_binary(dot_bin: impl Into<String>) -> Self {
        Self {
            dot_bin: dot_bin.into(),
        }
    }
}

#[async_trait]
impl Renderer for GraphvizRenderer {
    async fn render(
        &self,
        dot_file: &Path,
        format: DiagramFormat,
        output: &Path,
    ) -> Result<(), DiagramError> {
        debug!(bin = %self.dot_bin, format = %format, "Running graphviz");

        let result = Command::new(&self.dot_bin)
            .arg(format!("-T{}", format.extension()))
            .arg(dot_file)
            .arg("-o")
            .arg(output)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        let finished = match result {
            Ok(finished) => finished,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DiagramError::RendererNotFound(self.dot_bin.clone()));
            }
            Err(e) => return Err(DiagramError::Io(e)),
        };

        if !finished.status.success() {
            let stderr = String::from_utf8_lossy(&finished.stderr).to_string();
            return Err(DiagramError::RendererFailed(stderr));
        }
        Ok(())
    }
}

/// Write the diagram into `out_dir`, returning the path of the final file.
pub async fn report(
    app: &App,
    config: &DiagramConfig,
    out_dir: &Path,
    renderer: &dyn Renderer,
) -> Result<PathBuf, DiagramError> {
    tokio::fs::create_dir_all(out_dir).await?;

    let dot_file = out_dir.join(format!("{}.dot", config.name));
    tokio::fs::write(&dot_file, render_dot(app, config)).await?;

    if config.format == DiagramFormat::Dot {
        info!(path = %dot_file.display(), "Diagram written");
        return Ok(dot_file);
    }

    let image = out_dir.join(format!("{}.{}", config.name, config.format.extension()));
    renderer.render(&dot_file, config.format, &image).await?;
    info!(path = %image.display(), "Diagram written");
    Ok(image)
}

/// Run the report, logging a failure instead of returning it.
pub async fn report_best_effort(
    app: &App,
    config: &DiagramConfig,
    out_dir: &Path,
    renderer: &dyn Renderer,
) -> Option<PathBuf> {
    match report(app, config, out_dir, renderer).await {
        Ok(path) => Some(path),
        Err(e) => {
            warn!(error = %e, "Diagram report failed");
            None
        }
    }
}

/// Graphviz source for the app.
pub fn render_dot(app: &App, config: &DiagramConfig) -> String {
    let palette = config.theme.palette();
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "digraph {} {{", quote(&config.name));
    let _ = writeln!(out, "  label={};", quote(&config.title));
    let _ = writeln!(out, "  labelloc=t;");
    let _ = writeln!(out, "  compound=true;");
    let _ = writeln!(out, "  rankdir=LR;");
    let _ = writeln!(out, "  bgcolor={};", quote(palette.background));
    let _ = writeln!(out, "  fontcolor={};", quote(palette.font));
    let _ = writeln!(
        out,
        "  node [shape=box, style=\"rounded,filled\", fillcolor={}, fontcolor={}, color={}];",
        quote(palette.node),
        quote(palette.font),
        quote(palette.edge)
    );
    let _ = writeln!(out, "  edge [color={}, fontcolor={}];", quote(palette.edge), quote(palette.font));

    for (index, stack) in app.stacks().iter().enumerate() {
        write_cluster(&mut out, index, stack, config, &palette);
    }

    for stack in app.stacks() {
        for dep in stack.dependencies() {
            let _ = writeln!(
                out,
                "  {} -> {} [style=dashed, label=\"depends on\"];",
                quote(stack.name()),
                quote(dep)
            );
        }
    }

    for consumer in app.stacks() {
        for export_name in consumer.template().imported_exports() {
            let Some((producer, logical_id)) = find_export(app, &export_name) else {
                continue;
            };
            let _ = writeln!(
                out,
                "  {} -> {} [label=\"import\"];",
                quote(&node_id(producer.name(), logical_id)),
                quote(consumer.name())
            );
        }
    }

    out.push_str("}\n");
    out
}

fn write_cluster(out: &mut String, index: usize, stack: &Stack, config: &DiagramConfig, palette: &Palette) {
    let _ = writeln!(out, "  subgraph cluster_{} {{", index);
    let _ = writeln!(out, "    label={};", quote(stack.name()));
    let _ = writeln!(out, "    style=filled;");
    let _ = writeln!(out, "    color={};", quote(palette.cluster));
    let _ = writeln!(out, "    {} [shape=folder, label={}];", quote(stack.name()), quote("stack"));

    for (logical_id, resource) in &stack.template().resources {
        let _ = writeln!(
            out,
            "    {} [label={}];",
            quote(&node_id(stack.name(), logical_id)),
            quote(&format!("{}\\n{}", logical_id, resource.resource_type))
        );
    }

    if config.filter.shows_outputs() {
        for id in stack.template().outputs.keys() {
            let _ = writeln!(
                out,
                "    {} [shape=note, label={}];",
                quote(&node_id(stack.name(), &format!("output/{}", id))),
                quote(id)
            );
        }
    }

    out.push_str("  }\n");
}

/// The stack exporting `export_name` and the resource behind the export.
fn find_export<'a>(app: &'a App, export_name: &str) -> Option<(&'a Stack, &'a str)> {
    app.stacks().iter().find_map(|stack| {
        let template = stack.template();
        template
            .outputs
            .values()
            .find(|o| o.export.as_ref().is_some_and(|e| e.name == export_name))
            .and_then(|o| referenced_resource(&o.value, template))
            .map(|id| (stack, id))
    })
}

fn referenced_resource<'a>(token: &'a Token, template: &Template) -> Option<&'a str> {
    match token {
        Token::Ref(id) | Token::GetAtt { logical_id: id, .. } => {
            template.resources.contains_key(id).then_some(id.as_str())
        }
        Token::Join { parts, .. } => parts.iter().find_map(|p| referenced_resource(p, template)),
        Token::Select { list: inner, .. } | Token::Split { source: inner, .. } => {
            referenced_resource(inner, template)
        }
        Token::Literal(_) | Token::ImportValue(_) => None,
    }
}

fn node_id(stack: &str, id: &str) -> String {
    format!("{}/{}", stack, id)
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::compose;
    use crate::test_support::{FailingRenderer, config};
    use std::sync::Mutex;

    struct RecordingRenderer {
        calls: Mutex<Vec<(PathBuf, DiagramFormat, PathBuf)>>,
    }

    #[async_trait]
    impl Renderer for RecordingRenderer {
        async fn render(
            &self,
            dot_file: &Path,
            format: DiagramFormat,
            output: &Path,
        ) -> Result<(), DiagramError> {
            self.calls
                .lock()
                .unwrap()
                .push((dot_file.to_path_buf(), format, output.to_path_buf()));
            Ok(())
        }
    }

    fn app() -> App {
        compose(&config()).unwrap().app
    }

    #[test]
    fn test_defaults() {
        let config = DiagramConfig::default();
        assert_eq!(config.name, "conduit-stack-diagram");
        assert_eq!(config.title, "Conduit Stack Diagram");
        assert_eq!(config.format, DiagramFormat::Png);
        assert_eq!(config.theme, Theme::Light);
        assert_eq!(config.filter, FilterPreset::Compact);
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("SVG".parse::<DiagramFormat>().unwrap(), DiagramFormat::Svg);
        assert!("jpeg".parse::<DiagramFormat>().is_err());
        assert_eq!("dark".parse::<Theme>().unwrap(), Theme::Dark);
        assert_eq!("none".parse::<FilterPreset>().unwrap(), FilterPreset::None);
        assert!("full".parse::<FilterPreset>().is_err());
    }

    #[test]
    fn test_dark_theme_palette() {
        let app = app();
        let dark = render_dot(
            &app,
            &DiagramConfig {
                theme: Theme::Dark,
                ..DiagramConfig::default()
            },
        );
        assert!(dark.contains("bgcolor=\"#1e1e1e\";"));
        assert!(!dark.contains("bgcolor=\"#ffffff\";"));
    }

    #[test]
    fn test_dot_has_cluster_per_stack() {
        let app = app();
        let dot = render_dot(&app, &DiagramConfig::default());

        assert!(dot.starts_with("digraph \"conduit-stack-diagram\" {"));
        assert!(dot.contains("label=\"Conduit Stack Diagram\";"));
        for index in 0..app.stacks().len() {
            assert!(dot.contains(&format!("subgraph cluster_{} {{", index)));
        }
        assert!(dot.contains("AWS::SQS::Queue"));
    }

    #[test]
    fn test_dot_has_dependency_and_import_edges() {
        let app = app();
        let names = config().names();
        let dot = render_dot(&app, &DiagramConfig::default());

        assert!(dot.contains(&format!(
            "\"{}\" -> \"{}\" [style=dashed",
            names.stacks.cicd, names.stacks.storage
        )));
        assert_eq!(dot.matches("[label=\"import\"]").count(), 3);
    }

    #[test]
    fn test_compact_hides_outputs() {
        let app = app();
        let compact = render_dot(&app, &DiagramConfig::default());
        assert!(!compact.contains("shape=note"));

        let full = render_dot(
            &app,
            &DiagramConfig {
                filter: FilterPreset::None,
                ..DiagramConfig::default()
            },
        );
        assert!(full.contains("shape=note"));
        assert!(full.contains("DefaultLambdaRoleArn"));
    }

    #[tokio::test]
    async fn test_report_dot_only_skips_renderer() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = FailingRenderer;
        let config = DiagramConfig {
            format: DiagramFormat::Dot,
            ..DiagramConfig::default()
        };

        let path = report(&app(), &config, dir.path(), &renderer).await.unwrap();
        assert_eq!(path, dir.path().join("conduit-stack-diagram.dot"));
        assert!(tokio::fs::read_to_string(&path).await.unwrap().contains("digraph"));
    }

    #[tokio::test]
    async fn test_report_renders_image() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = RecordingRenderer {
            calls: Mutex::new(Vec::new()),
        };

        let path = report(&app(), &DiagramConfig::default(), dir.path(), &renderer)
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("conduit-stack-diagram.png"));

        let calls = renderer.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, dir.path().join("conduit-stack-diagram.dot"));
        assert_eq!(calls[0].1, DiagramFormat::Png);
    }

    #[tokio::test]
    async fn test_report_surfaces_renderer_failure() {
        let dir = tempfile::tempdir().unwrap();
        let result = report(&app(), &DiagramConfig::default(), dir.path(), &FailingRenderer).await;
        assert!(matches!(result.unwrap_err(), DiagramError::RendererFailed(_)));
    }

    #[tokio::test]
    async fn test_best_effort_report_swallows_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path =
            report_best_effort(&app(), &DiagramConfig::default(), dir.path(), &FailingRenderer).await;
        assert!(path.is_none());
        // The graph source is still left behind for inspection
        assert!(dir.path().join("conduit-stack-diagram.dot").exists());
    }

    #[tokio::test]
    async fn test_missing_graphviz_binary() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = GraphvizRenderer::with_binary("/nonexistent/dot");
        let result = report(&app(), &DiagramConfig::default(), dir.path(), &renderer).await;
        assert!(matches!(result.unwrap_err(), DiagramError::RendererNotFound(_)));
    }
}
