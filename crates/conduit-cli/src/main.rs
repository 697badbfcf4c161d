//! Conduit infrastructure CLI.

use clap::{Parser, Subcommand};
use conduit_config::ConfigLoader;
use conduit_stacks::diagram::{DiagramConfig, DiagramFormat, FilterPreset, Theme};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "conduit-infra")]
#[command(about = "Declare and synthesize the Conduit infrastructure", long_about = None)]
struct Cli {
    /// Path to the KDL configuration file
    #[arg(long, global = true, env = "CONDUIT_CONFIG")]
    config: Option<PathBuf>,

    /// Path to a .env file loaded before reading the environment
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize every stack into a cloud assembly
    Synth {
        /// Output directory
        #[arg(long, short, default_value = "cdk.out")]
        output: PathBuf,
        /// Skip the diagram report
        #[arg(long)]
        no_diagram: bool,
    },
    /// List stacks in deploy order
    List,
    /// Render the stack diagram only
    Diagram {
        /// Output directory
        #[arg(long, short, default_value = "cdk.out")]
        output: PathBuf,
        /// Output format (dot, png or svg)
        #[arg(long, default_value = "png")]
        format: DiagramFormat,
        /// Color theme (light or dark)
        #[arg(long, default_value = "light")]
        theme: Theme,
        /// Elements to draw (compact hides outputs, none hides nothing)
        #[arg(long, default_value = "compact")]
        filter: FilterPreset,
    },
    /// Load and validate the configuration
    Validate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cli.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_config_file(path);
    }
    if let Some(path) = &cli.env_file {
        loader = loader.with_env_file(path);
    }

    match cli.command {
        Commands::Synth { output, no_diagram } => {
            commands::synth::run(&loader, &output, !no_diagram).await?;
        }
        Commands::List => {
            commands::list(&loader)?;
        }
        Commands::Diagram {
            output,
            format,
            theme,
            filter,
        } => {
            let diagram_config = DiagramConfig {
                format,
                theme,
                filter,
                ..DiagramConfig::default()
            };
            commands::diagram::run(&loader, &output, diagram_config).await?;
        }
        Commands::Validate => {
            commands::validate(&loader)?;
        }
    }

    Ok(())
}
