//! CLI command implementations.

pub mod diagram;
pub mod synth;

use anyhow::{Context, Result};
use conduit_config::ConfigLoader;
use conduit_stacks::compose;

pub fn list(loader: &ConfigLoader) -> Result<()> {
    let config = loader.load().context("failed to load configuration")?;
    let composition = compose(&config).context("failed to compose stacks")?;

    for stack in composition.app.deploy_order()? {
        let deps: Vec<&str> = stack.dependencies().collect();
        if deps.is_empty() {
            println!("{}", stack.name());
        } else {
            println!("{} (depends on: {})", stack.name(), deps.join(", "));
        }
    }
    Ok(())
}

pub fn validate(loader: &ConfigLoader) -> Result<()> {
    let config = loader.load().context("configuration is invalid")?;
    let names = config.names();

    println!("Configuration is valid");
    println!("  environment: {}", config.node_env);
    println!("  account:     {}", config.aws.account_id);
    println!("  region:      {}", config.aws.region);
    println!("  prefix:      {}", names.prefix.as_str());
    Ok(())
}
