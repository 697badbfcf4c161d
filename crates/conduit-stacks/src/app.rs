//! The app: every declared stack, their deploy order and synthesis.

use conduit_core::{Error, Result, Stack};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const MANIFEST_VERSION: &str = "36.0.0";
pub const STACK_ARTIFACT_TYPE: &str = "aws:cloudformation:stack";

/// Collection of stacks to synthesize together.
#[derive(Debug, Default)]
pub struct App {
    stacks: Vec<Stack>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stack(&mut self, stack: Stack) -> Result<()> {
        if self.stack(stack.name()).is_some() {
            return Err(Error::Duplicate(format!("stack '{}'", stack.name())));
        }
        debug!(stack = %stack.name(), "Stack added to app");
        self.stacks.push(stack);
        Ok(())
    }

    pub fn stack(&self, name: &str) -> Option<&Stack> {
        self.stacks.iter().find(|s| s.name() == name)
    }

    /// Stacks in insertion order.
    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    /// Stacks ordered so that every stack comes after its dependencies.
    ///
    /// Ties keep insertion order.
    pub fn deploy_order(&self) -> Result<Vec<&Stack>> {
        for stack in &self.stacks {
            for dep in stack.dependencies() {
                if self.stack(dep).is_none() {
                    return Err(Error::UnknownStack(format!(
                        "'{}' (dependency of '{}')",
                        dep,
                        stack.name()
                    )));
                }
            }
        }

        let mut visited: HashMap<&str, bool> = HashMap::new();
        let mut rec_stack: HashMap<&str, bool> = HashMap::new();
        let mut order = Vec::with_capacity(self.stacks.len());

        for stack in &self.stacks {
            if !visited.contains_key(stack.name()) {
                self.visit(stack, &mut visited, &mut rec_stack, &mut order)?;
            }
        }
        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        stack: &'a Stack,
        visited: &mut HashMap<&'a str, bool>,
        rec_stack: &mut HashMap<&'a str, bool>,
        order: &mut Vec<&'a Stack>,
    ) -> Result<()> {
        visited.insert(stack.name(), true);
        rec_stack.insert(stack.name(), true);

        // Dependencies in insertion order, not name order
        for dep in self.stacks.iter().filter(|s| stack.depends_on(s.name())) {
            if !visited.contains_key(dep.name()) {
                self.visit(dep, visited, rec_stack, order)?;
            } else if rec_stack.get(dep.name()).copied().unwrap_or(false) {
                return Err(Error::CycleDetected(format!(
                    "{} -> {}",
                    stack.name(),
                    dep.name()
                )));
            }
        }

        rec_stack.insert(stack.name(), false);
        order.push(stack);
        Ok(())
    }

    /// Write every template and the assembly manifest into `out_dir`.
    pub fn synth(&self, out_dir: &Path) -> Result<CloudAssembly> {
        let order = self.deploy_order()?;
        std::fs::create_dir_all(out_dir)?;

        let mut artifacts = Vec::with_capacity(order.len());
        for stack in order {
            let template = stack.to_json()?;
            let template_file = format!("{}.template.json", stack.name());
            std::fs::write(out_dir.join(&template_file), &template)?;

            let fingerprint = hex::encode(Sha256::digest(template.as_bytes()));
            info!(
                stack = %stack.name(),
                file = %template_file,
                resources = stack.template().resources.len(),
                "Template written"
            );

            artifacts.push(StackArtifact {
                id: stack.name().to_string(),
                artifact_type: STACK_ARTIFACT_TYPE.to_string(),
                environment: stack.environment().uri(),
                properties: StackArtifactProperties {
                    template_file,
                    fingerprint,
                },
                dependencies: stack.dependencies().map(str::to_string).collect(),
            });
        }

        let manifest = Manifest {
            version: MANIFEST_VERSION.to_string(),
            artifacts,
        };
        std::fs::write(
            out_dir.join(MANIFEST_FILE),
            serde_json::to_string_pretty(&manifest)?,
        )?;
        info!(dir = %out_dir.display(), stacks = manifest.artifacts.len(), "Synthesis complete");

        Ok(CloudAssembly {
            directory: out_dir.to_path_buf(),
            manifest,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    /// Stack artifacts in deploy order.
    pub artifacts: Vec<StackArtifact>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackArtifact {
    pub id: String,
    #[serde(rename = "type")]
    pub artifact_type: String,
    /// `aws://<account>/<region>`
    pub environment: String,
    pub properties: StackArtifactProperties,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackArtifactProperties {
    pub template_file: String,
    /// Hex sha256 of the template file.
    pub fingerprint: String,
}

/// Result of synthesis: where it was written and what it contains.
#[derive(Debug, Clone)]
pub struct CloudAssembly {
    pub directory: PathBuf,
    pub manifest: Manifest,
}

impl CloudAssembly {
    pub fn stack_names(&self) -> impl Iterator<Item = &str> {
        self.manifest.artifacts.iter().map(|a| a.id.as_str())
    }

    pub fn template_path(&self, stack: &str) -> Option<PathBuf> {
        self.manifest
            .artifacts
            .iter()
            .find(|a| a.id == stack)
            .map(|a| self.directory.join(&a.properties.template_file))
    }
}
