//! Deployable stacks.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeSet;
use tracing::debug;

use crate::id::{HIDDEN_FROM_HUMAN_ID, path_hash};
use crate::reference::{ExportedArn, Reference, ResourceKind};
use crate::template::{Output, RemovalPolicy, Resource, Template};
use crate::{Error, LogicalId, Result, Token};

/// Metadata key recording the construct path of a resource.
pub const PATH_METADATA_KEY: &str = "aws:cdk:path";

/// Target account and region of a stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub account: String,
    pub region: String,
}

impl Environment {
    pub fn new(account: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            region: region.into(),
        }
    }

    /// `aws://<account>/<region>`
    pub fn uri(&self) -> String {
        format!("aws://{}/{}", self.account, self.region)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.uri())
    }
}

/// One independently deployable unit: a name, a target environment, a
/// template and the names of the stacks that must be deployed first.
#[derive(Debug, Clone)]
pub struct Stack {
    name: String,
    environment: Environment,
    template: Template,
    dependencies: BTreeSet<String>,
}

impl Stack {
    pub fn new(name: impl Into<String>, environment: Environment) -> Self {
        Self {
            name: name.into(),
            environment,
            template: Template::default(),
            dependencies: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.template.description = Some(description.into());
    }

    /// Names of the stacks this stack depends on, sorted.
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.dependencies.iter().map(|s| s.as_str())
    }

    pub fn depends_on(&self, stack: &str) -> bool {
        self.dependencies.contains(stack)
    }

    pub fn add_dependency(&mut self, stack: impl Into<String>) -> Result<()> {
        let stack = stack.into();
        if stack == self.name {
            return Err(Error::InvalidInput(format!(
                "stack '{}' cannot depend on itself",
                self.name
            )));
        }
        self.dependencies.insert(stack);
        Ok(())
    }

    /// Declare a resource under `<construct_id>/Resource`.
    pub fn add_resource<K: ResourceKind>(
        &mut self,
        construct_id: &str,
        properties: Value,
    ) -> Result<Reference<K>> {
        self.declare(construct_id, Resource::new(K::CFN_TYPE, properties))
    }

    /// Declare a resource with the same policy on deletion and replacement.
    pub fn add_resource_with_policy<K: ResourceKind>(
        &mut self,
        construct_id: &str,
        properties: Value,
        policy: RemovalPolicy,
    ) -> Result<Reference<K>> {
        let resource = Resource::new(K::CFN_TYPE, properties).with_removal_policy(policy);
        self.declare(construct_id, resource)
    }

    fn declare<K: ResourceKind>(&mut self, construct_id: &str, resource: Resource) -> Result<Reference<K>> {
        let logical_id = self.add_resource_at(&[construct_id, HIDDEN_FROM_HUMAN_ID], resource)?;
        Ok(Reference::new(&self.name, construct_id, logical_id))
    }

    /// Declare a resource at an arbitrary construct path.
    pub fn add_resource_at(&mut self, path: &[&str], mut resource: Resource) -> Result<LogicalId> {
        let logical_id = LogicalId::from_path(path)?;
        if self.template.resources.contains_key(logical_id.as_str()) {
            return Err(Error::Duplicate(format!(
                "resource '{}' in stack '{}'",
                logical_id, self.name
            )));
        }

        let cdk_path = std::iter::once(self.name.as_str())
            .chain(path.iter().copied())
            .collect::<Vec<_>>()
            .join("/");
        resource
            .metadata
            .insert(PATH_METADATA_KEY.to_string(), json!(cdk_path));

        debug!(stack = %self.name, logical_id = %logical_id, resource_type = %resource.resource_type, "Declared resource");
        self.template
            .resources
            .insert(logical_id.to_string(), resource);
        Ok(logical_id)
    }

    pub fn add_output(&mut self, id: &str, output: Output) -> Result<()> {
        let id = LogicalId::literal(id)?;
        if self.template.outputs.contains_key(id.as_str()) {
            return Err(Error::Duplicate(format!(
                "output '{}' in stack '{}'",
                id, self.name
            )));
        }
        self.template.outputs.insert(id.to_string(), output);
        Ok(())
    }

    /// Export the ARN of a resource declared in this stack.
    ///
    /// Exporting the same resource twice returns the existing export.
    pub fn export_arn<K: ResourceKind>(&mut self, reference: &Reference<K>) -> Result<ExportedArn<K>> {
        if reference.stack() != self.name {
            return Err(Error::InvalidInput(format!(
                "cannot export '{}' from stack '{}': it is declared in '{}'",
                reference.logical_id(),
                self.name,
                reference.stack()
            )));
        }

        let logical_id = reference.logical_id().as_str();
        let hash = path_hash(&[self.name.as_str(), logical_id, "Arn"]);
        let output_id = format!("ExportsOutputFnGetAtt{logical_id}Arn{hash}");
        let export_name = format!("{}:{}", self.name, output_id);

        if !self.template.outputs.contains_key(&output_id) {
            debug!(stack = %self.name, export = %export_name, "Exporting ARN");
            self.add_output(
                &output_id,
                Output::new(reference.arn()).exported_as(&export_name),
            )?;
        }

        Ok(ExportedArn::new(&self.name, export_name))
    }

    /// Import an ARN exported by another stack and record the dependency.
    pub fn import_arn<K: ResourceKind>(&mut self, exported: &ExportedArn<K>) -> Result<Token> {
        if exported.producer() == self.name {
            return Err(Error::InvalidInput(format!(
                "stack '{}' cannot import its own export '{}'",
                self.name,
                exported.export_name()
            )));
        }
        self.add_dependency(exported.producer())?;
        debug!(stack = %self.name, export = %exported.export_name(), producer = %exported.producer(), "Importing ARN");
        Ok(Token::import_value(exported.export_name()))
    }

    /// Pretty-printed template JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.template)?)
    }
}
