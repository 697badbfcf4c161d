//! Storage unit: the pipeline artifact bucket.

use conduit_config::Config;
use conduit_core::reference::Bucket;
use conduit_core::template::RemovalPolicy;
use conduit_core::{ExportedArn, Reference, Result, Stack};
use serde_json::json;
use tracing::info;

pub struct StorageStack {
    stack: Stack,
    artifact_bucket: Reference<Bucket>,
}

impl StorageStack {
    pub fn new(config: &Config) -> Result<Self> {
        let names = config.names();
        let mut stack = Stack::new(&names.stacks.storage, config.environment());
        stack.set_description("Conduit artifact storage");

        let artifact_bucket = setup_artifact_bucket(&mut stack, &names.buckets.artifact_bucket)?;

        info!(stack = %stack.name(), bucket = %artifact_bucket.logical_id(), "Storage stack declared");
        Ok(Self {
            stack,
            artifact_bucket,
        })
    }

    pub fn artifact_bucket(&self) -> &Reference<Bucket> {
        &self.artifact_bucket
    }

    /// Export the bucket ARN for consumers in other stacks.
    pub fn export_artifact_bucket_arn(&mut self) -> Result<ExportedArn<Bucket>> {
        self.stack.export_arn(&self.artifact_bucket)
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn into_stack(self) -> Stack {
        self.stack
    }
}

/// Versioned, and kept when removed from the template or replaced.
fn setup_artifact_bucket(stack: &mut Stack, construct_id: &str) -> Result<Reference<Bucket>> {
    stack.add_resource_with_policy(
        construct_id,
        json!({
            "VersioningConfiguration": { "Status": "Enabled" }
        }),
        RemovalPolicy::Retain,
    )
}
