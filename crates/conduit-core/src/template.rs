//! CloudFormation template model.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::Token;

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// What the provider does with a resource when it leaves the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RemovalPolicy {
    Retain,
    Delete,
}

impl std::fmt::Display for RemovalPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemovalPolicy::Retain => write!(f, "Retain"),
            RemovalPolicy::Delete => write!(f, "Delete"),
        }
    }
}

/// A declared resource.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub properties: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<RemovalPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<RemovalPolicy>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, properties: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties,
            update_replace_policy: None,
            deletion_policy: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Apply the same policy on deletion and on replacement.
    pub fn with_removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.update_replace_policy = Some(policy);
        self.deletion_policy = Some(policy);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Export {
    pub name: String,
}

/// A stack output, optionally exported for other stacks to import.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub value: Token,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<Export>,
}

impl Output {
    pub fn new(value: Token) -> Self {
        Self {
            description: None,
            value,
            export: None,
        }
    }

    pub fn exported_as(mut self, name: impl Into<String>) -> Self {
        self.export = Some(Export { name: name.into() });
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub resources: BTreeMap<String, Resource>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Output>,
}

impl Default for Template {
    fn default() -> Self {
        Self {
            format_version: TEMPLATE_FORMAT_VERSION.to_string(),
            description: None,
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }
}

impl Template {
    /// Every export name imported anywhere in this template.
    pub fn imported_exports(&self) -> Vec<String> {
        let mut found = Vec::new();
        for resource in self.resources.values() {
            collect_imports(&resource.properties, &mut found);
        }
        for output in self.outputs.values() {
            found.extend(output.value.imports().into_iter().map(str::to_string));
        }
        found.sort();
        found.dedup();
        found
    }
}

fn collect_imports(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(name)) = map.get("Fn::ImportValue") {
                out.push(name.clone());
            }
            map.values().for_each(|v| collect_imports(v, out));
        }
        Value::Array(items) => items.iter().for_each(|v| collect_imports(v, out)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_serialization() {
        let resource = Resource::new(
            "AWS::S3::Bucket",
            json!({"VersioningConfiguration": {"Status": "Enabled"}}),
        )
        .with_removal_policy(RemovalPolicy::Retain);

        let value = serde_json::to_value(&resource).unwrap();
        assert_eq!(value["Type"], "AWS::S3::Bucket");
        assert_eq!(value["DeletionPolicy"], "Retain");
        assert_eq!(value["UpdateReplacePolicy"], "Retain");
        assert!(value.get("Metadata").is_none());
    }

    #[test]
    fn test_empty_template_has_format_version() {
        let value = serde_json::to_value(Template::default()).unwrap();
        assert_eq!(value["AWSTemplateFormatVersion"], "2010-09-09");
        assert!(value.get("Outputs").is_none());
        assert_eq!(value["Resources"], json!({}));
    }

    #[test]
    fn test_imported_exports_found_in_nested_properties() {
        let mut template = Template::default();
        template.resources.insert(
            "Pipeline".to_string(),
            Resource::new(
                "AWS::CodePipeline::Pipeline",
                json!({"RoleArn": {"Fn::ImportValue": "role:Arn"}, "Stages": [
                    {"Actions": [{"RoleArn": {"Fn::ImportValue": "role:Arn"}}]}
                ]}),
            ),
        );
        template.outputs.insert(
            "Out".to_string(),
            Output::new(Token::import_value("bucket:Arn")),
        );

        assert_eq!(template.imported_exports(), vec!["bucket:Arn", "role:Arn"]);
    }

    #[test]
    fn test_output_export() {
        let output = Output::new(Token::literal("x")).exported_as("stack:Name");
        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value, json!({"Value": "x", "Export": {"Name": "stack:Name"}}));
    }
}
