//! Typed references to declared resources.
//!
//! A [`Reference`] points at a resource inside the stack that declares it.
//! Stacks deploy independently, so a reference never crosses a stack
//! boundary directly: the producing stack exports the ARN and hands out an
//! [`ExportedArn`], and the consuming stack imports it by export name.

use std::fmt;
use std::marker::PhantomData;

use crate::{LogicalId, Token};

/// A kind of resource that can be referenced.
pub trait ResourceKind {
    /// CloudFormation resource type.
    const CFN_TYPE: &'static str;
    /// Short label used in diagrams and logs.
    const LABEL: &'static str;

    /// Token resolving to the resource ARN.
    fn arn(logical_id: &LogicalId) -> Token {
        Token::get_att(logical_id, "Arn")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Queue {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipeline {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildProject {}

impl ResourceKind for Bucket {
    const CFN_TYPE: &'static str = "AWS::S3::Bucket";
    const LABEL: &'static str = "bucket";
}

impl ResourceKind for Role {
    const CFN_TYPE: &'static str = "AWS::IAM::Role";
    const LABEL: &'static str = "role";
}

impl ResourceKind for Queue {
    const CFN_TYPE: &'static str = "AWS::SQS::Queue";
    const LABEL: &'static str = "queue";
}

impl ResourceKind for Pipeline {
    const CFN_TYPE: &'static str = "AWS::CodePipeline::Pipeline";
    const LABEL: &'static str = "pipeline";

    // Pipelines have no Arn attribute; Ref yields the pipeline name.
    fn arn(logical_id: &LogicalId) -> Token {
        Token::format_arn("codepipeline", Token::reference(logical_id))
    }
}

impl ResourceKind for BuildProject {
    const CFN_TYPE: &'static str = "AWS::CodeBuild::Project";
    const LABEL: &'static str = "build project";
}

/// A resource declared in a known stack.
pub struct Reference<K> {
    stack: String,
    construct_id: String,
    logical_id: LogicalId,
    _kind: PhantomData<K>,
}

impl<K: ResourceKind> Reference<K> {
    pub fn new(stack: impl Into<String>, construct_id: impl Into<String>, logical_id: LogicalId) -> Self {
        Self {
            stack: stack.into(),
            construct_id: construct_id.into(),
            logical_id,
            _kind: PhantomData,
        }
    }

    /// Name of the stack that declares the resource.
    pub fn stack(&self) -> &str {
        &self.stack
    }

    pub fn construct_id(&self) -> &str {
        &self.construct_id
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    /// `{"Ref": logical_id}`; only valid inside the declaring stack.
    pub fn ref_token(&self) -> Token {
        Token::reference(&self.logical_id)
    }

    /// ARN token; only valid inside the declaring stack.
    pub fn arn(&self) -> Token {
        K::arn(&self.logical_id)
    }
}

// Manual impls so `K` does not need to satisfy the derive bounds.
impl<K> Clone for Reference<K> {
    fn clone(&self) -> Self {
        Self {
            stack: self.stack.clone(),
            construct_id: self.construct_id.clone(),
            logical_id: self.logical_id.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K> PartialEq for Reference<K> {
    fn eq(&self, other: &Self) -> bool {
        self.stack == other.stack && self.logical_id == other.logical_id
    }
}

impl<K: ResourceKind> fmt::Debug for Reference<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reference")
            .field("kind", &K::LABEL)
            .field("stack", &self.stack)
            .field("logical_id", &self.logical_id)
            .finish()
    }
}

/// An ARN exported by one stack for import by another.
///
/// The export name is the whole contract between the two stacks: the
/// consumer never sees the producer's template, only this name.
pub struct ExportedArn<K> {
    producer: String,
    export_name: String,
    _kind: PhantomData<K>,
}

impl<K: ResourceKind> ExportedArn<K> {
    pub fn new(producer: impl Into<String>, export_name: impl Into<String>) -> Self {
        Self {
            producer: producer.into(),
            export_name: export_name.into(),
            _kind: PhantomData,
        }
    }

    /// Name of the stack that owns the export.
    pub fn producer(&self) -> &str {
        &self.producer
    }

    pub fn export_name(&self) -> &str {
        &self.export_name
    }
}

impl<K> Clone for ExportedArn<K> {
    fn clone(&self) -> Self {
        Self {
            producer: self.producer.clone(),
            export_name: self.export_name.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K> PartialEq for ExportedArn<K> {
    fn eq(&self, other: &Self) -> bool {
        self.producer == other.producer && self.export_name == other.export_name
    }
}

impl<K: ResourceKind> fmt::Debug for ExportedArn<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportedArn")
            .field("kind", &K::LABEL)
            .field("producer", &self.producer)
            .field("export_name", &self.export_name)
            .finish()
    }
}
