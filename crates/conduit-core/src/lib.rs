//! Core declaration types for the Conduit infrastructure.
//!
//! This crate contains:
//! - Resource naming derived from application, environment and account
//! - Logical ids and CloudFormation tokens
//! - The template model and the `Stack` that owns one
//! - Typed references and cross-stack exports
//! - Pipeline and buildspec definitions
//! - Secret references

pub mod buildspec;
pub mod error;
pub mod id;
pub mod naming;
pub mod pipeline;
pub mod reference;
pub mod secret;
pub mod stack;
pub mod template;
pub mod token;

pub use error::{Error, Result};
pub use id::LogicalId;
pub use naming::{Names, ResourcePrefix};
pub use reference::{ExportedArn, Reference};
pub use stack::{Environment, Stack};
pub use token::Token;
