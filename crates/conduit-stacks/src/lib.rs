//! Stack declarations and synthesis for the Conduit infrastructure.
//!
//! Provides:
//! - One stack per unit: storage, role, queue and CI/CD
//! - The `App` that orders and synthesizes stacks
//! - The composition root wiring units together
//! - A best-effort diagram of the composed graph

pub mod app;
pub mod cicd;
pub mod compose;
pub mod diagram;
pub mod queue;
pub mod role;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

pub use app::{App, CloudAssembly};
pub use cicd::{CicdStack, CicdStackProps};
pub use compose::{Composition, Synthesis, compose, synthesize};
pub use queue::QueueStack;
pub use role::RoleStack;
pub use storage::StorageStack;
