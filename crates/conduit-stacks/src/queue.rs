//! Queue unit: the task queue.
//!
//! Nothing in this repository produces to or consumes from the queue yet.

use conduit_config::Config;
use conduit_core::reference::Queue;
use conduit_core::template::RemovalPolicy;
use conduit_core::{Reference, Result, Stack};
use serde_json::json;
use tracing::info;

pub struct QueueStack {
    stack: Stack,
    task_queue: Reference<Queue>,
}

impl QueueStack {
    pub fn new(config: &Config) -> Result<Self> {
        let names = config.names();
        let mut stack = Stack::new(&names.stacks.queue, config.environment());
        stack.set_description("Conduit task queue");

        let task_queue = setup_task_queue(&mut stack, &names.queues.task)?;

        info!(stack = %stack.name(), queue = %names.queues.task, "Queue stack declared");
        Ok(Self { stack, task_queue })
    }

    pub fn task_queue(&self) -> &Reference<Queue> {
        &self.task_queue
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn into_stack(self) -> Stack {
        self.stack
    }
}

/// Provider-default delivery settings; only the name is fixed.
fn setup_task_queue(stack: &mut Stack, queue_name: &str) -> Result<Reference<Queue>> {
    stack.add_resource_with_policy(
        queue_name,
        json!({ "QueueName": queue_name }),
        RemovalPolicy::Delete,
    )
}
