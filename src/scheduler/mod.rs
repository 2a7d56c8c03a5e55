//! Dispatch ordering for build tasks.
//!
//! The planner turns the build graph into a priority-ordered task list; the
//! queue hands out ready tasks (all dependencies completed) to the execution
//! engine and absorbs retries.

pub mod plan;
pub mod queue;
pub mod task;

pub use plan::plan_tasks;
pub use queue::{RequeueOutcome, TaskQueue};
pub use task::{Task, TaskStatus};
