//! Build agent tracking and discovery.
//!
//! - [`registry`]: the single source of truth for agent identity, liveness,
//!   and exclusive reservation
//! - [`probe`]: the line-oriented capability probe spoken to remote agents
//! - [`discovery`]: local registration and hosts-file discovery

pub mod discovery;
pub mod probe;
pub mod registry;

pub use registry::{Agent, AgentRegistry, AgentStatus};
