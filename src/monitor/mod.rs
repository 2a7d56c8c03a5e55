//! Long-lived observer loops: agent liveness and build progress.

pub mod heartbeat;
pub mod progress;

pub use heartbeat::HeartbeatMonitor;
pub use progress::{BuildSummary, ProgressReporter};
