pub mod agent;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod monitor;
pub mod ninja;
pub mod orchestrator;
pub mod scheduler;
pub mod shutdown;
