use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("build tool query failed: {0}")]
    BuildTool(String),

    #[error("no usable build targets found in {0}")]
    EmptyGraph(PathBuf),

    #[error("build interrupted")]
    Interrupted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
