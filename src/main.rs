use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use ninja_team::config::OrchestratorConfig;
use ninja_team::ninja::NinjaCli;
use ninja_team::orchestrator::{BuildMode, Orchestrator};
use ninja_team::shutdown::install_shutdown_handler;

#[derive(Parser, Debug)]
#[command(name = "ninja-team")]
#[command(version)]
#[command(about = "Distributed ninja build orchestrator")]
struct Args {
    /// Build mode
    #[arg(long, value_enum, default_value = "single")]
    mode: Mode,

    /// Path to a JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Build directory containing build.ninja
    #[arg(long, default_value = "build")]
    build_dir: PathBuf,

    /// Path to a hosts file (one "host [port]" per line, for distributed mode)
    #[arg(long)]
    hosts: Option<PathBuf>,

    /// Clean the build directory before building
    #[arg(long)]
    clean: bool,

    /// Enable verbose output
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Single,
    Distributed,
}

impl From<Mode> for BuildMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Single => BuildMode::Single,
            Mode::Distributed => BuildMode::Distributed,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let config = OrchestratorConfig::load(args.config.as_deref());
    let shutdown = install_shutdown_handler();

    let tool = Arc::new(NinjaCli::default());
    if args.clean {
        tracing::info!(build_dir = %args.build_dir.display(), "Cleaning build directory");
        tool.clean(&args.build_dir).await;
    }

    let orchestrator = Orchestrator::new(config, args.mode.into(), tool, shutdown);
    orchestrator.discover_agents(args.hosts.as_deref()).await;
    orchestrator.run_build(&args.build_dir).await?;

    Ok(())
}
