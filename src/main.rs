//! sandboxd CLI - Sandbox Execution Engine control plane.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use sandboxd::config::{self, EngineConfig};
use sandboxd::manager::SandboxManager;
use sandboxd::runtime::DynRuntime;
use sandboxd::runtime::docker::DockerRuntime;
use sandboxd::server;

#[derive(Parser)]
#[command(name = "sandboxd")]
#[command(about = "Sandbox Execution Engine control plane", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path.
    #[arg(short, long, default_value = "sandboxd.toml")]
    config: PathBuf,

    /// Verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP control plane.
    Serve,

    /// Validate a configuration file without starting anything.
    Validate,

    /// Create a sandbox, run one command against it, print the result, tear it down.
    Exec {
        /// Container image to run the command in.
        #[arg(short, long)]
        image: Option<String>,

        /// Shell command to run.
        command: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Serve => serve(&cli.config).await,
        Commands::Validate => validate_config(&cli.config),
        Commands::Exec { image, command } => exec_once(&cli.config, image, &command).await,
    }
}

fn load_config_or_default(config_path: &PathBuf) -> Result<EngineConfig> {
    if config_path.exists() {
        config::load_config(config_path)
            .with_context(|| format!("failed to load config from {}", config_path.display()))
    } else {
        Ok(EngineConfig::default())
    }
}

async fn serve(config_path: &PathBuf) -> Result<()> {
    let config = load_config_or_default(config_path)?;
    info!("loaded configuration from {}", config_path.display());

    let docker = DockerRuntime::connect(&config.docker)?;
    let runtime: DynRuntime = Arc::new(docker);
    let manager = Arc::new(SandboxManager::new(runtime, &config));

    let result = server::serve(&config.server, manager.clone()).await;
    manager.shutdown().await;
    result
}

fn validate_config(config_path: &PathBuf) -> Result<()> {
    let config = config::load_config(config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    println!(
        "ok: {} (docker_host={:?}, default_image={})",
        config_path.display(),
        config.docker.docker_host,
        config.sandbox.default_image
    );
    Ok(())
}

async fn exec_once(config_path: &PathBuf, image: Option<String>, command: &str) -> Result<()> {
    let config = load_config_or_default(config_path)?;
    let docker = DockerRuntime::connect(&config.docker)?;
    let runtime: DynRuntime = Arc::new(docker);
    let manager = SandboxManager::new(runtime, &config);

    let image = image.unwrap_or_else(|| config.sandbox.default_image.clone());
    let id = manager.create(image, vec![]).await;
    manager.start(&id).await?;

    let result = manager.exec(&id, command, false).await;
    manager.stop(&id, true).await?;

    let (stdout, stderr, exit_code) = result?;
    print!("{stdout}");
    eprint!("{stderr}");
    std::process::exit(exit_code.clamp(0, 255) as i32);
}
