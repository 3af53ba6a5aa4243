use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use roost_provisioner::{
  BuildParams, DockerCli, InstallOutcome, InstallationRequest, Installer, LocalWorkload,
  ProvisionerConfig,
};

/// Roost - provisioning runner for containerized game-server workloads
#[derive(Parser)]
#[command(name = "roost")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run one installation request against the local Docker daemon
  Install {
    /// Path to the installation request (JSON)
    request_file: PathBuf,

    /// Workload identifier; names the scratch directory
    #[arg(long)]
    workload: String,

    /// Workload storage root, mounted at /mnt/server
    #[arg(long)]
    storage_root: PathBuf,

    /// Memory limit exposed to the script as SERVER_MEMORY
    #[arg(long, default_value_t = 512)]
    memory: u64,

    /// Address exposed to the script as SERVER_IP
    #[arg(long, default_value = "127.0.0.1")]
    ip: String,

    /// Port exposed to the script as SERVER_PORT
    #[arg(long, default_value_t = 25565)]
    port: u16,

    /// Base directory for per-workload scratch areas
    #[arg(long)]
    scratch_root: Option<PathBuf>,

    /// Mirror container output to the console instead of the install log
    #[arg(long)]
    debug_output: bool,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .init();

  let cli = Cli::parse();
  let rt = tokio::runtime::Runtime::new()?;

  match cli.command {
    Commands::Install {
      request_file,
      workload,
      storage_root,
      memory,
      ip,
      port,
      scratch_root,
      debug_output,
    } => rt.block_on(install(
      request_file,
      workload,
      storage_root,
      BuildParams { memory, ip, port },
      scratch_root,
      debug_output,
    )),
  }
}

async fn install(
  request_file: PathBuf,
  workload_id: String,
  storage_root: PathBuf,
  build: BuildParams,
  scratch_root: Option<PathBuf>,
  debug_output: bool,
) -> Result<()> {
  let content = tokio::fs::read_to_string(&request_file)
    .await
    .with_context(|| format!("failed to read request file: {}", request_file.display()))?;
  let request: InstallationRequest = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse request file: {}", request_file.display()))?;

  tokio::fs::create_dir_all(&storage_root)
    .await
    .with_context(|| format!("failed to create storage root: {}", storage_root.display()))?;

  let mut config = ProvisionerConfig {
    debug_output,
    ..ProvisionerConfig::default()
  };
  if let Some(scratch_root) = scratch_root {
    config.scratch_root = scratch_root;
  }

  let workload = Arc::new(LocalWorkload::new(workload_id, storage_root, build));
  let installer = Installer::new(request, workload, Arc::new(DockerCli::new()), config);

  match installer.run().await.context("installation failed")? {
    InstallOutcome::Installed => eprintln!("installation completed"),
    InstallOutcome::NoScript => eprintln!("template has no install script, nothing to do"),
  }
  Ok(())
}
