mod config;
mod seed;

use clap::{Args, Parser, Subcommand, ValueEnum};
use config::FileConfig;
use podbalancer_client::{ApiClient, Client, ObjectStore, StorageObjectStore};
use podbalancer_rebalancer::{
    InstallType, NodeZoneProbe, Orchestrator, PodDistributionController,
};
use podbalancer_storage::RedbBackend;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "podbalancer",
    about = "Keeps multi-replica workloads spread across availability zones"
)]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true, env = "PODBALANCER_CONFIG")]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(flatten)]
    backend: BackendArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Args)]
struct BackendArgs {
    /// Path to a redb snapshot database (used when --api-url is not set)
    #[arg(long, global = true, default_value = "./podbalancer.redb")]
    data_dir: PathBuf,

    /// Kubernetes API server URL
    #[arg(long, global = true, env = "PODBALANCER_API_URL")]
    api_url: Option<String>,

    /// Bearer token for the API server
    #[arg(long, global = true, env = "PODBALANCER_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[derive(Args)]
struct PassArgs {
    /// Prefix shared by the product namespaces
    #[arg(long, env = "PODBALANCER_NAMESPACE_PREFIX")]
    namespace_prefix: Option<String>,

    /// Installation type: managed, managed-api, self-managed or workshop
    #[arg(long, env = "PODBALANCER_INSTALL_TYPE")]
    install_type: Option<InstallType>,

    /// Detect and log without deleting pods or writing annotations
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run reconcile passes periodically until interrupted
    Run {
        #[command(flatten)]
        pass: PassArgs,
        /// Seconds between passes
        #[arg(long, env = "PODBALANCER_INTERVAL_SECS")]
        interval_secs: Option<u64>,
    },
    /// Run a single reconcile pass; exits non-zero if any error was collected
    Once {
        #[command(flatten)]
        pass: PassArgs,
    },
    /// Print the current workload distribution as JSON without changing anything
    Inspect {
        #[command(flatten)]
        pass: PassArgs,
    },
    /// Load a multi-document YAML snapshot into the redb database
    Load {
        /// YAML file of Nodes, Pods, ReplicaSets, StatefulSets and DeploymentConfigs
        #[arg(long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let file_config = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };

    match cli.command {
        Commands::Run {
            pass,
            interval_secs,
        } => run_controller(&cli.backend, &file_config, pass, interval_secs).await,
        Commands::Once { pass } => run_once(&cli.backend, &file_config, pass).await,
        Commands::Inspect { pass } => run_inspect(&cli.backend, &file_config, pass).await,
        Commands::Load { file } => run_load(&cli.backend, &file).await,
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

/// Open the object store selected on the command line
fn open_store(backend: &BackendArgs) -> miette::Result<Arc<dyn ObjectStore>> {
    if let Some(api_url) = &backend.api_url {
        info!("Using API server at {}", api_url);
        let client = ApiClient::new(api_url);
        let client = match &backend.token {
            Some(token) => client.with_token(token.clone()),
            None => client,
        };
        return Ok(Arc::new(client));
    }

    info!("Using redb snapshot at {}", backend.data_dir.display());
    let storage = RedbBackend::new(&backend.data_dir)
        .map_err(|e| miette::miette!("Failed to open {}: {}", backend.data_dir.display(), e))?;
    Ok(Arc::new(StorageObjectStore::new(Arc::new(storage))))
}

fn build_orchestrator(
    backend: &BackendArgs,
    file_config: &FileConfig,
    dry_run: bool,
) -> miette::Result<Orchestrator> {
    let client = Client::new(open_store(backend)?);
    let probe = Arc::new(NodeZoneProbe::new(client.clone()));
    Ok(Orchestrator::new(
        client,
        probe,
        file_config.rebalancer_config(dry_run),
    ))
}

/// Run the periodic controller until ctrl-c
async fn run_controller(
    backend: &BackendArgs,
    file_config: &FileConfig,
    pass: PassArgs,
    interval_secs: Option<u64>,
) -> miette::Result<()> {
    let orchestrator = Arc::new(build_orchestrator(backend, file_config, pass.dry_run)?);
    let controller_config =
        file_config.controller_config(pass.namespace_prefix, pass.install_type, interval_secs);
    let controller = PodDistributionController::new(orchestrator, controller_config);

    let token = CancellationToken::new();
    let controller_token = token.clone();
    let handle = tokio::spawn(async move {
        if let Err(e) = controller.run(controller_token).await {
            error!("Pod distribution controller error: {}", e);
        }
    });

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| miette::miette!("Failed to listen for ctrl-c: {}", e))?;

    info!("Shutting down gracefully...");
    token.cancel();

    handle
        .await
        .map_err(|e| miette::miette!("Controller task failed: {}", e))?;
    Ok(())
}

/// Run one pass and surface every collected error
async fn run_once(
    backend: &BackendArgs,
    file_config: &FileConfig,
    pass: PassArgs,
) -> miette::Result<()> {
    let orchestrator = build_orchestrator(backend, file_config, pass.dry_run)?;
    let config = file_config.controller_config(pass.namespace_prefix, pass.install_type, None);

    orchestrator
        .reconcile_pod_distribution(&config.namespace_prefix, config.install_type)
        .await
        .into_result()?;

    info!("Pod distribution pass completed without errors");
    Ok(())
}

async fn run_inspect(
    backend: &BackendArgs,
    file_config: &FileConfig,
    pass: PassArgs,
) -> miette::Result<()> {
    let orchestrator = build_orchestrator(backend, file_config, true)?;
    let config = file_config.controller_config(pass.namespace_prefix, pass.install_type, None);

    let report = orchestrator
        .inspect(&config.namespace_prefix, config.install_type)
        .await?;
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| miette::miette!("Failed to render report: {}", e))?;
    println!("{}", json);
    Ok(())
}

async fn run_load(backend: &BackendArgs, file: &Path) -> miette::Result<()> {
    if backend.api_url.is_some() {
        return Err(miette::miette!(
            "load only writes to the redb snapshot; drop --api-url"
        ));
    }

    let data = std::fs::read_to_string(file)
        .map_err(|e| miette::miette!("Failed to read {}: {}", file.display(), e))?;
    let documents = podbalancer_core::from_yaml_documents(&data)?;

    let store = open_store(backend)?;
    let loaded = seed::load_documents(store.as_ref(), documents).await?;
    info!("Loaded {} objects from {}", loaded, file.display());
    Ok(())
}
