/// virtinfra - KubeVirt infrastructure for cluster installs
///
/// Validates install configuration against a KubeVirt infra cluster and tears down
/// the virtual machines, data volumes and secrets a tenant cluster left behind.
mod config;
mod destroy;
mod kubevirt;
mod progress;
mod utils;
mod validation;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kube::ResourceExt;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::InstallConfig;
use crate::destroy::ClusterDestroyer;
use crate::kubevirt::KubevirtClient;
use crate::validation::{field, validate_machine_pool, validate_platform, FieldPath};

#[derive(Parser)]
#[command(name = "virtinfra")]
#[command(about = "Manage KubeVirt infrastructure for tenant clusters", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Install configuration file path
    #[arg(short, long, default_value = "install-config.yaml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate example configuration file
    Init,

    /// Validate the machine pool without contacting the infra cluster
    Validate,

    /// Check the platform configuration against the infra cluster
    Check,

    /// List namespaces on the infra cluster
    Namespaces,

    /// List the cluster's virtual machines, data volumes and secrets
    List,

    /// Delete the cluster's virtual machines, data volumes and secrets
    Destroy {
        /// Only show what would be deleted
        #[arg(long)]
        dry_run: bool,

        /// Print the final operation progress as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("virtinfra={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Execute command
    let result = match cli.command {
        Commands::Init => init_config(&cli).await,
        Commands::Validate => validate_config(&cli),
        Commands::Check => check_platform(&cli).await,
        Commands::Namespaces => list_namespaces(&cli).await,
        Commands::List => list_resources(&cli).await,
        Commands::Destroy { dry_run, json } => destroy_cluster(&cli, dry_run, json).await,
    };

    if let Err(e) = result {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn platform_path() -> FieldPath {
    FieldPath::root("platform").child("kubevirt")
}

async fn connect(config: &InstallConfig) -> Result<KubevirtClient> {
    let kubeconfig_path = config.kubeconfig_path()?;
    info!("Using infra cluster kubeconfig: {}", kubeconfig_path.display());

    KubevirtClient::from_kubeconfig(&kubeconfig_path)
        .await
        .context("Failed to create infra cluster client")
}

/// Initialize example configuration file
async fn init_config(cli: &Cli) -> Result<()> {
    if cli.config.exists() {
        anyhow::bail!(
            "Configuration file already exists: {}",
            cli.config.display()
        );
    }

    let example_config = InstallConfig::example();
    let yaml = serde_yaml::to_string(&example_config)?;

    tokio::fs::write(&cli.config, yaml)
        .await
        .context("Failed to write configuration file")?;

    info!("Example configuration created: {}", cli.config.display());
    info!("");
    info!("Next steps:");
    info!("  1. Edit the configuration file to match your infra cluster");
    info!("  2. Point KUBECONFIG at the infra cluster (or set 'kubeconfig' in the file)");
    info!("  3. Check the configuration:");
    info!("     virtinfra check");

    Ok(())
}

/// Offline machine pool validation
fn validate_config(cli: &Cli) -> Result<()> {
    let config = InstallConfig::from_file(&cli.config).context("Failed to load configuration")?;

    let errors = validate_machine_pool(
        &config.platform.default_machine_platform,
        &platform_path().child("default_machine_platform"),
    );
    if !errors.is_empty() {
        anyhow::bail!("Invalid machine pool:\n{}", field::aggregate(&errors));
    }

    info!("✓ Machine pool configuration is valid");
    Ok(())
}

/// Validate the platform against the live infra cluster
async fn check_platform(cli: &Cli) -> Result<()> {
    let config = InstallConfig::from_file(&cli.config).context("Failed to load configuration")?;
    let client = connect(&config).await?;

    let errors = validate_platform(&client, &config.platform, &platform_path())
        .await
        .context("Failed to query infra cluster")?;
    if !errors.is_empty() {
        anyhow::bail!("Invalid platform configuration:\n{}", field::aggregate(&errors));
    }

    info!(
        "✓ Namespace {}, storage class {} and network {} are ready",
        config.platform.namespace, config.platform.storage_class, config.platform.network_name
    );
    Ok(())
}

/// List namespaces on the infra cluster
async fn list_namespaces(cli: &Cli) -> Result<()> {
    use crate::kubevirt::InfraClient;

    let config = InstallConfig::from_file(&cli.config).context("Failed to load configuration")?;
    let client = connect(&config).await?;

    let namespaces = client
        .list_namespaces()
        .await
        .context("Failed to list namespaces")?;

    info!("Namespaces:");
    for ns in &namespaces {
        let phase = ns
            .status
            .as_ref()
            .and_then(|s| s.phase.clone())
            .unwrap_or_else(|| "Unknown".to_string());
        let marker = if ns.name_any() == config.platform.namespace {
            " (configured)"
        } else {
            ""
        };
        info!("  - {} [{}]{}", ns.name_any(), phase, marker);
    }

    Ok(())
}

/// Show the cluster's resources
async fn list_resources(cli: &Cli) -> Result<()> {
    let config = InstallConfig::from_file(&cli.config).context("Failed to load configuration")?;
    let client = connect(&config).await?;

    let destroyer = ClusterDestroyer::new(&client, &config.platform.namespace, config.owner_labels());
    let resources = destroyer.discover().await?;

    info!(
        "Cluster: {} (infra id: {}, namespace: {})",
        config.cluster_name, config.infra_id, config.platform.namespace
    );
    info!("  Virtual machines: {:?}", resources.virtual_machines);
    info!("  Data volumes: {:?}", resources.data_volumes);
    info!("  Secrets: {:?}", resources.secrets);

    Ok(())
}

/// Delete the cluster's KubeVirt resources
async fn destroy_cluster(cli: &Cli, dry_run: bool, json: bool) -> Result<()> {
    info!("Starting cluster destruction...");

    let config = InstallConfig::from_file(&cli.config).context("Failed to load configuration")?;
    info!("Cluster name: {}", config.cluster_name);

    let client = connect(&config).await?;
    let destroyer = ClusterDestroyer::new(&client, &config.platform.namespace, config.owner_labels());
    let resources = destroyer.discover().await?;

    if dry_run {
        info!("Dry run, would delete {} resource(s):", resources.total());
        info!("  Virtual machines: {:?}", resources.virtual_machines);
        info!("  Data volumes: {:?}", resources.data_volumes);
        info!("  Secrets: {:?}", resources.secrets);
        return Ok(());
    }

    let (progress, result) = destroyer.destroy(&resources).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&progress)?);
    }
    if result.is_err() {
        warn!("Destroy stopped at {}", progress);
    }
    result?;

    info!("✓ Cluster destroyed successfully ({})", progress);

    Ok(())
}
