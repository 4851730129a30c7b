//! # bucketctl
//!
//! Command-line interface for the Bucket Controller.
//!
//! ## Usage
//!
//! ```bash
//! # List Bucket and ClusterBucket resources
//! bucketctl list
//! bucketctl list bucket --namespace team-a
//!
//! # Show status of a resource
//! bucketctl status bucket assets --namespace team-a
//! bucketctl status clusterbucket shared-logs
//!
//! # Trigger an immediate reconciliation
//! bucketctl reconcile bucket assets --namespace team-a
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use kube::Client;

mod list;
mod reconcile;
mod status;

/// Bucket Controller CLI
#[derive(Parser)]
#[command(name = "bucketctl")]
#[command(
    about = "Bucket Controller CLI",
    long_about = None,
    after_help = "\
Available resource types:
  bucket (or 'b')         - namespaced Bucket resource
  clusterbucket (or 'cb') - cluster-scoped ClusterBucket resource

Examples:
  bucketctl list
  bucketctl reconcile b assets --namespace team-a
  bucketctl status clusterbucket shared-logs
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Kubernetes namespace for Bucket resources (defaults to all for list, 'default' otherwise)
    #[arg(short, long, global = true)]
    namespace: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Trigger reconciliation for a resource
    Reconcile {
        #[arg(value_enum, value_name = "RESOURCE_TYPE")]
        resource_type: ResourceType,

        /// Name of the resource
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// List resources with their phase and remote bucket
    List {
        /// Restrict the listing to one resource type
        #[arg(value_enum, value_name = "RESOURCE_TYPE")]
        resource_type: Option<ResourceType>,
    },
    /// Show status of a resource
    Status {
        #[arg(value_enum, value_name = "RESOURCE_TYPE")]
        resource_type: ResourceType,

        /// Name of the resource
        #[arg(value_name = "NAME")]
        name: String,
    },
}

/// Resource types supported by bucketctl
#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum ResourceType {
    /// Namespaced Bucket resource
    #[value(name = "bucket", alias = "b")]
    Bucket,
    /// Cluster-scoped ClusterBucket resource
    #[value(name = "clusterbucket", alias = "cb")]
    ClusterBucket,
}

#[tokio::main]
async fn main() -> Result<()> {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        return Err(anyhow::anyhow!("Failed to install rustls crypto provider"));
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bucketctl=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client. Ensure kubeconfig is configured.")?;

    match cli.command {
        Commands::Reconcile {
            resource_type,
            name,
        } => reconcile::reconcile_command(client, resource_type, name, cli.namespace).await,
        Commands::List { resource_type } => {
            list::list_command(client, resource_type, cli.namespace).await
        }
        Commands::Status {
            resource_type,
            name,
        } => status::status_command(client, resource_type, name, cli.namespace).await,
    }
}
