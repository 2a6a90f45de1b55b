//! escm: create, scale, inspect and destroy Elasticsearch clusters on EC2.
//!
//! # Usage
//!
//! ```text
//! escm create-cluster -c logs -n 5 -x true
//! escm add-nodes -c logs -d 2
//! escm list-cluster-params -c logs -p PrivateIpAddress
//! escm destroy-cluster -c logs
//! ```

use std::sync::Arc;

use clap::Parser;
use escm_aws::Ec2Provider;
use escm_cli::{Cli, DEFAULT_LOG_FILTER};
use escm_core::EscmConfig;
use escm_topology::TopologyController;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();
    let config = EscmConfig::load(cli.config.as_deref())?;
    let region = config.region(cli.region.as_deref());
    debug!(region = %region, "using region");

    let provider = Ec2Provider::connect(&region).await;
    let controller = TopologyController::from_config(Arc::new(provider), &config);

    let mut stdout = std::io::stdout().lock();
    escm_cli::commands::execute(&cli.command, &controller, &mut stdout).await
}
