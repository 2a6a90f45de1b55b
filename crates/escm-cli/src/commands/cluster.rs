use std::io::Write;

use anyhow::Context;
use escm_topology::TopologyController;
use tracing::warn;

use crate::cli::CreateClusterArgs;

pub async fn create(
    controller: &TopologyController,
    args: &CreateClusterArgs,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let intent = args.intent();
    let report = controller
        .create_cluster(&intent)
        .await
        .with_context(|| format!("failed to create cluster {}", intent.cluster_name))?;

    writeln!(out, "{report}")?;
    if let Some(path) = &report.key_saved_to {
        writeln!(out, "Private key for {} saved to {}", report.key_name, path.display())?;
    }
    for warning in &report.warnings {
        warn!(cluster = %report.cluster, "{warning}");
    }
    Ok(())
}

pub async fn destroy(
    controller: &TopologyController,
    cluster_name: &str,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let outcome = controller
        .destroy_cluster(cluster_name)
        .await
        .with_context(|| format!("failed to destroy cluster {cluster_name}"))?;
    writeln!(out, "{outcome}")?;
    Ok(())
}
