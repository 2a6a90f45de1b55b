use std::io::Write;

use anyhow::Context;
use escm_core::split_list;
use escm_topology::TopologyController;

use crate::cli::AddNodesArgs;

pub async fn add(
    controller: &TopologyController,
    args: &AddNodesArgs,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let intent = args.intent();
    let outcome = controller
        .add_nodes(&intent)
        .await
        .with_context(|| format!("failed to add nodes to cluster {}", intent.cluster_name))?;
    writeln!(out, "{outcome}")?;
    Ok(())
}

pub async fn remove(
    controller: &TopologyController,
    cluster_name: &str,
    node_names: &str,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let names = split_list(node_names);
    let outcome = controller
        .remove_nodes(cluster_name, &names)
        .await
        .with_context(|| format!("failed to remove nodes from cluster {cluster_name}"))?;
    writeln!(out, "{outcome}")?;
    Ok(())
}
