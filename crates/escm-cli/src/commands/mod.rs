pub mod cluster;
pub mod inspect;
pub mod nodes;

use std::io::Write;

use escm_topology::TopologyController;

use crate::cli::Commands;

/// Run one parsed command.
pub async fn execute(
    command: &Commands,
    controller: &TopologyController,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    match command {
        Commands::CreateCluster(args) => cluster::create(controller, args, out).await,
        Commands::DestroyCluster { cluster_name } => {
            cluster::destroy(controller, cluster_name, out).await
        }
        Commands::AddNodes(args) => nodes::add(controller, args, out).await,
        Commands::RemoveNodes {
            cluster_name,
            node_names,
        } => nodes::remove(controller, cluster_name, node_names, out).await,
        Commands::ListClusterInstances {
            cluster_name,
            format,
        } => inspect::instances(controller, cluster_name, *format, out).await,
        Commands::ListClusterParams {
            cluster_name,
            parameter_name,
            format,
        } => inspect::params(controller, cluster_name, parameter_name, *format, out).await,
    }
}
