use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use escm_core::{AddNodesIntent, ClusterIntent, MonitoringSettings, parse_switch, split_list};

#[derive(Parser, Debug)]
#[command(
    name = "escm",
    about = "escm: Elasticsearch cluster manager for EC2",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file (default: ./escm.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// AWS region. Overrides the config file and AWS_REGION.
    #[arg(long, global = true)]
    pub region: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new cluster: up to three master-eligible nodes, the rest data nodes
    #[command(visible_alias = "c")]
    CreateCluster(CreateClusterArgs),

    /// List one attribute of every running cluster instance
    #[command(visible_alias = "p")]
    ListClusterParams {
        #[arg(short = 'c', long)]
        cluster_name: String,
        /// Instance attribute, e.g. PrivateIpAddress or tag:Name
        #[arg(short = 'p', long)]
        parameter_name: String,
        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List the instance ids of a cluster
    #[command(visible_alias = "l")]
    ListClusterInstances {
        #[arg(short = 'c', long)]
        cluster_name: String,
        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Terminate every instance of a cluster
    #[command(visible_alias = "d")]
    DestroyCluster {
        #[arg(short = 'c', long)]
        cluster_name: String,
    },

    /// Add master, data or client nodes to a running cluster
    #[command(visible_alias = "a")]
    AddNodes(AddNodesArgs),

    /// Terminate cluster nodes by name
    #[command(visible_alias = "r")]
    RemoveNodes {
        #[arg(short = 'c', long)]
        cluster_name: String,
        /// Comma-separated node names (the `Name` tag)
        #[arg(short = 'n', long)]
        node_names: String,
    },
}

#[derive(Args, Debug)]
pub struct CreateClusterArgs {
    #[arg(short = 'c', long)]
    pub cluster_name: String,

    /// Total number of nodes
    #[arg(short = 'n', long)]
    pub cluster_size: u32,

    #[arg(short = 'i', long)]
    pub instance_type: Option<String>,

    /// IAM instance profile attached to every node
    #[arg(short = 'r', long)]
    pub iam_role: Option<String>,

    /// Key pair name (default: <cluster>-key)
    #[arg(short = 'k', long)]
    pub key_name: Option<String>,

    /// Use this security group instead of elasticsearch-sg
    #[arg(short = 'g', long)]
    pub security_group_id: Option<String>,

    #[arg(short = 's', long)]
    pub subnet_id: Option<String>,

    /// `true` to ship monitoring data to --monitoring-cluster
    #[arg(short = 'm', long)]
    pub remote_monitoring: Option<String>,

    #[arg(short = 'o', long)]
    pub monitoring_cluster: Option<String>,

    /// Extra node tags as Key:Value,Key:Value
    #[arg(short = 't', long)]
    pub node_tags: Option<String>,

    /// `true` to enable X-Pack
    #[arg(short = 'x', long)]
    pub xpack_enabled: Option<String>,
}

impl CreateClusterArgs {
    pub fn intent(&self) -> ClusterIntent {
        let switch = |value: &Option<String>| value.as_deref().is_some_and(parse_switch);
        ClusterIntent {
            cluster_name: self.cluster_name.clone(),
            cluster_size: self.cluster_size,
            instance_type: self.instance_type.clone(),
            iam_role: self.iam_role.clone(),
            key_name: self.key_name.clone(),
            security_group_id: self.security_group_id.clone(),
            subnet_id: self.subnet_id.clone(),
            monitoring: MonitoringSettings {
                remote_monitoring: switch(&self.remote_monitoring),
                monitoring_cluster: self.monitoring_cluster.clone(),
            },
            xpack_enabled: switch(&self.xpack_enabled),
            node_tags: self
                .node_tags
                .as_deref()
                .map(split_list)
                .unwrap_or_default(),
        }
    }
}

#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("counts")
        .required(true)
        .multiple(true)
        .args(["num_master_nodes", "num_data_nodes", "num_client_nodes"])
))]
pub struct AddNodesArgs {
    #[arg(short = 'c', long)]
    pub cluster_name: String,

    #[arg(short = 'm', long)]
    pub num_master_nodes: Option<u32>,

    #[arg(short = 'd', long)]
    pub num_data_nodes: Option<u32>,

    #[arg(short = 'r', long)]
    pub num_client_nodes: Option<u32>,

    #[arg(short = 'i', long)]
    pub instance_type: Option<String>,
}

impl AddNodesArgs {
    pub fn intent(&self) -> AddNodesIntent {
        AddNodesIntent {
            cluster_name: self.cluster_name.clone(),
            masters: self.num_master_nodes.unwrap_or(0),
            data: self.num_data_nodes.unwrap_or(0),
            clients: self.num_client_nodes.unwrap_or(0),
            instance_type: self.instance_type.clone(),
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
