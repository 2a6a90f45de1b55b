//! Typed operation outcomes. `Display` renders the operator message.

use std::fmt;
use std::path::PathBuf;

use escm_provider::{GroupId, InstanceId};
use serde::Serialize;

/// Non-fatal conditions noticed while creating a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProvisionWarning {
    /// A new key pair was created but its private key could not be written.
    KeyNotPersisted {
        key_name: String,
        path: PathBuf,
        reason: String,
    },
    /// The cluster has no master-eligible nodes; its recorded quorum of 1
    /// cannot be met.
    NoMasterNodes { cluster: String },
}

impl fmt::Display for ProvisionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisionWarning::KeyNotPersisted {
                key_name,
                path,
                reason,
            } => write!(
                f,
                "private key for {key_name} could not be saved to {}: {reason}",
                path.display()
            ),
            ProvisionWarning::NoMasterNodes { cluster } => {
                write!(f, "cluster {cluster} has no master-eligible nodes")
            }
        }
    }
}

/// A successfully created cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateReport {
    pub cluster: String,
    pub key_name: String,
    pub security_group_id: GroupId,
    pub minimum_master_nodes: u32,
    pub masters: Vec<InstanceId>,
    pub data_nodes: Vec<InstanceId>,
    /// Where a newly created private key was written.
    pub key_saved_to: Option<PathBuf>,
    pub warnings: Vec<ProvisionWarning>,
}

impl fmt::Display for CreateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Successfully created ES cluster: {}", self.cluster)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AddNodesOutcome {
    Added {
        cluster: String,
        masters: Vec<InstanceId>,
        data_nodes: Vec<InstanceId>,
        clients: Vec<InstanceId>,
    },
    ClusterNotFound { cluster: String },
}

impl AddNodesOutcome {
    pub fn is_added(&self) -> bool {
        matches!(self, AddNodesOutcome::Added { .. })
    }
}

impl fmt::Display for AddNodesOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddNodesOutcome::Added { cluster, .. } => {
                write!(f, "Successfully added new nodes to cluster [{cluster}]")
            }
            AddNodesOutcome::ClusterNotFound { cluster } => write!(
                f,
                "Could not add nodes to cluster [{cluster}]. Cluster does not exist."
            ),
        }
    }
}

/// Outcome of destroy-cluster and remove-nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RemovalOutcome {
    Destroyed {
        cluster: String,
        terminated: Vec<InstanceId>,
    },
    Removed {
        cluster: String,
        terminated: Vec<InstanceId>,
    },
    NothingToDestroy { cluster: String },
    NodesNotFound {
        cluster: String,
        node_names: Vec<String>,
    },
}

impl RemovalOutcome {
    /// Instances terminated by this operation; empty for the no-op outcomes.
    pub fn terminated(&self) -> &[InstanceId] {
        match self {
            RemovalOutcome::Destroyed { terminated, .. }
            | RemovalOutcome::Removed { terminated, .. } => terminated,
            RemovalOutcome::NothingToDestroy { .. } | RemovalOutcome::NodesNotFound { .. } => &[],
        }
    }
}

impl fmt::Display for RemovalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemovalOutcome::Destroyed { cluster, .. } => {
                write!(f, "Successfully destroyed cluster [{cluster}].")
            }
            RemovalOutcome::Removed {
                cluster,
                terminated,
            } => write!(
                f,
                "Successfully removed {} nodes from cluster [{cluster}]",
                terminated.len()
            ),
            RemovalOutcome::NothingToDestroy { cluster } => write!(
                f,
                "No cluster instances to delete with cluster name: {cluster}"
            ),
            RemovalOutcome::NodesNotFound {
                cluster,
                node_names,
            } => write!(
                f,
                "Could not find [{}] in cluster [{cluster}].",
                node_names.join(",")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_messages() {
        let removed = RemovalOutcome::Removed {
            cluster: "logs".to_string(),
            terminated: vec!["i-1".to_string(), "i-2".to_string()],
        };
        assert_eq!(
            removed.to_string(),
            "Successfully removed 2 nodes from cluster [logs]"
        );

        let missing = RemovalOutcome::NodesNotFound {
            cluster: "logs".to_string(),
            node_names: vec!["es-logs-client".to_string(), "x".to_string()],
        };
        assert_eq!(
            missing.to_string(),
            "Could not find [es-logs-client,x] in cluster [logs]."
        );
        assert!(missing.terminated().is_empty());

        assert_eq!(
            RemovalOutcome::NothingToDestroy {
                cluster: "logs".to_string()
            }
            .to_string(),
            "No cluster instances to delete with cluster name: logs"
        );
        assert_eq!(
            AddNodesOutcome::ClusterNotFound {
                cluster: "logs".to_string()
            }
            .to_string(),
            "Could not add nodes to cluster [logs]. Cluster does not exist."
        );
    }

    #[test]
    fn outcomes_serialize_with_tag() {
        let outcome = RemovalOutcome::Destroyed {
            cluster: "logs".to_string(),
            terminated: vec!["i-1".to_string()],
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "destroyed");
        assert_eq!(json["terminated"][0], "i-1");
    }
}
