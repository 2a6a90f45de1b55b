//! Topology controller error types.

use std::path::PathBuf;

use escm_provider::{InstanceId, ProviderError};
use thiserror::Error;

use crate::plan::NodeRole;

/// Errors that end a provisioning operation.
///
/// Nothing is rolled back: variants that follow a successful launch carry
/// the instance ids that remain running.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("failed to read bootstrap script {}: {source}", .path.display())]
    Bootstrap {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{role} node launch failed for cluster {cluster}: {source}")]
    Launch {
        cluster: String,
        role: NodeRole,
        #[source]
        source: ProviderError,
    },

    #[error(
        "data node launch failed for cluster {cluster} after {} master node(s) were launched: {source}",
        .masters.len()
    )]
    PartialCreate {
        cluster: String,
        masters: Vec<InstanceId>,
        #[source]
        source: ProviderError,
    },

    #[error("adding nodes to cluster {cluster} failed for {}", describe_failures(.failures))]
    AddNodes {
        cluster: String,
        failures: Vec<(NodeRole, ProviderError)>,
        /// Instances launched by the batches that succeeded.
        launched: Vec<InstanceId>,
    },

    #[error("cluster member {instance_id} is missing tag {tag}")]
    MemberTagMissing {
        instance_id: InstanceId,
        tag: &'static str,
    },

    #[error("unknown instance attribute: {0}")]
    UnknownAttribute(String),
}

fn describe_failures(failures: &[(NodeRole, ProviderError)]) -> String {
    failures
        .iter()
        .map(|(role, err)| format!("{role} ({err})"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub type TopologyResult<T> = Result<T, TopologyError>;
