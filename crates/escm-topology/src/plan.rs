//! Role partitioning and quorum arithmetic.
//!
//! ```text
//! masters = min(size, 3)
//! data    = size - masters
//! quorum  = floor(masters / 2) + 1
//! ```
//!
//! A zero-node cluster still yields a quorum of 1. That value is recorded
//! on nodes as-is; callers warn about it rather than adjusting it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Upper bound on master-eligible nodes in a new cluster.
pub const MAX_MASTER_NODES: u32 = 3;

/// Role a node plays in the search cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Master,
    Data,
    Client,
}

impl NodeRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::Master => "master",
            NodeRole::Data => "data",
            NodeRole::Client => "client",
        }
    }

    /// Node name prefix, also used as the display `Name` tag.
    pub fn name_prefix(&self, cluster: &str) -> String {
        format!("es-{cluster}-{}", self.as_str())
    }

    pub fn is_master_eligible(&self) -> bool {
        matches!(self, NodeRole::Master)
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Node counts per role for a new cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCounts {
    pub masters: u32,
    pub data: u32,
}

impl RoleCounts {
    pub fn minimum_master_nodes(&self) -> u32 {
        minimum_master_nodes(self.masters)
    }
}

/// Split a requested cluster size into master-eligible and data nodes.
pub fn partition(cluster_size: u32) -> RoleCounts {
    let masters = cluster_size.min(MAX_MASTER_NODES);
    RoleCounts {
        masters,
        data: cluster_size - masters,
    }
}

/// Minimum number of master-eligible nodes that must be visible to elect a
/// master.
pub fn minimum_master_nodes(masters: u32) -> u32 {
    masters / 2 + 1
}
