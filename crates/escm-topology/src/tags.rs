//! Cluster tag keys and per-role tag sets.
//!
//! Instance tags are the cluster's only persistent record: membership,
//! role, quorum and feature flags are all read back from them by later
//! operations.

use escm_provider::Tag;
use tracing::debug;

use crate::plan::NodeRole;

pub const CLUSTER_NAME_TAG: &str = "ES_CLUSTER_NAME";
pub const NODE_NAME_PREFIX_TAG: &str = "ES_NODE_NAME_PREFIX";
pub const NAME_TAG: &str = "Name";
pub const MASTER_ELIGIBLE_TAG: &str = "ES_MASTER_ELIGIBLE";
pub const DATA_ELIGIBLE_TAG: &str = "ES_DATA_ELIGIBLE";
pub const INGEST_ELIGIBLE_TAG: &str = "ES_INGEST_ELIGIBLE";
pub const CROSS_CLUSTER_ELIGIBLE_TAG: &str = "ES_CROSS_CLUSTER_ELIGIBLE";
pub const MINIMUM_MASTER_NODES_TAG: &str = "ES_MINIMUM_MASTER_NODES";
pub const XPACK_ENABLED_TAG: &str = "ES_XPACK_ENABLED";
pub const REMOTE_MONITORING_TAG: &str = "ES_REMOTE_MONITORING";
pub const MONITORING_CLUSTER_TAG: &str = "ES_MONITORING_CLUSTER";

/// Tags every node created by this crate carries.
pub const REQUIRED_TAGS: [&str; 6] = [
    CLUSTER_NAME_TAG,
    NODE_NAME_PREFIX_TAG,
    NAME_TAG,
    MASTER_ELIGIBLE_TAG,
    MINIMUM_MASTER_NODES_TAG,
    XPACK_ENABLED_TAG,
];

fn flag(value: bool) -> String {
    if value { "true" } else { "false" }.to_string()
}

/// Parse one operator `Key:Value` entry. Anything that is not exactly one
/// colon-separated pair yields `None`.
pub fn parse_node_tag(entry: &str) -> Option<Tag> {
    let mut parts = entry.split(':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(key), Some(value), None) => Some(Tag::new(key, value)),
        _ => None,
    }
}

/// Parse operator tag entries, silently dropping malformed ones.
pub fn parse_node_tags<S: AsRef<str>>(entries: &[S]) -> Vec<Tag> {
    entries
        .iter()
        .filter_map(|entry| {
            let entry = entry.as_ref();
            let tag = parse_node_tag(entry);
            if tag.is_none() {
                debug!(entry, "dropping malformed node tag");
            }
            tag
        })
        .collect()
}

/// Cluster-wide tag values shared by every role's tag set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterTags {
    cluster: String,
    minimum_master_nodes: String,
    xpack_enabled: String,
    monitoring_cluster: Option<String>,
    extra: Vec<Tag>,
}

impl ClusterTags {
    /// Tag values for a brand-new cluster.
    pub fn new(cluster: impl Into<String>, minimum_master_nodes: u32, xpack_enabled: bool) -> Self {
        Self {
            cluster: cluster.into(),
            minimum_master_nodes: minimum_master_nodes.to_string(),
            xpack_enabled: flag(xpack_enabled),
            monitoring_cluster: None,
            extra: Vec::new(),
        }
    }

    /// Tag values copied verbatim from a running member.
    pub fn inherited(
        cluster: impl Into<String>,
        minimum_master_nodes: &str,
        xpack_enabled: &str,
    ) -> Self {
        Self {
            cluster: cluster.into(),
            minimum_master_nodes: minimum_master_nodes.to_string(),
            xpack_enabled: xpack_enabled.to_string(),
            monitoring_cluster: None,
            extra: Vec::new(),
        }
    }

    /// Point nodes at a remote monitoring cluster.
    pub fn with_monitoring(mut self, monitoring_cluster: Option<&str>) -> Self {
        self.monitoring_cluster = monitoring_cluster.map(str::to_string);
        self
    }

    /// Append operator-supplied tags.
    pub fn with_extra(mut self, extra: Vec<Tag>) -> Self {
        self.extra = extra;
        self
    }

    /// Full tag set for a node of `role`.
    pub fn for_role(&self, role: NodeRole) -> Vec<Tag> {
        let prefix = role.name_prefix(&self.cluster);
        let mut tags = vec![
            Tag::new(CLUSTER_NAME_TAG, &self.cluster),
            Tag::new(NODE_NAME_PREFIX_TAG, &prefix),
            Tag::new(NAME_TAG, prefix),
            Tag::new(MASTER_ELIGIBLE_TAG, flag(role.is_master_eligible())),
        ];

        if role == NodeRole::Client {
            tags.push(Tag::new(DATA_ELIGIBLE_TAG, flag(false)));
            tags.push(Tag::new(INGEST_ELIGIBLE_TAG, flag(false)));
            tags.push(Tag::new(CROSS_CLUSTER_ELIGIBLE_TAG, flag(false)));
        }

        tags.push(Tag::new(MINIMUM_MASTER_NODES_TAG, &self.minimum_master_nodes));
        tags.push(Tag::new(XPACK_ENABLED_TAG, &self.xpack_enabled));

        if let Some(address) = &self.monitoring_cluster {
            tags.push(Tag::new(REMOTE_MONITORING_TAG, flag(true)));
            tags.push(Tag::new(MONITORING_CLUSTER_TAG, address));
        }

        tags.extend(self.extra.iter().cloned());
        tags
    }
}
