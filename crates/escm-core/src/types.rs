//! Operator intents shared by the command line and the topology controller.

use serde::{Deserialize, Serialize};

/// Interpret an operator switch value. Only the literal `true` enables it.
pub fn parse_switch(value: &str) -> bool {
    value.trim() == "true"
}

/// Split a comma-separated operator list, trimming entries and dropping
/// empty ones.
pub fn split_list(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Remote monitoring settings for a new cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringSettings {
    pub remote_monitoring: bool,
    /// Address of the monitoring cluster node.
    pub monitoring_cluster: Option<String>,
}

impl MonitoringSettings {
    /// Monitoring tags are only emitted when the flag is set and an
    /// address is known.
    pub fn target(&self) -> Option<&str> {
        if self.remote_monitoring {
            self.monitoring_cluster.as_deref()
        } else {
            None
        }
    }
}

/// Desired state for a new cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterIntent {
    pub cluster_name: String,
    /// Total node count across all roles.
    pub cluster_size: u32,
    pub instance_type: Option<String>,
    /// IAM instance profile name attached to every node.
    pub iam_role: Option<String>,
    pub key_name: Option<String>,
    /// Existing security group; skips resolving the shared group.
    pub security_group_id: Option<String>,
    pub subnet_id: Option<String>,
    pub monitoring: MonitoringSettings,
    pub xpack_enabled: bool,
    /// Raw `Key:Value` entries as typed by the operator.
    pub node_tags: Vec<String>,
}

impl ClusterIntent {
    pub fn new(cluster_name: impl Into<String>, cluster_size: u32) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            cluster_size,
            instance_type: None,
            iam_role: None,
            key_name: None,
            security_group_id: None,
            subnet_id: None,
            monitoring: MonitoringSettings::default(),
            xpack_enabled: false,
            node_tags: Vec::new(),
        }
    }

    /// The key pair to attach: the explicit name or `<cluster>-key`.
    pub fn key_name(&self) -> String {
        self.key_name
            .clone()
            .unwrap_or_else(|| format!("{}-key", self.cluster_name))
    }

    pub fn with_instance_type(mut self, instance_type: impl Into<String>) -> Self {
        self.instance_type = Some(instance_type.into());
        self
    }

    pub fn with_iam_role(mut self, role: impl Into<String>) -> Self {
        self.iam_role = Some(role.into());
        self
    }

    pub fn with_key_name(mut self, key_name: impl Into<String>) -> Self {
        self.key_name = Some(key_name.into());
        self
    }

    pub fn with_security_group(mut self, group_id: impl Into<String>) -> Self {
        self.security_group_id = Some(group_id.into());
        self
    }

    pub fn with_subnet(mut self, subnet_id: impl Into<String>) -> Self {
        self.subnet_id = Some(subnet_id.into());
        self
    }

    pub fn with_monitoring(mut self, monitoring: MonitoringSettings) -> Self {
        self.monitoring = monitoring;
        self
    }

    pub fn with_xpack(mut self, enabled: bool) -> Self {
        self.xpack_enabled = enabled;
        self
    }

    pub fn with_node_tags(mut self, tags: Vec<String>) -> Self {
        self.node_tags = tags;
        self
    }
}

/// Nodes to add to a running cluster, per role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddNodesIntent {
    pub cluster_name: String,
    pub masters: u32,
    pub data: u32,
    pub clients: u32,
    pub instance_type: Option<String>,
}

impl AddNodesIntent {
    pub fn new(cluster_name: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            ..Self::default()
        }
    }
}
