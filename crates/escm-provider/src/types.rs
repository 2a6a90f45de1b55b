//! Data types exchanged with a compute provider.
//!
//! These mirror the subset of the EC2 data model the cluster manager reads
//! and writes: instances and their tags, describe filters, launch requests,
//! and security-group ingress rules.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Provider-assigned instance identifier (e.g. `i-0abc...`).
pub type InstanceId = String;

/// Provider-assigned security group identifier (e.g. `sg-0abc...`).
pub type GroupId = String;

/// Filter name for the instance lifecycle state.
pub const STATE_FILTER: &str = "instance-state-name";

/// Filter name for instance ids.
pub const INSTANCE_ID_FILTER: &str = "instance-id";

/// Prefix for tag filters (`tag:<Key>`).
pub const TAG_FILTER_PREFIX: &str = "tag:";

// ── Tags ──────────────────────────────────────────────────────────

/// A single key/value instance tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Look up a tag value by key.
pub fn tag_value<'a>(tags: &'a [Tag], key: &str) -> Option<&'a str> {
    tags.iter().find(|t| t.key == key).map(|t| t.value.as_str())
}

// ── Instances ─────────────────────────────────────────────────────

/// Lifecycle state of a provider instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceState {
    Pending,
    Running,
    ShuttingDown,
    Terminated,
    Stopping,
    Stopped,
    Unknown,
}

impl InstanceState {
    /// The provider's name for this state, as used in filters.
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceState::Pending => "pending",
            InstanceState::Running => "running",
            InstanceState::ShuttingDown => "shutting-down",
            InstanceState::Terminated => "terminated",
            InstanceState::Stopping => "stopping",
            InstanceState::Stopped => "stopped",
            InstanceState::Unknown => "unknown",
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "pending" => InstanceState::Pending,
            "running" => InstanceState::Running,
            "shutting-down" => InstanceState::ShuttingDown,
            "terminated" => InstanceState::Terminated,
            "stopping" => InstanceState::Stopping,
            "stopped" => InstanceState::Stopped,
            _ => InstanceState::Unknown,
        }
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compute instance as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub instance_id: InstanceId,
    pub image_id: Option<String>,
    pub instance_type: Option<String>,
    pub key_name: Option<String>,
    pub state: InstanceState,
    pub private_ip_address: Option<String>,
    pub public_ip_address: Option<String>,
    pub private_dns_name: Option<String>,
    pub public_dns_name: Option<String>,
    pub subnet_id: Option<String>,
    pub vpc_id: Option<String>,
    /// RFC 3339 launch timestamp.
    pub launch_time: Option<String>,
    pub security_group_ids: Vec<GroupId>,
    pub tags: Vec<Tag>,
}

impl Instance {
    /// A bare instance with only an id and state; everything else empty.
    pub fn new(instance_id: impl Into<String>, state: InstanceState) -> Self {
        Self {
            instance_id: instance_id.into(),
            image_id: None,
            instance_type: None,
            key_name: None,
            state,
            private_ip_address: None,
            public_ip_address: None,
            private_dns_name: None,
            public_dns_name: None,
            subnet_id: None,
            vpc_id: None,
            launch_time: None,
            security_group_ids: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        tag_value(&self.tags, key)
    }
}

/// A group of instances launched by one request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Reservation {
    pub reservation_id: Option<String>,
    pub instances: Vec<Instance>,
}

// ── Filters ───────────────────────────────────────────────────────

/// A describe-instances filter predicate: the instance matches when the
/// named attribute equals any of `values`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceFilter {
    pub name: String,
    pub values: Vec<String>,
}

impl InstanceFilter {
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Match instances in the given lifecycle state.
    pub fn state(state: InstanceState) -> Self {
        Self::new(STATE_FILTER, vec![state.as_str().to_string()])
    }

    /// Match instances whose tag `key` has one of `values`.
    pub fn tag(key: &str, values: Vec<String>) -> Self {
        Self::new(format!("{TAG_FILTER_PREFIX}{key}"), values)
    }

    /// Whether `instance` satisfies this filter.
    ///
    /// Understands the state, instance-id and `tag:` filters. Any other
    /// filter name matches nothing.
    pub fn matches(&self, instance: &Instance) -> bool {
        if self.name == STATE_FILTER {
            return self.values.iter().any(|v| v == instance.state.as_str());
        }
        if self.name == INSTANCE_ID_FILTER {
            return self.values.iter().any(|v| *v == instance.instance_id);
        }
        if let Some(key) = self.name.strip_prefix(TAG_FILTER_PREFIX) {
            return match instance.tag(key) {
                Some(value) => self.values.iter().any(|v| v == value),
                None => false,
            };
        }
        false
    }
}

// ── Launch ────────────────────────────────────────────────────────

/// Parameters for a single batched instance launch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchRequest {
    pub image_id: String,
    pub instance_type: String,
    pub min_count: u32,
    pub max_count: u32,
    pub key_name: Option<String>,
    pub security_group_ids: Vec<GroupId>,
    pub tags: Vec<Tag>,
    /// Base64-encoded initialization payload.
    pub user_data: Option<String>,
    /// IAM instance profile name.
    pub iam_instance_profile: Option<String>,
    pub subnet_id: Option<String>,
}

impl LaunchRequest {
    pub fn tag(&self, key: &str) -> Option<&str> {
        tag_value(&self.tags, key)
    }
}

// ── Security groups and key pairs ─────────────────────────────────

/// A security group as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroup {
    pub group_id: GroupId,
    pub group_name: String,
}

/// A TCP ingress rule admitting traffic from members of a source group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    pub protocol: String,
    pub from_port: u16,
    pub to_port: u16,
    pub source_group_id: GroupId,
}

impl IngressRule {
    /// A single-port TCP rule scoped to `source_group_id`.
    pub fn tcp_from_group(port: u16, source_group_id: impl Into<String>) -> Self {
        Self {
            protocol: "tcp".to_string(),
            from_port: port,
            to_port: port,
            source_group_id: source_group_id.into(),
        }
    }
}

/// Private key material returned when a key pair is first created.
///
/// `Debug` is redacted so the material never reaches logs.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial(String);

impl KeyMaterial {
    pub fn new(pem: impl Into<String>) -> Self {
        Self(pem.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyMaterial(<redacted>)")
    }
}
