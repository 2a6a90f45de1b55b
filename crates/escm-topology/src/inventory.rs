//! Cluster inventory: tag-based membership queries.
//!
//! A cluster's members are the running instances tagged with its name.
//! There is no other record, so every read goes through the provider's
//! describe call.

use std::fmt;
use std::str::FromStr;

use escm_provider::{
    ComputeProvider, Instance, InstanceFilter, InstanceId, InstanceState, ProviderResult,
    TAG_FILTER_PREFIX,
};
use serde::Serialize;
use tracing::debug;

use crate::error::TopologyError;
use crate::tags::{CLUSTER_NAME_TAG, NAME_TAG};

/// Filters selecting the running members of `cluster`.
pub fn membership_filters(cluster: &str) -> Vec<InstanceFilter> {
    vec![
        InstanceFilter::state(InstanceState::Running),
        InstanceFilter::tag(CLUSTER_NAME_TAG, vec![cluster.to_string()]),
    ]
}

/// Build a `Name` tag filter from operator node names.
///
/// Duplicates collapse so each name appears once. Returns `None` when no
/// names remain.
pub fn name_filter<S: AsRef<str>>(names: &[S]) -> Option<InstanceFilter> {
    let mut values: Vec<String> = Vec::new();
    for name in names {
        let name = name.as_ref().trim();
        if !name.is_empty() && !values.iter().any(|v| v == name) {
            values.push(name.to_string());
        }
    }
    if values.is_empty() {
        None
    } else {
        Some(InstanceFilter::tag(NAME_TAG, values))
    }
}

/// A per-instance attribute an operator can list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceAttribute {
    InstanceId,
    ImageId,
    InstanceType,
    KeyName,
    State,
    PrivateIpAddress,
    PublicIpAddress,
    PrivateDnsName,
    PublicDnsName,
    SubnetId,
    VpcId,
    LaunchTime,
    SecurityGroups,
    Tag(String),
}

impl InstanceAttribute {
    /// Read this attribute from `instance`.
    pub fn extract(&self, instance: &Instance) -> Option<String> {
        match self {
            InstanceAttribute::InstanceId => Some(instance.instance_id.clone()),
            InstanceAttribute::ImageId => instance.image_id.clone(),
            InstanceAttribute::InstanceType => instance.instance_type.clone(),
            InstanceAttribute::KeyName => instance.key_name.clone(),
            InstanceAttribute::State => Some(instance.state.to_string()),
            InstanceAttribute::PrivateIpAddress => instance.private_ip_address.clone(),
            InstanceAttribute::PublicIpAddress => instance.public_ip_address.clone(),
            InstanceAttribute::PrivateDnsName => instance.private_dns_name.clone(),
            InstanceAttribute::PublicDnsName => instance.public_dns_name.clone(),
            InstanceAttribute::SubnetId => instance.subnet_id.clone(),
            InstanceAttribute::VpcId => instance.vpc_id.clone(),
            InstanceAttribute::LaunchTime => instance.launch_time.clone(),
            InstanceAttribute::SecurityGroups => {
                if instance.security_group_ids.is_empty() {
                    None
                } else {
                    Some(instance.security_group_ids.join(","))
                }
            }
            InstanceAttribute::Tag(key) => instance.tag(key).map(str::to_string),
        }
    }
}

impl FromStr for InstanceAttribute {
    type Err = TopologyError;

    /// Accepts provider field names (`PrivateIpAddress`) case-insensitively,
    /// with or without `_`/`-` separators, and `tag:<Key>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(key) = s.strip_prefix(TAG_FILTER_PREFIX) {
            if key.is_empty() {
                return Err(TopologyError::UnknownAttribute(s.to_string()));
            }
            return Ok(InstanceAttribute::Tag(key.to_string()));
        }

        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        let attr = match normalized.as_str() {
            "instanceid" => InstanceAttribute::InstanceId,
            "imageid" => InstanceAttribute::ImageId,
            "instancetype" => InstanceAttribute::InstanceType,
            "keyname" => InstanceAttribute::KeyName,
            "state" => InstanceAttribute::State,
            "privateipaddress" => InstanceAttribute::PrivateIpAddress,
            "publicipaddress" => InstanceAttribute::PublicIpAddress,
            "privatednsname" => InstanceAttribute::PrivateDnsName,
            "publicdnsname" => InstanceAttribute::PublicDnsName,
            "subnetid" => InstanceAttribute::SubnetId,
            "vpcid" => InstanceAttribute::VpcId,
            "launchtime" => InstanceAttribute::LaunchTime,
            "securitygroups" | "securitygroupids" => InstanceAttribute::SecurityGroups,
            _ => return Err(TopologyError::UnknownAttribute(s.to_string())),
        };
        Ok(attr)
    }
}

impl fmt::Display for InstanceAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstanceAttribute::InstanceId => "InstanceId",
            InstanceAttribute::ImageId => "ImageId",
            InstanceAttribute::InstanceType => "InstanceType",
            InstanceAttribute::KeyName => "KeyName",
            InstanceAttribute::State => "State",
            InstanceAttribute::PrivateIpAddress => "PrivateIpAddress",
            InstanceAttribute::PublicIpAddress => "PublicIpAddress",
            InstanceAttribute::PrivateDnsName => "PrivateDnsName",
            InstanceAttribute::PublicDnsName => "PublicDnsName",
            InstanceAttribute::SubnetId => "SubnetId",
            InstanceAttribute::VpcId => "VpcId",
            InstanceAttribute::LaunchTime => "LaunchTime",
            InstanceAttribute::SecurityGroups => "SecurityGroups",
            InstanceAttribute::Tag(key) => return write!(f, "{TAG_FILTER_PREFIX}{key}"),
        };
        f.write_str(name)
    }
}

/// One instance's value for a listed attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeValue {
    pub instance_id: InstanceId,
    pub value: Option<String>,
}

/// Read-only queries over a cluster's members.
pub struct Inventory<'a> {
    provider: &'a dyn ComputeProvider,
}

impl<'a> Inventory<'a> {
    pub fn new(provider: &'a dyn ComputeProvider) -> Self {
        Self { provider }
    }

    /// Running members of `cluster` that also match `extra_filters`.
    /// An empty result is not an error.
    pub async fn find_instances(
        &self,
        cluster: &str,
        extra_filters: &[InstanceFilter],
    ) -> ProviderResult<Vec<Instance>> {
        let mut filters = membership_filters(cluster);
        filters.extend(extra_filters.iter().cloned());

        let reservations = self.provider.describe_instances(&filters).await?;
        let instances: Vec<Instance> = reservations
            .into_iter()
            .flat_map(|r| r.instances)
            .collect();

        debug!(cluster, count = instances.len(), "cluster instances found");
        Ok(instances)
    }

    pub async fn list_instance_ids(
        &self,
        cluster: &str,
        extra_filters: &[InstanceFilter],
    ) -> ProviderResult<Vec<InstanceId>> {
        Ok(self
            .find_instances(cluster, extra_filters)
            .await?
            .into_iter()
            .map(|i| i.instance_id)
            .collect())
    }

    pub async fn list_attribute(
        &self,
        cluster: &str,
        attribute: &InstanceAttribute,
        extra_filters: &[InstanceFilter],
    ) -> ProviderResult<Vec<AttributeValue>> {
        Ok(self
            .find_instances(cluster, extra_filters)
            .await?
            .iter()
            .map(|i| AttributeValue {
                instance_id: i.instance_id.clone(),
                value: attribute.extract(i),
            })
            .collect())
    }
}
