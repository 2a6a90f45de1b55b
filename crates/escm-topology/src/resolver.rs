//! Resource resolver: idempotent discovery of shared prerequisites.
//!
//! The security group and key pair are shared by every cluster in an
//! account/region. Both are create-if-absent and never deleted; "already
//! exists" from the provider counts as success.

use escm_provider::{ComputeProvider, GroupId, IngressRule, KeyMaterial, ProviderResult};
use tracing::{debug, info};

/// Well-known name of the shared network-access group.
pub const SECURITY_GROUP_NAME: &str = "elasticsearch-sg";

pub const SECURITY_GROUP_DESCRIPTION: &str = "Security Group For Elasticsearch Node access";

/// HTTP search API.
pub const SEARCH_PORT: u16 = 9200;
/// Node-to-node transport.
pub const TRANSPORT_PORT: u16 = 9300;
/// SSH.
pub const REMOTE_ACCESS_PORT: u16 = 22;

/// The three self-referential ingress rules of the shared group.
pub fn ingress_rules(group_id: &str) -> Vec<IngressRule> {
    [SEARCH_PORT, TRANSPORT_PORT, REMOTE_ACCESS_PORT]
        .into_iter()
        .map(|port| IngressRule::tcp_from_group(port, group_id))
        .collect()
}

/// Outcome of resolving a key pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPairStatus {
    /// Newly created; the material must be persisted by the caller.
    Created(KeyMaterial),
    /// Already present; its material was saved on an earlier run.
    AlreadyExists,
}

/// Resolves shared prerequisite resources against a provider.
pub struct ResourceResolver<'a> {
    provider: &'a dyn ComputeProvider,
}

impl<'a> ResourceResolver<'a> {
    pub fn new(provider: &'a dyn ComputeProvider) -> Self {
        Self { provider }
    }

    /// Return the id of the shared security group, creating and
    /// authorizing it when absent.
    ///
    /// An existing group is assumed to already carry its ingress rules.
    /// When creation loses a race with another invocation the group is
    /// described again and authorization is left to the winner.
    pub async fn resolve_network_access_group(&self) -> ProviderResult<GroupId> {
        match self.provider.describe_security_group(SECURITY_GROUP_NAME).await {
            Ok(group) => {
                debug!(group_id = %group.group_id, "using existing security group");
                return Ok(group.group_id);
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let group_id = match self
            .provider
            .create_security_group(SECURITY_GROUP_NAME, SECURITY_GROUP_DESCRIPTION)
            .await
        {
            Ok(id) => id,
            Err(e) if e.is_already_exists() => {
                debug!("security group created concurrently, describing again");
                let group = self
                    .provider
                    .describe_security_group(SECURITY_GROUP_NAME)
                    .await?;
                return Ok(group.group_id);
            }
            Err(e) => return Err(e),
        };

        let rules = ingress_rules(&group_id);
        self.provider.authorize_ingress(&group_id, &rules).await?;
        info!(
            group_id = %group_id,
            name = SECURITY_GROUP_NAME,
            "created security group"
        );
        Ok(group_id)
    }

    /// Create the named key pair unless it already exists.
    pub async fn resolve_key_pair(&self, name: &str) -> ProviderResult<KeyPairStatus> {
        match self.provider.create_key_pair(name).await {
            Ok(material) => {
                info!(key_name = %name, "created key pair");
                Ok(KeyPairStatus::Created(material))
            }
            Err(e) if e.is_already_exists() => {
                debug!(key_name = %name, "key pair already exists");
                Ok(KeyPairStatus::AlreadyExists)
            }
            Err(e) => Err(e),
        }
    }
}
