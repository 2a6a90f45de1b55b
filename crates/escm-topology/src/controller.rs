//! Topology controller: turns operator intents into provider calls.
//!
//! Creation is a two-phase procedure: master-eligible nodes are launched
//! and awaited before any data node is requested. Nothing is rolled back;
//! a failure leaves completed work running and says so in the error.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use escm_core::config::{DEFAULT_IMAGE_ID, DEFAULT_INSTANCE_TYPE, DEFAULT_KEY_DIR, expand_home};
use escm_core::{AddNodesIntent, ClusterIntent, EscmConfig};
use escm_provider::{
    ComputeProvider, Instance, InstanceId, KeyMaterial, ProviderError, ProviderResult,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{TopologyError, TopologyResult};
use crate::inventory::{AttributeValue, InstanceAttribute, Inventory, name_filter};
use crate::keys::KeyVault;
use crate::launch::{LaunchTemplate, NodeRoleSpec};
use crate::outcome::{AddNodesOutcome, CreateReport, ProvisionWarning, RemovalOutcome};
use crate::payload::BootstrapSource;
use crate::plan::{NodeRole, partition};
use crate::resolver::{KeyPairStatus, ResourceResolver};
use crate::tags::{
    ClusterTags, MINIMUM_MASTER_NODES_TAG, MONITORING_CLUSTER_TAG, REMOTE_MONITORING_TAG,
    XPACK_ENABLED_TAG, parse_node_tags,
};

/// Progress of a create-cluster operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatePhase {
    Uninitialized,
    PrerequisitesResolved,
    MastersLaunching,
    /// Checkpoint: every master launch has returned.
    MastersReady,
    DataNodesLaunching,
    Complete,
    Failed,
}

impl CreatePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreatePhase::Uninitialized => "uninitialized",
            CreatePhase::PrerequisitesResolved => "prerequisites_resolved",
            CreatePhase::MastersLaunching => "masters_launching",
            CreatePhase::MastersReady => "masters_ready",
            CreatePhase::DataNodesLaunching => "data_nodes_launching",
            CreatePhase::Complete => "complete",
            CreatePhase::Failed => "failed",
        }
    }

    /// The phase after this one on the success path.
    pub fn next(&self) -> Option<CreatePhase> {
        match self {
            CreatePhase::Uninitialized => Some(CreatePhase::PrerequisitesResolved),
            CreatePhase::PrerequisitesResolved => Some(CreatePhase::MastersLaunching),
            CreatePhase::MastersLaunching => Some(CreatePhase::MastersReady),
            CreatePhase::MastersReady => Some(CreatePhase::DataNodesLaunching),
            CreatePhase::DataNodesLaunching => Some(CreatePhase::Complete),
            CreatePhase::Complete | CreatePhase::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CreatePhase::Complete | CreatePhase::Failed)
    }
}

impl fmt::Display for CreatePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks and logs phase transitions for one create-cluster call.
struct CreateProgress<'a> {
    cluster: &'a str,
    phase: CreatePhase,
}

impl<'a> CreateProgress<'a> {
    fn new(cluster: &'a str) -> Self {
        Self {
            cluster,
            phase: CreatePhase::Uninitialized,
        }
    }

    fn advance(&mut self) {
        if let Some(next) = self.phase.next() {
            debug!(cluster = %self.cluster, from = %self.phase, to = %next, "create phase");
            self.phase = next;
        }
    }

    fn fail(&mut self, err: &TopologyError) -> CreatePhase {
        let failed_in = self.phase;
        if !failed_in.is_terminal() {
            warn!(cluster = %self.cluster, phase = %failed_in, error = %err, "cluster creation failed");
            self.phase = CreatePhase::Failed;
        }
        failed_in
    }
}

/// Launch defaults not carried by an intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    pub image_id: String,
    pub default_instance_type: String,
}

impl ControllerSettings {
    pub fn from_config(config: &EscmConfig) -> Self {
        Self {
            image_id: config.image_id().to_string(),
            default_instance_type: config.instance_type().to_string(),
        }
    }

    fn instance_type(&self, requested: Option<&str>) -> String {
        requested
            .unwrap_or(self.default_instance_type.as_str())
            .to_string()
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            image_id: DEFAULT_IMAGE_ID.to_string(),
            default_instance_type: DEFAULT_INSTANCE_TYPE.to_string(),
        }
    }
}

/// Drives cluster create, scale and destroy operations against a provider.
pub struct TopologyController {
    provider: Arc<dyn ComputeProvider>,
    settings: ControllerSettings,
    bootstrap: BootstrapSource,
    keys: KeyVault,
}

impl TopologyController {
    /// A controller with built-in defaults: the stock image and instance
    /// type, the bundled bootstrap script, and keys under `~/.ssh`.
    pub fn new(provider: Arc<dyn ComputeProvider>) -> Self {
        Self {
            provider,
            settings: ControllerSettings::default(),
            bootstrap: BootstrapSource::default(),
            keys: KeyVault::new(expand_home(Path::new(DEFAULT_KEY_DIR))),
        }
    }

    pub fn from_config(provider: Arc<dyn ComputeProvider>, config: &EscmConfig) -> Self {
        Self {
            provider,
            settings: ControllerSettings::from_config(config),
            bootstrap: BootstrapSource::from_path(config.bootstrap_script()),
            keys: KeyVault::new(config.key_dir()),
        }
    }

    pub fn with_settings(mut self, settings: ControllerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: BootstrapSource) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn with_key_vault(mut self, keys: KeyVault) -> Self {
        self.keys = keys;
        self
    }

    fn inventory(&self) -> Inventory<'_> {
        Inventory::new(self.provider.as_ref())
    }

    // ── Create ──────────────────────────────────────────────────────

    /// Create a new cluster of `intent.cluster_size` nodes.
    pub async fn create_cluster(&self, intent: &ClusterIntent) -> TopologyResult<CreateReport> {
        let cluster = intent.cluster_name.as_str();
        let mut progress = CreateProgress::new(cluster);
        let mut warnings = Vec::new();

        let counts = partition(intent.cluster_size);
        let quorum = counts.minimum_master_nodes();
        if counts.masters == 0 {
            warn!(cluster, quorum, "cluster has no master-eligible nodes, recorded quorum cannot be met");
            warnings.push(ProvisionWarning::NoMasterNodes {
                cluster: cluster.to_string(),
            });
        }

        info!(
            cluster,
            masters = counts.masters,
            data = counts.data,
            quorum,
            "creating cluster"
        );

        let key_name = intent.key_name();
        let resolver = ResourceResolver::new(self.provider.as_ref());
        // Every prerequisite runs to completion even when a sibling fails.
        let (key_status, group_id, user_data) = tokio::join!(
            resolver.resolve_key_pair(&key_name),
            async {
                match &intent.security_group_id {
                    Some(group_id) => Ok(group_id.clone()),
                    None => resolver
                        .resolve_network_access_group()
                        .await
                        .map_err(TopologyError::from),
                }
            },
            self.bootstrap.load(),
        );

        // A created key pair exists only once; save its material before
        // any sibling error is returned.
        let mut key_saved_to = None;
        if let Ok(KeyPairStatus::Created(material)) = &key_status {
            match self.persist_key(&key_name, material).await {
                Ok(path) => key_saved_to = Some(path),
                Err(warning) => warnings.push(warning),
            }
        }

        let resolved = match (key_status, group_id, user_data) {
            (Ok(_), Ok(group_id), Ok(user_data)) => Ok((group_id, user_data)),
            (Err(e), _, _) => Err(TopologyError::from(e)),
            (_, Err(e), _) | (_, _, Err(e)) => Err(e),
        };
        let (group_id, user_data) = match resolved {
            Ok(resolved) => resolved,
            Err(err) => {
                progress.fail(&err);
                return Err(err);
            }
        };
        progress.advance();

        let template = LaunchTemplate {
            image_id: self.settings.image_id.clone(),
            instance_type: self.settings.instance_type(intent.instance_type.as_deref()),
            key_name: Some(key_name.clone()),
            security_group_ids: vec![group_id.clone()],
            iam_instance_profile: intent.iam_role.clone(),
            subnet_id: intent.subnet_id.clone(),
            user_data: Some(user_data.into_string()),
        };
        let tags = ClusterTags::new(cluster, quorum, intent.xpack_enabled)
            .with_monitoring(intent.monitoring.target())
            .with_extra(parse_node_tags(&intent.node_tags));

        progress.advance();
        let masters = NodeRoleSpec::new(
            NodeRole::Master,
            counts.masters,
            template.clone(),
            tags.for_role(NodeRole::Master),
        );
        let masters = match self.launch_role(cluster, &masters).await {
            Ok(ids) => ids,
            Err(source) => {
                let err = TopologyError::Launch {
                    cluster: cluster.to_string(),
                    role: NodeRole::Master,
                    source,
                };
                progress.fail(&err);
                return Err(err);
            }
        };
        progress.advance();

        progress.advance();
        let data = NodeRoleSpec::new(
            NodeRole::Data,
            counts.data,
            template,
            tags.for_role(NodeRole::Data),
        );
        let data_nodes = match self.launch_role(cluster, &data).await {
            Ok(ids) => ids,
            Err(source) => {
                let err = TopologyError::PartialCreate {
                    cluster: cluster.to_string(),
                    masters,
                    source,
                };
                progress.fail(&err);
                return Err(err);
            }
        };
        progress.advance();

        info!(
            cluster,
            masters = masters.len(),
            data = data_nodes.len(),
            "cluster created"
        );
        Ok(CreateReport {
            cluster: cluster.to_string(),
            key_name,
            security_group_id: group_id,
            minimum_master_nodes: quorum,
            masters,
            data_nodes,
            key_saved_to,
            warnings,
        })
    }

    // ── Scale up ────────────────────────────────────────────────────

    /// Add nodes to a running cluster, copying launch settings and quorum
    /// configuration from one of its members.
    pub async fn add_nodes(&self, intent: &AddNodesIntent) -> TopologyResult<AddNodesOutcome> {
        let cluster = intent.cluster_name.as_str();
        let members = self.inventory().find_instances(cluster, &[]).await?;
        let Some(member) = members.first() else {
            info!(cluster, "no running members, nothing added");
            return Ok(AddNodesOutcome::ClusterNotFound {
                cluster: cluster.to_string(),
            });
        };

        let quorum = required_tag(member, MINIMUM_MASTER_NODES_TAG)?;
        let xpack = required_tag(member, XPACK_ENABLED_TAG)?;
        let monitoring = match member.tag(REMOTE_MONITORING_TAG) {
            Some("true") => member.tag(MONITORING_CLUSTER_TAG),
            _ => None,
        };
        debug!(
            cluster,
            member = %member.instance_id,
            quorum,
            xpack,
            "inheriting settings from member"
        );

        let user_data = self.bootstrap.load().await?;
        let template = LaunchTemplate {
            image_id: self.settings.image_id.clone(),
            instance_type: self.settings.instance_type(intent.instance_type.as_deref()),
            key_name: member.key_name.clone(),
            security_group_ids: member.security_group_ids.clone(),
            iam_instance_profile: None,
            subnet_id: member.subnet_id.clone(),
            user_data: Some(user_data.into_string()),
        };
        let tags = ClusterTags::inherited(cluster, quorum, xpack).with_monitoring(monitoring);
        let spec = |role: NodeRole, count: u32| {
            NodeRoleSpec::new(role, count, template.clone(), tags.for_role(role))
        };
        let masters = spec(NodeRole::Master, intent.masters);
        let data = spec(NodeRole::Data, intent.data);
        let clients = spec(NodeRole::Client, intent.clients);

        info!(
            cluster,
            masters = intent.masters,
            data = intent.data,
            clients = intent.clients,
            "adding nodes"
        );
        let (masters, data, clients) = tokio::join!(
            self.launch_role(cluster, &masters),
            self.launch_role(cluster, &data),
            self.launch_role(cluster, &clients),
        );

        let mut failures: Vec<(NodeRole, ProviderError)> = Vec::new();
        let mut launched: Vec<InstanceId> = Vec::new();
        let mut settle = |role: NodeRole, result: ProviderResult<Vec<InstanceId>>| match result {
            Ok(ids) => {
                launched.extend(ids.iter().cloned());
                ids
            }
            Err(e) => {
                warn!(cluster, role = %role, error = %e, "node batch failed");
                failures.push((role, e));
                Vec::new()
            }
        };
        let masters = settle(NodeRole::Master, masters);
        let data_nodes = settle(NodeRole::Data, data);
        let clients = settle(NodeRole::Client, clients);

        if !failures.is_empty() {
            return Err(TopologyError::AddNodes {
                cluster: cluster.to_string(),
                failures,
                launched,
            });
        }

        Ok(AddNodesOutcome::Added {
            cluster: cluster.to_string(),
            masters,
            data_nodes,
            clients,
        })
    }

    // ── Scale down ──────────────────────────────────────────────────

    /// Terminate every running member of `cluster`.
    pub async fn destroy_cluster(&self, cluster: &str) -> TopologyResult<RemovalOutcome> {
        let ids = self.inventory().list_instance_ids(cluster, &[]).await?;
        if ids.is_empty() {
            info!(cluster, "no instances to terminate");
            return Ok(RemovalOutcome::NothingToDestroy {
                cluster: cluster.to_string(),
            });
        }

        self.terminate(cluster, &ids).await?;
        Ok(RemovalOutcome::Destroyed {
            cluster: cluster.to_string(),
            terminated: ids,
        })
    }

    /// Terminate the running members of `cluster` whose `Name` tag is one
    /// of `node_names`. Every node sharing a matched name is removed.
    pub async fn remove_nodes(
        &self,
        cluster: &str,
        node_names: &[String],
    ) -> TopologyResult<RemovalOutcome> {
        let not_found = || RemovalOutcome::NodesNotFound {
            cluster: cluster.to_string(),
            node_names: node_names.to_vec(),
        };

        let Some(filter) = name_filter(node_names) else {
            debug!(cluster, "no node names given");
            return Ok(not_found());
        };
        let ids = self.inventory().list_instance_ids(cluster, &[filter]).await?;
        if ids.is_empty() {
            info!(cluster, names = ?node_names, "no matching nodes");
            return Ok(not_found());
        }

        self.terminate(cluster, &ids).await?;
        Ok(RemovalOutcome::Removed {
            cluster: cluster.to_string(),
            terminated: ids,
        })
    }

    // ── Inspect ─────────────────────────────────────────────────────

    pub async fn list_instance_ids(&self, cluster: &str) -> TopologyResult<Vec<InstanceId>> {
        Ok(self.inventory().list_instance_ids(cluster, &[]).await?)
    }

    pub async fn list_attribute(
        &self,
        cluster: &str,
        attribute: &InstanceAttribute,
    ) -> TopologyResult<Vec<AttributeValue>> {
        Ok(self
            .inventory()
            .list_attribute(cluster, attribute, &[])
            .await?)
    }

    /// Write new key material to the vault. A failed write is reported as
    /// a warning, never as an error.
    async fn persist_key(
        &self,
        key_name: &str,
        material: &KeyMaterial,
    ) -> Result<PathBuf, ProvisionWarning> {
        self.keys.save(key_name, material).await.map_err(|e| {
            let path = self.keys.path_for(key_name);
            warn!(
                key_name,
                path = %path.display(),
                error = %e,
                "could not save private key"
            );
            ProvisionWarning::KeyNotPersisted {
                key_name: key_name.to_string(),
                path,
                reason: e.to_string(),
            }
        })
    }

    // ── Provider calls ──────────────────────────────────────────────

    /// Launch one role batch. An empty batch makes no provider call.
    async fn launch_role(&self, cluster: &str, spec: &NodeRoleSpec) -> ProviderResult<Vec<InstanceId>> {
        let Some(request) = spec.launch_request() else {
            debug!(cluster, role = %spec.role, "no nodes requested, skipping launch");
            return Ok(Vec::new());
        };

        info!(cluster, role = %spec.role, count = spec.count, "launching nodes");
        let instances = self.provider.run_instances(&request).await?;
        let ids: Vec<InstanceId> = instances.into_iter().map(|i| i.instance_id).collect();
        info!(cluster, role = %spec.role, ids = ?ids, "nodes launched");
        Ok(ids)
    }

    async fn terminate(&self, cluster: &str, ids: &[InstanceId]) -> ProviderResult<()> {
        self.provider.terminate_instances(ids).await?;
        info!(cluster, count = ids.len(), "instances terminated");
        Ok(())
    }
}

fn required_tag<'i>(member: &'i Instance, tag: &'static str) -> TopologyResult<&'i str> {
    member.tag(tag).ok_or_else(|| TopologyError::MemberTagMissing {
        instance_id: member.instance_id.clone(),
        tag,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::SECURITY_GROUP_NAME;
    use crate::tags::{CLUSTER_NAME_TAG, DATA_ELIGIBLE_TAG, MASTER_ELIGIBLE_TAG, NAME_TAG};
    use escm_core::MonitoringSettings;
    use escm_provider::{InMemoryProvider, InstanceState, Operation, ProviderFuture, Tag};

    struct Harness {
        provider: Arc<InMemoryProvider>,
        controller: TopologyController,
        _keys: tempfile::TempDir,
    }

    fn harness() -> Harness {
        let provider = Arc::new(InMemoryProvider::new());
        let keys = tempfile::tempdir().unwrap();
        let controller = TopologyController::new(provider.clone())
            .with_bootstrap(BootstrapSource::Inline("#!/bin/sh\n".to_string()))
            .with_key_vault(KeyVault::new(keys.path()));
        Harness {
            provider,
            controller,
            _keys: keys,
        }
    }

    fn launch_failure() -> ProviderError {
        ProviderError::api("RunInstances", "InsufficientInstanceCapacity")
    }

    #[test]
    fn phases_advance_in_order() {
        let mut phase = CreatePhase::Uninitialized;
        let mut seen = vec![phase];
        while let Some(next) = phase.next() {
            phase = next;
            seen.push(phase);
        }
        assert_eq!(
            seen,
            vec![
                CreatePhase::Uninitialized,
                CreatePhase::PrerequisitesResolved,
                CreatePhase::MastersLaunching,
                CreatePhase::MastersReady,
                CreatePhase::DataNodesLaunching,
                CreatePhase::Complete,
            ]
        );
        assert!(CreatePhase::Failed.next().is_none());
        assert_eq!(CreatePhase::MastersReady.to_string(), "masters_ready");
    }

    #[test]
    fn progress_records_failed_phase() {
        let mut progress = CreateProgress::new("logs");
        progress.advance();
        progress.advance();
        let err = TopologyError::UnknownAttribute("x".to_string());
        assert_eq!(progress.fail(&err), CreatePhase::MastersLaunching);
        assert_eq!(progress.phase, CreatePhase::Failed);

        progress.advance();
        assert_eq!(progress.phase, CreatePhase::Failed);
    }

    #[tokio::test]
    async fn create_five_node_cluster() {
        let h = harness();
        let report = h
            .controller
            .create_cluster(&ClusterIntent::new("logs", 5))
            .await
            .unwrap();

        assert_eq!(report.to_string(), "Successfully created ES cluster: logs");
        assert_eq!(report.masters.len(), 3);
        assert_eq!(report.data_nodes.len(), 2);
        assert_eq!(report.minimum_master_nodes, 2);
        assert!(report.warnings.is_empty());

        let launches = h.provider.launches();
        assert_eq!(launches.len(), 2);

        let masters = &launches[0];
        assert_eq!((masters.min_count, masters.max_count), (3, 3));
        assert_eq!(masters.tag(MASTER_ELIGIBLE_TAG), Some("true"));
        assert_eq!(masters.tag(MINIMUM_MASTER_NODES_TAG), Some("2"));
        assert_eq!(masters.tag(NAME_TAG), Some("es-logs-master"));

        let data = &launches[1];
        assert_eq!((data.min_count, data.max_count), (2, 2));
        assert_eq!(data.tag(MASTER_ELIGIBLE_TAG), Some("false"));
        assert_eq!(data.tag(MINIMUM_MASTER_NODES_TAG), Some("2"));
        assert_eq!(data.tag(CLUSTER_NAME_TAG), Some("logs"));

        for req in &launches {
            assert_eq!(req.image_id, DEFAULT_IMAGE_ID);
            assert_eq!(req.instance_type, DEFAULT_INSTANCE_TYPE);
            assert_eq!(req.key_name.as_deref(), Some("logs-key"));
            assert_eq!(req.security_group_ids, vec![report.security_group_id.clone()]);
            assert_eq!(req.user_data.as_deref(), Some("IyEvYmluL3NoCg=="));
        }

        assert_eq!(h.provider.security_groups()[0].group_name, SECURITY_GROUP_NAME);
        assert_eq!(h.provider.ingress_rules(&report.security_group_id).len(), 3);

        let saved = report.key_saved_to.unwrap();
        assert!(saved.ends_with("logs-key.pem"));
        assert!(saved.exists());
    }

    #[tokio::test]
    async fn single_node_cluster_skips_data_launch() {
        let h = harness();
        let report = h
            .controller
            .create_cluster(&ClusterIntent::new("solo", 1))
            .await
            .unwrap();

        assert_eq!(report.minimum_master_nodes, 1);
        assert!(report.data_nodes.is_empty());
        assert_eq!(h.provider.call_count(Operation::RunInstances), 1);
    }

    #[tokio::test]
    async fn empty_cluster_launches_nothing_and_warns() {
        let h = harness();
        let report = h
            .controller
            .create_cluster(&ClusterIntent::new("empty", 0))
            .await
            .unwrap();

        assert_eq!(report.minimum_master_nodes, 1);
        assert_eq!(h.provider.call_count(Operation::RunInstances), 0);
        assert_eq!(
            report.warnings,
            vec![ProvisionWarning::NoMasterNodes {
                cluster: "empty".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn supplied_security_group_is_not_resolved() {
        let h = harness();
        let intent = ClusterIntent::new("logs", 2)
            .with_security_group("sg-custom")
            .with_subnet("subnet-1")
            .with_iam_role("es-node")
            .with_instance_type("m5.large");

        h.controller.create_cluster(&intent).await.unwrap();

        assert_eq!(h.provider.call_count(Operation::DescribeSecurityGroup), 0);
        assert_eq!(h.provider.call_count(Operation::CreateSecurityGroup), 0);
        let req = &h.provider.launches()[0];
        assert_eq!(req.security_group_ids, vec!["sg-custom".to_string()]);
        assert_eq!(req.subnet_id.as_deref(), Some("subnet-1"));
        assert_eq!(req.iam_instance_profile.as_deref(), Some("es-node"));
        assert_eq!(req.instance_type, "m5.large");
    }

    #[tokio::test]
    async fn existing_key_pair_is_not_saved_again() {
        let h = harness();
        h.provider.insert_key_pair("shared");

        let report = h
            .controller
            .create_cluster(&ClusterIntent::new("logs", 1).with_key_name("shared"))
            .await
            .unwrap();

        assert_eq!(report.key_name, "shared");
        assert!(report.key_saved_to.is_none());
        assert!(report.warnings.is_empty());
    }

    #[tokio::test]
    async fn unsaved_key_is_a_warning() {
        let h = harness();
        let blocker = h._keys.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let controller = TopologyController::new(h.provider.clone())
            .with_bootstrap(BootstrapSource::Inline("#!/bin/sh\n".to_string()))
            .with_key_vault(KeyVault::new(blocker.join("keys")));

        let report = controller
            .create_cluster(&ClusterIntent::new("logs", 1))
            .await
            .unwrap();

        assert!(report.key_saved_to.is_none());
        assert!(matches!(
            report.warnings.as_slice(),
            [ProvisionWarning::KeyNotPersisted { key_name, .. }] if key_name == "logs-key"
        ));
        assert_eq!(h.provider.call_count(Operation::RunInstances), 1);
    }

    #[tokio::test]
    async fn monitoring_and_operator_tags_reach_every_node() {
        let h = harness();
        let intent = ClusterIntent::new("logs", 4)
            .with_xpack(true)
            .with_monitoring(MonitoringSettings {
                remote_monitoring: true,
                monitoring_cluster: Some("10.1.2.3".to_string()),
            })
            .with_node_tags(vec!["env:prod".to_string(), "badtag".to_string()]);

        h.controller.create_cluster(&intent).await.unwrap();

        for req in h.provider.launches() {
            assert_eq!(req.tag(XPACK_ENABLED_TAG), Some("true"));
            assert_eq!(req.tag(REMOTE_MONITORING_TAG), Some("true"));
            assert_eq!(req.tag(MONITORING_CLUSTER_TAG), Some("10.1.2.3"));
            assert_eq!(req.tag("env"), Some("prod"));
            assert_eq!(req.tag("badtag"), None);
        }
    }

    #[tokio::test]
    async fn master_failure_launches_no_data_nodes() {
        let h = harness();
        h.provider
            .inject_launch_failure(NAME_TAG, "es-logs-master", launch_failure());

        let err = h
            .controller
            .create_cluster(&ClusterIntent::new("logs", 5))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TopologyError::Launch { role: NodeRole::Master, .. }
        ));
        assert_eq!(h.provider.call_count(Operation::RunInstances), 1);
        // Prerequisites stay in place.
        assert_eq!(h.provider.security_groups().len(), 1);
        assert_eq!(h.provider.key_pairs(), vec!["logs-key".to_string()]);
    }

    #[tokio::test]
    async fn data_failure_keeps_masters_running() {
        let h = harness();
        h.provider
            .inject_launch_failure(NAME_TAG, "es-logs-data", launch_failure());

        let err = h
            .controller
            .create_cluster(&ClusterIntent::new("logs", 5))
            .await
            .unwrap_err();

        let TopologyError::PartialCreate { masters, .. } = err else {
            panic!("expected a partial create failure");
        };
        assert_eq!(masters.len(), 3);
        assert_eq!(
            h.controller.list_instance_ids("logs").await.unwrap(),
            masters
        );
    }

    #[tokio::test]
    async fn missing_bootstrap_script_fails_before_launch() {
        let h = harness();
        let dir = tempfile::tempdir().unwrap();
        let controller = TopologyController::new(h.provider.clone())
            .with_bootstrap(BootstrapSource::File(dir.path().join("missing.sh")))
            .with_key_vault(KeyVault::new(dir.path()));

        let err = controller
            .create_cluster(&ClusterIntent::new("logs", 3))
            .await
            .unwrap_err();

        assert!(matches!(err, TopologyError::Bootstrap { .. }));
        assert_eq!(h.provider.call_count(Operation::RunInstances), 0);

        // The other prerequisites still completed.
        assert_eq!(h.provider.key_pairs(), vec!["logs-key".to_string()]);
        assert!(dir.path().join("logs-key.pem").exists());
        let groups = h.provider.security_groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(h.provider.ingress_rules(&groups[0].group_id).len(), 3);

        // A retry reuses both without creating anything.
        let report = controller
            .with_bootstrap(BootstrapSource::Inline("#!/bin/sh\n".to_string()))
            .create_cluster(&ClusterIntent::new("logs", 3))
            .await
            .unwrap();
        assert_eq!(report.security_group_id, groups[0].group_id);
        assert!(report.key_saved_to.is_none());
        assert_eq!(h.provider.call_count(Operation::CreateSecurityGroup), 1);
    }

    /// Delegates to the in-memory provider but holds `authorize_ingress`
    /// open for a while.
    struct SlowIngress {
        inner: Arc<InMemoryProvider>,
    }

    impl ComputeProvider for SlowIngress {
        fn create_key_pair<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, KeyMaterial> {
            self.inner.create_key_pair(name)
        }

        fn describe_security_group<'a>(
            &'a self,
            name: &'a str,
        ) -> ProviderFuture<'a, escm_provider::SecurityGroup> {
            self.inner.describe_security_group(name)
        }

        fn create_security_group<'a>(
            &'a self,
            name: &'a str,
            description: &'a str,
        ) -> ProviderFuture<'a, escm_provider::GroupId> {
            self.inner.create_security_group(name, description)
        }

        fn authorize_ingress<'a>(
            &'a self,
            group_id: &'a str,
            rules: &'a [escm_provider::IngressRule],
        ) -> ProviderFuture<'a, ()> {
            Box::pin(async move {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                self.inner.authorize_ingress(group_id, rules).await
            })
        }

        fn describe_instances<'a>(
            &'a self,
            filters: &'a [escm_provider::InstanceFilter],
        ) -> ProviderFuture<'a, Vec<escm_provider::Reservation>> {
            self.inner.describe_instances(filters)
        }

        fn run_instances<'a>(
            &'a self,
            request: &'a escm_provider::LaunchRequest,
        ) -> ProviderFuture<'a, Vec<Instance>> {
            self.inner.run_instances(request)
        }

        fn terminate_instances<'a>(&'a self, ids: &'a [InstanceId]) -> ProviderFuture<'a, ()> {
            self.inner.terminate_instances(ids)
        }
    }

    #[tokio::test]
    async fn slow_group_authorization_outlives_failed_bootstrap() {
        let inner = Arc::new(InMemoryProvider::new());
        let dir = tempfile::tempdir().unwrap();
        let controller = TopologyController::new(Arc::new(SlowIngress {
            inner: inner.clone(),
        }))
        .with_bootstrap(BootstrapSource::File(dir.path().join("missing.sh")))
        .with_key_vault(KeyVault::new(dir.path()));

        let err = controller
            .create_cluster(&ClusterIntent::new("logs", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, TopologyError::Bootstrap { .. }));

        let groups = inner.security_groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(inner.ingress_rules(&groups[0].group_id).len(), 3);
        assert!(dir.path().join("logs-key.pem").exists());
    }

    #[tokio::test]
    async fn add_nodes_to_missing_cluster() {
        let h = harness();
        let mut intent = AddNodesIntent::new("ghost");
        intent.data = 2;

        let outcome = h.controller.add_nodes(&intent).await.unwrap();

        assert_eq!(
            outcome.to_string(),
            "Could not add nodes to cluster [ghost]. Cluster does not exist."
        );
        assert!(!outcome.is_added());
        assert_eq!(h.provider.call_count(Operation::RunInstances), 0);
    }

    #[tokio::test]
    async fn add_nodes_inherits_from_member() {
        let h = harness();
        let intent = ClusterIntent::new("logs", 3)
            .with_xpack(true)
            .with_subnet("subnet-9")
            .with_monitoring(MonitoringSettings {
                remote_monitoring: true,
                monitoring_cluster: Some("10.1.2.3".to_string()),
            });
        let report = h.controller.create_cluster(&intent).await.unwrap();

        let mut add = AddNodesIntent::new("logs");
        add.data = 1;
        add.clients = 2;
        add.instance_type = Some("r5.xlarge".to_string());
        let outcome = h.controller.add_nodes(&add).await.unwrap();

        assert_eq!(
            outcome.to_string(),
            "Successfully added new nodes to cluster [logs]"
        );
        let AddNodesOutcome::Added {
            masters,
            data_nodes,
            clients,
            ..
        } = outcome
        else {
            panic!("expected nodes to be added");
        };
        assert!(masters.is_empty());
        assert_eq!(data_nodes.len(), 1);
        assert_eq!(clients.len(), 2);

        let launches = h.provider.launches();
        // One master launch from create, then data and client batches.
        assert_eq!(launches.len(), 3);
        for req in &launches[1..] {
            assert_eq!(req.key_name.as_deref(), Some("logs-key"));
            assert_eq!(req.security_group_ids, vec![report.security_group_id.clone()]);
            assert_eq!(req.subnet_id.as_deref(), Some("subnet-9"));
            assert_eq!(req.instance_type, "r5.xlarge");
            assert_eq!(req.tag(MINIMUM_MASTER_NODES_TAG), Some("2"));
            assert_eq!(req.tag(XPACK_ENABLED_TAG), Some("true"));
            assert_eq!(req.tag(MONITORING_CLUSTER_TAG), Some("10.1.2.3"));
            assert_eq!(req.tag(MASTER_ELIGIBLE_TAG), Some("false"));
        }
        let client = launches
            .iter()
            .find(|r| r.tag(NAME_TAG) == Some("es-logs-client"))
            .unwrap();
        assert_eq!((client.min_count, client.max_count), (2, 2));
        assert_eq!(client.tag(DATA_ELIGIBLE_TAG), Some("false"));

        assert_eq!(h.controller.list_instance_ids("logs").await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn add_nodes_requires_inherited_tags() {
        let h = harness();
        let mut member = Instance::new("i-legacy", InstanceState::Running);
        member.tags = vec![Tag::new(CLUSTER_NAME_TAG, "logs")];
        h.provider.insert_instance(member);

        let mut add = AddNodesIntent::new("logs");
        add.data = 1;
        let err = h.controller.add_nodes(&add).await.unwrap_err();

        assert!(matches!(
            err,
            TopologyError::MemberTagMissing { tag: MINIMUM_MASTER_NODES_TAG, .. }
        ));
        assert_eq!(h.provider.call_count(Operation::RunInstances), 0);
    }

    #[tokio::test]
    async fn add_nodes_reports_failed_batches_after_all_complete() {
        let h = harness();
        h.controller
            .create_cluster(&ClusterIntent::new("logs", 3))
            .await
            .unwrap();
        h.provider
            .inject_launch_failure(NAME_TAG, "es-logs-client", launch_failure());

        let mut add = AddNodesIntent::new("logs");
        add.data = 2;
        add.clients = 1;
        let err = h.controller.add_nodes(&add).await.unwrap_err();

        let TopologyError::AddNodes {
            failures, launched, ..
        } = err
        else {
            panic!("expected an add-nodes failure");
        };
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, NodeRole::Client);
        assert_eq!(launched.len(), 2);
    }

    #[tokio::test]
    async fn destroy_terminates_in_one_batch() {
        let h = harness();
        h.controller
            .create_cluster(&ClusterIntent::new("logs", 4))
            .await
            .unwrap();

        let outcome = h.controller.destroy_cluster("logs").await.unwrap();
        assert_eq!(outcome.to_string(), "Successfully destroyed cluster [logs].");
        assert_eq!(outcome.terminated().len(), 4);
        assert_eq!(h.provider.terminations().len(), 1);

        let again = h.controller.destroy_cluster("logs").await.unwrap();
        assert_eq!(
            again,
            RemovalOutcome::NothingToDestroy {
                cluster: "logs".to_string()
            }
        );
        assert_eq!(h.provider.terminations().len(), 1);
    }

    #[tokio::test]
    async fn remove_nodes_by_name() {
        let h = harness();
        h.controller
            .create_cluster(&ClusterIntent::new("logs", 5))
            .await
            .unwrap();

        let names = vec!["es-logs-data".to_string(), "es-logs-data".to_string()];
        let outcome = h.controller.remove_nodes("logs", &names).await.unwrap();

        assert_eq!(
            outcome.to_string(),
            "Successfully removed 2 nodes from cluster [logs]"
        );
        assert_eq!(h.controller.list_instance_ids("logs").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn remove_unknown_nodes_terminates_nothing() {
        let h = harness();
        h.controller
            .create_cluster(&ClusterIntent::new("logs", 2))
            .await
            .unwrap();

        let names = vec!["es-logs-client".to_string()];
        let outcome = h.controller.remove_nodes("logs", &names).await.unwrap();
        assert_eq!(
            outcome.to_string(),
            "Could not find [es-logs-client] in cluster [logs]."
        );

        let describes = h.provider.call_count(Operation::DescribeInstances);
        let outcome = h.controller.remove_nodes("logs", &[]).await.unwrap();
        assert!(matches!(outcome, RemovalOutcome::NodesNotFound { .. }));
        assert_eq!(h.provider.call_count(Operation::DescribeInstances), describes);
        assert_eq!(h.provider.call_count(Operation::TerminateInstances), 0);
    }

    #[tokio::test]
    async fn terminate_errors_propagate() {
        let h = harness();
        h.controller
            .create_cluster(&ClusterIntent::new("logs", 1))
            .await
            .unwrap();
        h.provider.inject_failure(
            Operation::TerminateInstances,
            ProviderError::api("TerminateInstances", "denied"),
        );

        let err = h.controller.destroy_cluster("logs").await.unwrap_err();
        assert!(matches!(err, TopologyError::Provider(_)));
    }

    #[tokio::test]
    async fn lists_private_addresses() {
        let h = harness();
        h.controller
            .create_cluster(&ClusterIntent::new("logs", 2))
            .await
            .unwrap();

        let values = h
            .controller
            .list_attribute("logs", &"private_ip_address".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(values.len(), 2);
        assert!(values.iter().all(|v| v.value.as_deref().is_some_and(|ip| ip.starts_with("10.0."))));
    }
}
