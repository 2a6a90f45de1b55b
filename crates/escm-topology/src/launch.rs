//! Per-role launch parameters.

use escm_provider::{GroupId, LaunchRequest, Tag};

use crate::plan::NodeRole;

/// Launch parameters shared by every role of one provisioning call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchTemplate {
    pub image_id: String,
    pub instance_type: String,
    pub key_name: Option<String>,
    pub security_group_ids: Vec<GroupId>,
    pub iam_instance_profile: Option<String>,
    pub subnet_id: Option<String>,
    /// Base64-encoded initialization payload.
    pub user_data: Option<String>,
}

/// One role's batch: how many nodes, launched how, tagged how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRoleSpec {
    pub role: NodeRole,
    pub count: u32,
    pub template: LaunchTemplate,
    pub tags: Vec<Tag>,
}

impl NodeRoleSpec {
    pub fn new(role: NodeRole, count: u32, template: LaunchTemplate, tags: Vec<Tag>) -> Self {
        Self {
            role,
            count,
            template,
            tags,
        }
    }

    /// A fixed-size launch request (`min == max == count`), or `None` when
    /// the batch is empty.
    pub fn launch_request(&self) -> Option<LaunchRequest> {
        if self.count == 0 {
            return None;
        }
        let t = &self.template;
        Some(LaunchRequest {
            image_id: t.image_id.clone(),
            instance_type: t.instance_type.clone(),
            min_count: self.count,
            max_count: self.count,
            key_name: t.key_name.clone(),
            security_group_ids: t.security_group_ids.clone(),
            tags: self.tags.clone(),
            user_data: t.user_data.clone(),
            iam_instance_profile: t.iam_instance_profile.clone(),
            subnet_id: t.subnet_id.clone(),
        })
    }
}
