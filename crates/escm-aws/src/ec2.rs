//! EC2-backed compute provider.

use aws_config::BehaviorVersion;
use aws_sdk_ec2::Client;
use aws_sdk_ec2::config::Region;
use aws_sdk_ec2::types::{
    IamInstanceProfileSpecification, InstanceType, ResourceType, TagSpecification,
};
use escm_provider::{
    ComputeProvider, GroupId, IngressRule, Instance, InstanceFilter, InstanceId, KeyMaterial,
    LaunchRequest, ProviderError, ProviderFuture, ProviderResult, Reservation, ResourceKind,
    SecurityGroup,
};
use tracing::{debug, info};

use crate::convert::{
    from_ec2_instance, from_ec2_reservation, sdk_error, to_ec2_filter, to_ec2_tag,
    to_ip_permission,
};

/// A `ComputeProvider` talking to EC2 in one region.
#[derive(Debug, Clone)]
pub struct Ec2Provider {
    client: Client,
}

impl Ec2Provider {
    /// Build a client from the default credential chain for `region`.
    pub async fn connect(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        debug!(region, "EC2 client configured");
        Self::from_client(Client::new(&config))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    async fn do_create_key_pair(&self, name: &str) -> ProviderResult<KeyMaterial> {
        let out = self
            .client
            .create_key_pair()
            .key_name(name)
            .send()
            .await
            .map_err(|e| sdk_error("CreateKeyPair", name, &e))?;
        let material = out
            .key_material()
            .ok_or_else(|| ProviderError::api("CreateKeyPair", "response carried no key material"))?;
        info!(key_name = name, "EC2 key pair created");
        Ok(KeyMaterial::new(material))
    }

    async fn do_describe_security_group(&self, name: &str) -> ProviderResult<SecurityGroup> {
        let out = self
            .client
            .describe_security_groups()
            .group_names(name)
            .send()
            .await
            .map_err(|e| sdk_error("DescribeSecurityGroups", name, &e))?;

        out.security_groups()
            .iter()
            .find_map(|g| {
                Some(SecurityGroup {
                    group_id: g.group_id()?.to_string(),
                    group_name: g.group_name().unwrap_or(name).to_string(),
                })
            })
            .ok_or_else(|| ProviderError::NotFound {
                resource: ResourceKind::SecurityGroup,
                name: name.to_string(),
            })
    }

    async fn do_create_security_group(&self, name: &str, description: &str) -> ProviderResult<GroupId> {
        let out = self
            .client
            .create_security_group()
            .group_name(name)
            .description(description)
            .send()
            .await
            .map_err(|e| sdk_error("CreateSecurityGroup", name, &e))?;
        out.group_id()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::api("CreateSecurityGroup", "response carried no group id"))
    }

    async fn do_authorize_ingress(&self, group_id: &str, rules: &[IngressRule]) -> ProviderResult<()> {
        self.client
            .authorize_security_group_ingress()
            .group_id(group_id)
            .set_ip_permissions(Some(rules.iter().map(to_ip_permission).collect()))
            .send()
            .await
            .map_err(|e| sdk_error("AuthorizeSecurityGroupIngress", group_id, &e))?;
        Ok(())
    }

    async fn do_describe_instances(&self, filters: &[InstanceFilter]) -> ProviderResult<Vec<Reservation>> {
        let filters: Vec<_> = filters.iter().map(to_ec2_filter).collect();
        let mut reservations = Vec::new();
        let mut next_token = None;

        loop {
            let out = self
                .client
                .describe_instances()
                .set_filters(Some(filters.clone()))
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error("DescribeInstances", "", &e))?;

            reservations.extend(out.reservations().iter().map(from_ec2_reservation));
            match out.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        debug!(reservations = reservations.len(), "EC2 instances described");
        Ok(reservations)
    }

    async fn do_run_instances(&self, request: &LaunchRequest) -> ProviderResult<Vec<Instance>> {
        let min_count = count_param(request.min_count)?;
        let max_count = count_param(request.max_count)?;
        let tags = TagSpecification::builder()
            .resource_type(ResourceType::Instance)
            .set_tags(Some(request.tags.iter().map(to_ec2_tag).collect()))
            .build();
        let profile = request.iam_instance_profile.as_ref().map(|name| {
            IamInstanceProfileSpecification::builder()
                .name(name)
                .build()
        });

        let out = self
            .client
            .run_instances()
            .image_id(&request.image_id)
            .instance_type(InstanceType::from(request.instance_type.as_str()))
            .min_count(min_count)
            .max_count(max_count)
            .set_key_name(request.key_name.clone())
            .set_security_group_ids(Some(request.security_group_ids.clone()))
            .set_user_data(request.user_data.clone())
            .set_subnet_id(request.subnet_id.clone())
            .set_iam_instance_profile(profile)
            .tag_specifications(tags)
            .send()
            .await
            .map_err(|e| sdk_error("RunInstances", "", &e))?;

        let instances: Vec<Instance> = out.instances().iter().map(from_ec2_instance).collect();
        info!(count = instances.len(), "EC2 instances launched");
        Ok(instances)
    }

    async fn do_terminate_instances(&self, ids: &[InstanceId]) -> ProviderResult<()> {
        self.client
            .terminate_instances()
            .set_instance_ids(Some(ids.to_vec()))
            .send()
            .await
            .map_err(|e| sdk_error("TerminateInstances", "", &e))?;
        info!(count = ids.len(), "EC2 instances terminating");
        Ok(())
    }
}

fn count_param(count: u32) -> ProviderResult<i32> {
    i32::try_from(count).map_err(|_| ProviderError::api("RunInstances", format!("instance count {count} out of range")))
}

impl ComputeProvider for Ec2Provider {
    fn create_key_pair<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, KeyMaterial> {
        Box::pin(self.do_create_key_pair(name))
    }

    fn describe_security_group<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, SecurityGroup> {
        Box::pin(self.do_describe_security_group(name))
    }

    fn create_security_group<'a>(
        &'a self,
        name: &'a str,
        description: &'a str,
    ) -> ProviderFuture<'a, GroupId> {
        Box::pin(self.do_create_security_group(name, description))
    }

    fn authorize_ingress<'a>(
        &'a self,
        group_id: &'a str,
        rules: &'a [IngressRule],
    ) -> ProviderFuture<'a, ()> {
        Box::pin(self.do_authorize_ingress(group_id, rules))
    }

    fn describe_instances<'a>(
        &'a self,
        filters: &'a [InstanceFilter],
    ) -> ProviderFuture<'a, Vec<Reservation>> {
        Box::pin(self.do_describe_instances(filters))
    }

    fn run_instances<'a>(&'a self, request: &'a LaunchRequest) -> ProviderFuture<'a, Vec<Instance>> {
        Box::pin(self.do_run_instances(request))
    }

    fn terminate_instances<'a>(&'a self, ids: &'a [InstanceId]) -> ProviderFuture<'a, ()> {
        Box::pin(self.do_terminate_instances(ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_outside_i32_are_rejected() {
        assert_eq!(count_param(3).unwrap(), 3);
        assert!(count_param(u32::MAX).is_err());
    }

    #[test]
    fn provider_is_object_safe() {
        let config = aws_sdk_ec2::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .build();
        let provider: Box<dyn ComputeProvider> =
            Box::new(Ec2Provider::from_client(Client::from_conf(config)));
        drop(provider);
    }
}
