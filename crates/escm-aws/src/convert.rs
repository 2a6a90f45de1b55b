//! Conversions between EC2 SDK types and provider types.

use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_ec2::primitives::DateTimeFormat;
use aws_sdk_ec2::types as ec2;
use escm_provider::{
    IngressRule, Instance, InstanceFilter, InstanceState, ProviderError, Reservation,
    ResourceKind, Tag,
};

pub const DUPLICATE_KEY_PAIR: &str = "InvalidKeyPair.Duplicate";
pub const DUPLICATE_GROUP: &str = "InvalidGroup.Duplicate";
pub const GROUP_NOT_FOUND: &str = "InvalidGroup.NotFound";

/// Map an EC2 error code onto the provider taxonomy. `name` is the key
/// pair or security group the call was about.
pub fn classify(
    operation: &'static str,
    name: &str,
    code: Option<&str>,
    message: String,
) -> ProviderError {
    match code {
        Some(DUPLICATE_KEY_PAIR) => ProviderError::AlreadyExists {
            resource: ResourceKind::KeyPair,
            name: name.to_string(),
        },
        Some(DUPLICATE_GROUP) => ProviderError::AlreadyExists {
            resource: ResourceKind::SecurityGroup,
            name: name.to_string(),
        },
        Some(GROUP_NOT_FOUND) => ProviderError::NotFound {
            resource: ResourceKind::SecurityGroup,
            name: name.to_string(),
        },
        _ => ProviderError::Api {
            operation,
            code: code.map(str::to_string),
            message,
        },
    }
}

/// Classify an SDK error, keeping its full source chain as the message.
pub fn sdk_error<E>(operation: &'static str, name: &str, err: &E) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error,
{
    classify(
        operation,
        name,
        err.code(),
        DisplayErrorContext(err).to_string(),
    )
}

pub fn to_ec2_filter(filter: &InstanceFilter) -> ec2::Filter {
    ec2::Filter::builder()
        .name(&filter.name)
        .set_values(Some(filter.values.clone()))
        .build()
}

pub fn to_ec2_tag(tag: &Tag) -> ec2::Tag {
    ec2::Tag::builder().key(&tag.key).value(&tag.value).build()
}

pub fn to_ip_permission(rule: &IngressRule) -> ec2::IpPermission {
    ec2::IpPermission::builder()
        .ip_protocol(&rule.protocol)
        .from_port(i32::from(rule.from_port))
        .to_port(i32::from(rule.to_port))
        .user_id_group_pairs(
            ec2::UserIdGroupPair::builder()
                .group_id(&rule.source_group_id)
                .build(),
        )
        .build()
}

pub fn from_ec2_instance(instance: &ec2::Instance) -> Instance {
    let state = instance
        .state()
        .and_then(|s| s.name())
        .map(|name| InstanceState::from_name(name.as_str()))
        .unwrap_or(InstanceState::Unknown);

    let mut converted = Instance::new(instance.instance_id().unwrap_or_default(), state);
    converted.image_id = instance.image_id().map(str::to_string);
    converted.instance_type = instance.instance_type().map(|t| t.as_str().to_string());
    converted.key_name = instance.key_name().map(str::to_string);
    converted.private_ip_address = instance.private_ip_address().map(str::to_string);
    converted.public_ip_address = instance.public_ip_address().map(str::to_string);
    converted.private_dns_name = non_empty(instance.private_dns_name());
    converted.public_dns_name = non_empty(instance.public_dns_name());
    converted.subnet_id = instance.subnet_id().map(str::to_string);
    converted.vpc_id = instance.vpc_id().map(str::to_string);
    converted.launch_time = instance
        .launch_time()
        .and_then(|t| t.fmt(DateTimeFormat::DateTime).ok());
    converted.security_group_ids = instance
        .security_groups()
        .iter()
        .filter_map(|g| g.group_id().map(str::to_string))
        .collect();
    converted.tags = instance
        .tags()
        .iter()
        .filter_map(|t| Some(Tag::new(t.key()?, t.value().unwrap_or_default())))
        .collect();
    converted
}

pub fn from_ec2_reservation(reservation: &ec2::Reservation) -> Reservation {
    Reservation {
        reservation_id: reservation.reservation_id().map(str::to_string),
        instances: reservation
            .instances()
            .iter()
            .map(from_ec2_instance)
            .collect(),
    }
}

// EC2 reports unassigned DNS names as "".
fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}
