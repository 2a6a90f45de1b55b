//! The compute provider capability trait.
//!
//! Everything the cluster manager needs from a cloud: key pairs, security
//! groups, and the instance lifecycle primitives. The trait is object safe
//! (methods return boxed futures) so controllers hold an
//! `Arc<dyn ComputeProvider>` and tests inject the in-memory provider.

use std::future::Future;
use std::pin::Pin;

use crate::error::ProviderResult;
use crate::types::{
    GroupId, IngressRule, Instance, InstanceFilter, InstanceId, KeyMaterial, LaunchRequest,
    Reservation, SecurityGroup,
};

/// Boxed future alias for provider call results.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = ProviderResult<T>> + Send + 'a>>;

/// Instance, security-group and key-pair primitives of a compute provider.
pub trait ComputeProvider: Send + Sync {
    /// Create a named key pair and return its private key material.
    ///
    /// Fails with `AlreadyExists` when the name is taken.
    fn create_key_pair<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, KeyMaterial>;

    /// Look up a security group by name. Fails with `NotFound` when absent.
    fn describe_security_group<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, SecurityGroup>;

    /// Create a security group. Fails with `AlreadyExists` when the name is taken.
    fn create_security_group<'a>(
        &'a self,
        name: &'a str,
        description: &'a str,
    ) -> ProviderFuture<'a, GroupId>;

    /// Add ingress rules to a security group.
    fn authorize_ingress<'a>(
        &'a self,
        group_id: &'a str,
        rules: &'a [IngressRule],
    ) -> ProviderFuture<'a, ()>;

    /// Describe instances matching every filter.
    fn describe_instances<'a>(
        &'a self,
        filters: &'a [InstanceFilter],
    ) -> ProviderFuture<'a, Vec<Reservation>>;

    /// Launch between `min_count` and `max_count` instances.
    fn run_instances<'a>(&'a self, request: &'a LaunchRequest) -> ProviderFuture<'a, Vec<Instance>>;

    /// Terminate the given instances in one call.
    fn terminate_instances<'a>(&'a self, ids: &'a [InstanceId]) -> ProviderFuture<'a, ()>;
}
