//! escm-aws: `ComputeProvider` over the AWS EC2 API.
//!
//! EC2 error codes for duplicate key pairs, duplicate security groups and
//! missing security groups map onto the provider's `AlreadyExists` and
//! `NotFound` variants; every other failure becomes `ProviderError::Api`
//! carrying the EC2 error code.

pub mod convert;
pub mod ec2;

pub use ec2::Ec2Provider;
