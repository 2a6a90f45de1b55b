//! escm-provider: the compute provider interface.
//!
//! The cluster manager talks to a cloud only through [`ComputeProvider`]:
//! key pairs, security groups, and instance describe/run/terminate. The
//! provider's instance tags are the only persistent record of a cluster, so
//! the types here carry tags and tag filters as first-class data.
//!
//! # Architecture
//!
//! ```text
//! escm-topology ──► ComputeProvider (trait object)
//!                     ├── escm-aws::Ec2Provider     (live EC2)
//!                     └── memory::InMemoryProvider  (tests)
//! ```

pub mod error;
pub mod memory;
pub mod provider;
pub mod types;

pub use error::{ProviderError, ProviderResult, ResourceKind};
pub use memory::{InMemoryProvider, Operation, ProviderCall};
pub use provider::{ComputeProvider, ProviderFuture};
pub use types::*;
