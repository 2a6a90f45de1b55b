//! escm-topology: cluster topology controller.
//!
//! Turns operator intents into batched provider calls while keeping the
//! cluster's tag-encoded configuration consistent.
//!
//! ```text
//!  ClusterIntent ──► partition ──► ClusterTags ──► NodeRoleSpec ──► run_instances
//!                        │
//!  ResourceResolver ─────┘ (key pair, security group, bootstrap payload)
//!
//!  cluster name ──► Inventory (tag:ES_CLUSTER_NAME, running) ──► terminate_instances
//! ```

pub mod controller;
pub mod error;
pub mod inventory;
pub mod keys;
pub mod launch;
pub mod outcome;
pub mod payload;
pub mod plan;
pub mod resolver;
pub mod tags;

pub use controller::{ControllerSettings, CreatePhase, TopologyController};
pub use error::{TopologyError, TopologyResult};
pub use inventory::{AttributeValue, InstanceAttribute, Inventory};
pub use keys::KeyVault;
pub use outcome::{AddNodesOutcome, CreateReport, ProvisionWarning, RemovalOutcome};
pub use payload::{BootstrapSource, UserData};
pub use plan::{NodeRole, RoleCounts};
