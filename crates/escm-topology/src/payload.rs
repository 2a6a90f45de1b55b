//! Initialization payload passed to every new node.
//!
//! The bootstrap script is opaque to the controller: it is read once per
//! operation, base64-encoded, and handed to the provider as user data.

use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;

use crate::error::{TopologyError, TopologyResult};

/// Bootstrap script shipped with escm, used unless a script file is
/// configured.
pub const DEFAULT_BOOTSTRAP_SCRIPT: &str = include_str!("../../../bootstrap-scripts/bootstrap.sh");

/// Base64-encoded initialization payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserData(String);

impl UserData {
    pub fn encode(script: impl AsRef<[u8]>) -> Self {
        Self(STANDARD.encode(script))
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Where the bootstrap script comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapSource {
    /// Read from a file on each provisioning call.
    File(PathBuf),
    /// Script content held in memory.
    Inline(String),
}

impl Default for BootstrapSource {
    fn default() -> Self {
        BootstrapSource::Inline(DEFAULT_BOOTSTRAP_SCRIPT.to_string())
    }
}

impl BootstrapSource {
    /// The configured script file, or the built-in script.
    pub fn from_path(path: Option<PathBuf>) -> Self {
        path.map(BootstrapSource::File).unwrap_or_default()
    }

    pub async fn load(&self) -> TopologyResult<UserData> {
        match self {
            BootstrapSource::File(path) => {
                let script = tokio::fs::read(path)
                    .await
                    .map_err(|source| TopologyError::Bootstrap {
                        path: path.clone(),
                        source,
                    })?;
                debug!(path = %path.display(), bytes = script.len(), "bootstrap script loaded");
                Ok(UserData::encode(script))
            }
            BootstrapSource::Inline(script) => Ok(UserData::encode(script)),
        }
    }
}
