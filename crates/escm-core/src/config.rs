//! escm.toml configuration parser.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "escm.toml";

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_IMAGE_ID: &str = "ami-02da3a138888ced85";
pub const DEFAULT_INSTANCE_TYPE: &str = "i3.large";
pub const DEFAULT_KEY_DIR: &str = "~/.ssh";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscmConfig {
    pub provider: ProviderConfig,
    pub defaults: DefaultsConfig,
    pub bootstrap: BootstrapConfig,
    pub keys: KeysConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub region: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub image_id: Option<String>,
    pub instance_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Script passed to every new node as its initialization payload.
    /// The built-in script is used when unset.
    pub script: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    /// Directory newly created private keys are written to.
    pub dir: Option<PathBuf>,
}

impl EscmConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: EscmConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Load the explicit config file, or `escm.toml` from the working
    /// directory when present, or built-in defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            debug!(path = %path.display(), "loading config");
            return Self::from_file(path);
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            debug!(path = %local.display(), "loading config from working directory");
            return Self::from_file(local);
        }
        debug!("no config file, using defaults");
        Ok(Self::default())
    }

    /// Region precedence: flag, config file, `AWS_REGION`, built-in default.
    pub fn region(&self, flag: Option<&str>) -> String {
        self.region_with_env(flag, std::env::var("AWS_REGION").ok())
    }

    fn region_with_env(&self, flag: Option<&str>, env: Option<String>) -> String {
        flag.map(str::to_string)
            .or_else(|| self.provider.region.clone())
            .or(env.filter(|r| !r.is_empty()))
            .unwrap_or_else(|| DEFAULT_REGION.to_string())
    }

    pub fn image_id(&self) -> &str {
        self.defaults.image_id.as_deref().unwrap_or(DEFAULT_IMAGE_ID)
    }

    pub fn instance_type(&self) -> &str {
        self.defaults
            .instance_type
            .as_deref()
            .unwrap_or(DEFAULT_INSTANCE_TYPE)
    }

    /// Operator-supplied bootstrap script, if any.
    pub fn bootstrap_script(&self) -> Option<PathBuf> {
        self.bootstrap.script.as_deref().map(expand_home)
    }

    pub fn key_dir(&self) -> PathBuf {
        let path = self
            .keys
            .dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_KEY_DIR));
        expand_home(&path)
    }
}

/// Expand a leading `~/` to `$HOME`. Paths are returned unchanged when
/// `HOME` is unset.
pub fn expand_home(path: &Path) -> PathBuf {
    expand_home_with(path, std::env::var_os("HOME").map(PathBuf::from))
}

fn expand_home_with(path: &Path, home: Option<PathBuf>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
