//! Run configuration
//!
//! Loaded once per invocation from a TOML file and passed down explicitly.
//! A missing file yields the defaults; a malformed one is a `Config` error.
//!
//! ```toml
//! [paths]
//! scratch = "/var/tmp/cassnap"
//! archives = "/srv/snapshots"
//!
//! [cluster]
//! hosts = ["10.0.0.1", "10.0.0.2"]
//! playbook_dir = "/opt/cassnap/playbooks"
//!
//! [node]
//! cassandra_yaml = "/etc/cassandra/cassandra.yaml"
//!
//! [remote]
//! bucket = "backups"
//! region = "eu-west-1"
//! access_key = "AKIA..."
//! secret_key = "..."
//! ```

use crate::errors::{ExError, ExErrorKind, Result};
use cassnap_core_types::Sensitive;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub paths: PathsConfig,
    pub cluster: ClusterConfig,
    pub node: NodeConfig,
    pub remote: Option<RemoteConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Scratch workspace, wiped at the start of every run
    pub scratch: PathBuf,
    /// Default destination for new archives
    pub archives: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            scratch: PathBuf::from(".cassnap/work"),
            archives: PathBuf::from("snapshots"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusterConfig {
    pub hosts: Vec<String>,
    /// Directory holding `install.yml`, `snapshot.yml` and `restore.yml`
    pub playbook_dir: PathBuf,
    /// How nodes invoke this tool
    pub node_command: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            playbook_dir: PathBuf::from("playbooks"),
            node_command: "cassnap".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    /// Query host; falls back to `rpc_address` from cassandra.yaml
    pub host: Option<String>,
    pub cqlsh: String,
    pub nodetool: String,
    pub sstableloader: String,
    /// Skip the standard cassandra.yaml search
    pub cassandra_yaml: Option<PathBuf>,
    pub log_dir: PathBuf,
    pub service_name: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            host: None,
            cqlsh: "cqlsh".to_string(),
            nodetool: "nodetool".to_string(),
            sstableloader: "sstableloader".to_string(),
            cassandra_yaml: None,
            log_dir: PathBuf::from("/var/log/cassandra"),
            service_name: "cassandra".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    pub bucket: String,
    pub region: String,
    #[serde(default)]
    pub access_key: Option<Sensitive<String>>,
    #[serde(default)]
    pub secret_key: Option<Sensitive<String>>,
    #[serde(default = "default_aws_cli")]
    pub aws_cli: String,
}

fn default_aws_cli() -> String {
    "aws".to_string()
}

impl Config {
    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            ExError::new(ExErrorKind::Config)
                .with_op("load_config")
                .with_subject(path.display().to_string())
                .with_message(format!("Failed to read config: {}", e))
        })?;
        Self::from_toml_str(&text)
            .map_err(|e| e.with_subject(path.display().to_string()))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| {
            ExError::new(ExErrorKind::Config)
                .with_op("load_config")
                .with_message(format!("Invalid config: {}", e))
        })
    }

    /// The remote section, required by every remote-store operation
    pub fn require_remote(&self) -> Result<&RemoteConfig> {
        self.remote.as_ref().ok_or_else(|| {
            ExError::new(ExErrorKind::Config)
                .with_op("require_remote")
                .with_message("No [remote] section configured")
        })
    }
}
