use serde::{Deserialize, Serialize};

use crate::error::ExporterError;

/// Exporter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Hostname of the cache server, also the value of the `host` label on `up`
    pub hostname: String,
    /// Management interface port
    pub port: u16,
    /// Optional basic-auth login for the management interface
    pub login: Option<String>,
    /// Optional basic-auth password for the management interface
    pub password: Option<String>,
    /// Address the /metrics listener binds to
    pub listen_address: String,
    /// Fetch timeout in seconds
    pub timeout_secs: u64,
    /// Extra labels attached to every exported counter
    #[serde(default)]
    pub labels: Labels,
}

/// Ordered extra label dimensions and their values for this instance.
///
/// `keys` and `values` are parallel sequences: `values[i]` is the value of
/// the dimension named `keys[i]`. The order here is the order descriptors
/// are built with and the order label values are emitted in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Labels {
    pub keys: Vec<String>,
    pub values: Vec<String>,
}

impl Labels {
    pub fn new(keys: Vec<String>, values: Vec<String>) -> Result<Self, ExporterError> {
        if keys.len() != values.len() {
            return Err(ExporterError::ConfigError(format!(
                "label keys/values length mismatch: {} keys, {} values",
                keys.len(),
                values.len()
            )));
        }
        Ok(Self { keys, values })
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_string(),
            port: 3128,
            login: None,
            password: None,
            listen_address: "0.0.0.0:9301".to_string(),
            timeout_secs: 10,
            labels: Labels::default(),
        }
    }
}

impl ExporterConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &str) -> Result<Self, ExporterError> {
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants serde cannot express
    pub fn validate(&self) -> Result<(), ExporterError> {
        if self.labels.keys.len() != self.labels.values.len() {
            return Err(ExporterError::ConfigError(format!(
                "label keys/values length mismatch: {} keys, {} values",
                self.labels.keys.len(),
                self.labels.values.len()
            )));
        }
        if self.hostname.is_empty() {
            return Err(ExporterError::ConfigError("hostname must not be empty".into()));
        }
        Ok(())
    }

    /// Base URL of the management interface
    pub fn management_url(&self) -> String {
        format!("http://{}:{}", self.hostname, self.port)
    }
}
