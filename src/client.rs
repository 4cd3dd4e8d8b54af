//! Client for the cache server's HTTP management interface.

use std::time::Duration;

use crate::config::ExporterConfig;
use crate::error::ExporterError;

/// Report path of the raw counters page
const COUNTERS_PATH: &str = "/squid-internal-mgr/counters";

/// One raw (key, value) pair from a counters snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct CounterSample {
    pub key: String,
    pub value: f64,
}

/// Fetch collaborator boundary.
///
/// A cycle calls `get_counters` exactly once; any error is uniformly "fetch
/// failed this cycle" regardless of cause. Retries, if any, belong to the
/// implementation, never to the collection core.
pub trait CounterClient: Send + Sync {
    fn get_counters(&self) -> Result<Vec<CounterSample>, ExporterError>;
}

/// Blocking HTTP client for the management interface
pub struct ManagementClient {
    base_url: String,
    login: Option<String>,
    password: Option<String>,
    client: reqwest::blocking::Client,
}

impl ManagementClient {
    pub fn new(config: &ExporterConfig) -> Result<Self, ExporterError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExporterError::ConfigError(e.to_string()))?;

        Ok(Self {
            base_url: config.management_url(),
            login: config.login.clone(),
            password: config.password.clone(),
            client,
        })
    }
}

impl CounterClient for ManagementClient {
    fn get_counters(&self) -> Result<Vec<CounterSample>, ExporterError> {
        let url = format!("{}{}", self.base_url, COUNTERS_PATH);
        let mut request = self.client.get(&url);
        if let Some(login) = &self.login {
            request = request.basic_auth(login, self.password.as_deref());
        }

        let response = request
            .send()
            .map_err(|e| ExporterError::FetchError(format!("failed to reach {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(ExporterError::FetchError(format!(
                "management interface returned {} for {}",
                response.status(),
                url
            )));
        }

        let body = response
            .text()
            .map_err(|e| ExporterError::FetchError(e.to_string()))?;

        Ok(parse_counters(&body))
    }
}

/// Parse a counters report body.
///
/// Lines look like `client_http.requests = 42`; some carry trailing
/// annotations (`sample_time = 1611841385.729615 (Thu, 28 Jan ...)`), so
/// only the first token after `=` is read. Lines that do not parse are
/// skipped; key recognition is the registry's job, not the parser's.
pub fn parse_counters(body: &str) -> Vec<CounterSample> {
    body.lines()
        .filter_map(|line| {
            let (key, rest) = line.split_once('=')?;
            let value = rest.split_whitespace().next()?.parse::<f64>().ok()?;
            Some(CounterSample {
                key: key.trim().to_string(),
                value,
            })
        })
        .collect()
}
