use std::time::Duration;

use weft_core::config::ClusterConfig;
use weft_core::{Result, Topology, TopologyClient, WeftError};

/// Topology client for the gateway's HTTP topology endpoint.
#[derive(Debug, Clone)]
pub struct HttpTopologyClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTopologyClient {
    /// Create a client for `endpoint`, e.g. `http://gateway:9600`.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WeftError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Create a client from the `[cluster]` section.
    pub fn from_config(config: &ClusterConfig) -> Result<Self> {
        let endpoint = config.topology_endpoint.as_deref().ok_or_else(|| {
            WeftError::Config("cluster.topology_endpoint is not configured".to_string())
        })?;
        Self::new(endpoint, config.request_timeout())
    }

    pub fn url(&self) -> String {
        format!("{}/v1/topology", self.endpoint.trim_end_matches('/'))
    }
}

impl TopologyClient for HttpTopologyClient {
    async fn topology(&self) -> Result<Topology> {
        let response = self
            .client
            .get(self.url())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WeftError::Timeout(e.to_string())
                } else {
                    WeftError::Topology(e.to_string())
                }
            })?
            .error_for_status()
            .map_err(|e| WeftError::Topology(e.to_string()))?;

        response
            .json::<Topology>()
            .await
            .map_err(|e| WeftError::Deserialization(e.to_string()))
    }
}
