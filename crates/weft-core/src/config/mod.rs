mod cluster;
mod observability;

pub use cluster::{ClusterConfig, PartitionsConfig};
pub use observability::{LoggingConfig, ObservabilityConfig};

use std::path::Path;
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::command::{BackoffConfig, BackoffStrategy};
use crate::error::{Result, WeftError};

/// Root configuration for a weft node.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WeftConfig {
    /// Node metadata.
    #[serde(default)]
    pub node: NodeConfig,

    /// Cluster and partition configuration.
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// Remote command retry configuration.
    #[serde(default)]
    pub command: CommandConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl WeftConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| WeftError::Config(format!("Failed to read config file: {}", e)))?;

        Self::parse_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse_toml(content: &str) -> Result<Self> {
        // Substitute environment variables
        let content = substitute_env_vars(content);

        toml::from_str(&content)
            .map_err(|e| WeftError::Config(format!("Failed to parse config: {}", e)))
    }
}

/// Node metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node name, used in logs.
    #[serde(default = "default_node_name")]
    pub name: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: default_node_name(),
        }
    }
}

fn default_node_name() -> String {
    "weft-node".to_string()
}

/// Retry configuration for remote commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Maximum retries per command.
    #[serde(default = "default_command_retries")]
    pub max_retries: u32,

    /// Backoff strategy.
    #[serde(default)]
    pub backoff: BackoffStrategy,

    /// First retry delay in milliseconds.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Maximum retry delay in milliseconds.
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,

    /// Growth factor of the exponential strategy.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            max_retries: default_command_retries(),
            backoff: BackoffStrategy::default(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
            multiplier: default_multiplier(),
        }
    }
}

impl CommandConfig {
    /// Backoff policy described by this section.
    pub fn backoff_config(&self) -> BackoffConfig {
        BackoffConfig {
            strategy: self.backoff,
            initial: Duration::from_millis(self.initial_backoff_ms),
            max: Duration::from_millis(self.max_backoff_ms),
            multiplier: self.multiplier,
        }
    }
}

fn default_command_retries() -> u32 {
    3
}

fn default_initial_backoff() -> u64 {
    50
}

fn default_max_backoff() -> u64 {
    5000
}

fn default_multiplier() -> f64 {
    2.0
}

static ENV_VAR_PATTERN: Lazy<regex_lite::Regex> = Lazy::new(|| {
    regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid env var pattern")
});

/// Substitute environment variables in the format ${VAR_NAME}.
fn substitute_env_vars(content: &str) -> String {
    let mut result = content.to_string();

    for cap in ENV_VAR_PATTERN.captures_iter(content) {
        let var_name = &cap[1];
        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(&cap[0], &value);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WeftConfig::default();
        assert_eq!(config.node.name, "weft-node");
        assert_eq!(config.cluster.max_retries, 60);
        assert_eq!(config.command.max_retries, 3);
        assert_eq!(config.command.backoff, BackoffStrategy::Exponential);
    }

    #[test]
    fn test_parse_empty_config() {
        let config = WeftConfig::parse_toml("").unwrap();
        assert_eq!(config.cluster.wait_time_ms, 1000);
        assert!(config.cluster.partitions.partition_ids.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [node]
            name = "node-a"

            [cluster]
            name = "production"
            topology_endpoint = "http://gateway:9600"
            wait_time_ms = 250
            max_retries = 10

            [cluster.partitions]
            node_count = 3
            current_node_id = 1

            [command]
            max_retries = 5
            backoff = "linear"
            initial_backoff_ms = 100
            max_backoff_ms = 1000

            [observability.logging]
            level = "debug"
            json_format = true
        "#;

        let config = WeftConfig::parse_toml(toml).unwrap();
        assert_eq!(config.node.name, "node-a");
        assert_eq!(config.cluster.name, "production");
        assert_eq!(
            config.cluster.topology_endpoint.as_deref(),
            Some("http://gateway:9600")
        );
        assert_eq!(config.cluster.wait_time(), Duration::from_millis(250));
        assert_eq!(config.cluster.partitions.node_count, Some(3));
        assert_eq!(config.cluster.partitions.current_node_id, Some(1));
        assert_eq!(config.command.max_retries, 5);

        let backoff = config.command.backoff_config();
        assert_eq!(backoff.strategy, BackoffStrategy::Linear);
        assert_eq!(backoff.initial, Duration::from_millis(100));
        assert_eq!(backoff.max, Duration::from_secs(1));

        assert_eq!(config.observability.logging.level, "debug");
        assert!(config.observability.logging.json_format);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = WeftConfig::parse_toml("[cluster\nname = 1");
        assert!(matches!(result, Err(WeftError::Config(_))));
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("WEFT_TEST_TOPOLOGY", "http://localhost:9600");

        let toml = r#"
            [cluster]
            topology_endpoint = "${WEFT_TEST_TOPOLOGY}"
        "#;

        let config = WeftConfig::parse_toml(toml).unwrap();
        assert_eq!(
            config.cluster.topology_endpoint.as_deref(),
            Some("http://localhost:9600")
        );

        std::env::remove_var("WEFT_TEST_TOPOLOGY");
    }
}
