//! TOML-based configuration for mesh nodes.

use std::path::Path;

use serde::Deserialize;

use hwmp_core::MacAddr;
use hwmp_core::element::{PathMetricProtocol, PathSelectionProtocol};
use hwmp_routing::discovery::{DEFAULT_PREQ_RETRIES, DEFAULT_PREQ_RETRY_BASE_MS};
use hwmp_routing::engine::config::{
    DEFAULT_PANN_INTERVAL_MS, DEFAULT_RANN_INTERVAL_MS, DEFAULT_ROOT_INTERVAL_MS,
};
use hwmp_routing::seen::DEFAULT_PREQ_DUP_LIFETIME_MS;
use hwmp_routing::table::{DEFAULT_MAX_ROUTES, DEFAULT_ROUTE_LIFETIME_MS};
use hwmp_routing::{EngineConfig, RootMode};

use crate::error::NodeError;

/// Top-level node configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub mesh: MeshSection,
    #[serde(default)]
    pub timers: TimersSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(format!("failed to parse config: {e}")))
    }
}

/// The `[mesh]` section: identity of the interface and engine tunables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MeshSection {
    /// Hardware address of the mesh interface, `aa:bb:cc:dd:ee:ff`.
    pub address: String,
    pub ttl: u8,
    pub route_lifetime_ms: u32,
    pub preq_retries: u8,
    pub preq_retry_base_ms: u64,
    pub preq_dup_lifetime_ms: u64,
    pub max_routes: usize,
    /// One of `disabled`, `normal`, `proactive`, `rann`.
    pub root_mode: String,
    pub root_interval_ms: u64,
    pub rann_interval_ms: u64,
    pub rann_reply: bool,
    pub portal: bool,
    pub pann_interval_ms: u64,
    pub target_only: bool,
    pub intermediate_reply: bool,
    /// `hwmp` or `null`.
    pub path_protocol: String,
    /// `airtime` or `null`.
    pub metric: String,
}

impl Default for MeshSection {
    fn default() -> Self {
        Self {
            address: "02:00:00:00:00:01".to_string(),
            ttl: hwmp_core::constants::MESH_DEFAULT_TTL,
            route_lifetime_ms: DEFAULT_ROUTE_LIFETIME_MS,
            preq_retries: DEFAULT_PREQ_RETRIES,
            preq_retry_base_ms: DEFAULT_PREQ_RETRY_BASE_MS,
            preq_dup_lifetime_ms: DEFAULT_PREQ_DUP_LIFETIME_MS,
            max_routes: DEFAULT_MAX_ROUTES,
            root_mode: "disabled".to_string(),
            root_interval_ms: DEFAULT_ROOT_INTERVAL_MS,
            rann_interval_ms: DEFAULT_RANN_INTERVAL_MS,
            rann_reply: true,
            portal: false,
            pann_interval_ms: DEFAULT_PANN_INTERVAL_MS,
            target_only: true,
            intermediate_reply: true,
            path_protocol: "hwmp".to_string(),
            metric: "airtime".to_string(),
        }
    }
}

impl MeshSection {
    pub fn address(&self) -> Result<MacAddr, NodeError> {
        self.address
            .parse()
            .map_err(|e| NodeError::Config(format!("invalid mesh address: {e}")))
    }

    pub fn path_protocol(&self) -> Result<PathSelectionProtocol, NodeError> {
        parse_path_protocol(&self.path_protocol)
    }

    pub fn path_metric(&self) -> Result<PathMetricProtocol, NodeError> {
        parse_path_metric(&self.metric)
    }

    /// Build the engine tunables, validating every textual field.
    pub fn engine_config(&self) -> Result<EngineConfig, NodeError> {
        let root_mode: RootMode = self
            .root_mode
            .parse()
            .map_err(|e| NodeError::Config(format!("{e}")))?;
        if self.ttl == 0 {
            return Err(NodeError::Config("ttl must be at least 1".to_string()));
        }
        if self.max_routes == 0 {
            return Err(NodeError::Config("max_routes must be at least 1".to_string()));
        }
        Ok(EngineConfig {
            ttl: self.ttl,
            route_lifetime_ms: self.route_lifetime_ms,
            preq_retries: self.preq_retries,
            preq_retry_base_ms: self.preq_retry_base_ms,
            preq_dup_lifetime_ms: self.preq_dup_lifetime_ms,
            max_routes: self.max_routes,
            root_mode,
            root_interval_ms: self.root_interval_ms,
            rann_interval_ms: self.rann_interval_ms,
            rann_reply: self.rann_reply,
            portal: self.portal,
            pann_interval_ms: self.pann_interval_ms,
            target_only: self.target_only,
            intermediate_reply: self.intermediate_reply,
        })
    }
}

/// The `[timers]` section: how often the event loop wakes on its own.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimersSection {
    /// Interval of the retry and announcement tick.
    pub tick_ms: u64,
    /// Interval of the expiry sweep.
    pub sweep_ms: u64,
    /// Capacity of the inbound event and outbound frame channels.
    pub channel_capacity: usize,
}

impl Default for TimersSection {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            sweep_ms: 1_000,
            channel_capacity: 1024,
        }
    }
}

/// The `[logging]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Parse a path-selection protocol name.
pub fn parse_path_protocol(s: &str) -> Result<PathSelectionProtocol, NodeError> {
    match s.to_lowercase().as_str() {
        "hwmp" => Ok(PathSelectionProtocol::Hwmp),
        "null" | "none" => Ok(PathSelectionProtocol::Null),
        other => Err(NodeError::Config(format!(
            "unknown path selection protocol: {other}"
        ))),
    }
}

/// Parse a path metric name.
pub fn parse_path_metric(s: &str) -> Result<PathMetricProtocol, NodeError> {
    match s.to_lowercase().as_str() {
        "airtime" => Ok(PathMetricProtocol::Airtime),
        "null" | "none" => Ok(PathMetricProtocol::Null),
        other => Err(NodeError::Config(format!("unknown path metric: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let config = NodeConfig::parse("").unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.timers.tick_ms, 100);
        assert_eq!(config.timers.sweep_ms, 1_000);
        assert_eq!(
            config.mesh.address().unwrap(),
            MacAddr::new([0x02, 0, 0, 0, 0, 1])
        );
        assert_eq!(config.mesh.engine_config().unwrap(), EngineConfig::default());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[mesh]
address = "02:11:22:33:44:55"
ttl = 8
route_lifetime_ms = 10000
preq_retries = 5
preq_retry_base_ms = 250
preq_dup_lifetime_ms = 2000
max_routes = 64
root_mode = "Proactive"
root_interval_ms = 4000
rann_interval_ms = 500
rann_reply = false
portal = true
pann_interval_ms = 3000
target_only = false
intermediate_reply = false
path_protocol = "hwmp"
metric = "null"

[timers]
tick_ms = 50
sweep_ms = 250
channel_capacity = 16

[logging]
level = "debug"
"#;
        let config = NodeConfig::parse(toml).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.timers.tick_ms, 50);
        assert_eq!(config.timers.sweep_ms, 250);
        assert_eq!(config.timers.channel_capacity, 16);
        assert_eq!(
            config.mesh.address().unwrap(),
            MacAddr::new([0x02, 0x11, 0x22, 0x33, 0x44, 0x55])
        );
        assert_eq!(config.mesh.path_metric().unwrap(), PathMetricProtocol::Null);

        let engine = config.mesh.engine_config().unwrap();
        assert_eq!(engine.ttl, 8);
        assert_eq!(engine.route_lifetime_ms, 10_000);
        assert_eq!(engine.preq_retries, 5);
        assert_eq!(engine.preq_retry_base_ms, 250);
        assert_eq!(engine.preq_dup_lifetime_ms, 2_000);
        assert_eq!(engine.max_routes, 64);
        assert_eq!(engine.root_mode, RootMode::Proactive);
        assert_eq!(engine.root_interval_ms, 4_000);
        assert_eq!(engine.rann_interval_ms, 500);
        assert!(!engine.rann_reply);
        assert!(engine.portal);
        assert_eq!(engine.pann_interval_ms, 3_000);
        assert!(!engine.target_only);
        assert!(!engine.intermediate_reply);
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config = NodeConfig::parse("[mesh]\nportal = true\n").unwrap();
        let engine = config.mesh.engine_config().unwrap();
        assert!(engine.portal);
        assert_eq!(engine.ttl, 31);
        assert_eq!(engine.preq_retry_base_ms, 512);
    }

    #[test]
    fn invalid_address_is_a_config_error() {
        let config = NodeConfig::parse("[mesh]\naddress = \"02:00:00\"\n").unwrap();
        assert!(matches!(config.mesh.address(), Err(NodeError::Config(_))));
    }

    #[test]
    fn invalid_root_mode_is_a_config_error() {
        let config = NodeConfig::parse("[mesh]\nroot_mode = \"sometimes\"\n").unwrap();
        let err = config.mesh.engine_config().unwrap_err();
        assert!(err.to_string().contains("sometimes"));
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let config = NodeConfig::parse("[mesh]\nttl = 0\n").unwrap();
        assert!(config.mesh.engine_config().is_err());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = NodeConfig::load(Path::new("/nonexistent/hwmp.toml")).unwrap_err();
        assert!(matches!(err, NodeError::Io(_)), "{err}");
    }

    #[test]
    fn wrong_type_fails_to_parse() {
        assert!(NodeConfig::parse("[mesh]\nttl = \"many\"\n").is_err());
    }

    #[test]
    fn parse_protocol_names() {
        assert_eq!(parse_path_protocol("HWMP").unwrap(), PathSelectionProtocol::Hwmp);
        assert_eq!(parse_path_protocol("null").unwrap(), PathSelectionProtocol::Null);
        assert!(parse_path_protocol("olsr").is_err());
        assert_eq!(parse_path_metric("airtime").unwrap(), PathMetricProtocol::Airtime);
        assert_eq!(parse_path_metric("none").unwrap(), PathMetricProtocol::Null);
        assert!(parse_path_metric("hopcount").is_err());
    }
}
