use crate::discovery::ServiceKind;
use crate::error::LocatorError;
use serde::{Deserialize, Deserializer, Serialize};

/// Top-level locator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocatorConfig {
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    #[serde(default)]
    pub admin: AdminConfig,

    /// Analytics / telemetry servers (op server).
    #[serde(default = "default_analytics")]
    pub analytics: ServiceEndpointConfig,

    /// Configuration API servers.
    #[serde(default = "default_cnfg")]
    pub cnfg: ServiceEndpointConfig,

    #[serde(default = "default_dns")]
    pub dns: ServiceEndpointConfig,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            discovery: DiscoveryConfig::default(),
            admin: AdminConfig::default(),
            analytics: default_analytics(),
            cnfg: default_cnfg(),
            dns: default_dns(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Delay between two periodic sweeps (milliseconds).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound for a single health probe (milliseconds).
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Max in-flight probes within one service kind.
    #[serde(default = "default_probe_concurrency")]
    pub probe_concurrency: usize,

    /// "http" or "https".
    #[serde(default = "default_scheme")]
    pub scheme: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            probe_concurrency: default_probe_concurrency(),
            scheme: default_scheme(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    300_000
}

fn default_probe_timeout_ms() -> u64 {
    5_000
}

fn default_probe_concurrency() -> usize {
    16
}

fn default_scheme() -> String {
    "http".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_admin_listen")]
    pub listen: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            listen: default_admin_listen(),
        }
    }
}

fn default_admin_listen() -> String {
    "0.0.0.0:9092".to_string()
}

/// Candidate endpoints of one service kind.
///
/// `server_ip` may be a single address or a list; `server_port` may be a
/// string or an integer. Both are normalized at load time. A missing
/// `server_port` deserializes as 0 and is filled in from the kind's default
/// port by `LocatorConfig::load`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEndpointConfig {
    #[serde(default, deserialize_with = "deserialize_one_or_many")]
    pub server_ip: Vec<String>,

    #[serde(default, deserialize_with = "deserialize_port")]
    pub server_port: u16,

    #[serde(rename = "statusURL", default = "default_status_url")]
    pub status_url: String,
}

impl ServiceEndpointConfig {
    pub fn new(server_ip: Vec<String>, server_port: u16) -> Self {
        Self {
            server_ip,
            server_port,
            status_url: default_status_url(),
        }
    }
}

fn default_status_url() -> String {
    "/".to_string()
}

fn default_analytics() -> ServiceEndpointConfig {
    ServiceEndpointConfig::new(Vec::new(), ServiceKind::OpServer.default_port())
}

fn default_cnfg() -> ServiceEndpointConfig {
    ServiceEndpointConfig::new(Vec::new(), ServiceKind::ApiServer.default_port())
}

fn default_dns() -> ServiceEndpointConfig {
    ServiceEndpointConfig::new(Vec::new(), ServiceKind::DnsServer.default_port())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// Accepts `"10.0.0.1"`, `["10.0.0.1", "10.0.0.2"]` or `null`.
fn deserialize_one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(ip)) => vec![ip],
        Some(OneOrMany::Many(ips)) => ips,
        None => Vec::new(),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PortValue {
    Number(u64),
    Text(String),
}

fn deserialize_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match PortValue::deserialize(deserializer)? {
        PortValue::Number(n) => n.to_string(),
        PortValue::Text(s) => s,
    };
    parse_port(&raw).map_err(serde::de::Error::custom)
}

pub(crate) fn parse_port(raw: &str) -> Result<u16, LocatorError> {
    let port: u16 = raw
        .trim()
        .parse()
        .map_err(|_| LocatorError::Config(format!("invalid port: {}", raw)))?;
    if port == 0 {
        return Err(LocatorError::Config("port must be non-zero".to_string()));
    }
    Ok(port)
}
