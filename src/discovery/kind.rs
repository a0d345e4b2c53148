use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend roles the locator knows how to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ServiceKind {
    OpServer,
    ApiServer,
    #[serde(rename = "dns-server")]
    DnsServer,
}

impl ServiceKind {
    /// Sweep order.
    pub const ALL: [ServiceKind; 3] = [
        ServiceKind::OpServer,
        ServiceKind::ApiServer,
        ServiceKind::DnsServer,
    ];

    /// Key of the configuration section holding this kind's endpoints.
    pub fn config_key(self) -> &'static str {
        match self {
            ServiceKind::OpServer => "analytics",
            ServiceKind::ApiServer => "cnfg",
            ServiceKind::DnsServer => "dns",
        }
    }

    /// Port assumed when a configuration section omits `server_port`.
    pub fn default_port(self) -> u16 {
        match self {
            ServiceKind::OpServer => 8081,
            ServiceKind::ApiServer => 8082,
            ServiceKind::DnsServer => 8092,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceKind::OpServer => "OpServer",
            ServiceKind::ApiServer => "ApiServer",
            ServiceKind::DnsServer => "dns-server",
        }
    }

    /// DNS servers are always served head-first, never rotated.
    pub fn rotates(self) -> bool {
        !matches!(self, ServiceKind::DnsServer)
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Translate an API-kind label supplied by callers into a service kind.
pub fn map_api_kind(label: &str) -> Option<ServiceKind> {
    match label {
        "opServer" | "OpServer" => Some(ServiceKind::OpServer),
        "apiServer" | "ApiServer" => Some(ServiceKind::ApiServer),
        "dnsServer" => Some(ServiceKind::DnsServer),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_api_kind() {
        assert_eq!(map_api_kind("opServer"), Some(ServiceKind::OpServer));
        assert_eq!(map_api_kind("OpServer"), Some(ServiceKind::OpServer));
        assert_eq!(map_api_kind("apiServer"), Some(ServiceKind::ApiServer));
        assert_eq!(map_api_kind("ApiServer"), Some(ServiceKind::ApiServer));
        assert_eq!(map_api_kind("dnsServer"), Some(ServiceKind::DnsServer));
    }

    #[test]
    fn test_map_api_kind_unknown() {
        assert_eq!(map_api_kind("webServer"), None);
        assert_eq!(map_api_kind(""), None);
        assert_eq!(map_api_kind("apiserver"), None);
    }

    #[test]
    fn test_config_keys() {
        assert_eq!(ServiceKind::OpServer.config_key(), "analytics");
        assert_eq!(ServiceKind::ApiServer.config_key(), "cnfg");
        assert_eq!(ServiceKind::DnsServer.config_key(), "dns");
    }

    #[test]
    fn test_only_dns_is_fixed_head() {
        assert!(ServiceKind::OpServer.rotates());
        assert!(ServiceKind::ApiServer.rotates());
        assert!(!ServiceKind::DnsServer.rotates());
    }

    #[test]
    fn test_serialized_names() {
        assert_eq!(
            serde_json::to_string(&ServiceKind::DnsServer).unwrap(),
            r#""dns-server""#
        );
        assert_eq!(
            serde_json::to_string(&ServiceKind::ApiServer).unwrap(),
            r#""ApiServer""#
        );
    }
}
