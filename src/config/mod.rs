pub mod types;


pub use types::*;

use crate::discovery::ServiceKind;
use anyhow::Result;
use std::path::Path;

impl LocatorConfig {
    /// Load configuration from a file (if it exists) and apply environment
    /// variable overrides. When the file does not exist, built-in defaults
    /// are used: every service kind starts with an empty candidate pool.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config: LocatorConfig = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            match path.extension().and_then(|e| e.to_str()) {
                Some("toml") => toml::from_str(&content)?,
                Some("json") => serde_json::from_str(&content)?,
                Some(ext) => anyhow::bail!("unsupported config format: .{ext}, use .toml or .json"),
                None => anyhow::bail!("config file has no extension, use .toml or .json"),
            }
        } else {
            tracing::info!("config file not found at {}, using defaults", path.display());
            LocatorConfig::default()
        };

        config.fill_default_ports();
        config.apply_env_overrides();

        config.validate()?;
        tracing::info!(
            analytics = config.analytics.server_ip.len(),
            cnfg = config.cnfg.server_ip.len(),
            dns = config.dns.server_ip.len(),
            poll_interval_ms = config.discovery.poll_interval_ms,
            "loaded locator configuration"
        );
        Ok(config)
    }

    /// Sections that omit `server_port` use the kind's standard port.
    fn fill_default_ports(&mut self) {
        for kind in ServiceKind::ALL {
            let svc = self.service_mut(kind);
            if svc.server_port == 0 {
                svc.server_port = kind.default_port();
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("HERMES_LOCATOR_POLL_INTERVAL_MS") {
            if let Ok(n) = v.parse::<u64>() {
                self.discovery.poll_interval_ms = n;
            }
        }
        if let Ok(v) = std::env::var("HERMES_LOCATOR_PROBE_TIMEOUT_MS") {
            if let Ok(n) = v.parse::<u64>() {
                self.discovery.probe_timeout_ms = n;
            }
        }
        if let Ok(v) = std::env::var("HERMES_LOCATOR_PROBE_CONCURRENCY") {
            if let Ok(n) = v.parse::<usize>() {
                self.discovery.probe_concurrency = n;
            }
        }
        if let Ok(v) = std::env::var("HERMES_LOCATOR_ADMIN_LISTEN") {
            self.admin.listen = v;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let d = &self.discovery;
        if d.poll_interval_ms == 0 {
            anyhow::bail!("discovery.poll_interval_ms must be non-zero");
        }
        if d.probe_timeout_ms == 0 {
            anyhow::bail!("discovery.probe_timeout_ms must be non-zero");
        }
        if d.probe_concurrency == 0 {
            anyhow::bail!("discovery.probe_concurrency must be non-zero");
        }
        if d.scheme != "http" && d.scheme != "https" {
            anyhow::bail!("discovery.scheme must be 'http' or 'https', got '{}'", d.scheme);
        }

        for kind in ServiceKind::ALL {
            let svc = self.service(kind);
            let key = kind.config_key();
            if svc.server_ip.iter().any(|ip| ip.trim().is_empty()) {
                anyhow::bail!("'{}' has an empty server_ip entry", key);
            }
            if !svc.server_ip.is_empty() && svc.server_port == 0 {
                anyhow::bail!("'{}' lists server_ip but has no server_port", key);
            }
            if !svc.status_url.starts_with('/') {
                anyhow::bail!(
                    "'{}' statusURL must start with '/', got '{}'",
                    key,
                    svc.status_url
                );
            }
        }
        Ok(())
    }

    /// Endpoint configuration bound to a service kind's configuration key.
    pub fn service(&self, kind: ServiceKind) -> &ServiceEndpointConfig {
        match kind {
            ServiceKind::OpServer => &self.analytics,
            ServiceKind::ApiServer => &self.cnfg,
            ServiceKind::DnsServer => &self.dns,
        }
    }

    fn service_mut(&mut self, kind: ServiceKind) -> &mut ServiceEndpointConfig {
        match kind {
            ServiceKind::OpServer => &mut self.analytics,
            ServiceKind::ApiServer => &mut self.cnfg,
            ServiceKind::DnsServer => &mut self.dns,
        }
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.discovery.poll_interval_ms)
    }

    pub fn probe_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.discovery.probe_timeout_ms)
    }
}
