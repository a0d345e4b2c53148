use super::endpoint::{Endpoint, EndpointId, EndpointStatus, ProbeTarget};
use super::kind::ServiceKind;
use crate::config::LocatorConfig;
use dashmap::DashMap;

/// Every configured endpoint of one kind, Down ones included.
pub type RawSnapshot = Vec<Endpoint>;

/// Probe verdict for one endpoint, keyed by identity rather than list position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub id: EndpointId,
    pub status: EndpointStatus,
}

/// Per-kind raw endpoint lists, rebuilt from configuration every poll cycle.
///
/// Pure state operations; the scheduler owns the cycle.
#[derive(Default)]
pub struct ServiceRegistry {
    raw: DashMap<ServiceKind, RawSnapshot>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fresh snapshot for `kind` from configuration, every endpoint
    /// Down, along with one probe target per endpoint.
    pub fn refresh(
        &self,
        kind: ServiceKind,
        config: &LocatorConfig,
    ) -> (RawSnapshot, Vec<ProbeTarget>) {
        let svc = config.service(kind);
        let mut snapshot = Vec::with_capacity(svc.server_ip.len());
        let mut targets = Vec::with_capacity(svc.server_ip.len());

        for ip in &svc.server_ip {
            let endpoint = Endpoint::down(ip.clone(), svc.server_port);
            targets.push(ProbeTarget {
                id: endpoint.identity(),
                scheme: config.discovery.scheme.clone(),
                status_url: svc.status_url.clone(),
            });
            snapshot.push(endpoint);
        }

        (snapshot, targets)
    }

    /// Replace the previous snapshot outright; nothing carries over.
    pub fn store(&self, kind: ServiceKind, snapshot: RawSnapshot) {
        self.raw.insert(kind, snapshot);
    }

    /// Write probe verdicts back by identity. Endpoints without a verdict
    /// keep their current status (Down after a refresh). Returns how many
    /// endpoints ended up Up.
    pub fn apply(&self, kind: ServiceKind, updates: &[StatusUpdate]) -> usize {
        let Some(mut entry) = self.raw.get_mut(&kind) else {
            return 0;
        };

        for endpoint in entry.value_mut().iter_mut() {
            if let Some(update) = updates
                .iter()
                .find(|u| endpoint.same_identity(&u.id.address, u.id.port))
            {
                endpoint.status = update.status;
            }
        }

        entry.value().iter().filter(|e| e.is_up()).count()
    }

    pub fn snapshot(&self, kind: ServiceKind) -> RawSnapshot {
        self.raw
            .get(&kind)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }
}
