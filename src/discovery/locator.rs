use super::endpoint::{Endpoint, RequestTarget};
use super::failover::reselect_after_failure;
use super::kind::{map_api_kind, ServiceKind};
use super::registry::ServiceRegistry;
use super::selector::select_next;
use super::view::{compute_active, ActiveViewCache};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Owned discovery state: raw snapshots, active/stable views, readiness.
///
/// Cheap to clone; the poll path and the request path share one instance.
#[derive(Clone, Default)]
pub struct ServiceLocator {
    inner: Arc<LocatorInner>,
}

#[derive(Default)]
struct LocatorInner {
    registry: ServiceRegistry,
    views: ActiveViewCache,
    ready: AtomicBool,
}

impl ServiceLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.inner.registry
    }

    pub fn views(&self) -> &ActiveViewCache {
        &self.inner.views
    }

    /// Set once the first sweep has completed.
    pub fn mark_ready(&self) {
        self.inner.ready.store(true, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::Acquire)
    }

    fn fresh_active(&self, kind: ServiceKind) -> Vec<Endpoint> {
        compute_active(&self.registry().snapshot(kind))
    }

    /// Active list for `kind` after reconciling with the latest poll results.
    pub fn get_active(&self, kind: ServiceKind) -> Vec<Endpoint> {
        self.views().get_active(kind, self.fresh_active(kind))
    }

    pub fn select_next(&self, kind: ServiceKind) -> Option<Endpoint> {
        let fresh = self.fresh_active(kind);
        let picked = self
            .views()
            .with_active(kind, fresh, |active| select_next(kind, active));

        let result = if picked.is_some() { "hit" } else { "miss" };
        metrics::counter!(
            "locator_selection_total",
            "kind" => kind.as_str(),
            "result" => result,
        )
        .increment(1);
        picked
    }

    /// Resolve an API-kind label to the next endpoint to use.
    pub fn resolve_service_endpoint(&self, api_kind: &str) -> Option<Endpoint> {
        let Some(kind) = map_api_kind(api_kind) else {
            debug!("locator: unknown api kind, label={}", api_kind);
            return None;
        };
        self.select_next(kind)
    }

    /// Down-filtered raw view of every kind, for reporting.
    pub fn list_active_endpoints(&self) -> BTreeMap<ServiceKind, Vec<Endpoint>> {
        ServiceKind::ALL
            .into_iter()
            .map(|kind| (kind, self.fresh_active(kind)))
            .collect()
    }

    /// Evict the endpoint `target` points at from `kind`'s pool and redirect
    /// `target` to the next candidate. Returns `false` when there is none.
    pub fn report_failure_and_reselect(&self, kind: ServiceKind, target: &mut RequestTarget) -> bool {
        let failed = format!("{}:{}", target.url, target.port);
        let fresh = self.fresh_active(kind);
        let redirected = self
            .views()
            .with_active(kind, fresh, |active| reselect_after_failure(active, target));

        if redirected {
            info!(
                "locator: failover, kind={}, failed={}, next={}:{}",
                kind, failed, target.url, target.port
            );
        } else {
            debug!("locator: failover found no alternative, kind={}, failed={}", kind, failed);
        }
        let result = if redirected { "redirected" } else { "no_alternative" };
        metrics::counter!(
            "locator_failover_total",
            "kind" => kind.as_str(),
            "result" => result,
        )
        .increment(1);
        redirected
    }

    /// Label-based entry point for callers that only know the API kind.
    /// Returns the rewritten target, or `None` if the label is unknown or no
    /// alternative exists.
    pub fn report_endpoint_failure_and_reselect<'a>(
        &self,
        target: &'a mut RequestTarget,
        api_kind: &str,
    ) -> Option<&'a RequestTarget> {
        let kind = map_api_kind(api_kind)?;
        if self.report_failure_and_reselect(kind, target) {
            Some(target)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LocatorConfig, ServiceEndpointConfig};
    use crate::discovery::{EndpointId, EndpointStatus, StatusUpdate};

    /// Seed `kind` with `ips` and mark `up_ips` Up, as a finished poll would.
    fn seed(locator: &ServiceLocator, kind: ServiceKind, ips: &[&str], up_ips: &[&str]) {
        let mut cfg = LocatorConfig::default();
        let svc = ServiceEndpointConfig::new(ips.iter().map(|s| s.to_string()).collect(), 8082);
        match kind {
            ServiceKind::OpServer => cfg.analytics = svc,
            ServiceKind::ApiServer => cfg.cnfg = svc,
            ServiceKind::DnsServer => cfg.dns = svc,
        }
        let (snapshot, _) = locator.registry().refresh(kind, &cfg);
        locator.registry().store(kind, snapshot);
        let updates: Vec<StatusUpdate> = up_ips
            .iter()
            .map(|ip| StatusUpdate {
                id: EndpointId {
                    address: ip.to_string(),
                    port: 8082,
                },
                status: EndpointStatus::Up,
            })
            .collect();
        locator.registry().apply(kind, &updates);
    }

    #[test]
    fn test_select_round_robin() {
        let locator = ServiceLocator::new();
        seed(&locator, ServiceKind::ApiServer, &["a", "b", "c"], &["a", "b", "c"]);

        let picked: Vec<String> = (0..4)
            .map(|_| locator.select_next(ServiceKind::ApiServer).unwrap().address)
            .collect();
        assert_eq!(picked, vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn test_select_dns_fixed_head() {
        let locator = ServiceLocator::new();
        seed(&locator, ServiceKind::DnsServer, &["a", "b"], &["a", "b"]);
        for _ in 0..5 {
            assert_eq!(
                locator.resolve_service_endpoint("dnsServer").unwrap().address,
                "a"
            );
        }
    }

    #[test]
    fn test_select_skips_down() {
        let locator = ServiceLocator::new();
        seed(&locator, ServiceKind::OpServer, &["a", "b", "c"], &["b"]);
        for _ in 0..3 {
            assert_eq!(locator.select_next(ServiceKind::OpServer).unwrap().address, "b");
        }
    }

    #[test]
    fn test_select_unconfigured_kind() {
        let locator = ServiceLocator::new();
        assert!(locator.select_next(ServiceKind::ApiServer).is_none());
        assert!(locator.resolve_service_endpoint("apiServer").is_none());
    }

    #[test]
    fn test_resolve_unknown_label() {
        let locator = ServiceLocator::new();
        seed(&locator, ServiceKind::ApiServer, &["a"], &["a"]);
        assert!(locator.resolve_service_endpoint("webServer").is_none());
    }

    #[test]
    fn test_fresh_poll_with_same_identities_keeps_rotation() {
        let locator = ServiceLocator::new();
        seed(&locator, ServiceKind::ApiServer, &["a", "b", "c"], &["a", "b", "c"]);
        locator.select_next(ServiceKind::ApiServer);

        // Same identities polled again.
        seed(&locator, ServiceKind::ApiServer, &["a", "b", "c"], &["a", "b", "c"]);
        assert_eq!(locator.select_next(ServiceKind::ApiServer).unwrap().address, "b");
    }

    #[test]
    fn test_fresh_poll_with_new_identities_is_adopted() {
        let locator = ServiceLocator::new();
        seed(&locator, ServiceKind::ApiServer, &["a", "b"], &["a", "b"]);
        locator.select_next(ServiceKind::ApiServer);

        seed(&locator, ServiceKind::ApiServer, &["x", "y"], &["x", "y"]);
        let picked: Vec<String> = (0..3)
            .map(|_| locator.select_next(ServiceKind::ApiServer).unwrap().address)
            .collect();
        assert_eq!(picked, vec!["x", "y", "x"]);
    }

    #[test]
    fn test_selection_during_reset_is_fail_closed() {
        let locator = ServiceLocator::new();
        seed(&locator, ServiceKind::ApiServer, &["a"], &["a"]);
        assert!(locator.select_next(ServiceKind::ApiServer).is_some());

        // Registry reset to Down, probes not yet applied.
        seed(&locator, ServiceKind::ApiServer, &["a"], &[]);
        assert!(locator.select_next(ServiceKind::ApiServer).is_none());
    }

    #[test]
    fn test_list_active_endpoints() {
        let locator = ServiceLocator::new();
        seed(&locator, ServiceKind::ApiServer, &["a", "b"], &["b"]);

        let listed = locator.list_active_endpoints();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[&ServiceKind::ApiServer], vec![Endpoint::up("b", 8082)]);
        assert!(listed[&ServiceKind::OpServer].is_empty());
    }

    #[test]
    fn test_failover_single_endpoint() {
        let locator = ServiceLocator::new();
        seed(&locator, ServiceKind::ApiServer, &["a"], &["a"]);
        let mut target = RequestTarget::new("a", 8082);
        assert!(locator
            .report_endpoint_failure_and_reselect(&mut target, "apiServer")
            .is_none());
        assert_eq!(target, RequestTarget::new("a", 8082));
    }

    #[test]
    fn test_failover_redirects_and_evicts() {
        let locator = ServiceLocator::new();
        seed(&locator, ServiceKind::ApiServer, &["a", "b", "c"], &["a", "b", "c"]);
        let mut target = RequestTarget::new("a", 8082);

        let next = locator
            .report_endpoint_failure_and_reselect(&mut target, "ApiServer")
            .cloned();
        assert_eq!(next, Some(RequestTarget::new("b", 8082)));

        // "a" stays out of rotation until the view changes.
        let picked: Vec<String> = (0..4)
            .map(|_| locator.select_next(ServiceKind::ApiServer).unwrap().address)
            .collect();
        assert_eq!(picked, vec!["b", "c", "b", "c"]);
    }

    #[test]
    fn test_failover_unknown_label_is_noop() {
        let locator = ServiceLocator::new();
        seed(&locator, ServiceKind::ApiServer, &["a", "b"], &["a", "b"]);
        let mut target = RequestTarget::new("a", 8082);
        assert!(locator
            .report_endpoint_failure_and_reselect(&mut target, "webServer")
            .is_none());
        assert_eq!(target.url, "a");
        assert_eq!(locator.get_active(ServiceKind::ApiServer).len(), 2);
    }

    #[test]
    fn test_ready_flag() {
        let locator = ServiceLocator::new();
        assert!(!locator.is_ready());
        locator.clone().mark_ready();
        assert!(locator.is_ready());
    }
}
