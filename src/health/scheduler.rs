use super::probe::HealthProbe;
use crate::config::LocatorConfig;
use crate::discovery::{EndpointStatus, ServiceKind, ServiceLocator, StatusUpdate};
use arc_swap::ArcSwap;
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Drives poll cycles: refresh every kind from configuration, probe all of
/// its endpoints concurrently, then write the verdicts back in one step.
pub struct DiscoveryScheduler<P> {
    locator: ServiceLocator,
    probe: Arc<P>,
    config: Arc<ArcSwap<LocatorConfig>>,
    /// Keeps the timer and on-demand triggers from interleaving sweeps.
    cycle_mu: Arc<Mutex<()>>,
}

impl<P> Clone for DiscoveryScheduler<P> {
    fn clone(&self) -> Self {
        Self {
            locator: self.locator.clone(),
            probe: self.probe.clone(),
            config: self.config.clone(),
            cycle_mu: self.cycle_mu.clone(),
        }
    }
}

impl<P: HealthProbe> DiscoveryScheduler<P> {
    pub fn new(locator: ServiceLocator, probe: P, config: LocatorConfig) -> Self {
        Self {
            locator,
            probe: Arc::new(probe),
            config: Arc::new(ArcSwap::from_pointee(config)),
            cycle_mu: Arc::new(Mutex::new(())),
        }
    }

    pub fn locator(&self) -> &ServiceLocator {
        &self.locator
    }

    pub fn config(&self) -> Arc<LocatorConfig> {
        self.config.load_full()
    }

    /// Swap in new configuration; the next sweep rebuilds from it.
    pub fn update_config(&self, config: LocatorConfig) {
        self.config.store(Arc::new(config));
        info!("discovery: configuration replaced, applies from next sweep");
    }

    /// One full sweep over every service kind, one kind at a time.
    pub async fn run_cycle(&self) {
        let _guard = self.cycle_mu.lock().await;
        let start = Instant::now();
        let config = self.config.load_full();

        for kind in ServiceKind::ALL {
            self.sweep_kind(kind, &config).await;
        }

        self.locator.mark_ready();
        let elapsed = start.elapsed().as_secs_f64();
        metrics::histogram!("locator_discovery_cycle_duration_seconds").record(elapsed);
        debug!("discovery: sweep completed, duration={:.3}s", elapsed);
    }

    async fn sweep_kind(&self, kind: ServiceKind, config: &LocatorConfig) {
        let registry = self.locator.registry();
        let (snapshot, targets) = registry.refresh(kind, config);
        registry.store(kind, snapshot);

        if targets.is_empty() {
            debug!("discovery: no endpoints configured, kind={}", kind);
            metrics::gauge!("locator_active_endpoints", "kind" => kind.as_str()).set(0.0);
            return;
        }

        let total = targets.len();
        let probe = &self.probe;
        // Every verdict carries its endpoint identity, so completion order
        // does not matter. Nothing is applied until the whole batch settles.
        let updates: Vec<StatusUpdate> = stream::iter(targets)
            .map(|target| async move {
                let outcome = probe.probe(&target).await;
                let status = outcome.endpoint_status();

                metrics::counter!(
                    "locator_probe_total",
                    "kind" => kind.as_str(),
                    "result" => outcome.label(),
                )
                .increment(1);
                if status == EndpointStatus::Down {
                    warn!(
                        "discovery: probe failed, kind={}, endpoint={}, outcome={:?}",
                        kind, target.id, outcome
                    );
                } else {
                    debug!(
                        "discovery: probe passed, kind={}, endpoint={}, outcome={:?}",
                        kind, target.id, outcome
                    );
                }

                StatusUpdate {
                    id: target.id,
                    status,
                }
            })
            .buffer_unordered(config.discovery.probe_concurrency.max(1))
            .collect()
            .await;

        let up = registry.apply(kind, &updates);
        metrics::gauge!("locator_active_endpoints", "kind" => kind.as_str()).set(up as f64);
        info!(
            "discovery: kind refreshed, kind={}, endpoints={}, up={}",
            kind, total, up
        );
    }

    /// Immediate one-shot sweep, used at startup before the timer kicks in.
    pub async fn trigger_startup_discovery(&self) {
        info!("discovery: startup sweep triggered");
        self.run_cycle().await;
    }

    /// Spawn the recurring sweep. The first timed sweep fires one `interval`
    /// from now.
    pub fn start_periodic_discovery(&self, interval: Duration) -> DiscoveryHandle {
        let token = CancellationToken::new();
        let scheduler = self.clone();
        let cancelled = token.clone();

        let task = tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                "discovery: periodic sweep started, interval={}",
                humantime::format_duration(interval)
            );

            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => {
                        info!("discovery: periodic sweep stopped");
                        return;
                    }
                    _ = ticker.tick() => scheduler.run_cycle().await,
                }
            }
        });

        DiscoveryHandle { token, task }
    }
}

/// Stop handle for the recurring sweep.
pub struct DiscoveryHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl DiscoveryHandle {
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the timer and wait for an in-progress sweep to finish.
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            error!("discovery: periodic task failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceEndpointConfig;
    use crate::discovery::ProbeTarget;
    use crate::health::ProbeOutcome;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers from a fixed table; unknown addresses are refused.
    #[derive(Default)]
    struct ScriptedProbe {
        outcomes: HashMap<String, ProbeOutcome>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedProbe {
        fn with(mut self, addr: &str, outcome: ProbeOutcome) -> Self {
            self.outcomes.insert(addr.to_string(), outcome);
            self
        }
    }

    impl HealthProbe for ScriptedProbe {
        async fn probe(&self, target: &ProbeTarget) -> ProbeOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .get(&target.id.address)
                .cloned()
                .unwrap_or(ProbeOutcome::Refused)
        }
    }

    fn config(ips: &[&str]) -> LocatorConfig {
        let mut cfg = LocatorConfig::default();
        cfg.cnfg = ServiceEndpointConfig::new(ips.iter().map(|s| s.to_string()).collect(), 8082);
        cfg
    }

    #[tokio::test]
    async fn test_cycle_applies_classification() {
        let probe = ScriptedProbe::default()
            .with("a", ProbeOutcome::Reachable { status: 200 })
            .with("b", ProbeOutcome::Timeout)
            .with("c", ProbeOutcome::Failed("reset".into()));
        let scheduler =
            DiscoveryScheduler::new(ServiceLocator::new(), probe, config(&["a", "b", "c"]));

        scheduler.run_cycle().await;

        let raw = scheduler.locator().registry().snapshot(ServiceKind::ApiServer);
        let status: Vec<bool> = raw.iter().map(|e| e.is_up()).collect();
        assert_eq!(status, vec![true, false, true]);
        assert!(scheduler.locator().is_ready());
    }

    #[tokio::test]
    async fn test_cycle_with_nothing_configured() {
        let scheduler = DiscoveryScheduler::new(
            ServiceLocator::new(),
            ScriptedProbe::default(),
            LocatorConfig::default(),
        );
        scheduler.trigger_startup_discovery().await;
        for kind in ServiceKind::ALL {
            assert!(scheduler.locator().get_active(kind).is_empty());
        }
        assert!(scheduler.locator().is_ready());
    }

    #[tokio::test]
    async fn test_update_config_applies_next_cycle() {
        let probe = ScriptedProbe::default()
            .with("a", ProbeOutcome::Reachable { status: 200 })
            .with("b", ProbeOutcome::Reachable { status: 200 });
        let scheduler = DiscoveryScheduler::new(ServiceLocator::new(), probe, config(&["a"]));
        scheduler.run_cycle().await;
        assert_eq!(scheduler.locator().get_active(ServiceKind::ApiServer).len(), 1);

        scheduler.update_config(config(&["a", "b"]));
        scheduler.run_cycle().await;
        assert_eq!(scheduler.locator().get_active(ServiceKind::ApiServer).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_sweep_and_stop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let probe = ScriptedProbe {
            outcomes: HashMap::new(),
            calls: calls.clone(),
        }
        .with("a", ProbeOutcome::Reachable { status: 200 });
        let scheduler = DiscoveryScheduler::new(ServiceLocator::new(), probe, config(&["a"]));

        let handle = scheduler.start_periodic_discovery(Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0, "timer must not fire immediately");

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        handle.stop().await;
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
