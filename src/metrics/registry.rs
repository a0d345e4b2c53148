use anyhow::Result;
use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Histogram bucket boundaries for sweep duration (seconds). Sweeps are
/// bounded by the probe timeout, so the tail reaches well past it.
const SWEEP_BUCKETS: &[f64] = &[0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Thin handle around the global metrics recorder.
///
/// After `Metrics::install()` the `metrics` crate macros can be used anywhere
/// in the codebase. The `PrometheusHandle` is retained solely for rendering
/// the admin `/metrics` endpoint.
#[derive(Clone)]
pub struct Metrics {
    handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder and register metric
    /// descriptions. Call once at startup.
    pub fn install() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("_duration_seconds".to_string()),
                SWEEP_BUCKETS,
            )?
            .install_recorder()?;

        // probing
        describe_counter!(
            "locator_probe_total",
            Unit::Count,
            "Health probes issued, by service kind and outcome"
        );
        describe_histogram!(
            "locator_discovery_cycle_duration_seconds",
            Unit::Seconds,
            "Wall time of one sweep over every service kind"
        );
        describe_gauge!(
            "locator_active_endpoints",
            Unit::Count,
            "Endpoints marked up by the last sweep, per service kind"
        );

        // views
        describe_counter!(
            "locator_view_adopted_total",
            Unit::Count,
            "Times a freshly polled view replaced the stable one"
        );

        // request path
        describe_counter!(
            "locator_selection_total",
            Unit::Count,
            "Endpoint selections, by service kind and hit/miss"
        );
        describe_counter!(
            "locator_failover_total",
            Unit::Count,
            "Caller-reported failures, by service kind and result"
        );

        Ok(Self { handle })
    }

    /// Recorder that is never installed globally; renders nothing.
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        Self {
            handle: PrometheusBuilder::new().build_recorder().handle(),
        }
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
