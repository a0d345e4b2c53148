use crate::config::LocatorConfig;
use crate::discovery::ServiceLocator;
use crate::health::{DiscoveryScheduler, HealthProbe, HttpProbe};
use crate::metrics::Metrics;
use crate::server;
use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// CLI arguments forwarded from `main()`.
pub struct BootstrapArgs {
    pub config_path: PathBuf,
    pub admin_listen: Option<String>,
    pub poll_interval: Option<Duration>,
}

impl BootstrapArgs {
    /// CLI flags win over the file and the environment, on load and on reload.
    fn apply_overrides(&self, config: &mut LocatorConfig) -> Result<()> {
        if let Some(ref listen) = self.admin_listen {
            config.admin.listen = listen.clone();
        }
        if let Some(interval) = self.poll_interval {
            config.discovery.poll_interval_ms = interval.as_millis() as u64;
        }
        config.validate()
    }

    fn load_config(&self) -> Result<LocatorConfig> {
        let mut config = LocatorConfig::load(&self.config_path)?;
        self.apply_overrides(&mut config)?;
        Ok(config)
    }
}

/// Locator lifecycle: init → startup sweep → periodic sweep → serve → shutdown.
pub async fn run(args: BootstrapArgs) -> Result<()> {
    init_tracing();

    let config = args.load_config()?;
    let metrics = Metrics::install()?;
    let probe = HttpProbe::new(config.probe_timeout())?;
    let locator = ServiceLocator::new();

    let interval = config.poll_interval();
    let admin_listen = config.admin.listen.clone();
    let scheduler = DiscoveryScheduler::new(locator.clone(), probe, config);
    let shutdown = CancellationToken::new();

    // Admin comes up first so /ready can report the startup sweep in progress.
    start_admin_server(
        server::LocatorState::new(locator, metrics),
        admin_listen,
        &shutdown,
    );

    scheduler.trigger_startup_discovery().await;
    tracing::info!("discovery: startup sweep completed");

    let periodic = scheduler.start_periodic_discovery(interval);
    start_config_reloader(&scheduler, args, &shutdown);

    wait_for_shutdown(&shutdown).await;

    periodic.stop().await;
    tracing::info!("server: shutdown complete");
    Ok(())
}

fn init_tracing() {
    let (non_blocking, _guard) = tracing_appender::non_blocking::NonBlockingBuilder::default()
        .buffered_lines_limit(128_000)
        .lossy(true)
        .finish(std::io::stdout());

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false)
                .json(),
        )
        .init();

    std::mem::forget(_guard);
}

fn start_admin_server(state: server::LocatorState, listen: String, shutdown: &CancellationToken) {
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = server::run_admin_server(&listen, state, shutdown).await {
            tracing::error!("server: admin failed, error={}", e);
        }
    });
}

/// Re-read the config file on SIGHUP. The next sweep rebuilds every kind
/// from it; the probe timeout and sweep interval are fixed at startup.
#[cfg(unix)]
fn start_config_reloader<P: HealthProbe>(
    scheduler: &DiscoveryScheduler<P>,
    args: BootstrapArgs,
    shutdown: &CancellationToken,
) {
    use tokio::signal::unix::{signal, SignalKind};

    let scheduler = scheduler.clone();
    let shutdown = shutdown.clone();

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("config: SIGHUP handler unavailable, reload disabled: {}", e);
                return;
            }
        };

        loop {
            tokio::select! {
                _ = hangup.recv() => {}
                _ = shutdown.cancelled() => return,
            }

            match args.load_config() {
                Ok(config) => {
                    tracing::info!(
                        "config: reloaded from {}",
                        args.config_path.display()
                    );
                    scheduler.update_config(config);
                }
                Err(e) => {
                    tracing::error!("config: reload failed, keeping previous config: {}", e);
                }
            }
        }
    });
}

#[cfg(not(unix))]
fn start_config_reloader<P: HealthProbe>(
    _scheduler: &DiscoveryScheduler<P>,
    _args: BootstrapArgs,
    _shutdown: &CancellationToken,
) {
    tracing::info!("config: reload on signal not supported on this platform");
}

async fn wait_for_shutdown(shutdown: &CancellationToken) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::error!("server: SIGTERM handler unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("server: received SIGINT, shutting down"),
        _ = terminate => tracing::info!("server: received SIGTERM, shutting down"),
    }

    // Signal all background loops to stop.
    shutdown.cancel();
}
