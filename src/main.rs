#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use anyhow::Result;
use clap::Parser;
use hermes_locator::server;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "hermes-locator",
    about = "Health-probing service locator for analytics, config API and DNS backends"
)]
struct Cli {
    /// Path to locator config file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Admin API listen address (overrides config)
    #[arg(long)]
    admin_listen: Option<String>,

    /// Delay between periodic sweeps, e.g. "30s" or "5m" (overrides config)
    #[arg(long, value_parser = humantime::parse_duration)]
    poll_interval: Option<Duration>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(server::bootstrap::run(server::bootstrap::BootstrapArgs {
        config_path: cli.config,
        admin_listen: cli.admin_listen,
        poll_interval: cli.poll_interval,
    }))
}
