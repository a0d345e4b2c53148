//! Client-side service discovery for the gateway's backends.
//!
//! Statically configured analytics, config API and DNS servers are probed on
//! a timer; callers get healthy endpoints round-robin (DNS always head-first)
//! and can report a failed endpoint to be redirected to the next one.

pub mod config;
pub mod discovery;
pub mod error;
pub mod health;
pub mod metrics;
pub mod server;

pub use config::LocatorConfig;
pub use discovery::{Endpoint, RequestTarget, ServiceKind, ServiceLocator};
pub use error::LocatorError;
pub use health::{DiscoveryHandle, DiscoveryScheduler, HealthProbe, HttpProbe, ProbeOutcome};
