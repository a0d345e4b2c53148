pub mod probe;
pub mod scheduler;

pub use probe::{HealthProbe, HttpProbe, ProbeOutcome};
pub use scheduler::{DiscoveryHandle, DiscoveryScheduler};
