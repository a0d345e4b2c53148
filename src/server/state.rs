use crate::discovery::ServiceLocator;
use crate::metrics::Metrics;

/// Shared state handed to the admin server, cheaply cloneable.
#[derive(Clone)]
pub struct LocatorState {
    pub locator: ServiceLocator,
    pub metrics: Metrics,
}

impl LocatorState {
    pub fn new(locator: ServiceLocator, metrics: Metrics) -> Self {
        Self { locator, metrics }
    }
}
