pub mod endpoint;
pub mod failover;
pub mod kind;
pub mod locator;
pub mod registry;
pub mod selector;
pub mod view;

pub use endpoint::{Endpoint, EndpointId, EndpointStatus, ProbeTarget, RequestTarget};
pub use kind::{map_api_kind, ServiceKind};
pub use locator::ServiceLocator;
pub use registry::{RawSnapshot, ServiceRegistry, StatusUpdate};
pub use view::{compute_active, detect_change, ActiveViewCache, ComparisonError, ViewDecision};
