use crate::discovery::{EndpointStatus, ProbeTarget};
use crate::error::LocatorError;
use std::error::Error as _;
use std::future::Future;
use std::time::Duration;

/// Result of one health probe, classified by what it says about reachability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The endpoint answered; any status code counts.
    Reachable { status: u16 },
    Refused,
    Timeout,
    /// Any other transport error.
    Failed(String),
}

impl ProbeOutcome {
    /// Only refused connections and timeouts take an endpoint down.
    pub fn endpoint_status(&self) -> EndpointStatus {
        match self {
            ProbeOutcome::Refused | ProbeOutcome::Timeout => EndpointStatus::Down,
            ProbeOutcome::Reachable { .. } | ProbeOutcome::Failed(_) => EndpointStatus::Up,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProbeOutcome::Reachable { .. } => "reachable",
            ProbeOutcome::Refused => "refused",
            ProbeOutcome::Timeout => "timeout",
            ProbeOutcome::Failed(_) => "failed",
        }
    }
}

/// Transport used to health-check a single endpoint.
pub trait HealthProbe: Send + Sync + 'static {
    fn probe(&self, target: &ProbeTarget) -> impl Future<Output = ProbeOutcome> + Send;
}

/// HTTP GET against the endpoint's status URL.
#[derive(Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self, LocatorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| LocatorError::Probe(format!("failed to build http client: {}", e)))?;
        Ok(Self { client })
    }
}

impl HealthProbe for HttpProbe {
    async fn probe(&self, target: &ProbeTarget) -> ProbeOutcome {
        match self.client.get(target.url()).send().await {
            Ok(resp) => ProbeOutcome::Reachable {
                status: resp.status().as_u16(),
            },
            Err(e) => classify_error(&e),
        }
    }
}

/// Walk the error chain looking for a refused connection or a timeout.
fn classify_error(err: &reqwest::Error) -> ProbeOutcome {
    if err.is_timeout() {
        return ProbeOutcome::Timeout;
    }

    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            match io.kind() {
                std::io::ErrorKind::ConnectionRefused => return ProbeOutcome::Refused,
                std::io::ErrorKind::TimedOut => return ProbeOutcome::Timeout,
                _ => {}
            }
        }
        source = cause.source();
    }

    ProbeOutcome::Failed(err.to_string())
}
