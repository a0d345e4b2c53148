use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointStatus {
    Up,
    Down,
}

/// One candidate instance of a service kind.
///
/// Identity is `(address, port)`; `status` is rewritten every poll cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    #[serde(rename = "ip-address")]
    pub address: String,
    pub port: u16,
    pub status: EndpointStatus,
}

impl Endpoint {
    /// New endpoints start pessimistic: nothing is up until a probe says so.
    pub fn down(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            status: EndpointStatus::Down,
        }
    }

    pub fn up(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            status: EndpointStatus::Up,
        }
    }

    pub fn is_up(&self) -> bool {
        self.status == EndpointStatus::Up
    }

    #[inline]
    pub fn same_identity(&self, address: &str, port: u16) -> bool {
        self.address == address && self.port == port
    }

    pub fn identity(&self) -> EndpointId {
        EndpointId {
            address: self.address.clone(),
            port: self.port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// `(address, port)` pair identifying an endpoint independent of its status.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointId {
    pub address: String,
    pub port: u16,
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// Everything a transport needs to health-check one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub id: EndpointId,
    pub scheme: String,
    pub status_url: String,
}

impl ProbeTarget {
    pub fn url(&self) -> String {
        format!(
            "{}://{}:{}{}",
            self.scheme, self.id.address, self.id.port, self.status_url
        )
    }
}

/// Caller-owned request parameters rewritten on failover.
///
/// `url` carries the host address the caller is currently talking to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTarget {
    pub url: String,
    pub port: u16,
}

impl RequestTarget {
    pub fn new(url: impl Into<String>, port: u16) -> Self {
        Self {
            url: url.into(),
            port,
        }
    }
}

impl From<&Endpoint> for RequestTarget {
    fn from(ep: &Endpoint) -> Self {
        Self::new(ep.address.clone(), ep.port)
    }
}
