use std::fmt;

#[derive(Debug)]
pub enum LocatorError {
    UnknownApiKind(String),
    NoEndpoint(String),
    Probe(String),
    Config(String),
    Internal(String),
}

impl fmt::Display for LocatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocatorError::UnknownApiKind(label) => write!(f, "unknown api kind: {}", label),
            LocatorError::NoEndpoint(kind) => write!(f, "no active endpoint for {}", kind),
            LocatorError::Probe(msg) => write!(f, "probe error: {}", msg),
            LocatorError::Config(msg) => write!(f, "config error: {}", msg),
            LocatorError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for LocatorError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unknown_api_kind() {
        assert_eq!(
            LocatorError::UnknownApiKind("webServer".to_string()).to_string(),
            "unknown api kind: webServer"
        );
    }

    #[test]
    fn display_no_endpoint() {
        assert_eq!(
            LocatorError::NoEndpoint("ApiServer".to_string()).to_string(),
            "no active endpoint for ApiServer"
        );
    }

    #[test]
    fn display_probe() {
        assert_eq!(
            LocatorError::Probe("builder failed".to_string()).to_string(),
            "probe error: builder failed"
        );
    }

    #[test]
    fn display_config() {
        assert_eq!(
            LocatorError::Config("bad port".to_string()).to_string(),
            "config error: bad port"
        );
    }

    #[test]
    fn display_internal() {
        assert_eq!(
            LocatorError::Internal("oops".to_string()).to_string(),
            "internal error: oops"
        );
    }
}
