use super::LocatorState;
use crate::discovery::map_api_kind;
use crate::error::LocatorError;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Response, StatusCode};

pub(crate) type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

fn respond(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Response<BoxBody> {
    let mut resp = Response::new(full_body(body));
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static(content_type),
    );
    resp
}

fn json(status: StatusCode, value: &serde_json::Value) -> Response<BoxBody> {
    match serde_json::to_string_pretty(value) {
        Ok(body) => respond(status, "application/json", body),
        Err(e) => error_json(
            StatusCode::INTERNAL_SERVER_ERROR,
            &LocatorError::Internal(e.to_string()),
        ),
    }
}

fn error_json(status: StatusCode, err: &LocatorError) -> Response<BoxBody> {
    respond(
        status,
        "application/json",
        serde_json::json!({ "error": err.to_string() }).to_string(),
    )
}

pub fn handle_admin<B>(req: Request<B>, state: LocatorState) -> Result<Response<BoxBody>, hyper::Error> {
    let path = req.uri().path();

    if let Some(label) = path.strip_prefix("/resolve/") {
        return Ok(resolve(label, &state));
    }

    let resp = match path {
        "/health" | "/healthz" => respond(StatusCode::OK, "application/json", r#"{"status":"ok"}"#),

        "/ready" | "/readyz" => {
            if state.locator.is_ready() {
                respond(StatusCode::OK, "application/json", r#"{"status":"ready"}"#)
            } else {
                respond(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "application/json",
                    r#"{"status":"discovering"}"#,
                )
            }
        }

        "/metrics" => respond(
            StatusCode::OK,
            "text/plain; version=0.0.4; charset=utf-8",
            state.metrics.render(),
        ),

        "/services" => match serde_json::to_value(state.locator.list_active_endpoints()) {
            Ok(value) => json(StatusCode::OK, &value),
            Err(e) => error_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                &LocatorError::Internal(e.to_string()),
            ),
        },

        _ => respond(StatusCode::NOT_FOUND, "application/json", r#"{"error":"not found"}"#),
    };
    Ok(resp)
}

/// Runs a real selection, so it advances the rotation like any caller would.
fn resolve(label: &str, state: &LocatorState) -> Response<BoxBody> {
    let Some(kind) = map_api_kind(label) else {
        return error_json(
            StatusCode::NOT_FOUND,
            &LocatorError::UnknownApiKind(label.to_string()),
        );
    };
    match state.locator.select_next(kind) {
        Some(endpoint) => json(
            StatusCode::OK,
            &serde_json::json!({ "kind": kind, "endpoint": endpoint }),
        ),
        None => error_json(
            StatusCode::NOT_FOUND,
            &LocatorError::NoEndpoint(kind.to_string()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LocatorConfig, ServiceEndpointConfig};
    use crate::discovery::{EndpointId, EndpointStatus, ServiceKind, ServiceLocator, StatusUpdate};
    use crate::metrics::Metrics;

    fn state_with_api(ips: &[&str], up: &[&str]) -> LocatorState {
        let locator = ServiceLocator::new();
        let mut cfg = LocatorConfig::default();
        cfg.cnfg = ServiceEndpointConfig::new(ips.iter().map(|s| s.to_string()).collect(), 8082);
        let (snapshot, _) = locator.registry().refresh(ServiceKind::ApiServer, &cfg);
        locator.registry().store(ServiceKind::ApiServer, snapshot);
        let updates: Vec<StatusUpdate> = up
            .iter()
            .map(|ip| StatusUpdate {
                id: EndpointId {
                    address: ip.to_string(),
                    port: 8082,
                },
                status: EndpointStatus::Up,
            })
            .collect();
        locator.registry().apply(ServiceKind::ApiServer, &updates);
        LocatorState::new(locator, Metrics::detached())
    }

    async fn call(state: &LocatorState, path: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder().uri(path).body(()).unwrap();
        let resp = handle_admin(req, state.clone()).unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let state = state_with_api(&[], &[]);
        let (status, body) = call(&state, "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_ready_follows_first_sweep() {
        let state = state_with_api(&[], &[]);
        let (status, _) = call(&state, "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        state.locator.mark_ready();
        let (status, _) = call(&state, "/ready").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_services_lists_up_endpoints() {
        let state = state_with_api(&["10.0.0.1", "10.0.0.2"], &["10.0.0.2"]);
        let (status, body) = call(&state, "/services").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["ApiServer"],
            serde_json::json!([{"ip-address": "10.0.0.2", "port": 8082, "status": "up"}])
        );
        assert_eq!(body["OpServer"], serde_json::json!([]));
        assert_eq!(body["dns-server"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_resolve() {
        let state = state_with_api(&["10.0.0.1", "10.0.0.2"], &["10.0.0.1", "10.0.0.2"]);
        let (_, first) = call(&state, "/resolve/apiServer").await;
        let (_, second) = call(&state, "/resolve/apiServer").await;
        assert_eq!(first["endpoint"]["ip-address"], "10.0.0.1");
        assert_eq!(second["endpoint"]["ip-address"], "10.0.0.2");
        assert_eq!(first["kind"], "ApiServer");
    }

    #[tokio::test]
    async fn test_resolve_errors() {
        let state = state_with_api(&["10.0.0.1"], &[]);
        let (status, body) = call(&state, "/resolve/webServer").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "unknown api kind: webServer");

        let (status, body) = call(&state, "/resolve/apiServer").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "no active endpoint for ApiServer");
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let state = state_with_api(&[], &[]);
        let (status, _) = call(&state, "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
