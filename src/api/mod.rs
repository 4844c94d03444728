// API module entry
// Dispatches proxy requests to the endpoint handlers

mod error;
mod handlers;
mod mapping;
mod types;

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{CONTENT_LENGTH, USER_AGENT};
use hyper::{Request, Response, StatusCode};
use serde::Serialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::config::AppState;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use crate::routing::{self, Endpoint, RouteError};

use error::ApiError;
use types::HealthResponse;

/// Main entry point for HTTP request handling
///
/// Never fails: every outcome, upstream failures included, is turned into a
/// JSON response.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let entry = state
        .access_log_enabled()
        .then(|| new_access_entry(&req, peer_addr));

    let response = dispatch(req, &state).await;

    if let Some(mut entry) = entry {
        let body_bytes = response
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        entry.finish(response.status().as_u16(), body_bytes, started.elapsed());
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

async fn dispatch<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let server_name = state.config.http.server_name.as_str();
    let health = &state.config.routes.health;
    let health_path = health.enabled.then_some(health.liveness_path.as_str());

    let endpoint = match routing::match_endpoint(req.method(), req.uri().path(), health_path) {
        Ok(endpoint) => endpoint,
        Err(RouteError::NotFound) => return http::build_404_response(server_name),
        Err(RouteError::MethodNotAllowed { allow }) => {
            logger::log_warning(&format!("Method not allowed: {} {}", req.method(), req.uri().path()));
            return http::build_405_response(allow, server_name);
        }
    };

    logger::log_debug(&format!("Dispatching {}", endpoint.name()));
    let client = state.client.as_ref();

    let result = match &endpoint {
        Endpoint::SearchPeople => match read_body(req, state.config.http.max_body_size).await {
            Ok(body) => match handlers::parse_search_request(&body) {
                Ok(request) => handlers::search_people(client, &request)
                    .await
                    .map(|r| ok_json(&r, server_name)),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        },
        Endpoint::Profile { username } => handlers::get_profile(client, username)
            .await
            .map(|p| ok_json(&p, server_name)),
        Endpoint::ProfileDetails { urn_id } => handlers::get_profile_details(client, urn_id)
            .await
            .map(|d| ok_json(&d, server_name)),
        Endpoint::ProfileContactInfo { urn_id } => {
            handlers::get_profile_contact_info(client, urn_id)
                .await
                .map(|c| ok_json(&c, server_name))
        }
        Endpoint::Health => Ok(ok_json(&HealthResponse { status: "ok" }, server_name)),
    };

    result.unwrap_or_else(|err| error_response(&endpoint, &err, state))
}

fn ok_json<T: Serialize>(body: &T, server_name: &str) -> Response<Full<Bytes>> {
    http::build_json_response(StatusCode::OK, body, server_name)
}

fn error_response(endpoint: &Endpoint, err: &ApiError, state: &AppState) -> Response<Full<Bytes>> {
    let server_name = state.config.http.server_name.as_str();
    match err {
        ApiError::Upstream(e) => logger::log_upstream_failure(endpoint.name(), e),
        other => logger::log_warning(&format!("{} rejected: {other}", endpoint.name())),
    }
    if matches!(err, ApiError::PayloadTooLarge) {
        return http::build_413_response(state.config.http.max_body_size, server_name);
    }
    http::build_detail_response(err.status(), &err.to_string(), server_name)
}

/// Read the whole request body, enforcing `max_body_size`
async fn read_body<B>(req: Request<B>, max_body_size: u64) -> Result<Bytes, ApiError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let declared = req
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|size| size > max_body_size) {
        return Err(ApiError::PayloadTooLarge);
    }

    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    match Limited::new(req.into_body(), limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => Err(ApiError::PayloadTooLarge),
        Err(e) => Err(ApiError::BadBody(e.to_string())),
    }
}

fn new_access_entry<B>(req: &Request<B>, peer_addr: SocketAddr) -> AccessLogEntry {
    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = match req.version() {
        hyper::Version::HTTP_10 => "1.0".to_string(),
        hyper::Version::HTTP_2 => "2".to_string(),
        _ => "1.1".to_string(),
    };
    entry.user_agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);
    entry
}
