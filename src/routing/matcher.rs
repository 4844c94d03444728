//! Route matching module
//!
//! Exact matches for fixed paths, single-segment prefix matches for paths
//! carrying an identifier.

use std::borrow::Cow;

use hyper::Method;
use percent_encoding::percent_decode_str;

use super::{Endpoint, RouteError};

type ParamRoute = (&'static str, fn(String) -> Endpoint);

/// Routes of the form `<prefix>{param}`, all `GET`
const PARAM_ROUTES: [ParamRoute; 3] = [
    ("/profile/", |username| Endpoint::Profile { username }),
    ("/profile-details/", |urn_id| Endpoint::ProfileDetails { urn_id }),
    ("/profile-contact-info/", |urn_id| Endpoint::ProfileContactInfo { urn_id }),
];

/// Resolve the endpoint for a request.
///
/// `health_path` is `None` when the health endpoint is disabled.
pub fn match_endpoint(
    method: &Method,
    path: &str,
    health_path: Option<&str>,
) -> Result<Endpoint, RouteError> {
    if path == "/search-people/" || path == "/search-people" {
        return only(method, &Method::POST, Endpoint::SearchPeople);
    }

    if health_path == Some(path) {
        return only(method, &Method::GET, Endpoint::Health);
    }

    for (prefix, build) in PARAM_ROUTES {
        let Some(raw) = path.strip_prefix(prefix) else {
            continue;
        };
        let param = extract_param(raw).ok_or(RouteError::NotFound)?;
        return only(method, &Method::GET, build(param));
    }

    Err(RouteError::NotFound)
}

fn only(method: &Method, allowed: &Method, endpoint: Endpoint) -> Result<Endpoint, RouteError> {
    if method == allowed {
        Ok(endpoint)
    } else if *allowed == Method::POST {
        Err(RouteError::MethodNotAllowed { allow: "POST" })
    } else {
        Err(RouteError::MethodNotAllowed { allow: "GET" })
    }
}

/// A path parameter is exactly one non-empty segment that decodes to UTF-8
fn extract_param(raw: &str) -> Option<String> {
    if raw.is_empty() || raw.contains('/') {
        return None;
    }
    percent_decode_str(raw)
        .decode_utf8()
        .ok()
        .map(Cow::into_owned)
        .filter(|p| !p.is_empty())
}
