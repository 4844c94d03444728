//! HTTP response building module
//!
//! Every response the proxy emits is JSON. Error bodies use the
//! `{"detail": ...}` shape existing clients already parse.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{ALLOW, CONTENT_TYPE, SERVER};
use hyper::{Response, StatusCode};
use serde::Serialize;

const JSON: &str = "application/json";

/// Build a JSON response from any serializable body
pub fn build_json_response<T: Serialize + ?Sized>(
    status: StatusCode,
    body: &T,
    server_name: &str,
) -> Response<Full<Bytes>> {
    match serde_json::to_vec(body) {
        Ok(json) => build_raw_json(status, Bytes::from(json), server_name),
        Err(e) => {
            crate::logger::log_error(&format!("Failed to serialize response: {e}"));
            build_detail_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                server_name,
            )
        }
    }
}

/// Build a `{"detail": message}` response
pub fn build_detail_response(
    status: StatusCode,
    message: &str,
    server_name: &str,
) -> Response<Full<Bytes>> {
    let body = serde_json::json!({ "detail": message }).to_string();
    build_raw_json(status, Bytes::from(body), server_name)
}

/// Build 404 Not Found response
pub fn build_404_response(server_name: &str) -> Response<Full<Bytes>> {
    build_detail_response(StatusCode::NOT_FOUND, "Not Found", server_name)
}

/// Build 405 Method Not Allowed response
pub fn build_405_response(allow: &str, server_name: &str) -> Response<Full<Bytes>> {
    let mut resp =
        build_detail_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed", server_name);
    if let Ok(value) = allow.parse() {
        resp.headers_mut().insert(ALLOW, value);
    }
    resp
}

/// Build 413 Payload Too Large response
pub fn build_413_response(max_body_size: u64, server_name: &str) -> Response<Full<Bytes>> {
    build_detail_response(
        StatusCode::PAYLOAD_TOO_LARGE,
        &format!("Request body exceeds {max_body_size} bytes"),
        server_name,
    )
}

fn build_raw_json(status: StatusCode, body: Bytes, server_name: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, JSON)
        .header(SERVER, server_name)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error(status, &e);
            let mut fallback = Response::new(Full::new(Bytes::new()));
            *fallback.status_mut() = status;
            fallback
        })
}

/// Log response build error
fn log_build_error(status: StatusCode, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(resp: Response<Full<Bytes>>) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_detail_response_shape() {
        let resp = build_detail_response(StatusCode::INTERNAL_SERVER_ERROR, "boom", "test");
        assert_eq!(resp.status(), 500);
        assert_eq!(resp.headers()[CONTENT_TYPE], JSON);
        assert_eq!(resp.headers()[SERVER], "test");
        assert_eq!(body_json(resp).await, serde_json::json!({ "detail": "boom" }));
    }

    #[tokio::test]
    async fn test_405_lists_allowed_methods() {
        let resp = build_405_response("POST", "test");
        assert_eq!(resp.status(), 405);
        assert_eq!(resp.headers()[ALLOW], "POST");
    }

    #[tokio::test]
    async fn test_bad_server_name_still_yields_status() {
        let resp = build_404_response("bad\nname");
        assert_eq!(resp.status(), 404);
    }
}
