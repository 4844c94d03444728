//! HTTP implementation of `ProfileClient`
//!
//! Talks JSON over HTTP/1.1 to the upstream data API. A session cookie is
//! obtained from `POST /auth/login` and replayed on every data call.

use std::time::Instant;

use async_trait::async_trait;
use cookie::Cookie;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{ACCEPT, CONTENT_TYPE, COOKIE, SET_COOKIE};
use hyper::{Method, Request, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use super::{ClientError, ProfileClient, ProfileLookup, RawRecord};
use crate::config::{Credentials, UpstreamConfig};
use crate::logger;

const LOGIN_PATH: &str = "/auth/login";
const SEARCH_PATH: &str = "/search-people";
const PROFILE_PATH: &str = "/profile";
const CONTACT_INFO_PATH: &str = "/profile-contact-info";

/// Raw upstream reply before status handling
struct UpstreamReply {
    status: StatusCode,
    set_cookies: Vec<String>,
    body: Bytes,
}

pub struct HttpProfileClient {
    http: Client<HttpConnector, Full<Bytes>>,
    base_url: String,
    credentials: Credentials,
    session: RwLock<Option<String>>,
}

impl HttpProfileClient {
    /// Build a client without contacting the upstream
    pub fn new(upstream: &UpstreamConfig, credentials: Credentials) -> Result<Self, ClientError> {
        let base_url = upstream.base_url.trim_end_matches('/').to_string();

        let uri: Uri = base_url.parse().map_err(|e| {
            ClientError::Transport(format!("invalid upstream base URL '{base_url}': {e}"))
        })?;
        if uri.scheme_str() != Some("http") || uri.host().is_none() {
            return Err(ClientError::Transport(format!(
                "upstream base URL must be an absolute http:// URL, got '{base_url}'"
            )));
        }

        let http = Client::builder(TokioExecutor::new()).build_http();

        Ok(Self {
            http,
            base_url,
            credentials,
            session: RwLock::new(None),
        })
    }

    /// Build a client and, when `refresh_cookies` is set, log in right away
    /// so bad credentials stop the process before it serves anything.
    pub async fn connect(
        upstream: &UpstreamConfig,
        credentials: Credentials,
    ) -> Result<Self, ClientError> {
        let client = Self::new(upstream, credentials)?;
        if upstream.refresh_cookies {
            client.session().await?;
        }
        Ok(client)
    }

    /// Log in and return the `Cookie` header value for the new session
    async fn login(&self) -> Result<String, ClientError> {
        let body = json!({
            "username": self.credentials.username,
            "password": self.credentials.password,
        });

        let reply = self.send(LOGIN_PATH, &body, None).await?;
        if !reply.status.is_success() {
            return Err(ClientError::Authentication(format!(
                "login rejected with status {}: {}",
                reply.status,
                String::from_utf8_lossy(&reply.body)
            )));
        }

        let cookie = session_cookie(&reply.set_cookies).ok_or_else(|| {
            ClientError::Authentication("login response carried no session cookie".to_string())
        })?;

        logger::log_upstream_login(&self.base_url, &self.credentials.username);
        Ok(cookie)
    }

    /// Current session cookie, logging in first when there is none.
    ///
    /// The write lock is held across the login so concurrent first calls
    /// share a single login.
    async fn session(&self) -> Result<String, ClientError> {
        if let Some(cookie) = self.session.read().await.as_ref() {
            return Ok(cookie.clone());
        }

        let mut session = self.session.write().await;
        if let Some(cookie) = session.as_ref() {
            return Ok(cookie.clone());
        }
        let cookie = self.login().await?;
        *session = Some(cookie.clone());
        Ok(cookie)
    }

    /// Drop a session the upstream rejected so the next call logs in again.
    /// A session replaced in the meantime is left alone.
    async fn invalidate(&self, rejected: &str) {
        let mut session = self.session.write().await;
        if session.as_deref() == Some(rejected) {
            *session = None;
            logger::log_warning("Upstream session rejected, will log in again on next call");
        }
    }

    /// Authenticated JSON call
    async fn call(&self, path: &str, body: &Value) -> Result<Value, ClientError> {
        let cookie = self.session().await?;

        let started = Instant::now();
        let reply = self.send(path, body, Some(&cookie)).await?;
        logger::log_upstream_call(path, reply.status.as_u16(), started.elapsed());

        match reply.status {
            status if status.is_success() => Ok(serde_json::from_slice(&reply.body)?),
            status @ (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
                self.invalidate(&cookie).await;
                Err(ClientError::Authentication(format!(
                    "session rejected by upstream ({status})"
                )))
            }
            status => Err(ClientError::Status {
                status,
                body: String::from_utf8_lossy(&reply.body).into_owned(),
            }),
        }
    }

    async fn send(
        &self,
        path: &str,
        body: &Value,
        cookie: Option<&str>,
    ) -> Result<UpstreamReply, ClientError> {
        let uri = format!("{}{path}", self.base_url);

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(&uri)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        let req = builder
            .body(Full::new(Bytes::from(body.to_string())))
            .map_err(|e| ClientError::Transport(format!("{uri}: {e}")))?;

        let resp = self
            .http
            .request(req)
            .await
            .map_err(|e| ClientError::Transport(format!("{uri}: {e}")))?;

        let status = resp.status();
        let set_cookies = resp
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(ToString::to_string)
            .collect();

        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| ClientError::Transport(format!("{uri}: {e}")))?
            .to_bytes();

        Ok(UpstreamReply {
            status,
            set_cookies,
            body,
        })
    }
}

#[async_trait]
impl ProfileClient for HttpProfileClient {
    async fn search_people(
        &self,
        keywords: &str,
        limit: usize,
    ) -> Result<Vec<RawRecord>, ClientError> {
        let body = json!({ "keywords": keywords, "limit": limit });
        expect_records(self.call(SEARCH_PATH, &body).await?)
    }

    async fn get_profile(&self, lookup: &ProfileLookup) -> Result<RawRecord, ClientError> {
        let mut body = serde_json::Map::new();
        body.insert(lookup.key().to_string(), Value::from(lookup.value()));
        expect_object(self.call(PROFILE_PATH, &Value::Object(body)).await?)
    }

    async fn get_profile_contact_info(&self, urn_id: &str) -> Result<RawRecord, ClientError> {
        let body = json!({ "urn_id": urn_id });
        expect_object(self.call(CONTACT_INFO_PATH, &body).await?)
    }
}

/// Build a `Cookie` header value from `Set-Cookie` headers.
///
/// Attributes are dropped, unparsable headers skipped, and a repeated name
/// keeps its last value in its first position.
fn session_cookie(set_cookies: &[String]) -> Option<String> {
    let mut jar: Vec<Cookie<'_>> = Vec::new();
    for raw in set_cookies {
        let Ok(cookie) = Cookie::parse(raw.as_str()) else {
            continue;
        };
        match jar.iter_mut().find(|c| c.name() == cookie.name()) {
            Some(existing) => *existing = cookie,
            None => jar.push(cookie),
        }
    }

    if jar.is_empty() {
        return None;
    }
    let pairs: Vec<String> = jar
        .iter()
        .map(|c| {
            let (name, value) = c.name_value();
            format!("{name}={value}")
        })
        .collect();
    Some(pairs.join("; "))
}

fn expect_object(value: Value) -> Result<RawRecord, ClientError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ClientError::Malformed(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn expect_records(value: Value) -> Result<Vec<RawRecord>, ClientError> {
    let Value::Array(items) = value else {
        return Err(ClientError::Malformed(format!(
            "expected a JSON array, got {}",
            json_kind(&value)
        )));
    };
    items.into_iter().map(expect_object).collect()
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::body::Incoming;
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper::Response;
    use hyper_util::rt::TokioIo;
    use std::convert::Infallible;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    fn credentials() -> Credentials {
        Credentials {
            username: "me@example.com".to_string(),
            password: "hunter2".to_string(),
        }
    }

    fn upstream(base_url: &str, refresh_cookies: bool) -> UpstreamConfig {
        UpstreamConfig {
            base_url: base_url.to_string(),
            refresh_cookies,
        }
    }

    /// Minimal stand-in for the upstream data API
    async fn fake_upstream(
        req: Request<Incoming>,
    ) -> Result<Response<Full<Bytes>>, Infallible> {
        let path = req.uri().path().to_string();
        let has_session = req
            .headers()
            .get(COOKIE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("li_at=abc"));
        let body = req.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

        let reply = match path.as_str() {
            LOGIN_PATH if body["password"] == "hunter2" => Response::builder()
                .status(200)
                .header(SET_COOKIE, "li_at=abc; Path=/; HttpOnly")
                .header(SET_COOKIE, "JSESSIONID=\"ajax:1\"; Path=/")
                .body(Full::new(Bytes::from("{}"))),
            LOGIN_PATH => Response::builder()
                .status(401)
                .body(Full::new(Bytes::from("bad credentials"))),
            _ if !has_session => Response::builder()
                .status(401)
                .body(Full::new(Bytes::new())),
            SEARCH_PATH => {
                let hits: Vec<Value> = (0..body["limit"].as_u64().unwrap_or(0))
                    .map(|i| json!({ "urn_id": format!("urn{i}"), "name": body["keywords"] }))
                    .collect();
                Response::builder()
                    .status(200)
                    .body(Full::new(Bytes::from(Value::Array(hits).to_string())))
            }
            PROFILE_PATH => Response::builder()
                .status(200)
                .body(Full::new(Bytes::from(body.to_string()))),
            CONTACT_INFO_PATH => Response::builder()
                .status(429)
                .body(Full::new(Bytes::from("rate limited"))),
            _ => Response::builder().status(404).body(Full::new(Bytes::new())),
        };
        Ok(reply.unwrap())
    }

    async fn spawn_fake_upstream() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(async move {
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service_fn(fake_upstream))
                        .await;
                });
            }
        });
        addr
    }

    /// Upstream that numbers its sessions; with `single_use` a session is
    /// rejected after serving one data call
    struct ExpiringUpstream {
        logins: AtomicUsize,
        current: Mutex<Option<String>>,
        single_use: bool,
    }

    async fn expiring_reply(
        req: Request<Incoming>,
        fake: Arc<ExpiringUpstream>,
    ) -> Result<Response<Full<Bytes>>, Infallible> {
        if req.uri().path() == LOGIN_PATH {
            let n = fake.logins.fetch_add(1, Ordering::SeqCst) + 1;
            let token = format!("li_at=token{n}");
            *fake.current.lock().unwrap() = Some(token.clone());
            return Ok(Response::builder()
                .status(200)
                .header(SET_COOKIE, format!("{token}; Path=/; HttpOnly"))
                .body(Full::new(Bytes::from("{}")))
                .unwrap());
        }

        let presented = req
            .headers()
            .get(COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let mut current = fake.current.lock().unwrap();
        if presented.is_none() || *current != presented {
            return Ok(Response::builder()
                .status(401)
                .body(Full::new(Bytes::new()))
                .unwrap());
        }
        if fake.single_use {
            *current = None;
        }
        Ok(Response::builder()
            .status(200)
            .body(Full::new(Bytes::from(r#"{"ok": true}"#)))
            .unwrap())
    }

    async fn spawn_expiring_upstream(single_use: bool) -> (SocketAddr, Arc<ExpiringUpstream>) {
        let fake = Arc::new(ExpiringUpstream {
            logins: AtomicUsize::new(0),
            current: Mutex::new(None),
            single_use,
        });
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shared = Arc::clone(&fake);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let shared = Arc::clone(&shared);
                tokio::spawn(async move {
                    let service = service_fn(move |req| expiring_reply(req, Arc::clone(&shared)));
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });
        (addr, fake)
    }

    #[test]
    fn test_session_cookie_joins_name_value_pairs() {
        let headers = vec![
            "li_at=abc; Path=/; HttpOnly".to_string(),
            "JSESSIONID=ajax1; Secure; Expires=Wed, 21 Oct 2037 07:28:00 GMT".to_string(),
        ];
        assert_eq!(
            session_cookie(&headers).as_deref(),
            Some("li_at=abc; JSESSIONID=ajax1")
        );
        assert_eq!(session_cookie(&[]), None);
        assert_eq!(session_cookie(&["garbage".to_string()]), None);
    }

    #[test]
    fn test_session_cookie_repeated_name_keeps_last_value() {
        let headers = vec![
            "li_at=old; Path=/".to_string(),
            "lang=en".to_string(),
            "not a cookie".to_string(),
            "li_at=new; HttpOnly".to_string(),
        ];
        assert_eq!(
            session_cookie(&headers).as_deref(),
            Some("li_at=new; lang=en")
        );
    }

    #[test]
    fn test_expect_records_rejects_non_objects() {
        let ok = expect_records(json!([{ "a": 1 }, { "b": 2 }])).unwrap();
        assert_eq!(ok.len(), 2);

        let err = expect_records(json!([{ "a": 1 }, 3])).unwrap_err();
        assert!(err.to_string().contains("a number"));

        let err = expect_records(json!({ "results": [] })).unwrap_err();
        assert!(err.to_string().contains("expected a JSON array"));
    }

    #[test]
    fn test_new_rejects_non_http_base_url() {
        assert!(HttpProfileClient::new(&upstream("https://api.example.com", false), credentials()).is_err());
        assert!(HttpProfileClient::new(&upstream("not a url", false), credentials()).is_err());
        assert!(HttpProfileClient::new(&upstream("http://127.0.0.1:9000/", false), credentials()).is_ok());
    }

    #[tokio::test]
    async fn test_calls_carry_session_cookie() {
        let addr = spawn_fake_upstream().await;
        let client = HttpProfileClient::connect(&upstream(&format!("http://{addr}"), true), credentials())
            .await
            .unwrap();

        let hits = client.search_people("rust", 3).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[2]["urn_id"], "urn2");
        assert_eq!(hits[0]["name"], "rust");

        let profile = client
            .get_profile(&ProfileLookup::UrnId("ACoAAB".to_string()))
            .await
            .unwrap();
        assert_eq!(profile["urn_id"], "ACoAAB");
        assert!(profile.get("public_id").is_none());
    }

    #[tokio::test]
    async fn test_lazy_login_on_first_call() {
        let addr = spawn_fake_upstream().await;
        let client = HttpProfileClient::connect(&upstream(&format!("http://{addr}"), false), credentials())
            .await
            .unwrap();
        assert!(client.session.read().await.is_none());

        let profile = client
            .get_profile(&ProfileLookup::PublicId("jane".to_string()))
            .await
            .unwrap();
        assert_eq!(profile["public_id"], "jane");
        assert!(client.session.read().await.is_some());
    }

    #[tokio::test]
    async fn test_rejected_login_is_authentication_error() {
        let addr = spawn_fake_upstream().await;
        let bad = Credentials {
            username: "me@example.com".to_string(),
            password: "wrong".to_string(),
        };
        let err = HttpProfileClient::connect(&upstream(&format!("http://{addr}"), true), bad)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ClientError::Authentication(_)));
        assert!(err.to_string().contains("bad credentials"));
    }

    #[tokio::test]
    async fn test_error_status_is_reported_with_body() {
        let addr = spawn_fake_upstream().await;
        let client = HttpProfileClient::connect(&upstream(&format!("http://{addr}"), true), credentials())
            .await
            .unwrap();

        let err = client.get_profile_contact_info("ACoAAB").await.unwrap_err();
        match err {
            ClientError::Status { status, body } => {
                assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = HttpProfileClient::connect(&upstream(&format!("http://{addr}"), true), credentials())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ClientError::Transport(_)));
    }

    #[tokio::test]
    async fn test_rejected_session_is_renewed_on_next_call() {
        let (addr, fake) = spawn_expiring_upstream(true).await;
        let client = HttpProfileClient::connect(&upstream(&format!("http://{addr}"), false), credentials())
            .await
            .unwrap();
        let lookup = ProfileLookup::PublicId("jane".to_string());

        assert!(client.get_profile(&lookup).await.is_ok());

        let err = client.get_profile(&lookup).await.unwrap_err();
        assert!(matches!(err, ClientError::Authentication(_)));
        assert!(client.session.read().await.is_none());

        let profile = client.get_profile(&lookup).await.unwrap();
        assert_eq!(profile["ok"], true);
        assert_eq!(fake.logins.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_eager_session_is_renewed_after_rejection() {
        let (addr, fake) = spawn_expiring_upstream(true).await;
        let client = HttpProfileClient::connect(&upstream(&format!("http://{addr}"), true), credentials())
            .await
            .unwrap();
        assert_eq!(fake.logins.load(Ordering::SeqCst), 1);

        assert!(client.get_profile_contact_info("ACoAAB").await.is_ok());
        assert!(client.get_profile_contact_info("ACoAAB").await.is_err());
        assert!(client.get_profile_contact_info("ACoAAB").await.is_ok());
        assert_eq!(fake.logins.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_first_calls_share_one_login() {
        let (addr, fake) = spawn_expiring_upstream(false).await;
        let client = HttpProfileClient::connect(&upstream(&format!("http://{addr}"), false), credentials())
            .await
            .unwrap();
        let lookup = ProfileLookup::UrnId("ACoAAB".to_string());

        let (a, b, c) = tokio::join!(
            client.get_profile(&lookup),
            client.get_profile(&lookup),
            client.get_profile(&lookup),
        );
        assert!(a.is_ok());
        assert!(b.is_ok());
        assert!(c.is_ok());
        assert_eq!(fake.logins.load(Ordering::SeqCst), 1);
    }
}
