//! JSON-over-HTTP transport for the planner service.
//!
//! Requests carry screenshots as inline base64, so request bodies are large
//! and never logged verbatim: the debug trace (`STEER_HTTP_RAW=1`, target
//! `http.raw`) elides inline image data and caps what is left. The
//! `Authorization` header is always redacted.
//!
//! Every request is sent exactly once. A failed round-trip is reported to the
//! caller, which decides whether the run can continue.
//!
//! ```no_run
//! # async fn demo() -> Result<(), steer_http::HttpError> {
//! let client = steer_http::HttpClient::new("http://localhost:8000/")?;
//! let events: serde_json::Value = client
//!     .post_json("run", &serde_json::json!({}), steer_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, trace, warn};

const RAW_ENV: &str = "STEER_HTTP_RAW";
const RAW_BODY_CAP: usize = 64 * 1024;
/// Strings longer than this under an `inline_data` object are elided from traces.
const INLINE_DATA_KEEP: usize = 64;
const SNIPPET_CAP: usize = 500;

static SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("could not build request: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("could not decode response: {message} (body: {snippet})")]
    Decode { message: String, snippet: String },
    #[error("server answered {status}: {message} (request id {request_id})")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

impl HttpError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// How a request authenticates.
#[derive(Clone, Copy, Debug)]
pub enum Auth<'a> {
    Bearer(&'a str),
    None,
}

/// Per-request overrides of the client defaults.
///
/// ```
/// use steer_http::{Auth, RequestOpts};
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(30)),
///     auth: Some(Auth::Bearer("token")),
///     ..Default::default()
/// };
/// assert!(matches!(opts.auth, Some(Auth::Bearer("token"))));
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub auth: Option<Auth<'a>>,
}

/// Why a request did not produce a success body.
enum Failure {
    Network(String),
    Status {
        status: StatusCode,
        headers: HeaderMap,
        body: Vec<u8>,
    },
}

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub default_timeout: Duration,
}

impl HttpClient {
    /// A client resolving relative paths against `base`.
    ///
    /// Keep a trailing slash on `base` when it has a path component, or the
    /// last segment is replaced on join.
    ///
    /// ```no_run
    /// use steer_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("http://localhost:8000/")?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(15));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_timeout: Duration::from_secs(15),
        })
    }

    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    /// POST a JSON body and decode the JSON reply.
    pub async fn post_json<B, T>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = encode_body(body)?;
        let bytes = self.execute(Method::POST, path, Some(body), opts).await?;
        decode_json(&bytes)
    }

    /// POST a JSON body; only the status matters.
    pub async fn post_status<B>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<(), HttpError>
    where
        B: Serialize + ?Sized,
    {
        let body = encode_body(body)?;
        self.execute(Method::POST, path, Some(body), opts).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str, opts: RequestOpts<'_>) -> Result<(), HttpError> {
        self.execute(Method::DELETE, path, None, opts).await?;
        Ok(())
    }

    /// Send one request; returns the body of a 2xx response.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        opts: RequestOpts<'_>,
    ) -> Result<Vec<u8>, HttpError> {
        let url = self
            .base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))?;
        let token = match opts.auth {
            Some(Auth::Bearer(raw)) => Some(clean_token(raw)?),
            Some(Auth::None) | None => None,
        };
        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let id = SEQ.fetch_add(1, Ordering::Relaxed);

        if raw_enabled() {
            debug!(
                target: "http.raw",
                id,
                %method,
                %url,
                body = %body.as_deref().map(trace_body).unwrap_or_default(),
                "request"
            );
        }

        debug!(
            target: "http",
            id,
            %method,
            path = url.path(),
            timeout_ms = timeout.as_millis() as u64,
            bearer = token.is_some(),
            body_len = body.as_ref().map_or(0, Vec::len),
            "sending"
        );
        self.send(&method, &url, body, token.as_deref(), timeout, id)
            .await
            .map_err(|failure| into_error(failure, id))
    }

    async fn send(
        &self,
        method: &Method,
        url: &Url,
        body: Option<Vec<u8>>,
        token: Option<&str>,
        timeout: Duration,
        id: u64,
    ) -> Result<Vec<u8>, Failure> {
        let mut rb = self
            .inner
            .request(method.clone(), url.clone())
            .timeout(timeout);
        if let Some(bytes) = body {
            rb = rb
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(bytes);
        }
        if let Some(token) = token {
            rb = rb.bearer_auth(token);
        }

        let started = Instant::now();
        let resp = rb.send().await.map_err(|e| Failure::Network(e.to_string()))?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Failure::Network(e.to_string()))?
            .to_vec();

        debug!(
            target: "http",
            id,
            %status,
            duration_ms = started.elapsed().as_millis() as u64,
            body_len = bytes.len(),
            request_id = request_id(&headers),
            "response"
        );
        if raw_enabled() {
            debug!(
                target: "http.raw",
                id,
                %status,
                headers = ?redact_headers(&headers),
                body = %trace_body(&bytes),
                "response"
            );
        }

        if status.is_success() {
            trace!(target: "http", id, body = %snip_body(&bytes), "success body");
            Ok(bytes)
        } else {
            Err(Failure::Status {
                status,
                headers,
                body: bytes,
            })
        }
    }
}

fn into_error(failure: Failure, id: u64) -> HttpError {
    match failure {
        Failure::Network(message) => {
            warn!(target: "http", id, %message, "network failure");
            HttpError::Network(message)
        }
        Failure::Status {
            status,
            headers,
            body,
        } => {
            let message = extract_error_message(&body);
            let request_id = request_id(&headers).to_string();
            warn!(target: "http", id, %status, %message, %request_id, "request failed");
            HttpError::Api {
                status,
                message,
                request_id,
            }
        }
    }
}

fn raw_enabled() -> bool {
    matches!(
        std::env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

fn encode_body<B: Serialize + ?Sized>(body: &B) -> Result<Vec<u8>, HttpError> {
    serde_json::to_vec(body).map_err(|e| HttpError::Build(e.to_string()))
}

fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, HttpError> {
    serde_json::from_slice(bytes).map_err(|e| {
        let snippet = snip_body(bytes);
        warn!(
            target: "http",
            line = e.line(),
            column = e.column(),
            error = %e,
            body = %snippet,
            "response is not the expected JSON"
        );
        HttpError::Decode {
            message: e.to_string(),
            snippet,
        }
    })
}

fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get("x-request-id")
        .or_else(|| headers.get("x-correlation-id"))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
}

fn redact_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(k, v)| {
            let value = if k.as_str().eq_ignore_ascii_case("authorization") {
                "<redacted>".to_string()
            } else {
                v.to_str().unwrap_or("<binary>").to_string()
            };
            (k.as_str().to_string(), value)
        })
        .collect()
}

/// Render a body for the raw trace with inline image data elided.
fn trace_body(bytes: &[u8]) -> String {
    let mut text = match serde_json::from_slice::<Value>(bytes) {
        Ok(mut value) => {
            elide_inline_data(&mut value, false);
            value.to_string()
        }
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    };
    if text.len() > RAW_BODY_CAP {
        truncate_at_char_boundary(&mut text, RAW_BODY_CAP);
        text.push_str("...");
    }
    text
}

fn elide_inline_data(value: &mut Value, inside_inline: bool) {
    match value {
        Value::String(s) if inside_inline && s.len() > INLINE_DATA_KEEP => {
            *s = format!("<{} base64 chars>", s.len());
        }
        Value::Array(items) => items
            .iter_mut()
            .for_each(|v| elide_inline_data(v, inside_inline)),
        Value::Object(map) => {
            for (key, v) in map.iter_mut() {
                elide_inline_data(v, inside_inline || key == "inline_data");
            }
        }
        _ => {}
    }
}

/// A readable message from an error body.
///
/// Understands `{"error":{"message":..}}`, FastAPI's `{"detail": ..}` (string
/// or validation list) and plain `{"message"|"error": ..}`; falls back to a
/// body snippet.
fn extract_error_message(body: &[u8]) -> String {
    #[derive(Deserialize, Default)]
    #[serde(default)]
    struct ErrorBody {
        message: Option<String>,
        detail: Value,
        error: Value,
    }

    let Ok(parsed) = serde_json::from_slice::<ErrorBody>(body) else {
        return snip_body(body);
    };
    if let Some(nested) = parsed.error.get("message").and_then(Value::as_str) {
        return nested.to_string();
    }
    if let Some(m) = parsed.message.filter(|m| !m.is_empty()) {
        return m;
    }
    match parsed.detail {
        Value::String(s) if !s.is_empty() => return s,
        Value::Null | Value::String(_) => {}
        other => return other.to_string(),
    }
    match parsed.error {
        Value::String(s) if !s.is_empty() => s,
        _ => snip_body(body),
    }
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).into_owned();
    if snip.len() > SNIPPET_CAP {
        truncate_at_char_boundary(&mut snip, SNIPPET_CAP);
        snip.push_str("...");
    }
    snip
}

fn truncate_at_char_boundary(s: &mut String, max: usize) {
    let mut cut = max.min(s.len());
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
}

/// Strip quotes and whitespace pasted along with a token, then make sure the
/// rest is a valid header value.
fn clean_token(raw: &str) -> Result<String, HttpError> {
    let token: String = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if !token.is_ascii() {
        return Err(HttpError::Build("API token contains non-ASCII characters".into()));
    }
    if token.bytes().any(|b| b.is_ascii_control()) {
        return Err(HttpError::Build("API token contains control characters".into()));
    }
    HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| HttpError::Build(format!("invalid Authorization header: {e}")))?;
    Ok(token)
}
