//! Shared request/response types.

use std::{fmt, sync::OnceLock, time::Duration};

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use url::Url;

use crate::error::{Error, Result};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

pub(crate) const NO_RESPONSE_MESSAGE: &str = "Internal Error Or Request Timeout";
pub(crate) const TIMEOUT_MESSAGE: &str = "Request Timeout";

/// One HTTP request, built once per logical call.
///
/// Later header writes replace earlier ones with the same name. The only
/// mutation after construction is the `User-Agent` overwrite done at
/// dispatch time.
#[derive(Clone, Debug)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Bytes,
    timeout: Duration,
}

impl Request {
    /// Creates a request from a method name, which is upper-cased and must be
    /// `GET` or `POST`.
    pub fn new(method: impl AsRef<str>, url: Url) -> Result<Self> {
        let method = match method.as_ref().to_ascii_uppercase().as_str() {
            "GET" => Method::GET,
            "POST" => Method::POST,
            other => {
                return Err(Error::invalid_config(format!(
                    "unsupported request method: {other}"
                )));
            }
        };
        Ok(Self::with_method(method, url))
    }

    /// Creates a `GET` request with an empty body.
    pub fn get(url: Url) -> Self {
        Self::with_method(Method::GET, url)
    }

    /// Creates a `POST` request carrying `body`.
    pub fn post(url: Url, body: impl Into<Bytes>) -> Self {
        let mut req = Self::with_method(Method::POST, url);
        req.body = body.into();
        req
    }

    fn with_method(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets a header, replacing any previous value.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Merges `headers` in. Each name present in `headers` replaces all
    /// earlier values of that name and keeps every value it carries.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        let mut current: Option<HeaderName> = None;
        for (name, value) in headers {
            match name {
                Some(name) => {
                    self.headers.insert(name.clone(), value);
                    current = Some(name);
                }
                None => {
                    if let Some(name) = &current {
                        self.headers.append(name.clone(), value);
                    }
                }
            }
        }
        self
    }

    /// Sets the body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the timeout; must be at least one millisecond.
    pub fn timeout(mut self, timeout: Duration) -> Result<Self> {
        if timeout.as_millis() == 0 {
            return Err(Error::invalid_config("timeout must be a positive number of milliseconds"));
        }
        self.timeout = timeout;
        Ok(self)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn header_map(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body_bytes(&self) -> &Bytes {
        &self.body
    }

    pub fn timeout_duration(&self) -> Duration {
        self.timeout
    }

    pub(crate) fn set_user_agent(&mut self, value: HeaderValue) {
        self.headers.insert(http::header::USER_AGENT, value);
    }
}

/// Why a response is not a success.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Failure {
    /// No response within the request timeout.
    Timeout,
    /// Connection, protocol, DNS, or TLS failure.
    Fault,
    /// The transport produced nothing and gave no reason.
    NoResponse,
    /// The service answered with a non-2xx status.
    Application,
}

/// Normalized outcome of one dispatched request.
///
/// `status_code` is `-1` when no HTTP response was obtained; `error` then
/// carries the failure detail.
#[derive(Clone)]
pub struct Response {
    status_code: i32,
    duration: f64,
    headers: HeaderMap,
    body: Option<Bytes>,
    error: Option<String>,
    transport_failure: Option<Failure>,
    json: OnceLock<Option<serde_json::Value>>,
}

impl Response {
    /// Creates a response for an HTTP answer.
    pub fn new(status_code: i32, duration: f64, headers: HeaderMap, body: Option<Bytes>) -> Self {
        Self {
            status_code,
            duration,
            headers,
            body,
            error: None,
            transport_failure: None,
            json: OnceLock::new(),
        }
    }

    pub(crate) fn timeout(duration: f64) -> Self {
        Self::failed(duration, Failure::Timeout, TIMEOUT_MESSAGE.to_string())
    }

    pub(crate) fn no_response(duration: f64) -> Self {
        Self::failed(duration, Failure::NoResponse, NO_RESPONSE_MESSAGE.to_string())
    }

    pub(crate) fn fault(duration: f64, message: String) -> Self {
        Self::failed(duration, Failure::Fault, message)
    }

    fn failed(duration: f64, failure: Failure, message: String) -> Self {
        Self {
            status_code: -1,
            duration,
            headers: HeaderMap::new(),
            body: None,
            error: Some(message),
            transport_failure: Some(failure),
            json: OnceLock::new(),
        }
    }

    /// Returns true iff `200 <= status_code < 300`.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn status_code(&self) -> i32 {
        self.status_code
    }

    /// Elapsed seconds from dispatch start to outcome, millisecond precision.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Transport failure detail, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Classifies a non-success response.
    pub fn failure(&self) -> Option<Failure> {
        if let Some(failure) = self.transport_failure {
            return Some(failure);
        }
        if self.ok() {
            None
        } else {
            Some(Failure::Application)
        }
    }

    /// Decodes the body as JSON on first use.
    ///
    /// Returns `None` for an absent, empty, or malformed body; never fails.
    pub fn json(&self) -> Option<&serde_json::Value> {
        self.json
            .get_or_init(|| {
                let body = self.body.as_ref().filter(|b| !b.is_empty())?;
                serde_json::from_slice(body).ok()
            })
            .as_ref()
    }

    /// Decodes the body into `T`, `None` when it does not fit.
    pub fn json_as<T: DeserializeOwned>(&self) -> Option<T> {
        self.json()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Body as UTF-8 text, `None` when absent or not valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        self.body
            .as_ref()
            .and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Request id assigned by the service (`X-Reqid`).
    pub fn request_id(&self) -> Option<&str> {
        self.headers.get("x-reqid").and_then(|v| v.to_str().ok())
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status_code", &self.status_code)
            .field("duration", &self.duration)
            .field("headers", &self.headers)
            .field("body_len", &self.body.as_ref().map(Bytes::len))
            .field("error", &self.error)
            .finish()
    }
}

/// Metadata of a stored file.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct FileInfo {
    /// Key, present in listings only.
    pub key: Option<String>,
    pub hash: String,
    pub fsize: u64,
    pub mime_type: String,
    /// Upload time in units of 100 nanoseconds since the epoch.
    pub put_time: i64,
    /// Storage class: 0 standard, 1 infrequent access, 2 archive.
    #[serde(rename = "type")]
    pub file_type: i32,
    pub end_user: Option<String>,
}

/// One page of a file listing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListFilesOutput {
    pub items: Vec<FileInfo>,
    /// Marker for the next page, `None` once the listing is exhausted.
    pub marker: Option<String>,
    pub common_prefixes: Vec<String>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct ListFilesBody {
    pub(crate) items: Vec<FileInfo>,
    pub(crate) marker: Option<String>,
    pub(crate) common_prefixes: Vec<String>,
}

impl From<ListFilesBody> for ListFilesOutput {
    fn from(body: ListFilesBody) -> Self {
        Self {
            items: body.items,
            marker: body.marker.filter(|m| !m.is_empty()),
            common_prefixes: body.common_prefixes,
        }
    }
}

/// Per-operation outcome of a batch request, aligned with the submitted ops.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct BatchItem {
    pub code: i32,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl BatchItem {
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// Error message reported for this operation, if any.
    pub fn error(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.get("error"))
            .and_then(|v| v.as_str())
    }
}

/// Result of fetching a remote URL into a bucket.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct FetchOutput {
    pub key: String,
    pub hash: String,
    pub fsize: u64,
    pub mime_type: String,
}

/// Result of a form upload.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct PutOutput {
    pub key: Option<String>,
    pub hash: String,
    pub persistent_id: Option<String>,
}

/// Result of a CDN refresh submission.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct RefreshOutput {
    pub code: i32,
    pub error: String,
    pub request_id: Option<String>,
    pub invalid_urls: Option<Vec<String>>,
    pub url_quota_day: Option<i64>,
    pub url_surplus_day: Option<i64>,
}

/// Status of an asynchronous persistent processing job.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct PfopStatus {
    pub id: String,
    /// 0 success, 1 waiting, 2 processing, 3 failed, 4 callback failed.
    pub code: i32,
    pub desc: String,
    pub input_key: String,
    pub input_bucket: String,
    pub pipeline: Option<String>,
    pub reqid: Option<String>,
    pub items: Vec<PfopItem>,
}

impl PfopStatus {
    /// True while the job is waiting or running.
    pub fn is_pending(&self) -> bool {
        matches!(self.code, 1 | 2)
    }
}

/// One command of a persistent processing job.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PfopItem {
    pub cmd: String,
    pub code: i32,
    pub desc: String,
    pub error: Option<String>,
    pub hash: Option<String>,
    pub key: Option<String>,
    #[serde(rename = "returnOld")]
    pub return_old: i32,
}

/// Result of a synchronous processing request.
#[derive(Clone, Debug, PartialEq)]
pub enum FopOutput {
    /// The body decoded as JSON.
    Json(serde_json::Value),
    /// Any other body, returned as-is.
    Raw(Bytes),
}

/// Policy embedded in an upload token.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadPolicy {
    scope: String,
    deadline: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    insert_only: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    return_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    persistent_ops: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    persistent_notify_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    persistent_pipeline: Option<String>,
}

impl UploadPolicy {
    /// Policy allowing uploads into `bucket` (or overwriting `bucket:key`)
    /// until `expires_in` from now.
    pub fn new(bucket: &str, key: Option<&str>, expires_in: Duration) -> Self {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        let expires = i64::try_from(expires_in.as_secs()).unwrap_or(i64::MAX);
        Self::with_deadline(bucket, key, now.saturating_add(expires))
    }

    /// Policy with an absolute unix-seconds deadline.
    pub fn with_deadline(bucket: &str, key: Option<&str>, deadline: i64) -> Self {
        Self {
            scope: crate::batch::entry(bucket, key),
            deadline,
            insert_only: None,
            return_body: None,
            persistent_ops: None,
            persistent_notify_url: None,
            persistent_pipeline: None,
        }
    }

    /// Refuse to overwrite existing keys.
    pub fn insert_only(mut self) -> Self {
        self.insert_only = Some(1);
        self
    }

    pub fn return_body(mut self, template: impl Into<String>) -> Self {
        self.return_body = Some(template.into());
        self
    }

    /// Processing commands to queue after upload, joined with `;`.
    pub fn persistent_ops<I, S>(mut self, ops: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = ops
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(";");
        self.persistent_ops = Some(joined);
        self
    }

    pub fn persistent_notify_url(mut self, url: impl Into<String>) -> Self {
        self.persistent_notify_url = Some(url.into());
        self
    }

    pub fn persistent_pipeline(mut self, pipeline: impl Into<String>) -> Self {
        self.persistent_pipeline = Some(pipeline.into());
        self
    }

    pub fn deadline(&self) -> i64 {
        self.deadline
    }

    pub(crate) fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::signing(format!("failed to encode upload policy: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_response(status: i32, body: &'static str) -> Response {
        Response::new(
            status,
            0.0,
            HeaderMap::new(),
            Some(Bytes::from_static(body.as_bytes())),
        )
    }

    #[test]
    fn ok_covers_2xx_only() {
        for code in [200, 201, 298, 299] {
            assert!(body_response(code, "").ok(), "{code}");
        }
        for code in [-1, 0, 199, 300, 404, 500, 612] {
            assert!(!body_response(code, "").ok(), "{code}");
        }
    }

    #[test]
    fn json_returns_none_on_bad_input() {
        for body in ["", "not json", "{"] {
            assert!(body_response(200, body).json().is_none(), "{body:?}");
        }
        let resp = Response::new(200, 0.0, HeaderMap::new(), None);
        assert!(resp.json().is_none());
    }

    #[test]
    fn json_decodes_lazily() {
        let resp = body_response(200, r#"{"hash":"Fh","fsize":3}"#);
        assert_eq!(resp.json().unwrap()["fsize"], 3);

        let info: FileInfo = resp.json_as().unwrap();
        assert_eq!(info.hash, "Fh");
        assert_eq!(info.fsize, 3);

        let cloned = resp.clone();
        assert_eq!(cloned.json(), resp.json());
    }

    #[test]
    fn failure_classification() {
        assert_eq!(Response::timeout(0.0).failure(), Some(Failure::Timeout));
        assert_eq!(
            Response::no_response(0.0).failure(),
            Some(Failure::NoResponse)
        );
        assert_eq!(
            Response::fault(0.0, "dns".to_string()).failure(),
            Some(Failure::Fault)
        );
        assert_eq!(body_response(612, "").failure(), Some(Failure::Application));
        assert_eq!(body_response(200, "").failure(), None);

        let resp = Response::no_response(0.0);
        assert_eq!(resp.status_code(), -1);
        assert_eq!(resp.error(), Some("Internal Error Or Request Timeout"));
        assert!(resp.body().is_none());
    }

    #[test]
    fn request_method_is_normalized() {
        let url = Url::parse("https://rs.example.com/buckets").unwrap();
        let req = Request::new("post", url.clone()).unwrap();
        assert_eq!(req.method(), &Method::POST);
        assert_eq!(req.timeout_duration(), DEFAULT_TIMEOUT);
        assert!(Request::new("PUT", url.clone()).is_err());
        assert!(Request::get(url).timeout(Duration::ZERO).is_err());
    }

    #[test]
    fn later_header_writes_win() {
        let url = Url::parse("https://rs.example.com/buckets").unwrap();
        let mut extra = HeaderMap::new();
        extra.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        let req = Request::get(url)
            .header(
                http::header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain"),
            )
            .headers(extra);
        assert_eq!(
            req.header_map()[http::header::CONTENT_TYPE],
            "application/json"
        );
    }

    #[test]
    fn merged_headers_keep_repeated_values() {
        let url = Url::parse("https://rs.example.com/buckets").unwrap();
        let mut extra = HeaderMap::new();
        extra.append("x-qn-meta", HeaderValue::from_static("a"));
        extra.append("x-qn-meta", HeaderValue::from_static("b"));
        extra.insert(http::header::AUTHORIZATION, HeaderValue::from_static("QBox k:s"));

        let req = Request::get(url)
            .header(
                HeaderName::from_static("x-qn-meta"),
                HeaderValue::from_static("old"),
            )
            .headers(extra);

        let values: Vec<_> = req.header_map().get_all("x-qn-meta").iter().collect();
        assert_eq!(values, ["a", "b"]);
        assert_eq!(req.header_map()[http::header::AUTHORIZATION], "QBox k:s");
    }

    #[test]
    fn list_body_drops_empty_marker() {
        let body: ListFilesBody =
            serde_json::from_str(r#"{"marker":"","items":[{"key":"a","hash":"h"}]}"#).unwrap();
        let out = ListFilesOutput::from(body);
        assert_eq!(out.marker, None);
        assert_eq!(out.items[0].key.as_deref(), Some("a"));
    }

    #[test]
    fn upload_policy_serializes_camel_case() {
        let policy = UploadPolicy::with_deadline("photos", Some("a.jpg"), 1_700_000_000)
            .insert_only()
            .persistent_ops(["avthumb/mp4", "vframe/jpg/offset/1"]);
        assert_eq!(
            policy.to_json().unwrap(),
            r#"{"scope":"photos:a.jpg","deadline":1700000000,"insertOnly":1,"persistentOps":"avthumb/mp4;vframe/jpg/offset/1"}"#
        );
    }
}
