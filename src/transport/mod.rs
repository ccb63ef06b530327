//! Request dispatch over a pluggable HTTP transport.

use std::{any::Any, fmt, panic::AssertUnwindSafe, time::Instant};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::FutureExt as _;
use http::{HeaderMap, HeaderValue};

use crate::{
    error::{Error, Result},
    types::{Request, Response},
};

pub(crate) mod async_transport;

pub use async_transport::ReqwestTransport;

/// HTTP answer as produced by a transport.
#[derive(Clone, Debug)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Transport-level failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// The transport gave up waiting.
    Timeout,
    /// Any other failure, with a human-readable message.
    Fault(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("timeout"),
            Self::Fault(message) => f.write_str(message),
        }
    }
}

/// Executes one HTTP request.
///
/// `Ok(None)` means the transport produced no result and no reason.
#[async_trait]
pub trait HttpSend: Send + Sync {
    async fn send(
        &self,
        request: &Request,
    ) -> std::result::Result<Option<RawResponse>, TransportError>;
}

/// `<sdk>/<ver> (<os>/<arch>) Rust/<rustc-ver>`, where the last slot is the
/// compiler the crate was built with.
pub(crate) fn default_user_agent() -> String {
    let runtime_version = option_env!("KODO_RUSTC_VERSION")
        .filter(|v| !v.is_empty())
        .unwrap_or("unknown");
    format!(
        "KodoRust/{} ({}/{}) Rust/{}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH,
        runtime_version
    )
}

pub(crate) fn user_agent_header(user_agent: Option<&str>) -> Result<HeaderValue> {
    let value = match user_agent {
        Some(ua) => ua.to_string(),
        None => default_user_agent(),
    };
    HeaderValue::from_str(&value).map_err(|_| Error::invalid_config("invalid User-Agent value"))
}

enum Outcome {
    Answered(RawResponse),
    Timeout,
    Fault(String),
    NoResponse,
}

/// Sends `request` and folds every outcome into one [`Response`].
///
/// Never fails: timeouts, transport faults, an empty transport result, and
/// a panicking transport all become `status_code == -1` responses. The
/// request timeout is enforced here as well as in the transport.
pub(crate) async fn dispatch(
    transport: &dyn HttpSend,
    mut request: Request,
    user_agent: &HeaderValue,
) -> Response {
    let start = Instant::now();
    request.set_user_agent(user_agent.clone());

    let timeout = request.timeout_duration();
    let send = tokio::time::timeout(timeout, transport.send(&request));
    let outcome = match AssertUnwindSafe(send).catch_unwind().await {
        Ok(Ok(Ok(Some(raw)))) => Outcome::Answered(raw),
        Ok(Ok(Ok(None))) => Outcome::NoResponse,
        Ok(Ok(Err(TransportError::Timeout))) | Ok(Err(_)) => Outcome::Timeout,
        Ok(Ok(Err(TransportError::Fault(message)))) => Outcome::Fault(message),
        Err(panic) => Outcome::Fault(panic_message(panic)),
    };
    let duration = round_duration(start);

    #[cfg(feature = "metrics")]
    record_metrics(request.method(), &outcome, duration);

    match outcome {
        Outcome::Answered(raw) => {
            #[cfg(feature = "tracing")]
            tracing::debug!(status = raw.status, duration, "request completed");
            Response::new(i32::from(raw.status), duration, raw.headers, Some(raw.body))
        }
        Outcome::Timeout => {
            #[cfg(feature = "tracing")]
            tracing::warn!(kind = "timeout", duration, "request failed");
            Response::timeout(duration)
        }
        Outcome::Fault(message) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(kind = "fault", error = %message, duration, "request failed");
            Response::fault(duration, message)
        }
        Outcome::NoResponse => {
            #[cfg(feature = "tracing")]
            tracing::warn!(kind = "no_response", duration, "request failed");
            Response::no_response(duration)
        }
    }
}

/// Seconds since `start`, rounded to milliseconds and never reported as zero.
fn round_duration(start: Instant) -> f64 {
    let secs = (start.elapsed().as_secs_f64() * 1000.0).round() / 1000.0;
    secs.max(0.001)
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    if let Some(s) = panic.downcast_ref::<String>() {
        return s.clone();
    }
    "transport panicked".to_string()
}

#[cfg(feature = "metrics")]
fn record_metrics(method: &http::Method, outcome: &Outcome, duration: f64) {
    let method = method_label(method);
    match outcome {
        Outcome::Answered(raw) => {
            metrics::counter!(
                "kodo_http_requests_total",
                "method" => method,
                "class" => status_class(raw.status),
            )
            .increment(1);
        }
        Outcome::Timeout => {
            metrics::counter!("kodo_http_errors_total", "method" => method, "kind" => "timeout")
                .increment(1);
        }
        Outcome::Fault(_) => {
            metrics::counter!("kodo_http_errors_total", "method" => method, "kind" => "fault")
                .increment(1);
        }
        Outcome::NoResponse => {
            metrics::counter!("kodo_http_errors_total", "method" => method, "kind" => "no_response")
                .increment(1);
        }
    }
    metrics::histogram!("kodo_http_request_duration_seconds", "method" => method).record(duration);
}

#[cfg(feature = "metrics")]
fn status_class(status: u16) -> &'static str {
    match status {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}

#[cfg(feature = "metrics")]
fn method_label(method: &http::Method) -> &'static str {
    match method.as_str() {
        "GET" => "GET",
        "POST" => "POST",
        _ => "OTHER",
    }
}
