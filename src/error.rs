use std::{error::Error as StdError, fmt};

use crate::types::Response;

/// Library result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Longest body excerpt carried in an error message.
const MAX_MESSAGE_LEN: usize = 4096;

/// Error type for request building, transport, and API responses.
#[non_exhaustive]
pub enum Error {
    /// Invalid configuration or parameters.
    InvalidConfig { message: String },

    /// Request signing failed.
    Signing { message: String },

    /// The service answered with a non-2xx status, or no HTTP response was
    /// obtained at all (`code == -1`: timeout, transport fault, no response).
    Api {
        url: String,
        code: i32,
        message: String,
        request_id: Option<String>,
    },

    /// A successful response body did not have the expected shape.
    Decode {
        message: String,
        source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    },
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { message } => f
                .debug_struct("InvalidConfig")
                .field("message", message)
                .finish(),
            Self::Signing { message } => {
                f.debug_struct("Signing").field("message", message).finish()
            }
            Self::Api {
                url,
                code,
                message,
                request_id,
            } => f
                .debug_struct("Api")
                .field("url", url)
                .field("code", code)
                .field("message", message)
                .field("request_id", request_id)
                .finish(),
            Self::Decode { message, source } => f
                .debug_struct("Decode")
                .field("message", message)
                .field("source", source)
                .finish(),
        }
    }
}

impl Error {
    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates a signing error.
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }

    /// Creates a decode error with optional source.
    pub fn decode(
        message: impl Into<String>,
        source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    ) -> Self {
        Self::Decode {
            message: message.into(),
            source,
        }
    }

    /// Normalizes a failed response into an [`Error::Api`].
    ///
    /// The message is taken from the JSON `error` field when present, then
    /// from the raw body text, then from the transport failure detail, and
    /// finally from the status reason, so it is never empty.
    pub fn from_response(url: impl Into<String>, response: &Response) -> Self {
        Self::Api {
            url: url.into(),
            code: response.status_code(),
            message: response_message(response),
            request_id: response.request_id().map(str::to_string),
        }
    }

    /// Returns the service status code, `-1` when no response was obtained.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Api { code, .. } => Some(*code),
            Self::InvalidConfig { .. } | Self::Signing { .. } | Self::Decode { .. } => None,
        }
    }

    /// Returns the URL of the failed request.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Api { url, .. } => Some(url),
            Self::InvalidConfig { .. } | Self::Signing { .. } | Self::Decode { .. } => None,
        }
    }

    /// Returns the request id if reported by the service.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Api { request_id, .. } => request_id.as_deref(),
            Self::InvalidConfig { .. } | Self::Signing { .. } | Self::Decode { .. } => None,
        }
    }

    /// Returns true if repeating the request may succeed.
    ///
    /// The client never retries on its own; callers should only act on this
    /// for idempotent operations such as `stat` or `list`.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api { code, .. } => *code == -1 || (500..600).contains(code),
            Self::InvalidConfig { .. } | Self::Signing { .. } | Self::Decode { .. } => false,
        }
    }
}

fn response_message(response: &Response) -> String {
    if let Some(message) = response
        .json()
        .and_then(|v| v.get("error"))
        .and_then(|v| v.as_str())
        .filter(|v| !v.is_empty())
    {
        return message.to_string();
    }

    if let Some(text) = response.text().filter(|t| !t.trim().is_empty()) {
        return crate::util::text::truncate_snippet(text.trim(), MAX_MESSAGE_LEN);
    }

    if let Some(error) = response.error().filter(|e| !e.is_empty()) {
        return error.to_string();
    }

    u16::try_from(response.status_code())
        .ok()
        .and_then(|code| http::StatusCode::from_u16(code).ok())
        .and_then(|status| status.canonical_reason())
        .unwrap_or("unknown error")
        .to_string()
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { message } => write!(f, "invalid config: {message}"),
            Self::Signing { message } => write!(f, "signing error: {message}"),
            Self::Api {
                url,
                code,
                message,
                request_id,
            } => {
                write!(f, "api error: {code} ({message}) url={url}")?;
                match request_id.as_deref() {
                    Some(v) if !v.is_empty() => write!(f, " request_id={v}"),
                    _ => Ok(()),
                }
            }
            Self::Decode { message, .. } => write!(f, "decode error: {message}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Decode { source, .. } => {
                source.as_deref().map(|e| e as &(dyn StdError + 'static))
            }
            Self::InvalidConfig { .. } | Self::Signing { .. } | Self::Api { .. } => None,
        }
    }
}
