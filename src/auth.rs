use std::{fmt, sync::Arc, time::Duration};

use http::HeaderMap;
use time::OffsetDateTime;
use url::Url;

use crate::{error::Error, types::UploadPolicy};

/// Produces authorization for outgoing requests.
///
/// Implementations compute the signature; the client only merges the
/// returned headers with its own, letting its `Content-Type` win.
pub trait Signer: Send + Sync {
    /// Returns the headers that authorize a request for `url` with `body`.
    fn sign(&self, url: &Url, body: &[u8], content_type: Option<&str>) -> Result<HeaderMap, Error>;

    /// Returns a time-limited download URL for a private resource.
    fn private_download_url(&self, url: &str, expires_in: Duration) -> Result<String, Error>;
}

/// Access/secret key pair.
#[derive(Clone)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl Credentials {
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Result<Self, Error> {
        let access_key = access_key.into();
        let secret_key = secret_key.into();

        if access_key.trim().is_empty() {
            return Err(Error::invalid_config("access_key must not be empty"));
        }
        if secret_key.trim().is_empty() {
            return Err(Error::invalid_config("secret_key must not be empty"));
        }

        Ok(Self {
            access_key,
            secret_key,
        })
    }

    /// Issues an upload token for `policy`.
    pub fn upload_token(&self, policy: &UploadPolicy) -> Result<String, Error> {
        crate::util::signing::upload_token(self, policy)
    }
}

impl Signer for Credentials {
    fn sign(&self, url: &Url, body: &[u8], content_type: Option<&str>) -> Result<HeaderMap, Error> {
        crate::util::signing::sign_request(self, url, body, content_type)
    }

    fn private_download_url(&self, url: &str, expires_in: Duration) -> Result<String, Error> {
        let expires = i64::try_from(expires_in.as_secs())
            .map_err(|_| Error::invalid_config("expires_in is too large"))?;
        let deadline = OffsetDateTime::now_utc()
            .unix_timestamp()
            .saturating_add(expires);
        crate::util::signing::private_download_url(self, url, deadline)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field(
                "access_key",
                &crate::util::text::redact_value(&self.access_key),
            )
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// How requests are authorized.
#[non_exhaustive]
#[derive(Clone)]
pub enum Auth {
    /// No authorization headers; only unsigned endpoints work.
    Anonymous,
    /// QBox signing with a key pair.
    Static(Credentials),
    /// A caller-supplied signer.
    Custom(Arc<dyn Signer>),
}

impl Auth {
    /// Reads `QINIU_ACCESS_KEY` and `QINIU_SECRET_KEY`.
    pub fn from_env() -> Result<Self, Error> {
        let access_key = std::env::var("QINIU_ACCESS_KEY")
            .map_err(|_| Error::invalid_config("missing QINIU_ACCESS_KEY"))?;
        let secret_key = std::env::var("QINIU_SECRET_KEY")
            .map_err(|_| Error::invalid_config("missing QINIU_SECRET_KEY"))?;

        Ok(Self::Static(Credentials::new(access_key, secret_key)?))
    }

    pub fn custom(signer: impl Signer + 'static) -> Self {
        Self::Custom(Arc::new(signer))
    }

    pub(crate) fn signer(&self) -> Option<&dyn Signer> {
        match self {
            Self::Anonymous => None,
            Self::Static(creds) => Some(creds),
            Self::Custom(signer) => Some(signer.as_ref()),
        }
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Static(creds) => f.debug_tuple("Static").field(creds).finish(),
            Self::Custom(_) => f.debug_tuple("Custom").field(&"<signer>").finish(),
        }
    }
}
