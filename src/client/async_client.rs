use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use http::{HeaderValue, Method};
use url::Url;

use crate::{
    api,
    auth::{Auth, Signer},
    config::{Config, Hosts, Zone},
    error::{Error, Result},
    transport::{self, HttpSend, ReqwestTransport},
    types::{Request, Response},
    util::multipart::MultipartForm,
};

/// Async client. Cheap to clone; clones share configuration and transport.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

pub struct ClientBuilder {
    config: Option<Config>,
    zone: Zone,
    use_https: bool,
    hosts: Option<Hosts>,
    auth: Auth,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    transport: Option<Arc<dyn HttpSend>>,
}

struct Inner {
    config: Config,
    auth: Auth,
    transport: Arc<dyn HttpSend>,
    user_agent: HeaderValue,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Bucket and resource management.
    pub fn buckets(&self) -> api::BucketsService {
        api::BucketsService::new(self.clone())
    }

    /// Form uploads.
    pub fn uploads(&self) -> api::UploadsService {
        api::UploadsService::new(self.clone())
    }

    /// Media processing.
    pub fn processing(&self) -> api::ProcessingService {
        api::ProcessingService::new(self.clone())
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub(crate) fn hosts(&self) -> &Hosts {
        &self.inner.config.hosts
    }

    pub(crate) fn signer(&self) -> Option<&dyn Signer> {
        self.inner.auth.signer()
    }

    /// Builds a request authorized by the configured signer.
    ///
    /// Signer headers go in first; `Content-Type` is written last so it
    /// always wins.
    pub(crate) fn signed_request(
        &self,
        method: Method,
        url: Url,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<Request> {
        let mut req = self.unsigned_request(method, url, body)?;
        if let Some(signer) = self.signer() {
            let headers = signer.sign(req.url(), req.body_bytes(), content_type)?;
            req = req.headers(headers);
        }
        if let Some(ct) = content_type {
            let value = HeaderValue::from_str(ct)
                .map_err(|_| Error::invalid_config("invalid Content-Type header"))?;
            req = req.header(http::header::CONTENT_TYPE, value);
        }
        Ok(req)
    }

    pub(crate) fn unsigned_request(
        &self,
        method: Method,
        url: Url,
        body: Bytes,
    ) -> Result<Request> {
        let req = if method == Method::POST {
            Request::post(url, body)
        } else {
            Request::new(method.as_str(), url)?.body(body)
        };
        req.timeout(self.inner.config.timeout)
    }

    /// Builds a multipart `POST`; the form itself carries any credentials.
    pub(crate) fn multipart_request(&self, url: Url, form: &MultipartForm) -> Result<Request> {
        let (content_type, body) = form.encode();
        let value = HeaderValue::from_str(&content_type)
            .map_err(|_| Error::invalid_config("invalid multipart Content-Type"))?;
        Ok(self
            .unsigned_request(Method::POST, url, body)?
            .header(http::header::CONTENT_TYPE, value))
    }

    /// Dispatches `request` once. Never fails; see [`Response`].
    pub async fn send(&self, request: Request) -> Response {
        #[cfg(feature = "tracing")]
        let span = tracing::debug_span!(
            "kodo.http",
            method = %request.method(),
            host = request.url().host_str().unwrap_or(""),
            path = request.url().path(),
        );

        let fut = transport::dispatch(
            self.inner.transport.as_ref(),
            request,
            &self.inner.user_agent,
        );

        #[cfg(feature = "tracing")]
        let fut = tracing::Instrument::instrument(fut, span);

        fut.await
    }

    /// Sends `request` and turns a non-2xx outcome into [`Error::Api`].
    pub(crate) async fn execute(
        &self,
        operation: &'static str,
        request: Request,
    ) -> Result<Response> {
        #[cfg(feature = "tracing")]
        let span = tracing::info_span!(
            "kodo.request",
            operation,
            method = %request.method(),
            host = request.url().host_str().unwrap_or(""),
            path = request.url().path(),
        );

        let url = request.url().to_string();
        let fut = self.send(request);

        #[cfg(feature = "tracing")]
        let fut = tracing::Instrument::instrument(fut, span);

        #[cfg(not(feature = "tracing"))]
        let _ = operation;

        let resp = fut.await;
        if !resp.ok() {
            return Err(Error::from_response(url, &resp));
        }
        Ok(resp)
    }
}

impl ClientBuilder {
    fn new() -> Self {
        Self {
            config: None,
            zone: Zone::Z0,
            use_https: true,
            hosts: None,
            auth: Auth::Anonymous,
            timeout: None,
            user_agent: None,
            transport: None,
        }
    }

    /// Starts from a complete configuration; later setters still apply.
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Uses the preset hosts of `zone` (default `z0`).
    pub fn zone(mut self, zone: Zone) -> Self {
        self.zone = zone;
        self
    }

    /// Chooses http or https for zone presets (default https).
    pub fn use_https(mut self, use_https: bool) -> Self {
        self.use_https = use_https;
        self
    }

    /// Uses explicit hosts instead of a zone preset.
    pub fn hosts(mut self, hosts: Hosts) -> Self {
        self.hosts = Some(hosts);
        self
    }

    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Replaces the default reqwest transport.
    pub fn transport(mut self, transport: impl HttpSend + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn build(self) -> Result<Client> {
        let mut config = match self.config {
            Some(config) => config,
            None => Config::new(self.zone.hosts(self.use_https)?),
        };
        if let Some(hosts) = self.hosts {
            config.hosts = hosts;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if self.user_agent.is_some() {
            config.user_agent = self.user_agent;
        }
        config.validate()?;

        let user_agent = transport::user_agent_header(config.user_agent.as_deref())?;
        let transport: Arc<dyn HttpSend> = match self.transport {
            Some(t) => t,
            None => Arc::new(ReqwestTransport::new()?),
        };

        Ok(Client {
            inner: Arc::new(Inner {
                config,
                auth: self.auth,
                transport,
                user_agent,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credentials;

    fn client(auth: Auth) -> Client {
        Client::builder()
            .hosts(
                Hosts::new(
                    "http://up.test",
                    "http://io.test",
                    "http://rs.test",
                    "http://rsf.test",
                    "http://api.test",
                    "http://cdn.test",
                )
                .unwrap(),
            )
            .auth(auth)
            .timeout(Duration::from_millis(1500))
            .build()
            .unwrap()
    }

    #[test]
    fn builder_applies_overrides() {
        let c = client(Auth::Anonymous);
        assert_eq!(c.config().timeout, Duration::from_millis(1500));
        assert_eq!(c.hosts().rs.as_str(), "http://rs.test/");

        let c = Client::builder().zone(Zone::Z2).use_https(false).build().unwrap();
        assert_eq!(c.hosts().io.as_str(), "http://iovip-z2.qbox.me/");

        assert!(Client::builder().timeout(Duration::ZERO).build().is_err());
        assert!(Client::builder().user_agent(" ").build().is_err());
    }

    #[test]
    fn signed_request_lets_content_type_win() {
        let creds = Credentials::new("ak", "sk").unwrap();
        let c = client(Auth::Static(creds));
        let url = Url::parse("http://rs.test/batch").unwrap();

        let req = c
            .signed_request(
                Method::POST,
                url,
                Bytes::from_static(b"op=stat/YQ"),
                Some("application/x-www-form-urlencoded"),
            )
            .unwrap();

        let auth = req.header_map()[http::header::AUTHORIZATION].to_str().unwrap();
        assert!(auth.starts_with("QBox ak:"));
        assert_eq!(
            req.header_map()[http::header::CONTENT_TYPE],
            "application/x-www-form-urlencoded"
        );
        assert_eq!(req.timeout_duration(), Duration::from_millis(1500));
        assert_eq!(req.body_bytes().as_ref(), b"op=stat/YQ");
    }

    #[test]
    fn anonymous_requests_are_unsigned() {
        let c = client(Auth::Anonymous);
        let url = Url::parse("http://rs.test/buckets").unwrap();
        let req = c.signed_request(Method::GET, url, Bytes::new(), None).unwrap();
        assert!(req.header_map().get(http::header::AUTHORIZATION).is_none());
    }

    #[test]
    fn custom_signer_headers_are_merged() {
        struct FixedSigner;

        impl Signer for FixedSigner {
            fn sign(
                &self,
                _url: &Url,
                _body: &[u8],
                _content_type: Option<&str>,
            ) -> Result<http::HeaderMap> {
                let mut headers = http::HeaderMap::new();
                headers.insert(http::header::AUTHORIZATION, HeaderValue::from_static("Fixed"));
                headers.insert(http::header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
                Ok(headers)
            }

            fn private_download_url(&self, url: &str, _expires_in: Duration) -> Result<String> {
                Ok(format!("{url}?signed"))
            }
        }

        let c = client(Auth::custom(FixedSigner));
        let url = Url::parse("http://cdn.test/refresh").unwrap();
        let req = c
            .signed_request(Method::POST, url, Bytes::from_static(b"{}"), Some("application/json"))
            .unwrap();

        assert_eq!(req.header_map()[http::header::AUTHORIZATION], "Fixed");
        assert_eq!(req.header_map()[http::header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn multipart_request_sets_boundary_content_type() {
        let c = client(Auth::Anonymous);
        let form =
            MultipartForm::new("file", "a.txt", "hi", Some("text/plain")).field("token", "t");
        let req = c
            .multipart_request(Url::parse("http://up.test/").unwrap(), &form)
            .unwrap();

        let ct = req.header_map()[http::header::CONTENT_TYPE].to_str().unwrap();
        let boundary = ct.strip_prefix("multipart/form-data; boundary=").unwrap();
        let body = String::from_utf8(req.body_bytes().to_vec()).unwrap();
        assert!(body.starts_with(&format!("--{boundary}\r\n")));
        assert!(body.ends_with(&format!("--{boundary}--\r\n")));
        assert_eq!(req.method(), &Method::POST);
    }
}
