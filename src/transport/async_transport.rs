use std::error::Error as StdError;

use async_trait::async_trait;

use crate::{
    error::{Error, Result},
    transport::{HttpSend, RawResponse, TransportError},
    types::Request,
};

/// Default transport backed by a shared `reqwest::Client`.
///
/// Redirects are not followed; pooling and HTTP version negotiation are left
/// to reqwest.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::invalid_config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Wraps an already configured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSend for ReqwestTransport {
    async fn send(
        &self,
        request: &Request,
    ) -> std::result::Result<Option<RawResponse>, TransportError> {
        let resp = self
            .client
            .request(request.method().clone(), request.url().clone())
            .headers(request.header_map().clone())
            .body(request.body_bytes().clone())
            .timeout(request.timeout_duration())
            .send()
            .await
            .map_err(classify)?;

        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let body = resp.bytes().await.map_err(classify)?;

        Ok(Some(RawResponse {
            status,
            headers,
            body,
        }))
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::Timeout;
    }
    TransportError::Fault(error_chain(&err))
}

/// `outer: inner: root` so DNS and TLS causes are not lost.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use std::fmt;

    use super::*;

    #[derive(Debug)]
    struct Layer(&'static str, Option<Box<Layer>>);

    impl fmt::Display for Layer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    impl StdError for Layer {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            self.1.as_deref().map(|e| e as &(dyn StdError + 'static))
        }
    }

    #[test]
    fn error_chain_joins_sources() {
        let err = Layer(
            "error sending request",
            Some(Box::new(Layer(
                "client error (Connect)",
                Some(Box::new(Layer("dns error", None))),
            ))),
        );
        assert_eq!(
            error_chain(&err),
            "error sending request: client error (Connect): dns error"
        );
    }

    #[test]
    fn builds_default_client() {
        assert!(ReqwestTransport::new().is_ok());
    }
}
