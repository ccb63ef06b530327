//! Resource operations grouped by service.

mod buckets;
mod processing;
mod uploads;

use bytes::Bytes;
use http::Method;
use serde::de::DeserializeOwned;
use url::Url;

use crate::{
    client::Client,
    error::{Error, Result},
    types::Response,
    util::signing::FORM_CONTENT_TYPE,
};

pub use buckets::{
    BatchRequest, BucketsService, ChangeMimeRequest, DeleteRequest, FetchRequest,
    ListBucketsRequest, ListFilesPager, ListFilesRequest, PrefetchRequest, RefreshRequest,
    StatRequest, TransferRequest,
};
pub use processing::{
    DEFAULT_FOP_EXPIRY, FopRequest, PfopRequest, PfopStatusRequest, ProcessingService,
};
pub use uploads::{FORM_UPLOAD_LIMIT, PutFileRequest, PutRequest, UploadsService};

async fn signed_get(client: &Client, operation: &'static str, url: Url) -> Result<Response> {
    let req = client.signed_request(Method::GET, url, Bytes::new(), None)?;
    client.execute(operation, req).await
}

async fn unsigned_get(client: &Client, operation: &'static str, url: Url) -> Result<Response> {
    let req = client.unsigned_request(Method::GET, url, Bytes::new())?;
    client.execute(operation, req).await
}

/// Form-encoded `POST`; the body is part of the signature.
async fn signed_form_post(
    client: &Client,
    operation: &'static str,
    url: Url,
    body: String,
) -> Result<Response> {
    signed_post(client, operation, url, body, FORM_CONTENT_TYPE).await
}

async fn signed_post(
    client: &Client,
    operation: &'static str,
    url: Url,
    body: impl Into<Bytes>,
    content_type: &str,
) -> Result<Response> {
    let req = client.signed_request(Method::POST, url, body.into(), Some(content_type))?;
    client.execute(operation, req).await
}

/// Decodes a successful response body into `T`.
fn decode_body<T: DeserializeOwned>(url: &Url, resp: &Response) -> Result<T> {
    let body = resp.body().map(|b| b.as_ref()).unwrap_or_default();
    serde_json::from_slice(body).map_err(|e| {
        Error::decode(
            format!("unexpected response body from {url}"),
            Some(Box::new(e)),
        )
    })
}

#[cfg(test)]
mod tests {
    use http::HeaderMap;

    use super::*;
    use crate::types::FileInfo;

    #[test]
    fn decode_body_reports_shape_errors() {
        let url = Url::parse("http://rs.test/stat/x").unwrap();
        let resp = Response::new(200, 0.0, HeaderMap::new(), Some(Bytes::from_static(b"[1]")));
        let err = decode_body::<FileInfo>(&url, &resp).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
        assert!(err.to_string().contains("http://rs.test/stat/x"));
    }

    #[test]
    fn decode_body_reads_typed_payload() {
        let url = Url::parse("http://rs.test/buckets").unwrap();
        let resp = Response::new(
            200,
            0.0,
            HeaderMap::new(),
            Some(Bytes::from_static(br#"["a","b"]"#)),
        );
        let names: Vec<String> = decode_body(&url, &resp).unwrap();
        assert_eq!(names, ["a", "b"]);
    }
}
