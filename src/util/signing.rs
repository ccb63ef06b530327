use hmac::{Hmac, Mac as _};
use http::{HeaderMap, HeaderValue};
use sha1::Sha1;
use url::Url;

use crate::{auth::Credentials, error::Error, types::UploadPolicy, util::encode};

type HmacSha1 = Hmac<Sha1>;

pub(crate) const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Builds the `Authorization: QBox ...` header for a management request.
///
/// The signed data is the path and query followed by a newline, plus the
/// body when it is a form body.
pub(crate) fn sign_request(
    credentials: &Credentials,
    url: &Url,
    body: &[u8],
    content_type: Option<&str>,
) -> Result<HeaderMap, Error> {
    let data = signing_data(url, body, content_type);
    let token = token(credentials, &data)?;

    let value = HeaderValue::from_str(&format!("QBox {token}"))
        .map_err(|_| Error::signing("invalid authorization header value"))?;
    let mut headers = HeaderMap::new();
    headers.insert(http::header::AUTHORIZATION, value);
    Ok(headers)
}

fn signing_data(url: &Url, body: &[u8], content_type: Option<&str>) -> Vec<u8> {
    let mut data = Vec::with_capacity(url.path().len() + body.len() + 2);
    data.extend_from_slice(url.path().as_bytes());
    if let Some(query) = url.query() {
        data.push(b'?');
        data.extend_from_slice(query.as_bytes());
    }
    data.push(b'\n');
    if !body.is_empty() && content_type == Some(FORM_CONTENT_TYPE) {
        data.extend_from_slice(body);
    }
    data
}

/// Appends `e=<deadline>` and `token=<ak>:<sig>` to a download URL.
pub(crate) fn private_download_url(
    credentials: &Credentials,
    url: &str,
    deadline: i64,
) -> Result<String, Error> {
    let separator = if url.contains('?') { '&' } else { '?' };
    let with_deadline = format!("{url}{separator}e={deadline}");
    let token = token(credentials, with_deadline.as_bytes())?;
    Ok(format!("{with_deadline}&token={token}"))
}

/// `<ak>:<sig>:<encoded policy>`.
pub(crate) fn upload_token(
    credentials: &Credentials,
    policy: &UploadPolicy,
) -> Result<String, Error> {
    let encoded = encode::urlsafe_base64_padded(policy.to_json()?);
    let token = token(credentials, encoded.as_bytes())?;
    Ok(format!("{token}:{encoded}"))
}

fn token(credentials: &Credentials, data: &[u8]) -> Result<String, Error> {
    let sig = hmac_sha1(credentials.secret_key.as_bytes(), data)?;
    Ok(format!(
        "{}:{}",
        credentials.access_key,
        encode::urlsafe_base64_padded(sig)
    ))
}

fn hmac_sha1(key: &[u8], data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut mac = HmacSha1::new_from_slice(key).map_err(|_| Error::signing("invalid HMAC key"))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
