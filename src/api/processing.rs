use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::{
    api::{decode_body, signed_form_post, unsigned_get},
    client::Client,
    config,
    error::{Error, Result},
    types::{FopOutput, PfopStatus},
    util::encode::{form_encode, percent_encode_path},
};

/// Lifetime of the token embedded in a private `fop` URL.
pub const DEFAULT_FOP_EXPIRY: Duration = Duration::from_secs(3600);

/// Media processing: queued (`pfop`) and synchronous (`fop`) transforms.
#[derive(Clone)]
pub struct ProcessingService {
    client: Client,
}

impl ProcessingService {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Queues commands against `bucket:key`; returns the job id.
    pub fn pfop(&self, bucket: impl Into<String>, key: impl Into<String>) -> PfopRequest {
        PfopRequest {
            client: self.client.clone(),
            bucket: bucket.into(),
            key: key.into(),
            fops: Vec::new(),
            pipeline: None,
            notify_url: None,
            force: false,
        }
    }

    pub fn pfop_status(&self, id: impl Into<String>) -> PfopStatusRequest {
        PfopStatusRequest {
            client: self.client.clone(),
            id: id.into(),
        }
    }

    /// Runs commands on `domain/key` and returns the transformed output.
    pub fn fop(&self, domain: impl Into<String>, key: impl Into<String>) -> FopRequest {
        FopRequest {
            client: self.client.clone(),
            domain: domain.into(),
            key: key.into(),
            fops: Vec::new(),
            use_https: false,
            expires_in: DEFAULT_FOP_EXPIRY,
        }
    }
}

pub struct PfopRequest {
    client: Client,
    bucket: String,
    key: String,
    fops: Vec<String>,
    pipeline: Option<String>,
    notify_url: Option<String>,
    force: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PfopBody {
    persistent_id: String,
}

impl PfopRequest {
    pub fn fop(mut self, value: impl Into<String>) -> Self {
        self.fops.push(value.into());
        self
    }

    pub fn fops<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fops.extend(values.into_iter().map(Into::into));
        self
    }

    /// Private queue to run in.
    pub fn pipeline(mut self, value: impl Into<String>) -> Self {
        self.pipeline = Some(value.into());
        self
    }

    pub fn notify_url(mut self, value: impl Into<String>) -> Self {
        self.notify_url = Some(value.into());
        self
    }

    /// Overwrite existing outputs.
    pub fn force(mut self, value: bool) -> Self {
        self.force = value;
        self
    }

    fn body(&self) -> Result<String> {
        if self.fops.is_empty() {
            return Err(Error::invalid_config("pfop needs at least one command"));
        }

        let fops = self.fops.join(";");
        let mut pairs = vec![
            ("bucket", self.bucket.as_str()),
            ("key", self.key.as_str()),
            ("fops", fops.as_str()),
        ];
        if let Some(pipeline) = self.pipeline.as_deref().filter(|v| !v.is_empty()) {
            pairs.push(("pipeline", pipeline));
        }
        if let Some(url) = self.notify_url.as_deref().filter(|v| !v.is_empty()) {
            pairs.push(("notifyURL", url));
        }
        if self.force {
            pairs.push(("force", "1"));
        }
        Ok(form_encode(pairs))
    }

    pub async fn send(self) -> Result<String> {
        let body = self.body()?;
        let url = config::join(&self.client.hosts().api, "/pfop/")?;
        let resp = signed_form_post(&self.client, "pfop", url.clone(), body).await?;
        let out: PfopBody = decode_body(&url, &resp)?;
        Ok(out.persistent_id)
    }
}

pub struct PfopStatusRequest {
    client: Client,
    id: String,
}

impl PfopStatusRequest {
    pub async fn send(self) -> Result<PfopStatus> {
        if self.id.trim().is_empty() {
            return Err(Error::invalid_config("persistent id must not be empty"));
        }
        let query = form_encode([("id", self.id.as_str())]);
        let url = config::join(&self.client.hosts().api, &format!("/status/get/prefop?{query}"))?;
        let resp = unsigned_get(&self.client, "pfop_status", url.clone()).await?;
        decode_body(&url, &resp)
    }
}

pub struct FopRequest {
    client: Client,
    domain: String,
    key: String,
    fops: Vec<String>,
    use_https: bool,
    expires_in: Duration,
}

impl FopRequest {
    pub fn fop(mut self, value: impl Into<String>) -> Self {
        self.fops.push(value.into());
        self
    }

    pub fn fops<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fops.extend(values.into_iter().map(Into::into));
        self
    }

    /// Request the resource over https (default http).
    pub fn use_https(mut self, value: bool) -> Self {
        self.use_https = value;
        self
    }

    pub fn expires_in(mut self, value: Duration) -> Self {
        self.expires_in = value;
        self
    }

    /// The processing URL, carrying a download token when the client has a
    /// signer.
    pub fn url(&self) -> Result<String> {
        Ok(self.request_url()?.into())
    }

    /// The token is computed over the parsed form of the URL, which is also
    /// what goes on the wire.
    fn request_url(&self) -> Result<Url> {
        let domain = self.domain.trim().trim_end_matches('/');
        if domain.is_empty() {
            return Err(Error::invalid_config("domain must not be empty"));
        }
        if self.fops.is_empty() {
            return Err(Error::invalid_config("fop needs at least one command"));
        }

        let scheme = if self.use_https { "https" } else { "http" };
        let raw = format!(
            "{scheme}://{domain}/{}?{}",
            percent_encode_path(&self.key),
            self.fops.join("|")
        );
        let url = Url::parse(&raw)
            .map_err(|_| Error::invalid_config(format!("invalid processing URL: {raw}")))?;

        let Some(signer) = self.client.signer() else {
            return Ok(url);
        };
        let signed = signer.private_download_url(url.as_str(), self.expires_in)?;
        let parsed = Url::parse(&signed)
            .map_err(|_| Error::signing("signed processing URL is not a valid URL"))?;
        if parsed.as_str() != signed {
            return Err(Error::signing("signed processing URL changes when parsed"));
        }
        Ok(parsed)
    }

    /// JSON output is decoded; anything else comes back as raw bytes.
    pub async fn send(self) -> Result<FopOutput> {
        let url = self.request_url()?;
        let resp = unsigned_get(&self.client, "fop", url).await?;

        if let Some(value) = resp.json() {
            return Ok(FopOutput::Json(value.clone()));
        }
        Ok(FopOutput::Raw(resp.body().cloned().unwrap_or_default()))
    }
}
