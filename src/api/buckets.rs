use crate::{
    api::{decode_body, signed_form_post, signed_get, signed_post},
    batch::{self, encoded_entry},
    client::Client,
    config,
    error::{Error, Result},
    types::{BatchItem, FetchOutput, FileInfo, ListFilesBody, ListFilesOutput, RefreshOutput},
    util::encode::{form_encode, urlsafe_base64},
};

const DEFAULT_LIST_LIMIT: u32 = 1000;
const JSON_CONTENT_TYPE: &str = "application/json";

/// Resource management: listing, metadata, and mutations of stored files.
#[derive(Clone)]
pub struct BucketsService {
    client: Client,
}

impl BucketsService {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Names of all buckets of the account.
    pub fn list(&self) -> ListBucketsRequest {
        ListBucketsRequest {
            client: self.client.clone(),
        }
    }

    pub fn list_files(&self, bucket: impl Into<String>) -> ListFilesRequest {
        ListFilesRequest {
            client: self.client.clone(),
            bucket: bucket.into(),
            prefix: None,
            marker: None,
            limit: Some(DEFAULT_LIST_LIMIT),
            delimiter: None,
        }
    }

    pub fn stat(&self, bucket: impl Into<String>, key: impl Into<String>) -> StatRequest {
        StatRequest {
            client: self.client.clone(),
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    pub fn delete(&self, bucket: impl Into<String>, key: impl Into<String>) -> DeleteRequest {
        DeleteRequest {
            client: self.client.clone(),
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Moves `from_key` to `to_key` inside one bucket.
    pub fn rename(
        &self,
        bucket: impl Into<String>,
        from_key: impl Into<String>,
        to_key: impl Into<String>,
    ) -> TransferRequest {
        let bucket = bucket.into();
        self.transfer("move", bucket.clone(), from_key.into(), bucket, to_key.into())
    }

    pub fn copy(
        &self,
        from_bucket: impl Into<String>,
        from_key: impl Into<String>,
        to_bucket: impl Into<String>,
        to_key: impl Into<String>,
    ) -> TransferRequest {
        self.transfer(
            "copy",
            from_bucket.into(),
            from_key.into(),
            to_bucket.into(),
            to_key.into(),
        )
    }

    pub fn move_to(
        &self,
        from_bucket: impl Into<String>,
        from_key: impl Into<String>,
        to_bucket: impl Into<String>,
        to_key: impl Into<String>,
    ) -> TransferRequest {
        self.transfer(
            "move",
            from_bucket.into(),
            from_key.into(),
            to_bucket.into(),
            to_key.into(),
        )
    }

    fn transfer(
        &self,
        verb: &'static str,
        from_bucket: String,
        from_key: String,
        to_bucket: String,
        to_key: String,
    ) -> TransferRequest {
        TransferRequest {
            client: self.client.clone(),
            verb,
            from_bucket,
            from_key,
            to_bucket,
            to_key,
            force: false,
        }
    }

    pub fn change_mime(
        &self,
        bucket: impl Into<String>,
        key: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> ChangeMimeRequest {
        ChangeMimeRequest {
            client: self.client.clone(),
            bucket: bucket.into(),
            key: key.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Downloads `url` into `bucket`; the service picks the key unless one
    /// is set.
    pub fn fetch(&self, url: impl Into<String>, bucket: impl Into<String>) -> FetchRequest {
        FetchRequest {
            client: self.client.clone(),
            url: url.into(),
            bucket: bucket.into(),
            key: None,
        }
    }

    /// Refreshes `bucket:key` from the bucket's mirror origin.
    pub fn prefetch(&self, bucket: impl Into<String>, key: impl Into<String>) -> PrefetchRequest {
        PrefetchRequest {
            client: self.client.clone(),
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Runs pre-built ops (see [`crate::batch`]) in one request.
    pub fn batch<I, S>(&self, ops: I) -> BatchRequest
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        BatchRequest {
            client: self.client.clone(),
            ops: ops.into_iter().map(Into::into).collect(),
        }
    }

    /// Purges CDN caches of `urls`.
    pub fn refresh<I, S>(&self, urls: I) -> RefreshRequest
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RefreshRequest {
            client: self.client.clone(),
            urls: urls.into_iter().map(Into::into).collect(),
        }
    }
}

pub struct ListBucketsRequest {
    client: Client,
}

impl ListBucketsRequest {
    pub async fn send(self) -> Result<Vec<String>> {
        let url = config::join(&self.client.hosts().rs, "/buckets")?;
        let resp = signed_get(&self.client, "buckets", url.clone()).await?;
        decode_body(&url, &resp)
    }
}

#[derive(Clone)]
pub struct ListFilesRequest {
    client: Client,
    bucket: String,
    prefix: Option<String>,
    marker: Option<String>,
    limit: Option<u32>,
    delimiter: Option<String>,
}

impl ListFilesRequest {
    pub fn prefix(mut self, value: impl Into<String>) -> Self {
        self.prefix = Some(value.into());
        self
    }

    pub fn marker(mut self, value: impl Into<String>) -> Self {
        self.marker = Some(value.into());
        self
    }

    /// Page size, 1000 unless set; `0` leaves it to the service.
    pub fn limit(mut self, value: u32) -> Self {
        self.limit = Some(value).filter(|v| *v > 0);
        self
    }

    pub fn delimiter(mut self, value: impl Into<String>) -> Self {
        self.delimiter = Some(value.into());
        self
    }

    pub fn pager(self) -> ListFilesPager {
        ListFilesPager {
            request: self,
            done: false,
        }
    }

    fn query(&self) -> String {
        let limit = self.limit.map(|v| v.to_string());
        let optional = [
            ("prefix", self.prefix.as_deref()),
            ("marker", self.marker.as_deref()),
            ("limit", limit.as_deref()),
            ("delimiter", self.delimiter.as_deref()),
        ];

        let mut pairs = vec![("bucket", self.bucket.as_str())];
        pairs.extend(
            optional
                .into_iter()
                .filter_map(|(name, value)| value.filter(|v| !v.is_empty()).map(|v| (name, v))),
        );
        form_encode(pairs)
    }

    pub async fn send(self) -> Result<ListFilesOutput> {
        let url = config::join(&self.client.hosts().rsf, &format!("/list?{}", self.query()))?;
        let resp = signed_get(&self.client, "list_files", url.clone()).await?;
        let body: ListFilesBody = decode_body(&url, &resp)?;
        Ok(body.into())
    }
}

/// Walks a listing page by page, following the returned marker.
pub struct ListFilesPager {
    request: ListFilesRequest,
    done: bool,
}

impl ListFilesPager {
    pub async fn next_page(&mut self) -> Result<Option<ListFilesOutput>> {
        if self.done {
            return Ok(None);
        }

        let page = self.request.clone().send().await?;
        match &page.marker {
            Some(marker) => self.request.marker = Some(marker.clone()),
            None => self.done = true,
        }
        Ok(Some(page))
    }
}

pub struct StatRequest {
    client: Client,
    bucket: String,
    key: String,
}

impl StatRequest {
    pub async fn send(self) -> Result<FileInfo> {
        let path = format!("/stat/{}", encoded_entry(&self.bucket, Some(&self.key)));
        let url = config::join(&self.client.hosts().rs, &path)?;
        let resp = signed_get(&self.client, "stat", url.clone()).await?;
        decode_body(&url, &resp)
    }
}

pub struct DeleteRequest {
    client: Client,
    bucket: String,
    key: String,
}

impl DeleteRequest {
    pub async fn send(self) -> Result<()> {
        let path = format!("/delete/{}", encoded_entry(&self.bucket, Some(&self.key)));
        let url = config::join(&self.client.hosts().rs, &path)?;
        signed_form_post(&self.client, "delete", url, String::new()).await?;
        Ok(())
    }
}

/// A `copy` or `move` between two entries.
pub struct TransferRequest {
    client: Client,
    verb: &'static str,
    from_bucket: String,
    from_key: String,
    to_bucket: String,
    to_key: String,
    force: bool,
}

impl TransferRequest {
    /// Overwrite the target if it exists.
    pub fn force(mut self, value: bool) -> Self {
        self.force = value;
        self
    }

    fn path(&self) -> String {
        let mut path = format!(
            "/{}/{}/{}",
            self.verb,
            encoded_entry(&self.from_bucket, Some(&self.from_key)),
            encoded_entry(&self.to_bucket, Some(&self.to_key)),
        );
        if self.force {
            path.push_str("/force/true");
        }
        path
    }

    pub async fn send(self) -> Result<()> {
        let url = config::join(&self.client.hosts().rs, &self.path())?;
        signed_form_post(&self.client, self.verb, url, String::new()).await?;
        Ok(())
    }
}

pub struct ChangeMimeRequest {
    client: Client,
    bucket: String,
    key: String,
    mime_type: String,
}

impl ChangeMimeRequest {
    pub async fn send(self) -> Result<()> {
        if self.mime_type.trim().is_empty() {
            return Err(Error::invalid_config("mime type must not be empty"));
        }
        let path = format!(
            "/chgm/{}/mime/{}",
            encoded_entry(&self.bucket, Some(&self.key)),
            urlsafe_base64(&self.mime_type)
        );
        let url = config::join(&self.client.hosts().rs, &path)?;
        signed_form_post(&self.client, "change_mime", url, String::new()).await?;
        Ok(())
    }
}

pub struct FetchRequest {
    client: Client,
    url: String,
    bucket: String,
    key: Option<String>,
}

impl FetchRequest {
    pub fn key(mut self, value: impl Into<String>) -> Self {
        self.key = Some(value.into());
        self
    }

    pub async fn send(self) -> Result<FetchOutput> {
        let path = format!(
            "/fetch/{}/to/{}",
            urlsafe_base64(&self.url),
            encoded_entry(&self.bucket, self.key.as_deref())
        );
        let url = config::join(&self.client.hosts().io, &path)?;
        let resp = signed_form_post(&self.client, "fetch", url.clone(), String::new()).await?;
        decode_body(&url, &resp)
    }
}

pub struct PrefetchRequest {
    client: Client,
    bucket: String,
    key: String,
}

impl PrefetchRequest {
    pub async fn send(self) -> Result<()> {
        let path = format!("/prefetch/{}", encoded_entry(&self.bucket, Some(&self.key)));
        let url = config::join(&self.client.hosts().io, &path)?;
        signed_form_post(&self.client, "prefetch", url, String::new()).await?;
        Ok(())
    }
}

pub struct BatchRequest {
    client: Client,
    ops: Vec<String>,
}

impl BatchRequest {
    /// Results are positionally aligned with the submitted ops. A `298`
    /// overall status still succeeds; check each [`BatchItem`].
    pub async fn send(self) -> Result<Vec<BatchItem>> {
        if self.ops.is_empty() {
            return Err(Error::invalid_config("batch must contain at least one op"));
        }
        let url = config::join(&self.client.hosts().rs, "/batch")?;
        let body = batch::batch_body(&self.ops);
        let resp = signed_form_post(&self.client, "batch", url.clone(), body).await?;
        let items: Vec<BatchItem> = decode_body(&url, &resp)?;
        if items.len() != self.ops.len() {
            return Err(Error::decode(
                format!(
                    "batch returned {} results for {} ops",
                    items.len(),
                    self.ops.len()
                ),
                None,
            ));
        }
        Ok(items)
    }
}

pub struct RefreshRequest {
    client: Client,
    urls: Vec<String>,
}

impl RefreshRequest {
    pub async fn send(self) -> Result<RefreshOutput> {
        if self.urls.is_empty() {
            return Err(Error::invalid_config("refresh needs at least one url"));
        }
        let url = config::join(&self.client.hosts().cdn, "/refresh")?;
        let body = serde_json::to_vec(&serde_json::json!({ "urls": self.urls }))
            .map_err(|e| Error::invalid_config(format!("failed to encode refresh body: {e}")))?;
        let resp =
            signed_post(&self.client, "refresh", url.clone(), body, JSON_CONTENT_TYPE).await?;
        decode_body(&url, &resp)
    }
}
