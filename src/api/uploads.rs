use std::path::PathBuf;

use bytes::Bytes;

use crate::{
    api::decode_body,
    client::Client,
    error::{Error, Result},
    types::PutOutput,
    util::multipart::MultipartForm,
};

/// Largest file sent in a single form upload.
pub const FORM_UPLOAD_LIMIT: u64 = 4 * 1024 * 1024;

const FILE_FIELD: &str = "file";
const ANONYMOUS_FILE_NAME: &str = "filename";
const PARAM_PREFIX: &str = "x:";

/// Form uploads authorized by an upload token.
#[derive(Clone)]
pub struct UploadsService {
    client: Client,
}

impl UploadsService {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Uploads `data` in one multipart request.
    pub fn put(&self, token: impl Into<String>, data: impl Into<Bytes>) -> PutRequest {
        PutRequest {
            client: self.client.clone(),
            token: token.into(),
            key: None,
            data: data.into(),
            params: Vec::new(),
            mime_type: None,
        }
    }

    /// Uploads a local file of at most [`FORM_UPLOAD_LIMIT`] bytes.
    pub fn put_file(&self, token: impl Into<String>, path: impl Into<PathBuf>) -> PutFileRequest {
        PutFileRequest {
            client: self.client.clone(),
            token: token.into(),
            key: None,
            path: path.into(),
            params: Vec::new(),
            mime_type: None,
        }
    }
}

pub struct PutRequest {
    client: Client,
    token: String,
    key: Option<String>,
    data: Bytes,
    params: Vec<(String, String)>,
    mime_type: Option<String>,
}

impl PutRequest {
    /// Target key; without one the service derives it from the token policy
    /// or the content hash.
    pub fn key(mut self, value: impl Into<String>) -> Self {
        self.key = Some(value.into());
        self
    }

    /// Custom variable. Only `x:`-prefixed names with non-empty values are
    /// sent.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn mime_type(mut self, value: impl Into<String>) -> Self {
        self.mime_type = Some(value.into());
        self
    }

    fn form(&self) -> Result<MultipartForm> {
        if self.token.trim().is_empty() {
            return Err(Error::invalid_config("upload token must not be empty"));
        }

        let file_name = self.key.as_deref().unwrap_or(ANONYMOUS_FILE_NAME);
        let mut form = MultipartForm::new(
            FILE_FIELD,
            file_name,
            self.data.clone(),
            self.mime_type.as_deref(),
        )
        .field("token", self.token.as_str());

        if let Some(key) = &self.key {
            form = form.field("key", key.as_str());
        }
        for (name, value) in custom_params(&self.params) {
            form = form.field(name, value);
        }
        Ok(form)
    }

    pub async fn send(self) -> Result<PutOutput> {
        let form = self.form()?;
        let url = self.client.hosts().up.clone();
        let req = self.client.multipart_request(url.clone(), &form)?;
        let resp = self.client.execute("put", req).await?;
        decode_body(&url, &resp)
    }
}

pub struct PutFileRequest {
    client: Client,
    token: String,
    key: Option<String>,
    path: PathBuf,
    params: Vec<(String, String)>,
    mime_type: Option<String>,
}

impl PutFileRequest {
    pub fn key(mut self, value: impl Into<String>) -> Self {
        self.key = Some(value.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Overrides the type guessed from the file extension.
    pub fn mime_type(mut self, value: impl Into<String>) -> Self {
        self.mime_type = Some(value.into());
        self
    }

    pub async fn send(self) -> Result<PutOutput> {
        let meta = tokio::fs::metadata(&self.path).await.map_err(|e| {
            Error::invalid_config(format!("cannot open {}: {e}", self.path.display()))
        })?;
        if !meta.is_file() {
            return Err(Error::invalid_config(format!(
                "{} is not a regular file",
                self.path.display()
            )));
        }
        if meta.len() > FORM_UPLOAD_LIMIT {
            return Err(Error::invalid_config(format!(
                "{} is {} bytes; form upload accepts at most {FORM_UPLOAD_LIMIT}",
                self.path.display(),
                meta.len()
            )));
        }

        let data = tokio::fs::read(&self.path).await.map_err(|e| {
            Error::invalid_config(format!("cannot read {}: {e}", self.path.display()))
        })?;
        let mime_type = self.mime_type.or_else(|| {
            mime_guess::from_path(&self.path)
                .first()
                .map(|m| m.essence_str().to_string())
        });

        PutRequest {
            client: self.client,
            token: self.token,
            key: self.key,
            data: Bytes::from(data),
            params: self.params,
            mime_type,
        }
        .send()
        .await
    }
}

fn custom_params(params: &[(String, String)]) -> impl Iterator<Item = (&str, &str)> {
    params
        .iter()
        .filter(|(name, value)| name.starts_with(PARAM_PREFIX) && !value.is_empty())
        .map(|(name, value)| (name.as_str(), value.as_str()))
}
