use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    domain::Cursor,
    error::ApiErrorBody,
    protocol::{CreateImageRequest, HostedFileResponse, ImagePage, ImageRecord},
};
use tracing::debug;
use url::Url;

use crate::{
    draft::FileBlob,
    error::{FileHostError, GalleryApiError},
};

#[async_trait]
pub trait GalleryApi: Send + Sync {
    async fn list_page(&self, cursor: Option<&Cursor>) -> Result<ImagePage, GalleryApiError>;
    async fn create_image(
        &self,
        request: &CreateImageRequest,
    ) -> Result<ImageRecord, GalleryApiError>;
}

#[async_trait]
pub trait FileHost: Send + Sync {
    /// Uploads the blob and returns a publicly retrievable url.
    async fn upload_file(&self, file: &FileBlob) -> Result<String, FileHostError>;
}

pub struct HttpGalleryApi {
    http: Client,
    images_url: Url,
}

impl HttpGalleryApi {
    pub fn new(http: Client, base_url: &Url) -> Result<Self, url::ParseError> {
        Ok(Self {
            http,
            images_url: with_trailing_slash(base_url).join("images")?,
        })
    }

    pub fn images_url(&self) -> &Url {
        &self.images_url
    }
}

#[derive(serde::Serialize)]
struct ListImagesQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    after: Option<&'a str>,
}

#[async_trait]
impl GalleryApi for HttpGalleryApi {
    async fn list_page(&self, cursor: Option<&Cursor>) -> Result<ImagePage, GalleryApiError> {
        debug!(cursor = ?cursor, "gallery api: list page");
        let response = self
            .http
            .get(self.images_url.clone())
            .query(&ListImagesQuery {
                after: cursor.map(Cursor::as_str),
            })
            .send()
            .await?;
        let response = ensure_success(response, false).await?;
        decode_body(response).await
    }

    async fn create_image(
        &self,
        request: &CreateImageRequest,
    ) -> Result<ImageRecord, GalleryApiError> {
        debug!(title = %request.title, "gallery api: create image");
        let response = self
            .http
            .post(self.images_url.clone())
            .json(request)
            .send()
            .await?;
        let response = ensure_success(response, true).await?;
        decode_body(response).await
    }
}

// An undecodable 2xx body is a `Server` error; only a failed read is `Network`.
async fn decode_body<T: DeserializeOwned>(response: Response) -> Result<T, GalleryApiError> {
    let status = response.status();
    let raw = response.bytes().await?;
    serde_json::from_slice(&raw).map_err(|err| GalleryApiError::Server {
        status: status.as_u16(),
        message: format!("invalid response body: {err}"),
    })
}

async fn ensure_success(
    response: Response,
    rejects_fields: bool,
) -> Result<Response, GalleryApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let raw = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ApiErrorBody>(&raw) {
        Ok(body) => body.message,
        Err(_) if raw.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string(),
        Err(_) => raw,
    };

    if rejects_fields
        && (status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY)
    {
        return Err(GalleryApiError::Validation { message });
    }

    Err(GalleryApiError::Server {
        status: status.as_u16(),
        message,
    })
}

pub struct HttpFileHost {
    http: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl HttpFileHost {
    pub fn new(http: Client, endpoint: Url, api_key: Option<String>) -> Self {
        Self {
            http,
            endpoint,
            api_key,
        }
    }
}

#[async_trait]
impl FileHost for HttpFileHost {
    async fn upload_file(&self, file: &FileBlob) -> Result<String, FileHostError> {
        let mut query = vec![("name", file.name.clone())];
        if let Some(key) = &self.api_key {
            query.push(("key", key.clone()));
        }

        let response = self
            .http
            .post(self.endpoint.clone())
            .query(&query)
            .header(CONTENT_TYPE, file.mime_type.clone())
            .body(file.bytes.clone())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FileHostError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let raw = response.bytes().await?;
        let hosted: HostedFileResponse =
            serde_json::from_slice(&raw).map_err(|_| FileHostError::MissingUrl)?;
        if hosted.data.url.trim().is_empty() {
            return Err(FileHostError::MissingUrl);
        }
        debug!(name = %file.name, url = %hosted.data.url, "file host: stored file");
        Ok(hosted.data.url)
    }
}

fn with_trailing_slash(base_url: &Url) -> Url {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
