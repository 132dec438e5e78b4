//! HTTP implementation of [`ImageApi`].

use boxmark_canvas::Category;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

use super::{ApiError, CategoryRecord, ImageApi, ImageRecord, SaveRequest, SaveResponse};

/// Client for the annotation server's REST API.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    /// API root, always ending in `/` so relative joins append
    base: Url,
    token: Option<String>,
}

impl HttpApi {
    /// Create a client for the API rooted at `base_url`.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ApiError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            client: Client::new(),
            base,
            token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Absolute URL of an endpoint path relative to the API root.
    pub fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base.join(path)?)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Vec<u8>, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        log::debug!("GET {}", url);
        let body = self.send(self.request(Method::GET, url)).await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

impl ImageApi for HttpApi {
    async fn categories(&self, dataset_id: u64) -> Result<Vec<Category>, ApiError> {
        let url = self.endpoint(&format!("categories/dataset/{}", dataset_id))?;
        let records: Vec<CategoryRecord> = self.get_json(url).await?;
        Ok(records.into_iter().map(Category::from).collect())
    }

    async fn next_batch(&self, dataset_id: u64, count: usize) -> Result<Vec<ImageRecord>, ApiError> {
        let mut url = self.endpoint(&format!("images/next/{}/batch", dataset_id))?;
        url.query_pairs_mut()
            .append_pair("count", &count.to_string());
        self.get_json(url).await
    }

    async fn next_image(&self, dataset_id: u64) -> Result<Option<ImageRecord>, ApiError> {
        let url = self.endpoint(&format!("images/next/{}", dataset_id))?;
        self.get_json(url).await
    }

    async fn image(&self, image_id: u64) -> Result<ImageRecord, ApiError> {
        let url = self.endpoint(&format!("images/{}", image_id))?;
        self.get_json(url).await
    }

    async fn image_file(&self, image_id: u64) -> Result<Vec<u8>, ApiError> {
        let url = self.endpoint(&format!("images/{}/file", image_id))?;
        log::debug!("GET {}", url);
        let bytes = self.send(self.request(Method::GET, url)).await?;
        log::debug!("Fetched image {} ({} bytes)", image_id, bytes.len());
        Ok(bytes)
    }

    async fn save(&self, image_id: u64, request: &SaveRequest) -> Result<SaveResponse, ApiError> {
        let url = self.endpoint(&format!("images/{}/save", image_id))?;
        log::debug!(
            "POST {} ({} annotations, skip={})",
            url,
            request.annotations.len(),
            request.skip
        );
        let body = self
            .send(self.request(Method::POST, url).json(request))
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
