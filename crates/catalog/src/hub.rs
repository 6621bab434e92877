//! Hugging Face Hub catalog client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use proto::{CatalogError, GgufInfo, ModelDetails, RemoteModel};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::ModelCatalog;
use crate::quant::quantizations_from_files;

pub const DEFAULT_ENDPOINT: &str = "https://huggingface.co";
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;
const REQUEST_TIMEOUT_SECS: u64 = 20;

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct HubModel {
    id: String,
    #[serde(default)]
    downloads: u64,
    #[serde(default)]
    likes: u64,
    #[serde(default)]
    pipeline_tag: Option<String>,
    #[serde(default, rename = "lastModified")]
    last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct HubModelInfo {
    id: String,
    #[serde(default)]
    downloads: u64,
    #[serde(default)]
    likes: u64,
    #[serde(default)]
    pipeline_tag: Option<String>,
    #[serde(default, rename = "lastModified")]
    last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    siblings: Vec<HubSibling>,
    #[serde(default, rename = "cardData")]
    card_data: Option<HubCardData>,
    #[serde(default)]
    gguf: Option<HubGguf>,
}

#[derive(Debug, Deserialize)]
struct HubSibling {
    rfilename: String,
}

#[derive(Debug, Deserialize)]
struct HubCardData {
    /// A single identifier or a list of them.
    #[serde(default)]
    license: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct HubGguf {
    #[serde(default)]
    architecture: Option<String>,
    #[serde(default)]
    context_length: Option<u64>,
    #[serde(default)]
    total: Option<u64>,
}

impl From<HubModel> for RemoteModel {
    fn from(model: HubModel) -> Self {
        Self {
            id: model.id,
            downloads: model.downloads,
            likes: model.likes,
            pipeline_tag: model.pipeline_tag,
            last_modified: model.last_modified,
        }
    }
}

impl From<HubModelInfo> for ModelDetails {
    fn from(info: HubModelInfo) -> Self {
        let files: Vec<String> = info.siblings.into_iter().map(|s| s.rfilename).collect();
        let quantizations = quantizations_from_files(&files);
        Self {
            id: info.id,
            downloads: info.downloads,
            likes: info.likes,
            pipeline_tag: info.pipeline_tag,
            license: info.card_data.and_then(|c| c.license).and_then(license_text),
            gguf: info.gguf.map(|g| GgufInfo {
                architecture: g.architecture,
                context_length: g.context_length,
                total: g.total,
            }),
            last_modified: info.last_modified,
            files,
            quantizations,
        }
    }
}

fn license_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Array(items) => {
            let names: Vec<String> = items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
            (!names.is_empty()).then(|| names.join(", "))
        }
        _ => None,
    }
}

// ── Client ────────────────────────────────────────────────────────────────────

/// Catalog backed by the Hub's public model API.
#[derive(Debug, Clone)]
pub struct HubClient {
    http: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    search_limit: u32,
}

impl HubClient {
    /// Creates a client for the public Hub endpoint.
    pub fn new() -> Result<Self, CatalogError> {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    /// Creates a client targeting a custom endpoint (mirrors, tests).
    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| CatalogError::Http(format!("build client: {e}")))?;
        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token: None,
            search_limit: DEFAULT_SEARCH_LIMIT,
        })
    }

    /// Sends `Authorization: Bearer <token>` on every request.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn with_search_limit(mut self, limit: u32) -> Self {
        self.search_limit = limit.max(1);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, CatalogError> {
        let mut request = self.http.get(url).query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CatalogError::Http(e.to_string()))?;
        let status = response.status();
        debug!(status = %status.as_u16(), url, "catalog response received");
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| CatalogError::Http(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| {
            CatalogError::Decode(format!(
                "{e}; body: {}",
                body.chars().take(200).collect::<String>()
            ))
        })
    }
}

#[async_trait]
impl ModelCatalog for HubClient {
    async fn search(&self, query: &str) -> Result<Vec<RemoteModel>, CatalogError> {
        let url = format!("{}/api/models", self.endpoint);
        let params = [
            ("search", query.to_string()),
            ("library", "gguf".to_string()),
            ("limit", self.search_limit.to_string()),
            ("sort", "downloads".to_string()),
            ("direction", "-1".to_string()),
        ];
        let models: Vec<HubModel> = self.get_json(&url, &params).await?;
        debug!(query, results = models.len(), "catalog search finished");
        Ok(models.into_iter().map(RemoteModel::from).collect())
    }

    async fn list_quantizations(&self, model_id: &str) -> Result<Vec<String>, CatalogError> {
        Ok(self.describe(model_id).await?.quantizations)
    }

    async fn describe(&self, model_id: &str) -> Result<ModelDetails, CatalogError> {
        let url = format!("{}/api/models/{}", self.endpoint, model_id.trim_matches('/'));
        let info: HubModelInfo = self.get_json(&url, &[]).await?;
        Ok(info.into())
    }
}
