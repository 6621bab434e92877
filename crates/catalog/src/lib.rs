//! Remote model catalog: search, metadata and quantization listing.

pub mod hub;
pub mod quant;

use async_trait::async_trait;
use proto::{CatalogError, ModelDetails, RemoteModel};

pub use hub::{DEFAULT_ENDPOINT, DEFAULT_SEARCH_LIMIT, HubClient};
pub use quant::quantizations_from_files;

/// A searchable catalog of downloadable models.
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    /// Searches the catalog for GGUF models matching `query`.
    async fn search(&self, query: &str) -> Result<Vec<RemoteModel>, CatalogError>;

    /// Lists quantization labels available for `model_id`. Empty when the
    /// repository publishes none.
    async fn list_quantizations(&self, model_id: &str) -> Result<Vec<String>, CatalogError>;

    /// Fetches full metadata for `model_id`.
    async fn describe(&self, model_id: &str) -> Result<ModelDetails, CatalogError>;
}
