use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::Result;
use super::http::JsonClient;
use crate::geometry::RoiGeometry;

/// Layer metadata needed to validate an export request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerMetadata {
    pub id: String,
    pub product_id: String,
    pub product_version: String,
    pub product_type: String,
    pub footprint: RoiGeometry,
    /// Finest resolution the layer was ingested at, degrees per pixel
    pub max_resolution_deg: f64,
}

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn find_layer(&self, catalog_id: &str) -> Result<Option<LayerMetadata>>;
}

pub struct HttpCatalog {
    http: JsonClient,
}

impl HttpCatalog {
    pub fn new(http: JsonClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Catalog for HttpCatalog {
    async fn find_layer(&self, catalog_id: &str) -> Result<Option<LayerMetadata>> {
        self.http
            .get_optional(&format!("records/{catalog_id}"), &[])
            .await
    }
}
