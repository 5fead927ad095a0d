use bon::Builder;
use chrono::{Duration, Utc};
use serde_json::Map;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::capacity::{CapacityChecker, estimate_package_size};
use super::duplication::{DuplicateHit, DuplicateQuery, DuplicationResolver, ProcessingHandle};
use super::error::{ExportError, Result};
use super::validation::validate_roi;
use crate::clients::{Catalog, JobStore, LayerMetadata};
use crate::geometry::{Roi, RoiProperties};
use crate::jobs::{
    CallbackOutcome, CallbackTarget, CleanupData, JobParameters, NewJob, OperationStatus,
};
use crate::observability::Metrics;

pub const DEFAULT_CRS: &str = "EPSG:4326";

#[derive(Debug, Clone, Builder)]
#[builder(on(String, into))]
pub struct ExportRequest {
    pub catalog_record_id: String,
    /// Defaults to the whole layer footprint at the layer's finest resolution
    pub roi: Option<Roi>,
    #[builder(default = DEFAULT_CRS.to_string())]
    pub crs: String,
    #[builder(default)]
    pub callbacks: Vec<CallbackTarget>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportResponse {
    Created { job_id: Uuid, status: OperationStatus },
    Completed(CallbackOutcome),
    Processing(ProcessingHandle),
}

#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub job_type: String,
    pub tile_size_bytes: u64,
    pub expiration_days: u32,
}

/// Entry point for export requests: validate, reuse, admit, create
pub struct ExportService {
    catalog: Arc<dyn Catalog>,
    store: Arc<dyn JobStore>,
    resolver: DuplicationResolver,
    capacity: CapacityChecker,
    settings: ExportSettings,
    metrics: Arc<Metrics>,
}

impl ExportService {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        store: Arc<dyn JobStore>,
        resolver: DuplicationResolver,
        capacity: CapacityChecker,
        settings: ExportSettings,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            catalog,
            store,
            resolver,
            capacity,
            settings,
            metrics,
        }
    }

    pub async fn create_export(&self, request: ExportRequest) -> Result<ExportResponse> {
        let layer = self
            .catalog
            .find_layer(&request.catalog_record_id)
            .await?
            .ok_or_else(|| ExportError::NotFound(format!("layer {}", request.catalog_record_id)))?;

        let roi = request.roi.clone().unwrap_or_else(|| default_roi(&layer));
        let features = validate_roi(&roi, &layer)?;

        let query = DuplicateQuery {
            resource_id: layer.product_id.clone(),
            version: layer.product_version.clone(),
            catalog_id: layer.id.clone(),
            roi: roi.clone(),
            crs: request.crs.clone(),
            callbacks: request.callbacks.clone(),
        };

        match self.resolver.check_for_duplicate(&query).await? {
            Some(DuplicateHit::Completed(outcome)) => return Ok(ExportResponse::Completed(outcome)),
            Some(DuplicateHit::Processing(handle)) => return Ok(ExportResponse::Processing(handle)),
            None => {}
        }

        let estimated = estimate_package_size(&features, self.settings.tile_size_bytes)?;
        self.capacity.ensure_capacity(estimated).await?;

        let job = self.new_job(&layer, roi, request, estimated);
        let job_id = self.store.create_job(&job).await?;
        self.metrics.job_created();

        info!(%job_id, catalog_id = %layer.id, estimated_bytes = estimated, "Export job created");
        Ok(ExportResponse::Created {
            job_id,
            status: OperationStatus::Pending,
        })
    }

    fn new_job(
        &self,
        layer: &LayerMetadata,
        roi: Roi,
        request: ExportRequest,
        estimated: u64,
    ) -> NewJob {
        let directory = Uuid::now_v7().to_string();
        let package_name = format!(
            "{}_{}_{}.gpkg",
            layer.product_id,
            layer.product_version.replace('.', "_"),
            Utc::now().format("%Y_%m_%dT%H_%M_%SZ")
        );
        let expiration = Utc::now() + Duration::days(i64::from(self.settings.expiration_days));

        NewJob {
            resource_id: layer.product_id.clone(),
            version: layer.product_version.clone(),
            internal_id: layer.id.clone(),
            job_type: self.settings.job_type.clone(),
            product_type: layer.product_type.clone(),
            description: request.description,
            status: OperationStatus::Pending,
            percentage: 0,
            parameters: JobParameters {
                roi,
                crs: request.crs,
                callbacks: request.callbacks,
                callback_params: None,
                package_relative_path: format!("{directory}/{package_name}"),
                estimated_size_bytes: estimated,
                cleanup_data: CleanupData {
                    directory_path: Some(directory),
                    cleanup_expiration_time_utc: Some(expiration),
                },
                additional_params: Map::new(),
            },
        }
    }
}

fn default_roi(layer: &LayerMetadata) -> Roi {
    Roi::single(
        layer.footprint.clone(),
        RoiProperties {
            max_resolution_deg: Some(layer.max_resolution_deg),
            min_resolution_deg: crate::geometry::tiles::ZOOM_ZERO_RESOLUTION,
        },
    )
}
