//! ROI checks against the source layer, run before any duplicate lookup

use crate::clients::LayerMetadata;
use crate::geometry::{BBox, Roi, degrees_per_pixel_to_zoom, sanitize_bbox};

use super::error::{ExportError, Result};

/// A feature that passed validation, ready for size estimation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatedFeature {
    /// Footprint-clipped bbox snapped to the grid at `max_zoom`
    pub bbox: BBox,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

pub fn validate_roi(roi: &Roi, layer: &LayerMetadata) -> Result<Vec<ValidatedFeature>> {
    if roi.features.is_empty() {
        return Err(ExportError::Validation("ROI has no features".to_string()));
    }

    let layer_max_zoom = degrees_per_pixel_to_zoom(layer.max_resolution_deg)?;

    roi.features
        .iter()
        .enumerate()
        .map(|(index, feature)| {
            let max_resolution = feature.properties.max_resolution_deg.ok_or_else(|| {
                ExportError::Validation(format!("feature {index} is missing maxResolutionDeg"))
            })?;

            let max_zoom = degrees_per_pixel_to_zoom(max_resolution)?;
            if max_zoom > layer_max_zoom {
                return Err(ExportError::Validation(format!(
                    "feature {index} requests zoom {max_zoom}, \
                     layer {} only reaches zoom {layer_max_zoom}",
                    layer.id
                )));
            }

            let min_zoom = degrees_per_pixel_to_zoom(feature.properties.min_resolution_deg)?;
            if max_zoom < min_zoom {
                return Err(ExportError::Validation(format!(
                    "feature {index} maxResolutionDeg {max_resolution} \
                     is coarser than minResolutionDeg {}",
                    feature.properties.min_resolution_deg
                )));
            }

            let bbox = sanitize_bbox(&feature.geometry, &layer.footprint, max_zoom)?
                .ok_or_else(|| {
                    ExportError::Validation(format!(
                        "feature {index} does not intersect the footprint of layer {}",
                        layer.id
                    ))
                })?;

            Ok(ValidatedFeature {
                bbox,
                min_zoom,
                max_zoom,
            })
        })
        .collect()
}
