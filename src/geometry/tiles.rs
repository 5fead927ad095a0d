//! WGS84 geographic tile grid (2x1 tiles of 256px at zoom 0)

use geo::{Area, BooleanOps, BoundingRect};
use serde::{Deserialize, Serialize};

use super::roi::RoiGeometry;
use super::{GeometryError, Result};

/// Degrees per pixel at zoom 0
pub const ZOOM_ZERO_RESOLUTION: f64 = 0.703125;
pub const MAX_ZOOM: u8 = 22;

const RESOLUTION_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }
}

/// Resolution (degrees per pixel) of a zoom level
pub fn zoom_resolution(zoom: u8) -> f64 {
    ZOOM_ZERO_RESOLUTION / 2f64.powi(zoom as i32)
}

/// Tile edge length in degrees at `zoom`
pub fn tile_size_deg(zoom: u8) -> f64 {
    180.0 / 2f64.powi(zoom as i32)
}

/// Smallest zoom level whose resolution is at least as fine as `resolution`
pub fn degrees_per_pixel_to_zoom(resolution: f64) -> Result<u8> {
    if !(resolution.is_finite() && resolution > 0.0) {
        return Err(GeometryError::InvalidResolution(resolution));
    }

    let zoom = (0..=MAX_ZOOM)
        .find(|zoom| zoom_resolution(*zoom) <= resolution * (1.0 + RESOLUTION_TOLERANCE))
        .unwrap_or(MAX_ZOOM);

    Ok(zoom)
}

/// Expand `bbox` outward to tile boundaries at `zoom`
pub fn snap_bbox_to_grid(bbox: BBox, zoom: u8) -> Result<BBox> {
    if zoom > MAX_ZOOM {
        return Err(GeometryError::InvalidZoom(zoom));
    }

    let tile = tile_size_deg(zoom);
    let snap_down = |value: f64, origin: f64| ((value - origin) / tile).floor() * tile + origin;
    let snap_up = |value: f64, origin: f64| ((value - origin) / tile).ceil() * tile + origin;

    Ok(BBox {
        min_x: snap_down(bbox.min_x, -180.0).max(-180.0),
        min_y: snap_down(bbox.min_y, -90.0).max(-90.0),
        max_x: snap_up(bbox.max_x, -180.0).min(180.0),
        max_y: snap_up(bbox.max_y, -90.0).min(90.0),
    })
}

/// Number of tiles covering `bbox` at `zoom`
pub fn tile_count(bbox: BBox, zoom: u8) -> Result<u64> {
    let snapped = snap_bbox_to_grid(bbox, zoom)?;
    let tile = tile_size_deg(zoom);
    let columns = ((snapped.max_x - snapped.min_x) / tile).round() as u64;
    let rows = ((snapped.max_y - snapped.min_y) / tile).round() as u64;
    Ok(columns * rows)
}

/// Clip `polygon` to `footprint` and snap the result's bbox to the grid
///
/// Returns `Ok(None)` when the two geometries do not overlap.
pub fn sanitize_bbox(
    polygon: &RoiGeometry,
    footprint: &RoiGeometry,
    zoom: u8,
) -> Result<Option<BBox>> {
    let requested = polygon.to_multi_polygon()?;
    let footprint = footprint.to_multi_polygon()?;

    let intersection = requested.intersection(&footprint);
    if intersection.0.is_empty() || intersection.unsigned_area() == 0.0 {
        return Ok(None);
    }

    let rect = intersection
        .bounding_rect()
        .ok_or(GeometryError::EmptyGeometry)?;
    let bbox = BBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y);

    snap_bbox_to_grid(bbox, zoom).map(Some)
}
