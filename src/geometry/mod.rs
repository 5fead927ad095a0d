//! Geometry helpers for export requests
//!
//! - [`roi`] - GeoJSON-shaped ROI types and their conversion to `geo` polygons
//! - [`similarity`] - ROI equivalence under containment/buffer tolerance
//! - [`tiles`] - WGS84 geographic tile grid arithmetic and bbox sanitization
//!
//! Similarity checks fail closed: any geometry error is reported as "not
//! similar". Sanitization errors propagate to the caller.

pub mod roi;
pub mod similarity;
pub mod tiles;

pub use roi::{Roi, RoiFeature, RoiGeometry, RoiProperties};
pub use similarity::{SimilarityOptions, is_similar};
pub use tiles::{BBox, degrees_per_pixel_to_zoom, sanitize_bbox, snap_bbox_to_grid, tile_count};

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("polygon ring has {0} positions, at least 4 are required")]
    RingTooShort(usize),

    #[error("position must have at least 2 finite coordinates")]
    InvalidPosition,

    #[error("geometry has no polygons")]
    EmptyGeometry,

    #[error("container geometry has zero area")]
    DegenerateArea,

    #[error("buffering by {0} degrees produced an empty geometry")]
    EmptyBuffer(f64),

    #[error("resolution must be a positive finite number, got {0}")]
    InvalidResolution(f64),

    #[error("zoom level {0} is outside the supported range")]
    InvalidZoom(u8),
}

pub type Result<T> = std::result::Result<T, GeometryError>;
