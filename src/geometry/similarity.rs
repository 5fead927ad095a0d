//! ROI equivalence: do two feature collections describe the same export?
//!
//! Matching is greedy first-fit in request order. It is not a maximum
//! matching, so an early pairing can block a later one and the relation is
//! not symmetric.

use geo::{Area, BoundingRect, Buffer, Contains, Coord, MapCoords, MultiPolygon};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::roi::{Roi, RoiGeometry};
use super::{GeometryError, Result};

/// Approximate length of one degree of latitude
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Floor for the longitude scale so polar containers stay non-degenerate
const MIN_LONGITUDE_SCALE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityOptions {
    /// Minimum `area(request) / area(job)` ratio, as a percentage
    pub min_contained_percentage: f64,
    /// Outward tolerance applied to the job geometry when direct containment fails
    pub buffer_meters: f64,
}

impl Default for SimilarityOptions {
    fn default() -> Self {
        Self {
            min_contained_percentage: 90.0,
            buffer_meters: 10.0,
        }
    }
}

/// Whether `job_roi` already covers everything `request_roi` asks for
pub fn is_similar(request_roi: &Roi, job_roi: &Roi, options: &SimilarityOptions) -> bool {
    if request_roi.features.len() != job_roi.features.len() {
        return false;
    }

    let mut consumed = vec![false; job_roi.features.len()];

    'request: for requested in &request_roi.features {
        for (index, candidate) in job_roi.features.iter().enumerate() {
            if consumed[index] || requested.properties != candidate.properties {
                continue;
            }

            if geometry_matches(&requested.geometry, &candidate.geometry, options) {
                consumed[index] = true;
                continue 'request;
            }
        }

        return false;
    }

    true
}

fn geometry_matches(
    contained: &RoiGeometry,
    container: &RoiGeometry,
    options: &SimilarityOptions,
) -> bool {
    match contains_with_ratio(contained, container, options) {
        Ok(matched) => matched,
        Err(error) => {
            debug!(error = %error, "Geometry comparison failed, treating as not similar");
            false
        }
    }
}

fn contains_with_ratio(
    contained: &RoiGeometry,
    container: &RoiGeometry,
    options: &SimilarityOptions,
) -> Result<bool> {
    let inner = contained.to_multi_polygon()?;
    let outer = container.to_multi_polygon()?;

    let outer_area = outer.unsigned_area();
    if !(outer_area > 0.0) {
        return Err(GeometryError::DegenerateArea);
    }

    let ratio = inner.unsigned_area() / outer_area;
    if ratio < options.min_contained_percentage / 100.0 {
        return Ok(false);
    }

    if parts_contained(&inner, &outer) {
        return Ok(true);
    }

    if options.buffer_meters <= 0.0 {
        return Ok(false);
    }

    // Both axes in latitude degrees so the buffer is metric in every direction
    let scale = longitude_scale(&outer)?;
    let to_local = |coord: Coord<f64>| Coord {
        x: coord.x * scale,
        y: coord.y,
    };
    let inner = inner.map_coords(to_local);
    let outer = outer.map_coords(to_local);

    let distance = options.buffer_meters / METERS_PER_DEGREE;
    let buffered = outer.buffer(distance);
    if buffered.0.is_empty() {
        return Err(GeometryError::EmptyBuffer(distance));
    }

    Ok(parts_contained(&inner, &buffered))
}

/// Length of a longitude degree relative to a latitude degree at the
/// container's central latitude
fn longitude_scale(outer: &MultiPolygon<f64>) -> Result<f64> {
    let center = outer
        .bounding_rect()
        .ok_or(GeometryError::EmptyGeometry)?
        .center();

    Ok(center.y.to_radians().cos().max(MIN_LONGITUDE_SCALE))
}

/// Every part of `inner` must sit inside some part of `outer`
fn parts_contained(inner: &MultiPolygon<f64>, outer: &MultiPolygon<f64>) -> bool {
    inner
        .0
        .iter()
        .all(|part| outer.0.iter().any(|container| container.contains(part)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::roi::{RoiFeature, RoiProperties};

    const MAX_RES: f64 = 0.0000429153442382812;
    const MIN_RES: f64 = 0.703125;

    fn feature(geometry: RoiGeometry) -> RoiFeature {
        RoiFeature {
            geometry,
            properties: RoiProperties::new(MAX_RES, MIN_RES),
        }
    }

    fn rect_roi(rects: &[(f64, f64, f64, f64)]) -> Roi {
        Roi::new(
            rects
                .iter()
                .map(|(a, b, c, d)| feature(RoiGeometry::rectangle(*a, *b, *c, *d)))
                .collect(),
        )
    }

    fn options(min_contained_percentage: f64) -> SimilarityOptions {
        SimilarityOptions {
            min_contained_percentage,
            buffer_meters: 0.0,
        }
    }

    #[test]
    fn test_identical_rois_are_similar() {
        let roi = rect_roi(&[(34.0, 31.0, 35.0, 32.0)]);
        assert!(is_similar(&roi, &roi, &SimilarityOptions::default()));
    }

    #[test]
    fn test_feature_count_mismatch() {
        let request = rect_roi(&[(0.0, 0.0, 1.0, 1.0)]);
        let job = rect_roi(&[(0.0, 0.0, 1.0, 1.0), (2.0, 2.0, 3.0, 3.0)]);
        assert!(!is_similar(&request, &job, &options(0.0)));
    }

    #[test]
    fn test_count_mismatch_short_circuits_broken_geometry() {
        let broken = Roi::new(vec![feature(RoiGeometry::Polygon(vec![]))]);
        let job = Roi::new(vec![]);
        assert!(!is_similar(&broken, &job, &options(0.0)));
    }

    #[test]
    fn test_contained_above_threshold() {
        let request = rect_roi(&[(0.05, 0.05, 9.95, 9.95)]);
        let job = rect_roi(&[(0.0, 0.0, 10.0, 10.0)]);
        assert!(is_similar(&request, &job, &options(90.0)));
    }

    #[test]
    fn test_contained_below_threshold() {
        let request = rect_roi(&[(1.0, 1.0, 5.0, 5.0)]);
        let job = rect_roi(&[(0.0, 0.0, 10.0, 10.0)]);
        assert!(!is_similar(&request, &job, &options(90.0)));
    }

    #[test]
    fn test_ratio_exactly_at_threshold_is_accepted() {
        let request = rect_roi(&[(0.5, 0.5, 1.5, 1.5)]);
        let job = rect_roi(&[(0.0, 0.0, 2.0, 2.0)]);
        assert!(is_similar(&request, &job, &options(25.0)));
        assert!(!is_similar(&request, &job, &options(25.000001)));
    }

    #[test]
    fn test_resolution_properties_must_match() {
        let request = rect_roi(&[(0.0, 0.0, 1.0, 1.0)]);
        let mut job = request.clone();
        job.features[0].properties.max_resolution_deg = Some(MAX_RES * 2.0);
        assert!(!is_similar(&request, &job, &options(0.0)));
    }

    #[test]
    fn test_buffer_tolerates_slight_overhang() {
        // Overhangs the job by ~5.5m on the east edge
        let request = rect_roi(&[(0.0, 0.0, 0.01005, 0.01)]);
        let job = rect_roi(&[(0.0, 0.0, 0.01, 0.01)]);

        assert!(!is_similar(&request, &job, &options(90.0)));

        let buffered = SimilarityOptions {
            min_contained_percentage: 90.0,
            buffer_meters: 10.0,
        };
        assert!(is_similar(&request, &job, &buffered));
    }

    #[test]
    fn test_containment_is_not_symmetric() {
        let small = rect_roi(&[(1.0, 1.0, 2.0, 2.0)]);
        let large = rect_roi(&[(0.0, 0.0, 3.0, 3.0)]);

        assert!(is_similar(&small, &large, &options(10.0)));
        assert!(!is_similar(&large, &small, &options(10.0)));
    }

    #[test]
    fn test_greedy_first_fit_is_order_sensitive() {
        // Job X covers both request features, job Y only covers A
        let job = rect_roi(&[(0.0, 0.0, 10.0, 10.0), (0.0, 0.0, 4.0, 4.0)]);
        let a_then_b = rect_roi(&[(1.0, 1.0, 3.0, 3.0), (5.0, 5.0, 9.0, 9.0)]);
        let b_then_a = rect_roi(&[(5.0, 5.0, 9.0, 9.0), (1.0, 1.0, 3.0, 3.0)]);

        // A grabs X first, leaving nothing that contains B
        assert!(!is_similar(&a_then_b, &job, &options(1.0)));
        assert!(is_similar(&b_then_a, &job, &options(1.0)));
    }

    #[test]
    fn test_polygon_inside_multi_polygon() {
        let square = |min: f64, max: f64| {
            vec![vec![
                vec![min, min],
                vec![max, min],
                vec![max, max],
                vec![min, max],
                vec![min, min],
            ]]
        };
        let container = RoiGeometry::MultiPolygon(vec![square(0.0, 2.0), square(5.0, 7.0)]);
        let request = Roi::new(vec![feature(RoiGeometry::rectangle(5.5, 5.5, 6.5, 6.5))]);
        let job = Roi::new(vec![feature(container)]);

        assert!(is_similar(&request, &job, &options(10.0)));
    }

    #[test]
    fn test_multi_polygon_parts_split_across_container_parts() {
        let ring = |min: f64, max: f64| {
            vec![vec![
                vec![min, min],
                vec![max, min],
                vec![max, max],
                vec![min, max],
                vec![min, min],
            ]]
        };
        let parts = |offset: f64| {
            vec![
                ring(0.0 + offset, 2.0 - offset),
                ring(5.0 + offset, 7.0 - offset),
            ]
        };
        let request = Roi::new(vec![feature(RoiGeometry::MultiPolygon(parts(0.1)))]);
        let job = Roi::new(vec![feature(RoiGeometry::MultiPolygon(parts(0.0)))]);

        assert!(is_similar(&request, &job, &options(50.0)));
    }

    #[test]
    fn test_buffer_is_metric_at_high_latitude() {
        // degrees of longitude per metre at 60N
        let meter_x = 1.0 / (METERS_PER_DEGREE * 60f64.to_radians().cos());
        let job = rect_roi(&[(0.0, 60.0, 0.01, 60.01)]);
        let buffered = SimilarityOptions {
            min_contained_percentage: 90.0,
            buffer_meters: 10.0,
        };

        let seven_meters_east = rect_roi(&[(0.0, 60.0, 0.01 + 7.0 * meter_x, 60.01)]);
        assert!(is_similar(&seven_meters_east, &job, &buffered));

        let fifteen_meters_east = rect_roi(&[(0.0, 60.0, 0.01 + 15.0 * meter_x, 60.01)]);
        assert!(!is_similar(&fifteen_meters_east, &job, &buffered));
    }

    #[test]
    fn test_longitude_scale() {
        let equator = RoiGeometry::rectangle(0.0, -1.0, 1.0, 1.0).to_multi_polygon().unwrap();
        let north = RoiGeometry::rectangle(0.0, 59.0, 1.0, 61.0).to_multi_polygon().unwrap();

        assert!((longitude_scale(&equator).unwrap() - 1.0).abs() < 1e-12);
        assert!((longitude_scale(&north).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_geometry_errors_fail_closed() {
        let request = rect_roi(&[(0.0, 0.0, 1.0, 1.0)]);
        let degenerate = Roi::new(vec![feature(RoiGeometry::rectangle(0.0, 0.0, 0.0, 0.0))]);
        let broken = Roi::new(vec![feature(RoiGeometry::Polygon(vec![vec![vec![0.0, 0.0]]]))]);

        assert!(!is_similar(&request, &degenerate, &options(0.0)));
        assert!(!is_similar(&request, &broken, &options(0.0)));
    }
}
