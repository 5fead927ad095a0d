//! ROI feature collections as they travel over the wire

use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};

use super::tiles::ZOOM_ZERO_RESOLUTION;
use super::{GeometryError, Result};

/// GeoJSON position; altitude and extra members are ignored
pub type Position = Vec<f64>;

/// Polygonal GeoJSON geometry (the only kinds an export ROI may carry)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum RoiGeometry {
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

/// Per-feature resolution bounds in degrees per pixel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoiProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_resolution_deg: Option<f64>,
    #[serde(default = "default_min_resolution_deg")]
    pub min_resolution_deg: f64,
}

fn default_min_resolution_deg() -> f64 {
    ZOOM_ZERO_RESOLUTION
}

impl RoiProperties {
    pub fn new(max_resolution_deg: f64, min_resolution_deg: f64) -> Self {
        Self {
            max_resolution_deg: Some(max_resolution_deg),
            min_resolution_deg,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct RoiFeature {
    pub geometry: RoiGeometry,
    pub properties: RoiProperties,
}

/// Region of interest: a feature collection of polygonal features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct Roi {
    pub features: Vec<RoiFeature>,
}

impl Roi {
    pub fn new(features: Vec<RoiFeature>) -> Self {
        Self { features }
    }

    /// Single-feature ROI covering `geometry`
    pub fn single(geometry: RoiGeometry, properties: RoiProperties) -> Self {
        Self {
            features: vec![RoiFeature {
                geometry,
                properties,
            }],
        }
    }
}

impl RoiGeometry {
    /// Axis-aligned rectangle, mostly handy for fixtures and layer footprints
    pub fn rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        RoiGeometry::Polygon(vec![vec![
            vec![min_x, min_y],
            vec![max_x, min_y],
            vec![max_x, max_y],
            vec![min_x, max_y],
            vec![min_x, min_y],
        ]])
    }

    /// Convert into constituent `geo` polygons
    ///
    /// A Polygon yields one part; a MultiPolygon yields one part per member.
    pub fn to_multi_polygon(&self) -> Result<MultiPolygon<f64>> {
        let polygons = match self {
            RoiGeometry::Polygon(rings) => vec![to_polygon(rings)?],
            RoiGeometry::MultiPolygon(members) => members
                .iter()
                .map(|rings| to_polygon(rings))
                .collect::<Result<Vec<_>>>()?,
        };

        if polygons.is_empty() {
            return Err(GeometryError::EmptyGeometry);
        }

        Ok(MultiPolygon::new(polygons))
    }
}

fn to_polygon(rings: &[Vec<Position>]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| to_line_string(ring));
    let exterior = rings.next().ok_or(GeometryError::EmptyGeometry)??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn to_line_string(ring: &[Position]) -> Result<LineString<f64>> {
    if ring.len() < 4 {
        return Err(GeometryError::RingTooShort(ring.len()));
    }

    let coords = ring
        .iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Coord { x: *x, y: *y }),
            _ => Err(GeometryError::InvalidPosition),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(LineString::new(coords))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_feature_collection() {
        let value = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[
                        [34.0, 31.0], [35.0, 31.0], [35.0, 32.0], [34.0, 32.0], [34.0, 31.0]
                    ]]
                },
                "properties": {
                    "maxResolutionDeg": 0.0000429153442382812,
                    "minResolutionDeg": 0.703125
                }
            }]
        });

        let roi: Roi = serde_json::from_value(value).unwrap();
        assert_eq!(roi.features.len(), 1);
        assert_eq!(
            roi.features[0].properties.max_resolution_deg,
            Some(0.0000429153442382812)
        );
        assert_eq!(roi.features[0].geometry, RoiGeometry::rectangle(34.0, 31.0, 35.0, 32.0));
    }

    #[test]
    fn test_missing_resolution_properties() {
        let value = json!({
            "type": "Feature",
            "geometry": { "type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]] },
            "properties": {}
        });

        let feature: RoiFeature = serde_json::from_value(value).unwrap();
        assert_eq!(feature.properties.max_resolution_deg, None);
        assert_eq!(feature.properties.min_resolution_deg, ZOOM_ZERO_RESOLUTION);
    }

    #[test]
    fn test_rejects_non_polygonal_geometry() {
        let value = json!({ "type": "Point", "coordinates": [1.0, 2.0] });
        assert!(serde_json::from_value::<RoiGeometry>(value).is_err());
    }

    #[test]
    fn test_multi_polygon_parts() {
        let geometry = RoiGeometry::MultiPolygon(vec![
            vec![vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![1.0, 1.0], vec![0.0, 0.0]]],
            vec![vec![vec![2.0, 2.0], vec![3.0, 2.0], vec![3.0, 3.0], vec![2.0, 2.0]]],
        ]);

        assert_eq!(geometry.to_multi_polygon().unwrap().0.len(), 2);
    }

    #[test]
    fn test_short_ring_is_an_error() {
        let geometry = RoiGeometry::Polygon(vec![vec![vec![0.0, 0.0], vec![1.0, 1.0]]]);
        assert_eq!(
            geometry.to_multi_polygon().unwrap_err(),
            GeometryError::RingTooShort(2)
        );
    }

    #[test]
    fn test_non_finite_position_is_an_error() {
        let geometry = RoiGeometry::Polygon(vec![vec![
            vec![0.0, 0.0],
            vec![f64::NAN, 0.0],
            vec![1.0, 1.0],
            vec![0.0, 0.0],
        ]]);
        assert_eq!(
            geometry.to_multi_polygon().unwrap_err(),
            GeometryError::InvalidPosition
        );
    }
}
