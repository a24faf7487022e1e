use std::path::Path;

use geojson::{Feature, GeoJson, Value as GeoJsonValue};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Name normalization
// ---------------------------------------------------------------------------

/// Join key for municipality names: NFKD decomposition with combining marks
/// dropped, upper-cased, whitespace trimmed and collapsed.
///
/// `normalize_name("São Mateus") == normalize_name("SAO  MATEUS") == "SAO MATEUS"`.
pub fn normalize_name(name: &str) -> String {
    let stripped: String = name.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    stripped
        .to_uppercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Boundary polygons
// ---------------------------------------------------------------------------

/// A named region from the boundary file.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryPolygon {
    pub name: String,
    /// `normalize_name(name)`.
    pub key: String,
    /// Exterior ring of every polygon part, as `[lon, lat]` points.
    pub rings: Vec<Vec<[f64; 2]>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundarySet {
    pub regions: Vec<BoundaryPolygon>,
}

impl BoundarySet {
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// `([min_lon, min_lat], [max_lon, max_lat])` over every ring point.
    pub fn bounds(&self) -> Option<([f64; 2], [f64; 2])> {
        let mut points = self.regions.iter().flat_map(|r| r.rings.iter().flatten());
        let first = *points.next()?;
        Some(points.fold((first, first), |(lo, hi), p| {
            (
                [lo[0].min(p[0]), lo[1].min(p[1])],
                [hi[0].max(p[0]), hi[1].max(p[1])],
            )
        }))
    }
}

/// Load a GeoJSON FeatureCollection, naming each region by the string
/// property `name_property`.
pub fn load_boundaries(path: &Path, name_property: &str) -> Result<BoundarySet> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::BoundaryFileMissing(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    let set = parse_boundaries(&text, name_property)?;
    log::info!(
        "Loaded {} boundary regions from {}",
        set.len(),
        path.display()
    );
    Ok(set)
}

/// Like [`load_boundaries`], but any failure only costs the map view.
pub fn try_load_boundaries(path: &Path, name_property: &str) -> Option<BoundarySet> {
    match load_boundaries(path, name_property) {
        Ok(set) => Some(set),
        Err(e) => {
            log::warn!("Geographic view disabled: {e}");
            None
        }
    }
}

/// Parse GeoJSON text into regions. A bare Feature is accepted as a
/// one-region collection.
pub fn parse_boundaries(text: &str, name_property: &str) -> Result<BoundarySet> {
    let features = match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(_) => {
            log::warn!("Boundary file holds a bare geometry with no region names");
            Vec::new()
        }
    };

    let regions = features
        .iter()
        .enumerate()
        .filter_map(|(i, feature)| feature_to_region(i, feature, name_property))
        .collect();
    Ok(BoundarySet { regions })
}

fn feature_to_region(index: usize, feature: &Feature, name_property: &str) -> Option<BoundaryPolygon> {
    let Some(name) = feature.property(name_property).and_then(|v| v.as_str()) else {
        log::warn!("Boundary feature {index} has no '{name_property}' property; skipped");
        return None;
    };

    let rings = match feature.geometry.as_ref().map(|g| &g.value) {
        Some(GeoJsonValue::Polygon(polygon)) => exterior(polygon).into_iter().collect(),
        Some(GeoJsonValue::MultiPolygon(parts)) => parts.iter().filter_map(|p| exterior(p)).collect(),
        other => {
            log::warn!(
                "Boundary feature '{name}' has unsupported geometry {:?}; skipped",
                other.map(geometry_kind)
            );
            return None;
        }
    };

    Some(BoundaryPolygon {
        name: name.to_string(),
        key: normalize_name(name),
        rings,
    })
}

fn exterior(polygon: &[Vec<Vec<f64>>]) -> Option<Vec<[f64; 2]>> {
    let ring = polygon.first()?;
    Some(
        ring.iter()
            .filter(|pos| pos.len() >= 2)
            .map(|pos| [pos[0], pos[1]])
            .collect(),
    )
}

fn geometry_kind(value: &GeoJsonValue) -> &'static str {
    match value {
        GeoJsonValue::Point(_) => "Point",
        GeoJsonValue::MultiPoint(_) => "MultiPoint",
        GeoJsonValue::LineString(_) => "LineString",
        GeoJsonValue::MultiLineString(_) => "MultiLineString",
        GeoJsonValue::Polygon(_) => "Polygon",
        GeoJsonValue::MultiPolygon(_) => "MultiPolygon",
        GeoJsonValue::GeometryCollection(_) => "GeometryCollection",
    }
}
