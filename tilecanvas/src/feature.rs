//! Normalized vector features, loaded from GeoJSON.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use geo_types::{
    Coord, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon, coord,
};
use serde_json::{Map, Value};

use crate::position::GeoBounds;

/// Process-unique identity of a [`Feature`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureId(u64);

impl FeatureId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "feature-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryType {
    Point,
    MultiPoint,
    LineString,
    MultiLineString,
    Polygon,
    MultiPolygon,
}

impl GeometryType {
    /// Type of the geometry named as in GeoJSON's `type` member.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Point" => Self::Point,
            "MultiPoint" => Self::MultiPoint,
            "LineString" => Self::LineString,
            "MultiLineString" => Self::MultiLineString,
            "Polygon" => Self::Polygon,
            "MultiPolygon" => Self::MultiPolygon,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::MultiPoint => "MultiPoint",
            Self::LineString => "LineString",
            Self::MultiLineString => "MultiLineString",
            Self::Polygon => "Polygon",
            Self::MultiPolygon => "MultiPolygon",
        }
    }

    pub fn family(&self) -> FeatureFamily {
        match self {
            Self::Point | Self::MultiPoint => FeatureFamily::Points,
            Self::LineString | Self::MultiLineString => FeatureFamily::Lines,
            Self::Polygon | Self::MultiPolygon => FeatureFamily::Shapes,
        }
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kinds of geometry drawn the same way, and kept in the same layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureFamily {
    Points,
    Lines,
    Shapes,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GeometryError {
    #[error("unsupported geometry type '{0}'")]
    Unsupported(String),

    #[error("malformed {geometry_type} coordinates: {reason}")]
    Malformed {
        geometry_type: GeometryType,
        reason: String,
    },
}

/// Geometry of a feature. Coordinates are (longitude, latitude).
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point),
    MultiPoint(MultiPoint),
    LineString(LineString),
    MultiLineString(MultiLineString),
    Polygon(Polygon),
    MultiPolygon(MultiPolygon),
}

impl Geometry {
    /// Parse a GeoJSON geometry object.
    pub fn from_geojson(value: &Value) -> Result<Self, GeometryError> {
        let name = value.get("type").and_then(Value::as_str).unwrap_or_default();
        let geometry_type =
            GeometryType::from_name(name).ok_or_else(|| GeometryError::Unsupported(name.into()))?;

        let malformed = |reason: &str| GeometryError::Malformed {
            geometry_type,
            reason: reason.to_owned(),
        };

        let coordinates = value
            .get("coordinates")
            .ok_or_else(|| malformed("no coordinates"))?;

        Ok(match geometry_type {
            GeometryType::Point => Self::Point(Point(position(coordinates).map_err(malformed)?)),
            GeometryType::MultiPoint => Self::MultiPoint(
                positions(coordinates)
                    .map_err(malformed)?
                    .into_iter()
                    .map(Point)
                    .collect(),
            ),
            GeometryType::LineString => {
                Self::LineString(LineString(positions(coordinates).map_err(malformed)?))
            }
            GeometryType::MultiLineString => Self::MultiLineString(MultiLineString(
                nested(coordinates, positions)
                    .map_err(malformed)?
                    .into_iter()
                    .map(LineString)
                    .collect(),
            )),
            GeometryType::Polygon => Self::Polygon(polygon(coordinates).map_err(malformed)?),
            GeometryType::MultiPolygon => Self::MultiPolygon(MultiPolygon(
                nested(coordinates, polygon).map_err(malformed)?,
            )),
        })
    }

    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Self::Point(_) => GeometryType::Point,
            Self::MultiPoint(_) => GeometryType::MultiPoint,
            Self::LineString(_) => GeometryType::LineString,
            Self::MultiLineString(_) => GeometryType::MultiLineString,
            Self::Polygon(_) => GeometryType::Polygon,
            Self::MultiPolygon(_) => GeometryType::MultiPolygon,
        }
    }

    pub fn family(&self) -> FeatureFamily {
        self.geometry_type().family()
    }

    /// Geographical bounding box, `None` if there are no coordinates at all.
    pub fn bounds(&self) -> Option<GeoBounds> {
        match self {
            Self::Point(point) => GeoBounds::of_coords([&point.0]),
            Self::MultiPoint(points) => GeoBounds::of_coords(points.0.iter().map(|p| &p.0)),
            Self::LineString(line) => GeoBounds::of_coords(&line.0),
            Self::MultiLineString(lines) => {
                GeoBounds::of_coords(lines.0.iter().flat_map(|line| &line.0))
            }
            Self::Polygon(polygon) => GeoBounds::of_coords(polygon_coords(polygon)),
            Self::MultiPolygon(polygons) => {
                GeoBounds::of_coords(polygons.0.iter().flat_map(polygon_coords))
            }
        }
    }
}

fn polygon_coords(polygon: &Polygon) -> impl Iterator<Item = &Coord> {
    polygon
        .exterior()
        .0
        .iter()
        .chain(polygon.interiors().iter().flat_map(|ring| &ring.0))
}

fn position(value: &Value) -> Result<Coord, &'static str> {
    let Some([x, y, ..]) = value.as_array().map(Vec::as_slice) else {
        return Err("position is not an array of at least two numbers");
    };

    match (x.as_f64(), y.as_f64()) {
        (Some(x), Some(y)) => Ok(coord! { x: x, y: y }),
        _ => Err("position is not numeric"),
    }
}

fn positions(value: &Value) -> Result<Vec<Coord>, &'static str> {
    nested(value, position)
}

fn nested<T>(
    value: &Value,
    item: impl Fn(&Value) -> Result<T, &'static str>,
) -> Result<Vec<T>, &'static str> {
    value
        .as_array()
        .ok_or("expected an array")?
        .iter()
        .map(item)
        .collect()
}

fn polygon(value: &Value) -> Result<Polygon, &'static str> {
    let mut rings = nested(value, positions)?.into_iter().map(LineString);
    let exterior = rings.next().ok_or("polygon has no rings")?;
    Ok(Polygon::new(exterior, rings.collect()))
}

/// Single, normalized geometry together with its attributes and provenance.
#[derive(Debug, Clone)]
pub struct Feature {
    pub id: FeatureId,

    /// `None` when the source geometry could not be used.
    pub geometry: Option<Geometry>,

    pub properties: Map<String, Value>,

    /// Load order, which is also the drawing order within a layer.
    pub sequence_index: usize,

    /// Name of the collection the feature was found in, if any.
    pub collection_name: Option<String>,

    /// Names of the enclosing collections, outermost first.
    pub parent_chain: Vec<String>,

    /// Copy of the source record.
    pub raw: Value,
}

impl Feature {
    /// Build a feature from a GeoJSON `Feature` object, or from a bare geometry object.
    ///
    /// Geometry which cannot be used is logged and leaves the feature without geometry.
    pub fn from_raw(
        raw: &Value,
        sequence_index: usize,
        collection_name: Option<String>,
        parent_chain: Vec<String>,
    ) -> Self {
        let properties = raw
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let geometry = match raw.get("geometry") {
            Some(Value::Null) => None,
            Some(geometry) => Some(geometry),
            None if raw.get("coordinates").is_some() => Some(raw),
            None => None,
        };

        Self::with_geometry(
            geometry,
            properties,
            raw.clone(),
            sequence_index,
            collection_name,
            parent_chain,
        )
    }

    fn with_geometry(
        geometry: Option<&Value>,
        properties: Map<String, Value>,
        raw: Value,
        sequence_index: usize,
        collection_name: Option<String>,
        parent_chain: Vec<String>,
    ) -> Self {
        let geometry = geometry.and_then(|geometry| {
            Geometry::from_geojson(geometry)
                .inspect_err(|err| log::warn!("Feature #{sequence_index} has no geometry: {err}."))
                .ok()
        });

        Self {
            id: FeatureId::next(),
            geometry,
            properties,
            sequence_index,
            collection_name,
            parent_chain,
            raw,
        }
    }

    pub fn geometry_type(&self) -> Option<GeometryType> {
        self.geometry.as_ref().map(Geometry::geometry_type)
    }

    pub fn family(&self) -> Option<FeatureFamily> {
        self.geometry.as_ref().map(Geometry::family)
    }

    pub fn bounds(&self) -> Option<GeoBounds> {
        self.geometry.as_ref().and_then(Geometry::bounds)
    }

    /// Property as text. Strings are taken as they are, other values are formatted as JSON.
    pub fn text_property(&self, key: &str) -> Option<String> {
        match self.properties.get(key)? {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Turns GeoJSON documents into features, numbering them in load order across all loads.
#[derive(Debug, Default)]
pub struct FeatureLoader {
    next_index: usize,
}

impl FeatureLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence index the next loaded feature will get.
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Every leaf geometry of a `FeatureCollection`, `Feature`, `GeometryCollection` or a bare
    /// geometry, depth first.
    pub fn load(&mut self, geojson: &Value) -> Vec<Feature> {
        let mut features = Vec::new();
        self.walk(geojson, &mut Vec::new(), &mut features);
        log::debug!("Loaded {} feature(s).", features.len());
        features
    }

    fn walk(&mut self, value: &Value, chain: &mut Vec<String>, features: &mut Vec<Feature>) {
        match value.get("type").and_then(Value::as_str) {
            Some("FeatureCollection") => {
                let members = value.get("features").and_then(Value::as_array);
                chain.push(ancestry_name(value, "FeatureCollection"));
                for member in members.into_iter().flatten() {
                    self.walk(member, chain, features);
                }
                chain.pop();
            }
            Some("Feature") => {
                let geometry = value.get("geometry").unwrap_or(&Value::Null);
                if is_geometry_collection(geometry) {
                    let properties = value
                        .get("properties")
                        .and_then(Value::as_object)
                        .cloned()
                        .unwrap_or_default();

                    chain.push(ancestry_name(value, "Feature"));
                    self.walk_geometries(geometry, &properties, chain, features);
                    chain.pop();
                } else {
                    let index = self.take_index();
                    features.push(Feature::from_raw(
                        value,
                        index,
                        chain.last().cloned(),
                        chain.clone(),
                    ));
                }
            }
            Some("GeometryCollection") => {
                self.walk_geometries(value, &Map::new(), chain, features);
            }
            Some(_) if value.get("coordinates").is_some() => {
                let index = self.take_index();
                features.push(Feature::from_raw(
                    value,
                    index,
                    chain.last().cloned(),
                    chain.clone(),
                ));
            }
            other => {
                log::warn!("Skipping GeoJSON object of type {other:?}.");
            }
        }
    }

    /// Leaves of a `GeometryCollection`, sharing properties of the enclosing feature.
    fn walk_geometries(
        &mut self,
        collection: &Value,
        properties: &Map<String, Value>,
        chain: &mut Vec<String>,
        features: &mut Vec<Feature>,
    ) {
        chain.push(ancestry_name(collection, "GeometryCollection"));

        let geometries = collection.get("geometries").and_then(Value::as_array);
        for geometry in geometries.into_iter().flatten() {
            if is_geometry_collection(geometry) {
                self.walk_geometries(geometry, properties, chain, features);
            } else {
                let index = self.take_index();
                features.push(Feature::with_geometry(
                    Some(geometry),
                    properties.clone(),
                    geometry.clone(),
                    index,
                    chain.last().cloned(),
                    chain.clone(),
                ));
            }
        }

        chain.pop();
    }

    fn take_index(&mut self) -> usize {
        let index = self.next_index;
        self.next_index += 1;
        index
    }
}

fn is_geometry_collection(value: &Value) -> bool {
    value.get("type").and_then(Value::as_str) == Some("GeometryCollection")
}

/// How a collection is referred to in the parent chain.
fn ancestry_name(value: &Value, fallback: &str) -> String {
    let named = value
        .get("name")
        .or_else(|| value.get("id"))
        .or_else(|| value.get("properties").and_then(|p| p.get("name")));

    match named {
        Some(Value::String(name)) => name.clone(),
        Some(Value::Number(number)) => number.to_string(),
        _ => fallback.to_owned(),
    }
}

/// Selects features to be removed from a layer. Unset criteria match everything.
#[derive(Debug, Clone, Default)]
pub struct FeatureFilter {
    pub id: Option<FeatureId>,
    pub geometry_type: Option<GeometryType>,

    /// Properties which must be present with exactly these values.
    pub properties: Map<String, Value>,
}

impl FeatureFilter {
    pub fn by_id(id: FeatureId) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }

    pub fn by_geometry_type(geometry_type: GeometryType) -> Self {
        Self {
            geometry_type: Some(geometry_type),
            ..Default::default()
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn matches(&self, feature: &Feature) -> bool {
        self.id.is_none_or(|id| id == feature.id)
            && self
                .geometry_type
                .is_none_or(|wanted| feature.geometry_type() == Some(wanted))
            && self
                .properties
                .iter()
                .all(|(key, value)| feature.properties.get(key) == Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn point(lon: f64, lat: f64) -> Value {
        json!({
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [lon, lat] },
            "properties": { "label": format!("{lon},{lat}") },
        })
    }

    #[test]
    fn features_are_numbered_in_load_order() {
        let mut loader = FeatureLoader::new();
        let features = loader.load(&json!({
            "type": "FeatureCollection",
            "features": [point(1., 1.), point(2., 2.), point(3., 3.)],
        }));

        let indices: Vec<_> = features.iter().map(|f| f.sequence_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_ne!(features[0].id, features[1].id);
        assert_eq!(features[2].text_property("label").unwrap(), "3,3");
        assert_eq!(features[0].family(), Some(FeatureFamily::Points));

        // Numbering continues with the next document.
        let more = loader.load(&point(4., 4.));
        assert_eq!(more[0].sequence_index, 3);
        assert_eq!(loader.next_index(), 4);
    }

    #[test]
    fn raw_record_is_kept() {
        let source = point(21., 52.);
        let features = FeatureLoader::new().load(&source);

        assert_eq!(features[0].raw, source);
        assert_eq!(features[0].geometry, Some(Geometry::Point(Point::new(21., 52.))));
        assert!(features[0].parent_chain.is_empty());
        assert_eq!(features[0].collection_name, None);
    }

    #[test]
    fn nested_collections_are_walked_depth_first() {
        let features = FeatureLoader::new().load(&json!({
            "type": "FeatureCollection",
            "name": "outer",
            "features": [
                {
                    "type": "Feature",
                    "id": "route",
                    "properties": { "color": "blue" },
                    "geometry": {
                        "type": "GeometryCollection",
                        "geometries": [
                            { "type": "Point", "coordinates": [0., 0.] },
                            { "type": "LineString", "coordinates": [[0., 0.], [1., 1.]] },
                        ],
                    },
                },
                {
                    "type": "FeatureCollection",
                    "name": "inner",
                    "features": [point(5., 5.)],
                },
            ],
        }));

        assert_eq!(features.len(), 3);

        assert_eq!(features[0].parent_chain, vec!["outer", "route", "GeometryCollection"]);
        assert_eq!(features[0].collection_name.as_deref(), Some("GeometryCollection"));
        assert_eq!(features[0].properties["color"], "blue");
        assert_eq!(features[0].raw["type"], "Point");

        assert_eq!(features[1].geometry_type(), Some(GeometryType::LineString));
        assert_eq!(features[1].sequence_index, 1);

        assert_eq!(features[2].parent_chain, vec!["outer", "inner"]);
        assert_eq!(features[2].collection_name.as_deref(), Some("inner"));
    }

    #[test]
    fn bare_geometry_collection_is_a_source_of_features() {
        let features = FeatureLoader::new().load(&json!({
            "type": "GeometryCollection",
            "geometries": [
                { "type": "Point", "coordinates": [0., 0.] },
                { "type": "MultiPoint", "coordinates": [[0., 0.], [1., 1.]] },
            ],
        }));

        assert_eq!(features.len(), 2);
        assert!(features.iter().all(|f| f.properties.is_empty()));
        assert_eq!(features[1].geometry_type(), Some(GeometryType::MultiPoint));
    }

    #[test]
    fn bad_geometry_gives_empty_feature() {
        let features = FeatureLoader::new().load(&json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "geometry": { "type": "Circle", "coordinates": [0., 0.] } },
                { "type": "Feature", "geometry": { "type": "Point", "coordinates": "here" } },
                { "type": "Feature", "geometry": null },
                point(1., 1.),
            ],
        }));

        assert_eq!(features.len(), 4);
        assert!(features[..3].iter().all(|f| f.geometry.is_none()));
        assert!(features[3].geometry.is_some());
    }

    #[test]
    fn geometry_errors() {
        assert_eq!(
            Geometry::from_geojson(&json!({ "type": "Circle" })),
            Err(GeometryError::Unsupported("Circle".to_owned()))
        );
        assert!(matches!(
            Geometry::from_geojson(&json!({ "type": "Polygon", "coordinates": [] })),
            Err(GeometryError::Malformed {
                geometry_type: GeometryType::Polygon,
                ..
            })
        ));
    }

    #[test]
    fn polygon_keeps_its_holes() {
        let geometry = Geometry::from_geojson(&json!({
            "type": "MultiPolygon",
            "coordinates": [
                [
                    [[0., 0.], [10., 0.], [10., 10.], [0., 10.], [0., 0.]],
                    [[4., 4.], [6., 4.], [6., 6.], [4., 6.], [4., 4.]],
                ],
                [
                    [[20., 20.], [30., 20.], [30., 30.], [20., 20.]],
                ],
            ],
        }))
        .unwrap();

        let Geometry::MultiPolygon(polygons) = &geometry else {
            panic!("not a multipolygon");
        };
        assert_eq!(polygons.0.len(), 2);
        assert_eq!(polygons.0[0].interiors().len(), 1);
        assert!(polygons.0[1].interiors().is_empty());

        let bounds = geometry.bounds().unwrap();
        assert_eq!((bounds.min_lon, bounds.min_lat), (0., 0.));
        assert_eq!((bounds.max_lon, bounds.max_lat), (30., 30.));
    }

    #[test]
    fn filter_criteria_are_combined() {
        let features = FeatureLoader::new().load(&json!({
            "type": "FeatureCollection",
            "features": [
                point(1., 1.),
                {
                    "type": "Feature",
                    "geometry": { "type": "LineString", "coordinates": [[0., 0.], [1., 1.]] },
                    "properties": { "kind": "road" },
                },
            ],
        }));

        assert!(FeatureFilter::default().matches(&features[0]));
        assert!(FeatureFilter::by_id(features[0].id).matches(&features[0]));
        assert!(!FeatureFilter::by_id(features[0].id).matches(&features[1]));
        assert!(
            FeatureFilter::by_geometry_type(GeometryType::LineString)
                .with_property("kind", "road")
                .matches(&features[1])
        );
        assert!(
            !FeatureFilter::by_geometry_type(GeometryType::LineString)
                .with_property("kind", "rail")
                .matches(&features[1])
        );
    }
}
