//! GeoJSON export of a whole tile.
//!
//! The output is assembled with plain string formatting rather than a JSON
//! serializer: the document shape is fixed and tiny, and this keeps the
//! conversion allocation-light. Geometries are projected to WGS84, so the
//! tile's zoom/column/row address must be supplied.

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::error::TileError;
use crate::geometry::{GeomType, LatLng};
use crate::reader::TileReader;

/// Render every feature of every layer as a GeoJSON `FeatureCollection`.
///
/// `clip_buffer` behaves as in [`crate::Feature::geometry`]: `None` exports
/// geometries as stored, `Some(n)` clips them against the tile boundary
/// expanded by `n` tile units. Features with an unknown geometry type or no
/// decodable geometry are skipped.
///
/// # Errors
/// Propagates any decode error from the underlying layers and features.
pub fn to_geojson(
    tile: &TileReader,
    zoom: u64,
    tile_column: u64,
    tile_row: u64,
    clip_buffer: Option<u32>,
) -> Result<String, TileError> {
    let mut features: Vec<String> = Vec::new();

    for name in tile.layer_names() {
        let Some(layer) = tile.layer(name)? else {
            continue;
        };

        for i in 0..layer.feature_count() {
            let feature = layer.feature_with(i, clip_buffer, 1.0)?;
            if feature.geom_type() == GeomType::Unknown {
                continue;
            }

            let properties = format_properties(&layer, &feature)?;

            let parts = feature.geometry_wgs84(zoom, tile_column, tile_row, clip_buffer)?;
            let Some((geom_type, coordinates)) =
                format_geometry(feature.geom_type(), &parts)
            else {
                continue;
            };

            features.push(format!(
                r#"{{"type":"Feature","geometry":{{"type":"{geom_type}","coordinates":[{coordinates}]}},"properties":{properties}}}"#,
            ));
        }
    }

    Ok(format!(
        r#"{{"type":"FeatureCollection","features":[{}]}}"#,
        features.join(",")
    ))
}

/// Properties object: feature id, owning layer, then the key/value pairs
/// in tag order with every value rendered as a JSON string.
fn format_properties(
    layer: &crate::Layer<'_>,
    feature: &crate::Feature<'_>,
) -> Result<String, TileError> {
    let mut out = format!(
        r#"{{"id":{},"lyr":"{}""#,
        feature.id(),
        escape_json(layer.name())
    );
    for pair in feature.tags().chunks_exact(2) {
        let (Some(key), Some(value)) = (
            layer.keys().get(pair[0] as usize),
            layer.values().get(pair[1] as usize),
        ) else {
            return Err(TileError::SchemaViolation(format!(
                "layer [{}]: feature tag index out of bounds",
                layer.name()
            )));
        };
        // Writing to a String cannot fail.
        let _ = write!(
            out,
            r#","{}":"{}""#,
            escape_json(key),
            escape_json(&value.to_string())
        );
    }
    out.push('}');
    Ok(out)
}

/// Escape the characters that would break a JSON string literal.
///
/// Keys and values land inside double-quoted literals; a backslash or quote
/// in tile attributes must not produce invalid JSON. Control characters are
/// left alone, as are all other code points (JSON strings are UTF-8).
fn escape_json(s: &str) -> Cow<'_, str> {
    if !s.contains(['"', '\\']) {
        return Cow::Borrowed(s);
    }
    let mut escaped = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        if c == '"' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    Cow::Owned(escaped)
}

/// GeoJSON type name and coordinate body for a decoded geometry.
///
/// Multi-part geometries promote to their `Multi*` counterpart; an empty
/// geometry yields `None`.
fn format_geometry(geom_type: GeomType, parts: &[Vec<LatLng>]) -> Option<(&'static str, String)> {
    match (geom_type, parts.len()) {
        (_, 0) => None,
        (GeomType::Point, 1) => {
            let p = parts[0].first()?;
            Some((geom_type.description(), format!("{},{}", p.lng, p.lat)))
        }
        (GeomType::Point, _) => Some((
            "MultiPoint",
            parts
                .iter()
                .flatten()
                .map(|p| format!("[{},{}]", p.lng, p.lat))
                .collect::<Vec<_>>()
                .join(","),
        )),
        (GeomType::Linestring, 1) => Some((geom_type.description(), format_part(&parts[0]))),
        (GeomType::Linestring, _) => Some((
            "MultiLineString",
            parts
                .iter()
                .map(|part| format!("[{}]", format_part(part)))
                .collect::<Vec<_>>()
                .join(","),
        )),
        (GeomType::Polygon, 1) => Some((
            geom_type.description(),
            format!("[{}]", format_part(&parts[0])),
        )),
        (GeomType::Polygon, _) => Some((
            "MultiPolygon",
            format!(
                "[{}]",
                parts
                    .iter()
                    .map(|part| format!("[{}]", format_part(part)))
                    .collect::<Vec<_>>()
                    .join(",")
            ),
        )),
        (GeomType::Unknown, _) => None,
    }
}

fn format_part(part: &[LatLng]) -> String {
    part.iter()
        .map(|p| format!("[{},{}]", p.lng, p.lat))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_point() {
        let parts = vec![vec![LatLng {
            lat: 47.26,
            lng: 11.39,
        }]];
        let (geom_type, coords) = format_geometry(GeomType::Point, &parts).unwrap();
        assert_eq!(geom_type, "Point");
        assert_eq!(coords, "11.39,47.26");
    }

    #[test]
    fn test_multi_point_flattens_parts() {
        let parts = vec![
            vec![LatLng { lat: 1.0, lng: 2.0 }],
            vec![LatLng { lat: 3.0, lng: 4.0 }],
        ];
        let (geom_type, coords) = format_geometry(GeomType::Point, &parts).unwrap();
        assert_eq!(geom_type, "MultiPoint");
        assert_eq!(coords, "[2,1],[4,3]");
    }

    #[test]
    fn test_linestring_and_multi() {
        let part = vec![
            LatLng { lat: 0.0, lng: 0.0 },
            LatLng { lat: 1.0, lng: 1.0 },
        ];

        let (geom_type, coords) =
            format_geometry(GeomType::Linestring, std::slice::from_ref(&part)).unwrap();
        assert_eq!(geom_type, "LineString");
        assert_eq!(coords, "[0,0],[1,1]");

        let (geom_type, coords) =
            format_geometry(GeomType::Linestring, &[part.clone(), part]).unwrap();
        assert_eq!(geom_type, "MultiLineString");
        assert_eq!(coords, "[[0,0],[1,1]],[[0,0],[1,1]]");
    }

    #[test]
    fn test_polygon_nesting() {
        let ring = vec![
            LatLng { lat: 0.0, lng: 0.0 },
            LatLng { lat: 0.0, lng: 1.0 },
            LatLng { lat: 1.0, lng: 1.0 },
            LatLng { lat: 0.0, lng: 0.0 },
        ];

        let (geom_type, coords) =
            format_geometry(GeomType::Polygon, std::slice::from_ref(&ring)).unwrap();
        assert_eq!(geom_type, "Polygon");
        assert!(coords.starts_with("[[0,0],"));

        let (geom_type, coords) =
            format_geometry(GeomType::Polygon, &[ring.clone(), ring]).unwrap();
        assert_eq!(geom_type, "MultiPolygon");
        // one extra level of nesting for the polygon list
        assert!(coords.starts_with("[[[0,0],"));
    }

    #[test]
    fn test_empty_and_unknown_geometry() {
        assert!(format_geometry(GeomType::Point, &[]).is_none());
        assert!(format_geometry(GeomType::Unknown, &[vec![]]).is_none());
    }

    #[test]
    fn test_escape_json() {
        assert!(matches!(escape_json("plain"), Cow::Borrowed("plain")));
        assert_eq!(escape_json(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(escape_json(r"a\b"), r"a\\b");
    }

    #[test]
    fn test_properties_with_json_special_characters() {
        use crate::layer::{Layer, Value};

        let layer = Layer {
            name: "pois".to_string(),
            version: 2,
            extent: 4096,
            keys: vec![r#"na"me"#.to_string()],
            values: vec![Value::String(r#"The "Golden" Inn\Bar"#.to_string())],
            features: Vec::new(),
            validate: true,
        };
        let mut feature = crate::Feature::new(&layer, None, 1.0);
        feature.tags = vec![0, 0];

        let props = format_properties(&layer, &feature).unwrap();
        assert_eq!(
            props,
            r#"{"id":0,"lyr":"pois","na\"me":"The \"Golden\" Inn\\Bar"}"#
        );
    }
}
