//! Tile, layer and feature assembly on top of the wire-format reader.
//!
//! [`TileReader`] owns the raw tile bytes. Construction scans the top level
//! of the tile message just far enough to build an ordered layer-name index
//! (each entry keeps a byte range into the owned buffer, no copies); layers
//! and features are decoded lazily from their raw slices on request.
//!
//! With `validate = true` every decode step additionally enforces the MVT
//! schema invariants (known tags, version 2, non-zero extent, distinct
//! values, tag indices in bounds, ...). Passing `validate = false` skips all
//! of these checks for maximum throughput on trusted input.

use std::ops::Range;

use crate::error::TileError;
use crate::feature::Feature;
use crate::geometry::GeomType;
use crate::layer::{Layer, Value};
use crate::pbf::PbfReader;

/// Tile-level field numbers (vector_tile.proto).
const TILE_LAYERS: u64 = 3;

/// Layer-level field numbers.
mod layer_field {
    pub const NAME: u64 = 1;
    pub const FEATURES: u64 = 2;
    pub const KEYS: u64 = 3;
    pub const VALUES: u64 = 4;
    pub const EXTENT: u64 = 5;
    pub const VERSION: u64 = 15;
}

/// Feature-level field numbers.
mod feature_field {
    pub const ID: u64 = 1;
    pub const TAGS: u64 = 2;
    pub const TYPE: u64 = 3;
    pub const GEOMETRY: u64 = 4;
    /// Present in the schema; recognised but not decoded.
    pub const RASTER: u64 = 5;
}

/// Value-message field numbers.
mod value_field {
    pub const STRING: u64 = 1;
    pub const FLOAT: u64 = 2;
    pub const DOUBLE: u64 = 3;
    pub const INT: u64 = 4;
    pub const UINT: u64 = 5;
    pub const SINT: u64 = 6;
    pub const BOOL: u64 = 7;
}

/// Reader over one MVT tile payload.
///
/// The layer index is built once at construction and is read-only
/// afterwards, so concurrent [`TileReader::layer`] calls on a shared
/// instance are safe.
pub struct TileReader {
    data: Vec<u8>,
    validate: bool,
    /// Layer name → byte range into `data`, in encounter order.
    layers: Vec<(String, Range<usize>)>,
}

impl TileReader {
    /// Take ownership of raw (already decompressed) tile bytes and index
    /// its layers.
    ///
    /// # Errors
    /// `MalformedInput` for empty or truncated input, `AlreadyCompressed`
    /// if the buffer starts with a gzip magic header, `SchemaViolation`
    /// (validation only) for unknown top-level tags or missing/empty/
    /// duplicate layer names.
    pub fn new(data: Vec<u8>, validate: bool) -> Result<Self, TileError> {
        if data.is_empty() {
            return Err(TileError::MalformedInput(
                "tile data cannot be empty".to_string(),
            ));
        }
        if data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b {
            return Err(TileError::AlreadyCompressed);
        }

        let layers = scan_layers(&data, validate)?;
        Ok(TileReader {
            data,
            validate,
            layers,
        })
    }

    /// Layer names in encounter order.
    #[must_use]
    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Decode a layer by name from its stored raw slice.
    ///
    /// Returns `Ok(None)` when no layer of that name exists in the tile.
    ///
    /// # Errors
    /// `SchemaViolation`/`UnsupportedValueType`/`MalformedInput` per the
    /// layer decode rules.
    pub fn layer(&self, name: &str) -> Result<Option<Layer<'_>>, TileError> {
        let Some((_, range)) = self.layers.iter().find(|(n, _)| n == name) else {
            return Ok(None);
        };
        decode_layer(&self.data[range.clone()], self.validate).map(Some)
    }
}

/// Scan the top-level tile message and index layer slices by name.
fn scan_layers(
    data: &[u8],
    validate: bool,
) -> Result<Vec<(String, Range<usize>)>, TileError> {
    let mut layers: Vec<(String, Range<usize>)> = Vec::new();
    let mut reader = PbfReader::new(data);

    while reader.advance()? {
        if reader.tag() != TILE_LAYERS {
            if validate {
                return Err(TileError::SchemaViolation(format!(
                    "unknown tile tag: {}",
                    reader.tag()
                )));
            }
            reader.skip()?;
            continue;
        }

        let slice = reader.bytes()?;
        let range = reader.pos() - slice.len()..reader.pos();
        let name = prescan_layer_name(slice)?;

        if validate {
            let name = match name {
                Some(n) if !n.is_empty() => n,
                _ => {
                    return Err(TileError::SchemaViolation(
                        "layer missing name".to_string(),
                    ))
                }
            };
            if layers.iter().any(|(n, _)| *n == name) {
                return Err(TileError::SchemaViolation(format!(
                    "duplicate layer names: {name}"
                )));
            }
            layers.push((name, range));
        } else {
            // Without validation a repeated name replaces the earlier entry,
            // keeping the index duplicate-free.
            let name = name.unwrap_or_default();
            match layers.iter_mut().find(|(n, _)| *n == name) {
                Some(entry) => entry.1 = range,
                None => layers.push((name, range)),
            }
        }
    }

    Ok(layers)
}

/// Scan a layer message for its name without decoding anything else.
///
/// A repeated name field keeps the last occurrence, matching how
/// [`decode_layer`] assigns fields, so the index name and the decoded
/// layer's name always agree.
fn prescan_layer_name(data: &[u8]) -> Result<Option<String>, TileError> {
    let mut reader = PbfReader::new(data);
    let mut name = None;
    while reader.advance()? {
        if reader.tag() == layer_field::NAME {
            let len = reader.varint()? as usize;
            name = Some(reader.string(len)?.to_string());
        } else {
            reader.skip()?;
        }
    }
    Ok(name)
}

/// Decode a full layer message.
pub(crate) fn decode_layer(data: &[u8], validate: bool) -> Result<Layer<'_>, TileError> {
    let mut layer = Layer {
        name: String::new(),
        version: 0,
        extent: 0,
        keys: Vec::new(),
        values: Vec::new(),
        features: Vec::new(),
        validate,
    };

    let mut reader = PbfReader::new(data);
    while reader.advance()? {
        match reader.tag() {
            layer_field::VERSION => layer.version = reader.varint()? as u64,
            layer_field::NAME => {
                let len = reader.varint()? as usize;
                layer.name = reader.string(len)?.to_string();
            }
            layer_field::FEATURES => layer.features.push(reader.bytes()?),
            layer_field::KEYS => {
                let raw = reader.bytes()?;
                layer.keys.push(std::str::from_utf8(raw)?.to_string());
            }
            layer_field::VALUES => decode_values(reader.bytes()?, &mut layer.values)?,
            layer_field::EXTENT => layer.extent = reader.varint()? as u64,
            tag => {
                if validate {
                    return Err(TileError::SchemaViolation(format!(
                        "unknown layer type: {tag}"
                    )));
                }
                reader.skip()?;
            }
        }
    }

    if validate {
        validate_layer(&layer)?;
    }

    Ok(layer)
}

fn validate_layer(layer: &Layer<'_>) -> Result<(), TileError> {
    if layer.name.is_empty() {
        return Err(TileError::SchemaViolation("layer has no name".to_string()));
    }
    if layer.version != 2 {
        return Err(TileError::SchemaViolation(format!(
            "layer [{}] has invalid version: {}. Only version 2.x of the \
             Mapbox Vector Tile Specification is supported",
            layer.name, layer.version
        )));
    }
    if layer.extent == 0 {
        return Err(TileError::SchemaViolation(format!(
            "layer [{}] has no extent",
            layer.name
        )));
    }
    if layer.features.is_empty() {
        return Err(TileError::SchemaViolation(format!(
            "layer [{}] has no features",
            layer.name
        )));
    }
    // The value table is a deduplication scheme; a repeated entry is a sign
    // of a broken encoder even though the format does not strictly forbid it.
    for (i, value) in layer.values.iter().enumerate() {
        if layer.values[..i].contains(value) {
            return Err(TileError::SchemaViolation(format!(
                "layer [{}]: duplicate attribute values found",
                layer.name
            )));
        }
    }
    Ok(())
}

/// Decode one `Value` sub-message, appending each typed field to `out`.
fn decode_values(data: &[u8], out: &mut Vec<Value>) -> Result<(), TileError> {
    let mut reader = PbfReader::new(data);
    while reader.advance()? {
        let value = match reader.tag() {
            value_field::STRING => {
                let raw = reader.bytes()?;
                Value::String(std::str::from_utf8(raw)?.to_string())
            }
            value_field::FLOAT => Value::Float(reader.float32()?),
            value_field::DOUBLE => Value::Double(reader.float64()?),
            value_field::INT => Value::Int(reader.varint()?),
            value_field::UINT => Value::UInt(reader.varint()? as u64),
            // sint is read as a raw varint, deliberately without the zigzag
            // transform: existing decoders of this format behave this way
            // and changing it would silently alter decoded attributes.
            value_field::SINT => Value::Int(reader.varint()?),
            value_field::BOOL => Value::Bool(reader.varint()? != 0),
            tag => {
                return Err(TileError::UnsupportedValueType {
                    tag,
                    wire_type: reader.wire_type() as u64,
                })
            }
        };
        out.push(value);
    }
    Ok(())
}

/// Decode one feature message belonging to `layer`.
pub(crate) fn decode_feature<'a>(
    layer: &'a Layer<'a>,
    data: &[u8],
    validate: bool,
    clip_buffer: Option<u32>,
    scale: f32,
) -> Result<Feature<'a>, TileError> {
    let mut feature = Feature::new(layer, clip_buffer, scale);
    let mut geom_type_set = false;
    let mut has_geometry = false;

    let mut reader = PbfReader::new(data);
    while reader.advance()? {
        match reader.tag() {
            feature_field::ID => feature.id = reader.varint()? as u64,
            feature_field::TAGS => feature.tags = reader.packed_u32()?,
            feature_field::TYPE => {
                let raw = reader.varint()?;
                match GeomType::from_tag(raw) {
                    Some(geom_type) => feature.geom_type = geom_type,
                    None => {
                        if validate {
                            return Err(TileError::SchemaViolation(format!(
                                "layer [{}] has unknown geometry type tag: {raw}",
                                layer.name()
                            )));
                        }
                    }
                }
                geom_type_set = true;
            }
            feature_field::GEOMETRY => {
                if has_geometry {
                    return Err(TileError::SchemaViolation(format!(
                        "layer [{}]: feature already has a geometry",
                        layer.name()
                    )));
                }
                feature.commands = reader.packed_u32()?;
                has_geometry = true;
            }
            feature_field::RASTER => reader.skip()?,
            tag => {
                if validate {
                    return Err(TileError::SchemaViolation(format!(
                        "layer [{}] has unknown feature type: {tag}",
                        layer.name()
                    )));
                }
                reader.skip()?;
            }
        }
    }

    if validate {
        validate_feature(layer, &feature, geom_type_set, has_geometry)?;
    }

    Ok(feature)
}

fn validate_feature(
    layer: &Layer<'_>,
    feature: &Feature<'_>,
    geom_type_set: bool,
    has_geometry: bool,
) -> Result<(), TileError> {
    if !geom_type_set {
        return Err(TileError::SchemaViolation(format!(
            "layer [{}]: feature missing geometry type",
            layer.name()
        )));
    }
    if !has_geometry {
        return Err(TileError::SchemaViolation(format!(
            "layer [{}]: feature has no geometry",
            layer.name()
        )));
    }
    if feature.tags.len() % 2 != 0 {
        return Err(TileError::SchemaViolation(format!(
            "layer [{}]: uneven number of feature tag ids",
            layer.name()
        )));
    }
    let max_key = feature.tags.iter().step_by(2).max();
    let max_value = feature.tags.iter().skip(1).step_by(2).max();
    if let Some(&max_key) = max_key {
        if max_key as usize >= layer.keys().len() {
            return Err(TileError::SchemaViolation(format!(
                "layer [{}]: maximum key index equal or greater number of key elements",
                layer.name()
            )));
        }
    }
    if let Some(&max_value) = max_value {
        if max_value as usize >= layer.values().len() {
            return Err(TileError::SchemaViolation(format!(
                "layer [{}]: maximum value index equal or greater number of value elements",
                layer.name()
            )));
        }
    }
    Ok(())
}
