//! Decoded vector tile feature.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::TileError;
use crate::geometry::clip::clip_feature_geometry;
use crate::geometry::decode::{decode_geometry, scale_geometry};
use crate::geometry::{CoordScalar, GeomType, LatLng, Point2d};
use crate::layer::{Layer, Value};

#[derive(Debug, PartialEq, Eq)]
struct CacheKey {
    clip_buffer: Option<u32>,
    scale_bits: u32,
}

#[derive(Debug)]
struct CacheSlot {
    key: CacheKey,
    /// Integer-domain parts after decode and clip, before scaling.
    parts: Vec<Vec<Point2d<i64>>>,
}

/// A single feature, decoded on demand from a layer's raw feature bytes.
///
/// The feature holds a non-owning back-reference to its layer for key/value
/// resolution. Geometry is decoded lazily on first request and the result is
/// kept in a single-slot cache keyed by the (clip buffer, scale) pair that
/// produced it; a request with a different pair evicts the slot. The cache
/// uses interior mutability, so a `Feature` must not be shared across
/// threads without external synchronization (it is not `Sync`).
#[derive(Debug)]
pub struct Feature<'a> {
    layer: &'a Layer<'a>,
    pub(crate) id: u64,
    pub(crate) geom_type: GeomType,
    pub(crate) tags: Vec<u32>,
    pub(crate) commands: Vec<u32>,
    clip_buffer: Option<u32>,
    scale: f32,
    cache: RefCell<Option<CacheSlot>>,
}

impl<'a> Feature<'a> {
    pub(crate) fn new(layer: &'a Layer<'a>, clip_buffer: Option<u32>, scale: f32) -> Self {
        Feature {
            layer,
            id: 0,
            geom_type: GeomType::Unknown,
            tags: Vec::new(),
            commands: Vec::new(),
            clip_buffer,
            scale,
            cache: RefCell::new(None),
        }
    }

    /// Feature id; 0 when the tile did not encode one.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The layer this feature belongs to.
    #[must_use]
    pub fn layer(&self) -> &Layer<'a> {
        self.layer
    }

    /// Geometry type of this feature.
    #[must_use]
    pub fn geom_type(&self) -> GeomType {
        self.geom_type
    }

    /// Raw key-index/value-index pairs into the layer's tables.
    #[must_use]
    pub fn tags(&self) -> &[u32] {
        &self.tags
    }

    /// Raw, undecoded geometry command stream.
    #[must_use]
    pub fn geometry_commands(&self) -> &[u32] {
        &self.commands
    }

    /// Decode this feature's geometry into parts of `Point2d<T>`.
    ///
    /// `clip_buffer` and `scale` override the defaults given at feature
    /// construction. With a clip buffer, geometry is clipped to
    /// `[-buffer, extent + buffer]²`; without one it is returned exactly as
    /// encoded. Scaling multiplies coordinates by `scale` and converts to
    /// `T` as the final step.
    ///
    /// # Errors
    /// `MalformedGeometry` if the command stream contains an unknown command
    /// or truncated parameters. Clipping itself never fails; degenerate
    /// input degrades to unclipped geometry.
    pub fn geometry<T: CoordScalar>(
        &self,
        clip_buffer: Option<u32>,
        scale: Option<f32>,
    ) -> Result<Vec<Vec<Point2d<T>>>, TileError> {
        let clip_buffer = clip_buffer.or(self.clip_buffer);
        let scale = scale.unwrap_or(self.scale);
        let key = CacheKey {
            clip_buffer,
            scale_bits: scale.to_bits(),
        };

        if let Some(slot) = self.cache.borrow().as_ref() {
            if slot.key == key {
                return Ok(scale_geometry(&slot.parts, scale));
            }
        }

        let mut parts = decode_geometry(self.geom_type, &self.commands)?;
        if let Some(buffer) = clip_buffer {
            parts = clip_feature_geometry(
                parts,
                self.geom_type,
                self.layer.extent() as i64,
                buffer,
            );
        }

        let scaled = scale_geometry(&parts, scale);
        *self.cache.borrow_mut() = Some(CacheSlot { key, parts });
        Ok(scaled)
    }

    /// Geometry projected to WGS84 for the tile at `zoom`/`col`/`row`.
    ///
    /// # Errors
    /// Propagates geometry decode failures; projection itself is unchecked
    /// (no `OutOfRange` here), matching the GeoJSON export path.
    pub fn geometry_wgs84(
        &self,
        zoom: u64,
        col: u64,
        row: u64,
        clip_buffer: Option<u32>,
    ) -> Result<Vec<Vec<LatLng>>, TileError> {
        let extent = self.layer.extent();
        let parts: Vec<Vec<Point2d<i64>>> = self.geometry(clip_buffer, Some(1.0))?;
        let mut projected = Vec::with_capacity(parts.len());
        for part in &parts {
            let mut out = Vec::with_capacity(part.len());
            for point in part {
                out.push(point.to_lat_lng(zoom, col, row, extent, false)?);
            }
            projected.push(out);
        }
        Ok(projected)
    }

    /// Resolve all tag pairs into a key → value map.
    ///
    /// A duplicate key inside one feature keeps the later pair's value; the
    /// collision is logged and never fatal.
    ///
    /// # Errors
    /// `SchemaViolation` on an uneven tag count or a tag index outside the
    /// layer's key/value tables (reachable when the reader was built with
    /// `validate = false`).
    pub fn properties(&self) -> Result<HashMap<&'a str, &'a Value>, TileError> {
        if self.tags.len() % 2 != 0 {
            return Err(TileError::SchemaViolation(format!(
                "layer [{}]: uneven number of feature tag ids",
                self.layer.name()
            )));
        }

        let mut properties: HashMap<&str, &Value> = HashMap::with_capacity(self.tags.len() / 2);
        for pair in self.tags.chunks_exact(2) {
            let key = self
                .layer
                .keys()
                .get(pair[0] as usize)
                .ok_or_else(|| self.tag_index_error("key", pair[0]))?;
            let value = self
                .layer
                .values()
                .get(pair[1] as usize)
                .ok_or_else(|| self.tag_index_error("value", pair[1]))?;
            if let Some(previous) = properties.insert(key, value) {
                tracing::warn!(
                    layer = self.layer.name(),
                    %key,
                    %previous,
                    "duplicate property key, keeping later value"
                );
            }
        }
        Ok(properties)
    }

    /// Look up a single property by key name.
    ///
    /// Returns `None` when the key is not in the layer's key table or no tag
    /// pair of this feature references it.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&'a Value> {
        let key_index = self.layer.keys().iter().position(|k| k == key)? as u32;
        for pair in self.tags.chunks_exact(2) {
            if pair[0] == key_index {
                return self.layer.values().get(pair[1] as usize);
            }
        }
        None
    }

    fn tag_index_error(&self, kind: &str, index: u32) -> TileError {
        TileError::SchemaViolation(format!(
            "layer [{}]: {kind} index {index} out of range",
            self.layer.name()
        ))
    }
}
