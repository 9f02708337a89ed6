//! Decoded vector tile layer.

use std::fmt;

use crate::error::TileError;
use crate::feature::Feature;

/// A layer attribute value.
///
/// The MVT `Value` message is a tagged union; exactly one variant is set per
/// entry. `Int`, `UInt` and `SInt` fields all decode through the raw varint:
/// the `SInt` tag is intentionally *not* zigzag-corrected here, matching the
/// observed behaviour of existing decoders of this format.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Float(f32),
    Double(f64),
    Int(i64),
    UInt(u64),
    Bool(bool),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// A decoded layer: metadata, key/value tables and raw per-feature slices.
///
/// Layers borrow the raw feature bytes from the tile buffer; features are
/// decoded on demand via [`Layer::feature`] and are not cached by the layer.
#[derive(Debug)]
pub struct Layer<'t> {
    pub(crate) name: String,
    pub(crate) version: u64,
    pub(crate) extent: u64,
    pub(crate) keys: Vec<String>,
    pub(crate) values: Vec<Value>,
    pub(crate) features: Vec<&'t [u8]>,
    pub(crate) validate: bool,
}

impl<'t> Layer<'t> {
    /// Layer name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Layer version (2 for all tiles this crate validates).
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Size of the layer's local coordinate space, typically 4096.
    #[must_use]
    pub fn extent(&self) -> u64 {
        self.extent
    }

    /// Ordered attribute key table.
    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Ordered attribute value table.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of features in this layer.
    #[must_use]
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    /// Decode the feature at `index` from its raw bytes.
    ///
    /// The returned [`Feature`] borrows this layer for key/value resolution.
    /// Clip buffer and scale become the feature's defaults and can still be
    /// overridden per geometry request.
    ///
    /// # Errors
    /// `SchemaViolation` on schema-invalid feature data (when the owning
    /// reader was constructed with validation), `MalformedInput` on
    /// truncated bytes.
    pub fn feature(&self, index: usize) -> Result<Feature<'_>, TileError> {
        self.feature_with(index, None, 1.0)
    }

    /// [`Layer::feature`] with explicit clip buffer and scale defaults.
    ///
    /// # Errors
    /// See [`Layer::feature`].
    pub fn feature_with(
        &self,
        index: usize,
        clip_buffer: Option<u32>,
        scale: f32,
    ) -> Result<Feature<'_>, TileError> {
        let data = self.features.get(index).ok_or_else(|| {
            TileError::MalformedInput(format!(
                "feature index {index} out of range for layer [{}] with {} features",
                self.name,
                self.features.len()
            ))
        })?;
        crate::reader::decode_feature(self, data, self.validate, clip_buffer, scale)
    }
}
