//! Error taxonomy for tile decoding.
//!
//! Every failure is raised synchronously at the point of detection; nothing is
//! retried. The `SchemaViolation` family is only produced when validation is
//! enabled on the [`TileReader`](crate::TileReader).

use thiserror::Error;

/// Errors produced while decoding a vector tile.
#[derive(Debug, Error)]
pub enum TileError {
    /// Buffer truncated or corrupt relative to declared lengths.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A field uses a protobuf wire type this reader does not implement.
    #[error("unsupported wire type: {0}")]
    UnsupportedWireType(u64),

    /// A layer value sub-message uses an unknown value-type tag.
    #[error("unsupported value type tag {tag} (wire type {wire_type})")]
    UnsupportedValueType { tag: u64, wire_type: u64 },

    /// Structurally valid protobuf that violates an MVT schema invariant.
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    /// A string field contains invalid UTF-8.
    #[error("invalid UTF-8 encoding")]
    InvalidEncoding(#[from] std::str::Utf8Error),

    /// Projected coordinate outside valid geographic bounds (strict mode only).
    #[error("coordinate out of range: {0}")]
    OutOfRange(String),

    /// Unknown geometry command in the command stream.
    #[error("malformed geometry: {0}")]
    MalformedGeometry(String),

    /// Input starts with a gzip magic header; decompression must happen
    /// before the bytes reach this crate.
    #[error("tile is compressed: expected raw (unzipped) tile data")]
    AlreadyCompressed,
}
