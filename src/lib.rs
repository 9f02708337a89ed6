#![doc = include_str!("../README.md")]
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`reader`]: Tile parsing and lazy layer/feature assembly
//! - [`layer`]: Decoded layer with its key/value attribute tables
//! - [`feature`]: Per-feature geometry and property access
//! - [`geometry`]: Command-stream decoding, tile-boundary clipping and
//!   WGS84 projection
//! - [`pbf`]: Low-level protobuf wire-format reader
//! - [`geojson`]: Whole-tile GeoJSON export
//! - [`error`]: Error taxonomy for every decode stage

// ============================================================================
// Public modules
// ============================================================================

pub mod error;
pub mod feature;
pub mod geojson;
pub mod geometry;
pub mod layer;
pub mod pbf;
pub mod reader;

// ============================================================================
// Tile Decoding
// ============================================================================
// Primary API: TileReader::new(data, validate) -> layer(name) -> feature(i)

pub use reader::TileReader;

pub use layer::{
    Layer,
    Value,
};

pub use feature::Feature;

// ============================================================================
// Geometry & Projections
// ============================================================================

pub use geometry::{
    CoordScalar,
    GeomType,
    LatLng,
    Point2d,
};
pub use geometry::clip::{
    clip_feature_geometry,
    clip_geometry,
};
pub use geometry::decode::{
    decode_geometry,
    scale_geometry,
    zigzag_decode,
};

// ============================================================================
// GeoJSON Export
// ============================================================================

pub use geojson::to_geojson;

// ============================================================================
// Errors
// ============================================================================

pub use error::TileError;
