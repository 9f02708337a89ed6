//! Coordinate types and geometry processing.
//!
//! - [`Point2d`]: a 2D tile-local coordinate pair, generic over the numeric
//!   representation via [`CoordScalar`].
//! - [`GeomType`]: the MVT geometry type enum.
//! - [`LatLng`]: a WGS84 coordinate pair.
//! - [`decode`]: command-stream decoding to coordinate parts.
//! - [`clip`]: tile-boundary clipping with winding-order correction.
//! - [`projection`]: tile-local to WGS84 projection.

pub mod clip;
pub mod decode;
pub mod projection;

use std::fmt;

use crate::error::TileError;

/// Geometry types defined by the MVT specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeomType {
    #[default]
    Unknown = 0,
    Point = 1,
    Linestring = 2,
    Polygon = 3,
}

impl GeomType {
    /// Map a decoded `type` field value to a geometry type.
    #[must_use]
    pub fn from_tag(tag: i64) -> Option<Self> {
        match tag {
            0 => Some(GeomType::Unknown),
            1 => Some(GeomType::Point),
            2 => Some(GeomType::Linestring),
            3 => Some(GeomType::Polygon),
            _ => None,
        }
    }

    /// Human-readable name, matching GeoJSON geometry type spelling.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            GeomType::Unknown => "Unknown",
            GeomType::Point => "Point",
            GeomType::Linestring => "LineString",
            GeomType::Polygon => "Polygon",
        }
    }
}

/// Numeric types usable as the output coordinate representation.
///
/// Decoding happens in the `i64` domain; the final scaling step converts to
/// the caller-chosen scalar. Integer targets round to nearest.
pub trait CoordScalar: Copy {
    fn from_f64(value: f64) -> Self;
    fn to_f64(self) -> f64;
}

impl CoordScalar for i64 {
    #[inline]
    fn from_f64(value: f64) -> Self {
        value.round() as i64
    }
    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl CoordScalar for i32 {
    #[inline]
    fn from_f64(value: f64) -> Self {
        value.round() as i32
    }
    #[inline]
    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl CoordScalar for f32 {
    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }
    #[inline]
    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl CoordScalar for f64 {
    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }
    #[inline]
    fn to_f64(self) -> f64 {
        self
    }
}

/// A 2D point in internal tile coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point2d<T> {
    pub x: T,
    pub y: T,
}

impl<T> Point2d<T> {
    #[inline]
    pub fn new(x: T, y: T) -> Self {
        Point2d { x, y }
    }
}

impl<T: CoordScalar> Point2d<T> {
    /// Project this tile-local point to WGS84 for the tile at
    /// `zoom`/`col`/`row` with the given layer extent.
    ///
    /// # Errors
    /// `OutOfRange` if `check_range` is set and the result falls outside
    /// Web-Mercator-valid bounds.
    pub fn to_lat_lng(
        &self,
        zoom: u64,
        col: u64,
        row: u64,
        extent: u64,
        check_range: bool,
    ) -> Result<LatLng, TileError> {
        projection::project_tile_point(
            self.x.to_f64(),
            self.y.to_f64(),
            zoom,
            col,
            row,
            extent,
            check_range,
        )
    }
}

impl<T: fmt::Display> fmt::Display for Point2d<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.x, self.y)
    }
}

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}/{:.6}", self.lat, self.lng)
    }
}
