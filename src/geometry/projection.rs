//! Tile-local to WGS84 projection (inverse Web Mercator).
//!
//! A point inside a tile addressed by `zoom`/`col`/`row` with a layer extent
//! of `E` lives on a global grid of `E * 2^zoom` units per axis. The inverse
//! Web Mercator transform maps that grid position to longitude/latitude.

use std::f64::consts::PI;

use crate::error::TileError;
use crate::geometry::LatLng;

/// Largest latitude representable in Web Mercator.
pub const LATITUDE_MAX: f64 = 85.051_128_779_806_59;

/// Project a tile-local coordinate to WGS84.
///
/// # Arguments
/// * `x`, `y` - Tile-local coordinates (same units as `extent`)
/// * `zoom` - Zoom level of the tile
/// * `col`, `row` - Tile address in the OSM tile schema
/// * `extent` - Layer extent (tile-local units per tile edge)
/// * `check_range` - Fail on coordinates outside Web-Mercator-valid bounds
///
/// # Errors
/// `OutOfRange` when `check_range` is set and longitude leaves [-180, 180]
/// or latitude leaves [-85.0511..., 85.0511...]. Without `check_range` the
/// computed value is returned unchecked; tiles near the poles or with
/// malformed offsets can exceed range and callers decide whether that is
/// fatal.
pub fn project_tile_point(
    x: f64,
    y: f64,
    zoom: u64,
    col: u64,
    row: u64,
    extent: u64,
    check_range: bool,
) -> Result<LatLng, TileError> {
    let size = extent as f64 * 2f64.powi(zoom as i32);
    let x0 = extent as f64 * col as f64;
    let y0 = extent as f64 * row as f64;

    let lng = (x + x0) * 360.0 / size - 180.0;
    let y2 = 180.0 - (y + y0) * 360.0 / size;
    let lat = 360.0 / PI * (y2 * PI / 180.0).exp().atan() - 90.0;

    if check_range {
        if !(-180.0..=180.0).contains(&lng) {
            return Err(TileError::OutOfRange(format!(
                "longitude {lng} outside [-180, 180]"
            )));
        }
        if !(-LATITUDE_MAX..=LATITUDE_MAX).contains(&lat) {
            return Err(TileError::OutOfRange(format!(
                "latitude {lat} outside [-{LATITUDE_MAX}, {LATITUDE_MAX}]"
            )));
        }
    }

    Ok(LatLng { lat, lng })
}
