//! Geometry command-stream decoding.
//!
//! MVT geometry is a flat run of unsigned 32-bit integers: a command header
//! whose low 3 bits select MoveTo/LineTo/ClosePath and whose remaining bits
//! give a repeat count, followed (for MoveTo/LineTo) by that many
//! zigzag-encoded coordinate delta pairs. Deltas accumulate against a running
//! cursor that starts at the origin, producing absolute tile-local
//! coordinates grouped into parts (one part per ring, line or point cluster).

use crate::error::TileError;
use crate::geometry::{CoordScalar, GeomType, Point2d};

const CMD_MOVE_TO: u32 = 1;
const CMD_LINE_TO: u32 = 2;
const CMD_CLOSE_PATH: u32 = 7;

/// Zigzag-decode a geometry parameter: `(n >> 1) ^ -(n & 1)`.
#[inline]
#[must_use]
pub fn zigzag_decode(n: u32) -> i64 {
    let v = i64::from(n);
    (v >> 1) ^ -(v & 1)
}

/// Decode a raw command stream into absolute coordinate parts.
///
/// MoveTo starts a new part; LineTo extends the current one; ClosePath
/// (polygons only) duplicates the first point of the part as its last point
/// unless the ring is already closed. Unknown commands fail
/// [`TileError::MalformedGeometry`]; anything that decodes is accepted.
///
/// # Errors
/// `MalformedGeometry` on an unknown command or a parameter run that extends
/// past the end of the stream.
pub fn decode_geometry(
    geom_type: GeomType,
    commands: &[u32],
) -> Result<Vec<Vec<Point2d<i64>>>, TileError> {
    let mut parts: Vec<Vec<Point2d<i64>>> = Vec::new();
    let mut part: Vec<Point2d<i64>> = Vec::new();
    let mut cursor_x: i64 = 0;
    let mut cursor_y: i64 = 0;

    let mut i = 0;
    while i < commands.len() {
        let header = commands[i];
        i += 1;
        let command = header & 0x07;
        let count = header >> 3;

        match command {
            CMD_MOVE_TO | CMD_LINE_TO => {
                for _ in 0..count {
                    let (Some(&dx), Some(&dy)) = (commands.get(i), commands.get(i + 1)) else {
                        return Err(TileError::MalformedGeometry(
                            "parameter pair extends past end of command stream".to_string(),
                        ));
                    };
                    i += 2;
                    cursor_x += zigzag_decode(dx);
                    cursor_y += zigzag_decode(dy);
                    if command == CMD_MOVE_TO && !part.is_empty() {
                        parts.push(std::mem::take(&mut part));
                    }
                    part.push(Point2d::new(cursor_x, cursor_y));
                }
            }
            CMD_CLOSE_PATH => {
                if geom_type == GeomType::Polygon && !part.is_empty() {
                    let first = part[0];
                    if part.last() != Some(&first) {
                        part.push(first);
                    }
                }
            }
            other => {
                return Err(TileError::MalformedGeometry(format!(
                    "unknown geometry command: {other}"
                )));
            }
        }
    }

    if !part.is_empty() {
        parts.push(part);
    }

    Ok(parts)
}

/// Scale integer-domain parts by `scale` into the caller-chosen scalar type.
#[must_use]
pub fn scale_geometry<T: CoordScalar>(
    parts: &[Vec<Point2d<i64>>],
    scale: f32,
) -> Vec<Vec<Point2d<T>>> {
    let factor = f64::from(scale);
    parts
        .iter()
        .map(|part| {
            part.iter()
                .map(|p| {
                    Point2d::new(
                        T::from_f64(p.x as f64 * factor),
                        T::from_f64(p.y as f64 * factor),
                    )
                })
                .collect()
        })
        .collect()
}
