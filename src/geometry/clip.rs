//! Tile-boundary clipping.
//!
//! Geometry in a vector tile may extend past the tile edge into a buffer
//! zone. This module clips decoded parts against the axis-aligned rectangle
//! `[-buffer, extent + buffer]²`. Points are filtered directly; lines and
//! polygons go through the `geo` crate's boolean operations (intersection
//! for closed paths, line clip for open paths).
//!
//! Clipping is best-effort and never fails the decode path: degenerate input
//! that cannot be clipped is returned unchanged.

use geo::BooleanOps;
use geo_types::{Coord, LineString, MultiLineString, MultiPolygon, Polygon, Rect};

use crate::geometry::{GeomType, Point2d};

/// Clip decoded parts for one feature.
///
/// Multi-ring polygons are clipped ring by ring: the general clipper does
/// not reliably preserve the exterior/hole distinction when handed several
/// rings at once. A ring classified as a hole (non-negative signed area) is
/// reversed to nominal outer winding before clipping and every resulting
/// sub-part is reversed back afterwards, so the winding convention survives.
/// A ring entirely outside the clip rectangle contributes nothing; a ring
/// may split into several output parts (e.g. a U-shape straddling the
/// buffer).
#[must_use]
pub fn clip_feature_geometry(
    parts: Vec<Vec<Point2d<i64>>>,
    geom_type: GeomType,
    extent: i64,
    buffer: u32,
) -> Vec<Vec<Point2d<i64>>> {
    if parts.len() < 2 || geom_type != GeomType::Polygon {
        return clip_geometry(&parts, geom_type, extent, buffer);
    }

    let mut clipped = Vec::with_capacity(parts.len());
    for mut ring in parts {
        let is_inner = signed_area(&ring) >= 0.0;
        if is_inner {
            ring.reverse();
        }
        for mut sub in clip_geometry(std::slice::from_ref(&ring), geom_type, extent, buffer) {
            if is_inner {
                sub.reverse();
            }
            clipped.push(sub);
        }
    }
    clipped
}

/// Clip a set of parts against `[-buffer, extent + buffer]²`.
///
/// Point parts are filtered in place (a stable filter: surviving points keep
/// their relative order and empty parts are dropped). Line and polygon parts
/// are clipped as one path set; callers that need per-ring winding handling
/// go through [`clip_feature_geometry`].
#[must_use]
pub fn clip_geometry(
    parts: &[Vec<Point2d<i64>>],
    geom_type: GeomType,
    extent: i64,
    buffer: u32,
) -> Vec<Vec<Point2d<i64>>> {
    let lo = -i64::from(buffer);
    let hi = extent + i64::from(buffer);

    if geom_type == GeomType::Point {
        return parts
            .iter()
            .map(|part| {
                part.iter()
                    .filter(|p| p.x >= lo && p.x <= hi && p.y >= lo && p.y <= hi)
                    .copied()
                    .collect::<Vec<_>>()
            })
            .filter(|part: &Vec<Point2d<i64>>| !part.is_empty())
            .collect();
    }

    let rect = Rect::new(
        Coord {
            x: lo as f64,
            y: lo as f64,
        },
        Coord {
            x: hi as f64,
            y: hi as f64,
        },
    )
    .to_polygon();

    match geom_type {
        GeomType::Linestring => clip_lines(parts, &rect),
        GeomType::Polygon => clip_rings(parts, &rect),
        // Unknown geometry passes through untouched.
        _ => parts.to_vec(),
    }
}

fn clip_lines(parts: &[Vec<Point2d<i64>>], rect: &Polygon<f64>) -> Vec<Vec<Point2d<i64>>> {
    if parts.iter().all(|p| p.len() < 2) {
        tracing::debug!("degenerate line input, returning unclipped geometry");
        return parts.to_vec();
    }

    let subject = MultiLineString(
        parts
            .iter()
            .map(|part| LineString(part.iter().map(to_coord).collect()))
            .collect(),
    );
    let solution = rect.clip(&subject, false);

    solution
        .0
        .into_iter()
        .map(|line| line.0.iter().map(from_coord).collect::<Vec<_>>())
        .filter(|part: &Vec<Point2d<i64>>| !part.is_empty())
        .collect()
}

fn clip_rings(parts: &[Vec<Point2d<i64>>], rect: &Polygon<f64>) -> Vec<Vec<Point2d<i64>>> {
    // A ring needs at least 3 distinct vertices to enclose area; handing the
    // clipper less than that is the degenerate case where the original
    // geometry is returned as-is.
    let rings: Vec<&Vec<Point2d<i64>>> = parts.iter().filter(|p| distinct_len(p) >= 3).collect();
    if rings.is_empty() {
        tracing::debug!("degenerate polygon input, returning unclipped geometry");
        return parts.to_vec();
    }

    let subject = MultiPolygon(
        rings
            .iter()
            .map(|ring| Polygon::new(LineString(ring.iter().map(to_coord).collect()), Vec::new()))
            .collect(),
    );
    let solution = subject.intersection(rect);

    let mut out = Vec::new();
    for polygon in solution {
        let (exterior, interiors) = polygon.into_inner();
        for ring in std::iter::once(exterior).chain(interiors) {
            let mut part: Vec<Point2d<i64>> = ring.0.iter().map(from_coord).collect();
            let Some(&last) = part.last() else {
                continue;
            };
            // The clipper may drop the duplicate closing vertex; restore
            // closure by reinserting a copy of the last vertex at the front.
            if part.first() != Some(&last) {
                part.insert(0, last);
            }
            out.push(part);
        }
    }
    out
}

/// Shoelace signed area over a ring, excluding the explicit closing vertex.
///
/// In tile coordinates (y grows downwards) an exterior ring encoded per the
/// MVT convention accumulates a negative sum; a non-negative sum marks an
/// inner ring (hole).
#[must_use]
pub fn signed_area(ring: &[Point2d<i64>]) -> f64 {
    let mut area = 0.0;
    for pair in ring.windows(2) {
        area += (pair[1].x - pair[0].x) as f64 * (pair[1].y + pair[0].y) as f64 / 2.0;
    }
    area
}

fn distinct_len(ring: &[Point2d<i64>]) -> usize {
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.len() - 1
    } else {
        ring.len()
    }
}

#[inline]
fn to_coord(p: &Point2d<i64>) -> Coord<f64> {
    Coord {
        x: p.x as f64,
        y: p.y as f64,
    }
}

#[inline]
fn from_coord(c: &Coord<f64>) -> Point2d<i64> {
    Point2d::new(c.x.round() as i64, c.y.round() as i64)
}
