//! Benchmarks for mvtrs tile decoding performance.
//!
//! Run with: `cargo bench`
//!
//! These benchmarks measure the critical hot paths:
//! - Layer indexing on tile open
//! - Layer and feature decoding
//! - Geometry decoding with and without clipping
//! - WGS84 projection and GeoJSON export

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use mvtrs::{to_geojson, Point2d, TileReader};

// ----------------------------------------------------------------------------
// Synthetic tile construction (minimal hand-rolled protobuf writer)
// ----------------------------------------------------------------------------

fn put_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

fn put_field_varint(out: &mut Vec<u8>, tag: u64, value: u64) {
    put_varint(out, tag << 3);
    put_varint(out, value);
}

fn put_field_bytes(out: &mut Vec<u8>, tag: u64, payload: &[u8]) {
    put_varint(out, (tag << 3) | 2);
    put_varint(out, payload.len() as u64);
    out.extend_from_slice(payload);
}

fn zigzag_encode(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

/// Closed square ring as an MVT command stream.
fn square_geometry(origin: i64, size: i64) -> Vec<u8> {
    let mut geometry = Vec::new();
    put_varint(&mut geometry, (1 << 3) | 1); // MoveTo x1
    put_varint(&mut geometry, zigzag_encode(origin));
    put_varint(&mut geometry, zigzag_encode(origin));
    put_varint(&mut geometry, (3 << 3) | 2); // LineTo x3
    put_varint(&mut geometry, zigzag_encode(size));
    put_varint(&mut geometry, zigzag_encode(0));
    put_varint(&mut geometry, zigzag_encode(0));
    put_varint(&mut geometry, zigzag_encode(size));
    put_varint(&mut geometry, zigzag_encode(-size));
    put_varint(&mut geometry, zigzag_encode(0));
    put_varint(&mut geometry, 7); // ClosePath
    geometry
}

fn polygon_feature(id: u64, origin: i64, size: i64) -> Vec<u8> {
    let mut tags = Vec::new();
    put_varint(&mut tags, 0);
    put_varint(&mut tags, (id % 8) as u64);

    let mut feature = Vec::new();
    put_field_varint(&mut feature, 1, id);
    put_field_bytes(&mut feature, 2, &tags);
    put_field_varint(&mut feature, 3, 3); // Polygon
    put_field_bytes(&mut feature, 4, &square_geometry(origin, size));
    feature
}

/// One-layer tile with `count` square polygons marching across the extent,
/// some of them straddling the tile border.
fn synthetic_tile(count: u64) -> Vec<u8> {
    let mut layer = Vec::new();
    put_field_varint(&mut layer, 15, 2); // version
    put_field_bytes(&mut layer, 1, b"buildings");
    put_field_bytes(&mut layer, 3, b"height");
    for v in 0..8u64 {
        let mut value = Vec::new();
        put_field_varint(&mut value, 5, v * 3);
        put_field_bytes(&mut layer, 4, &value);
    }
    for i in 0..count {
        let origin = (i as i64 * 97) % 4300 - 100;
        put_field_bytes(&mut layer, 2, &polygon_feature(i, origin, 150));
    }
    put_field_varint(&mut layer, 5, 4096); // extent

    let mut tile = Vec::new();
    put_field_bytes(&mut tile, 3, &layer);
    tile
}

// ----------------------------------------------------------------------------
// Benchmarks
// ----------------------------------------------------------------------------

/// Benchmark tile open (layer-name indexing only)
fn bench_tile_open(c: &mut Criterion) {
    let data = synthetic_tile(500);

    let mut group = c.benchmark_group("tile_open");
    for validate in [false, true] {
        group.bench_with_input(
            BenchmarkId::new("validate", validate),
            &validate,
            |b, &validate| {
                b.iter(|| TileReader::new(black_box(data.clone()), validate));
            },
        );
    }
    group.finish();
}

/// Benchmark full layer decode at various feature counts
fn bench_layer_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("layer_decode");
    for count in [10, 100, 1000] {
        let tile = TileReader::new(synthetic_tile(count), false).unwrap();
        group.bench_with_input(BenchmarkId::new("features", count), &tile, |b, tile| {
            b.iter(|| tile.layer(black_box("buildings")));
        });
    }
    group.finish();
}

/// Benchmark geometry decode, unclipped vs clipped
fn bench_geometry(c: &mut Criterion) {
    let tile = TileReader::new(synthetic_tile(200), false).unwrap();
    let layer = tile.layer("buildings").unwrap().unwrap();

    let mut group = c.benchmark_group("geometry");

    group.bench_function("unclipped", |b| {
        b.iter(|| {
            for i in 0..layer.feature_count() {
                let feature = layer.feature(i).unwrap();
                let geom: Vec<Vec<Point2d<i64>>> =
                    feature.geometry(black_box(None), None).unwrap();
                black_box(geom);
            }
        });
    });

    group.bench_function("clipped_buffer_64", |b| {
        b.iter(|| {
            for i in 0..layer.feature_count() {
                let feature = layer.feature(i).unwrap();
                let geom: Vec<Vec<Point2d<i64>>> =
                    feature.geometry(black_box(Some(64)), None).unwrap();
                black_box(geom);
            }
        });
    });

    // Same feature queried twice: the second call hits the geometry cache.
    group.bench_function("cached_repeat", |b| {
        let feature = layer.feature(0).unwrap();
        let _: Vec<Vec<Point2d<i64>>> = feature.geometry(Some(64), None).unwrap();
        b.iter(|| {
            let geom: Vec<Vec<Point2d<i64>>> =
                feature.geometry(black_box(Some(64)), None).unwrap();
            black_box(geom);
        });
    });

    group.finish();
}

/// Benchmark WGS84 projection of a decoded feature
fn bench_projection(c: &mut Criterion) {
    let tile = TileReader::new(synthetic_tile(50), false).unwrap();
    let layer = tile.layer("buildings").unwrap().unwrap();
    let feature = layer.feature(0).unwrap();

    c.bench_function("geometry_wgs84", |b| {
        b.iter(|| {
            feature.geometry_wgs84(black_box(14), black_box(8717), black_box(5683), None)
        });
    });
}

/// Benchmark whole-tile GeoJSON export
fn bench_geojson(c: &mut Criterion) {
    let tile = TileReader::new(synthetic_tile(200), false).unwrap();

    c.bench_function("to_geojson", |b| {
        b.iter(|| to_geojson(black_box(&tile), 14, 8717, 5683, Some(64)));
    });
}

criterion_group!(
    benches,
    bench_tile_open,
    bench_layer_decode,
    bench_geometry,
    bench_projection,
    bench_geojson,
);

criterion_main!(benches);
