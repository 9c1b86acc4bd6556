//! Compensation pass benchmarks
//!
//! Run with: cargo bench -p gcodelevel-leveling

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use gcodelevel_gcode::{GcodeParser, GcodeToken};
use gcodelevel_leveling::{compensate, CompensationOptions, GridHeightMap};

/// Zig-zag surfacing pass with rounded turnarounds
fn surfacing_program(rows: usize) -> String {
    let mut program = String::from("G17 G90\nG0 X0 Y0 Z1\nG1 Z-0.1 F300\n");
    for row in 0..rows {
        let y = row as f64 * 2.0;
        if row % 2 == 0 {
            program.push_str(&format!("G1 X100 Y{}\nG3 X100 Y{} R1\n", y, y + 2.0));
        } else {
            program.push_str(&format!("G1 X0 Y{}\nG2 X0 Y{} I0 J1\n", y, y + 2.0));
        }
    }
    program
}

fn probed_map() -> GridHeightMap {
    let points = (0..11)
        .map(|row| {
            (0..11)
                .map(|column| ((row * column) as f64 * 0.37).sin() * 0.05)
                .collect()
        })
        .collect();
    GridHeightMap::new([0.0, 0.0], [100.0, 100.0], points).expect("valid grid")
}

fn compensation_benchmark(c: &mut Criterion) {
    let tokens: Vec<GcodeToken> = GcodeParser::new()
        .parse(&surfacing_program(50))
        .expect("valid program");
    let map = probed_map();

    c.bench_function("compensate_surfacing_grid_spacing", |b| {
        b.iter(|| compensate(black_box(&tokens), &map, &CompensationOptions::default()))
    });

    let fine = CompensationOptions {
        segment_length: Some(0.5),
        ..Default::default()
    };
    c.bench_function("compensate_surfacing_half_mm", |b| {
        b.iter(|| compensate(black_box(&tokens), &map, &fine))
    });
}

criterion_group!(benches, compensation_benchmark);
criterion_main!(benches);
