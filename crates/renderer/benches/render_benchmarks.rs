//! Benchmarks for the color pipeline: pixel evaluation, legend sampling and
//! PNG encoding.
//!
//! Run with: cargo bench --package renderer --bench render_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use renderer::png;
use renderer::{colormap, render_legend, DisplayRangeController, PixelEvaluator, RangePolicy};

/// Emission-like grid: smooth field with a few no-data holes.
fn generate_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = vec![0.0f32; width * height];
    for y in 0..height {
        for x in 0..width {
            let fx = x as f32 / width as f32;
            let fy = y as f32 / height as f32;
            data[y * width + x] = if (x + y) % 97 == 0 {
                f32::NAN
            } else {
                ((fx * std::f32::consts::PI * 3.0).sin() * 0.5 + 0.5) * fy * 1e-9
            };
        }
    }
    data
}

fn evaluator() -> PixelEvaluator {
    let controller = DisplayRangeController::initialize(0.0, 1e-9, RangePolicy::Unclamped).unwrap();
    PixelEvaluator::new(1, controller.snapshot(), colormap("viridis").unwrap())
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    let e = evaluator();

    for size in [256usize, 512, 1024] {
        let grid = generate_grid(size, size);
        group.throughput(Throughput::Elements((size * size) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &grid, |b, grid| {
            b.iter(|| {
                let mut pixels = vec![0u8; grid.len() * 4];
                for (pixel, &value) in pixels.chunks_mut(4).zip(grid.iter()) {
                    if let Some(color) = e.color_for(black_box(value)) {
                        pixel.copy_from_slice(&color.to_array());
                    }
                }
                pixels
            })
        });
    }
    group.finish();
}

fn bench_legend(c: &mut Criterion) {
    let controller = DisplayRangeController::initialize(0.0, 2500.0, RangePolicy::Unclamped).unwrap();
    c.bench_function("legend_40_steps", |b| {
        b.iter(|| render_legend(black_box(&controller), "magma", 40))
    });
}

fn bench_png(c: &mut Criterion) {
    let mut group = c.benchmark_group("png_encode");
    let e = evaluator();

    for size in [256usize, 512] {
        let grid = generate_grid(size, size);
        let mut pixels = vec![0u8; size * size * 4];
        for (pixel, &value) in pixels.chunks_mut(4).zip(grid.iter()) {
            if let Some(color) = e.color_for(value) {
                pixel.copy_from_slice(&color.to_array());
            }
        }

        group.throughput(Throughput::Bytes(pixels.len() as u64));
        group.bench_with_input(BenchmarkId::new("auto", size), &pixels, |b, pixels| {
            b.iter(|| png::create_png_auto(black_box(pixels), size, size))
        });
        group.bench_with_input(BenchmarkId::new("rgba", size), &pixels, |b, pixels| {
            b.iter(|| png::create_png(black_box(pixels), size, size))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_evaluate, bench_legend, bench_png);
criterion_main!(benches);
