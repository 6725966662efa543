//! Benchmarks for the per-cycle analysis path

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgb, RgbImage};
use vlux_meter::{
    analysis::{brightness, crop, estimate_lux, CropRegion},
    capture::Frame,
    config::CalibrationTable,
};

fn bench_estimate_lux(c: &mut Criterion) {
    let table = CalibrationTable::default();

    c.bench_function("estimate_lux_interpolated", |b| {
        b.iter(|| estimate_lux(black_box(137.5), &table))
    });

    c.bench_function("estimate_lux_sweep", |b| {
        b.iter(|| {
            (0..=255u32)
                .map(|v| estimate_lux(black_box(f64::from(v)), &table))
                .sum::<u64>()
        })
    });
}

fn bench_brightness(c: &mut Criterion) {
    let frame = Frame::new(
        RgbImage::from_fn(640, 480, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128])),
        1,
    );
    let region = CropRegion::new(0.25, 0.25, 0.75, 0.75).unwrap_or_default();

    c.bench_function("brightness_640x480", |b| {
        b.iter(|| brightness(black_box(frame.image())))
    });

    c.bench_function("crop_and_brightness_640x480", |b| {
        b.iter(|| {
            let cropped = crop(black_box(&frame), &region).unwrap();
            brightness(&cropped)
        })
    });
}

criterion_group!(benches, bench_estimate_lux, bench_brightness);
criterion_main!(benches);
