use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use fast_bloom::core::{ThresholdCurve, pyramid_extents};
use fast_bloom::renderer::cpu::{CpuBackend, CpuImage};
use fast_bloom::{Bloom, BloomSettings};
use glam::{UVec2, Vec4};

fn frame(width: u32, height: u32) -> CpuImage {
    CpuImage::from_fn(width, height, |x, y| {
        let hot = (x / 16 + y / 16) % 7 == 0;
        if hot {
            Vec4::new(3.0, 2.5, 2.0, 1.0)
        } else {
            Vec4::new(0.1, 0.1, 0.12, 1.0)
        }
    })
}

fn bench_threshold_curve(c: &mut Criterion) {
    let curve = ThresholdCurve::new(0.6, 0.7);
    c.bench_function("threshold_factor", |b| {
        b.iter(|| black_box(curve.factor(black_box(0.9))))
    });
}

fn bench_pyramid_extents(c: &mut Criterion) {
    c.bench_function("pyramid_extents_910x512", |b| {
        b.iter(|| black_box(pyramid_extents(black_box(UVec2::new(910, 512)), 8)))
    });
}

fn bench_cpu_pipeline(c: &mut Criterion) {
    let mut backend = CpuBackend::new();
    let src = backend.insert(frame(256, 144));
    let dst = backend.insert(CpuImage::new(256, 144));
    let Ok(camera) = backend.desc(src) else {
        return;
    };

    let mut settings = BloomSettings::default();
    settings.set_resolution(128);
    let mut bloom = Bloom::new(settings);

    c.bench_function("cpu_full_pipeline_256x144", |b| {
        b.iter(|| {
            backend.take_commands();
            black_box(bloom.run_full_pipeline(&mut backend, &src, &dst, &camera).ok())
        })
    });
}

criterion_group!(
    benches,
    bench_threshold_curve,
    bench_pyramid_extents,
    bench_cpu_pipeline
);
criterion_main!(benches);
