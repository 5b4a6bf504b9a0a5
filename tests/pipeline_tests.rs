//! Bloom pipeline tests (CPU backend)
//!
//! Tests for:
//! - Recorded pass order for `apply` and `run_full_pipeline`
//! - Numerical behavior: threshold rejection, symmetric glow, combine + dither
//! - Skip paths: program unavailable, disabled, empty pyramid
//! - Allocator failure fallback and temporary bookkeeping
//! - In-place (aliased) source and destination

use fast_bloom::core::{FilterPass, NoiseTexture};
use fast_bloom::renderer::cpu::{CpuBackend, CpuCommand, CpuImage, CpuTextureId};
use fast_bloom::{Bloom, BloomError, BloomOutcome, BloomSettings, SkipReason, TextureDesc};
use glam::{UVec2, Vec2, Vec4};

// ============================================================================
// Helper
// ============================================================================

const SIZE: u32 = 64;

fn settings() -> BloomSettings {
    let mut s = BloomSettings::default();
    s.set_resolution(64);
    s
}

fn gray(value: f32) -> CpuImage {
    CpuImage::filled(SIZE, SIZE, Vec4::new(value, value, value, 1.0))
}

/// Black frame with a bright 2×2 block at the center.
fn bright_center() -> CpuImage {
    CpuImage::from_fn(SIZE, SIZE, |x, y| {
        if (31..=32).contains(&x) && (31..=32).contains(&y) {
            Vec4::new(4.0, 4.0, 4.0, 1.0)
        } else {
            Vec4::new(0.0, 0.0, 0.0, 1.0)
        }
    })
}

fn passes(backend: &CpuBackend) -> Vec<Option<FilterPass>> {
    backend.commands().iter().map(CpuCommand::pass).collect()
}

fn blit_sizes(backend: &CpuBackend) -> Vec<(UVec2, UVec2)> {
    backend
        .commands()
        .iter()
        .filter_map(|c| match c {
            CpuCommand::Blit {
                source_size,
                destination_size,
                ..
            } => Some((*source_size, *destination_size)),
            CpuCommand::Clear { .. } => None,
        })
        .collect()
}

fn setup(source: CpuImage) -> (CpuBackend, CpuTextureId, CpuTextureId, TextureDesc) {
    let mut backend = CpuBackend::new();
    let src = backend.insert(source);
    let dst = backend.insert(CpuImage::new(SIZE, SIZE));
    let desc = backend.desc(src).unwrap();
    (backend, src, dst, desc)
}

fn pyramid_passes() -> Vec<Option<FilterPass>> {
    let mut expected = vec![Some(FilterPass::Prefilter)];
    expected.extend([Some(FilterPass::Downsample); 4]);
    expected.extend([Some(FilterPass::Upsample); 4]);
    expected.push(Some(FilterPass::Final));
    expected
}

fn assert_images_close(a: &CpuImage, b: &CpuImage, tolerance: f32) {
    assert_eq!(a.extent(), b.extent());
    for (pa, pb) in a.pixels().iter().zip(b.pixels()) {
        assert!(
            (*pa - *pb).abs().max_element() <= tolerance,
            "{pa} vs {pb}"
        );
    }
}

// ============================================================================
// Pass Order
// ============================================================================

#[test]
fn apply_records_passes_in_order() {
    let (mut backend, src, dst, _) = setup(gray(0.15));
    let dst_desc = TextureDesc::color(SIZE, SIZE, wgpu::TextureFormat::Rgba16Float);
    let mut bloom = Bloom::new(settings());

    let outcome = bloom
        .apply(&mut backend, &src, &dst, UVec2::splat(SIZE), &dst_desc)
        .unwrap();

    assert_eq!(outcome, BloomOutcome::Applied { levels: 5 });
    assert_eq!(passes(&backend), pyramid_passes());

    let s = |n: u32| UVec2::splat(n);
    assert_eq!(
        blit_sizes(&backend),
        vec![
            (s(64), s(32)),
            (s(32), s(16)),
            (s(16), s(8)),
            (s(8), s(4)),
            (s(4), s(2)),
            (s(2), s(4)),
            (s(4), s(8)),
            (s(8), s(16)),
            (s(16), s(32)),
            (s(32), s(64)),
        ]
    );
}

#[test]
fn apply_binds_texel_size_of_the_read_image() {
    let (mut backend, src, dst, _) = setup(gray(0.15));
    let dst_desc = TextureDesc::color(SIZE, SIZE, wgpu::TextureFormat::Rgba16Float);
    let mut bloom = Bloom::new(settings());
    bloom
        .apply(&mut backend, &src, &dst, UVec2::splat(SIZE), &dst_desc)
        .unwrap();

    for command in backend.commands() {
        if let CpuCommand::Blit {
            source_size,
            texel_size,
            ..
        } = command
        {
            assert_eq!(*texel_size, Some(Vec2::ONE / source_size.as_vec2()));
        }
    }
}

#[test]
fn full_pipeline_records_copy_bloom_combine() {
    let (mut backend, src, dst, desc) = setup(gray(0.15));
    let mut bloom = Bloom::new(settings());

    let outcome = bloom.run_full_pipeline(&mut backend, &src, &dst, &desc).unwrap();

    assert_eq!(outcome, BloomOutcome::Applied { levels: 5 });

    let mut expected = vec![Some(FilterPass::Copy)];
    expected.extend(pyramid_passes());
    expected.push(Some(FilterPass::Combine));
    assert_eq!(passes(&backend), expected);

    match backend.commands().last() {
        Some(CpuCommand::Blit { destination, .. }) => assert_eq!(*destination, dst),
        other => panic!("unexpected last command {other:?}"),
    }
}

#[test]
fn repeated_frames_reuse_temporaries() {
    let (mut backend, src, dst, desc) = setup(gray(0.15));
    let mut bloom = Bloom::new(settings());

    bloom.run_full_pipeline(&mut backend, &src, &dst, &desc).unwrap();
    let created = backend.created_temporaries();
    bloom.run_full_pipeline(&mut backend, &src, &dst, &desc).unwrap();

    assert_eq!(backend.created_temporaries(), created);
    // Only the pyramid stays checked out between frames
    assert_eq!(backend.outstanding_temporaries(), 5);
}

// ============================================================================
// Numerical Behavior
// ============================================================================

#[test]
fn dim_frame_produces_no_bloom() {
    let (mut backend, src, dst, _) = setup(gray(0.15));
    let dst_desc = backend.desc(dst).unwrap();
    let mut bloom = Bloom::new(settings());

    bloom
        .apply(&mut backend, &src, &dst, UVec2::splat(SIZE), &dst_desc)
        .unwrap();

    assert_eq!(backend.image(dst).unwrap().max_rgb(), 0.0);
}

#[test]
fn mid_gray_inside_knee_blooms_softly() {
    let (mut backend, src, dst, _) = setup(gray(0.5));
    let dst_desc = backend.desc(dst).unwrap();
    let mut bloom = Bloom::new(settings());

    bloom
        .apply(&mut backend, &src, &dst, UVec2::splat(SIZE), &dst_desc)
        .unwrap();

    // Prefilter keeps 0.5 * 0.595238 * (0.5 - 0.18)^2 / 0.5 per channel.
    // Every level stays uniform, so five levels accumulate to 5x that
    // before the final pass scales by intensity.
    let prefiltered = 0.595_238 * 0.32 * 0.32;
    let expected = 5.0 * prefiltered * 0.8;
    assert!((expected - 0.2438_f32).abs() < 1e-3);

    let result = backend.image(dst).unwrap();
    for p in result.pixels() {
        for c in [p.x, p.y, p.z] {
            assert!((c - expected).abs() < 1e-4, "{c} vs {expected}");
        }
    }
}

#[test]
fn dim_frame_passes_through_full_pipeline() {
    let (mut backend, src, dst, desc) = setup(gray(0.15));
    let mut bloom = Bloom::new(settings());

    bloom.run_full_pipeline(&mut backend, &src, &dst, &desc).unwrap();

    let source = backend.image(src).unwrap().clone();
    assert_images_close(backend.image(dst).unwrap(), &source, 1e-6);
}

#[test]
fn bright_block_glows_symmetrically() {
    let (mut backend, src, dst, _) = setup(bright_center());
    let dst_desc = backend.desc(dst).unwrap();
    let mut bloom = Bloom::new(settings());

    bloom
        .apply(&mut backend, &src, &dst, UVec2::splat(SIZE), &dst_desc)
        .unwrap();
    let result = backend.image(dst).unwrap();

    let row: Vec<f32> = (0..SIZE).map(|x| result.get(x, 32).x).collect();

    assert!(row[32] > 0.0);
    for x in 0..SIZE as usize {
        let mirrored = row[SIZE as usize - 1 - x];
        assert!((row[x] - mirrored).abs() < 1e-4, "x={x}: {} vs {mirrored}", row[x]);
    }
    for x in 32..SIZE as usize - 1 {
        assert!(row[x + 1] <= row[x] + 1e-4, "x={x}: {} then {}", row[x], row[x + 1]);
    }
    assert!(row[0] < row[32]);
}

#[test]
fn bright_block_glow_is_vertically_symmetric() {
    let (mut backend, src, dst, _) = setup(bright_center());
    let dst_desc = backend.desc(dst).unwrap();
    let mut bloom = Bloom::new(settings());

    bloom
        .apply(&mut backend, &src, &dst, UVec2::splat(SIZE), &dst_desc)
        .unwrap();
    let result = backend.image(dst).unwrap();

    for y in 0..SIZE {
        let a = result.get(20, y).x;
        let b = result.get(20, SIZE - 1 - y).x;
        assert!((a - b).abs() < 1e-4);
    }
}

#[test]
fn intensity_scales_bloom_linearly() {
    let run = |intensity: f32| {
        let (mut backend, src, dst, _) = setup(bright_center());
        let dst_desc = backend.desc(dst).unwrap();
        let mut s = settings();
        s.set_intensity(intensity);
        let mut bloom = Bloom::new(s);
        bloom
            .apply(&mut backend, &src, &dst, UVec2::splat(SIZE), &dst_desc)
            .unwrap();
        backend.image(dst).unwrap().get(32, 32).x
    };

    let one = run(1.0);
    let two = run(2.0);
    assert!(one > 0.0);
    assert!((two - 2.0 * one).abs() < 1e-4);
    assert_eq!(run(0.0), 0.0);
}

#[test]
fn full_pipeline_adds_bloom_onto_source() {
    let (mut backend, src, dst, desc) = setup(bright_center());
    let mut bloom = Bloom::new(settings());

    bloom.run_full_pipeline(&mut backend, &src, &dst, &desc).unwrap();

    let source = backend.image(src).unwrap();
    let result = backend.image(dst).unwrap();
    for (s, r) in source.pixels().iter().zip(result.pixels()) {
        assert!(r.x >= s.x);
        assert_eq!(r.w, s.w);
    }
    assert!(result.get(28, 32).x > 0.0);
}

#[test]
fn combine_applies_dither_from_noise() {
    let (mut backend, src, dst, _) = setup(gray(0.25));
    let bloom_result = backend.insert(CpuImage::new(SIZE, SIZE));
    let noise = NoiseTexture {
        texture: backend.insert(CpuImage::filled(4, 4, Vec4::ONE)),
        size: UVec2::new(4, 4),
    };
    let bloom: Bloom<CpuTextureId> = Bloom::new(settings());

    bloom
        .combine(&mut backend, &src, &dst, &bloom_result, Some(&noise))
        .unwrap();

    let expected = 0.25 + 0.5 / 255.0;
    let result = backend.image(dst).unwrap();
    assert!(result.pixels().iter().all(|p| (p.x - expected).abs() < 1e-6));
    assert!(result.pixels().iter().all(|p| p.w == 1.0));
}

#[test]
fn combine_without_noise_has_no_dither() {
    let (mut backend, src, dst, _) = setup(gray(0.25));
    let bloom_result = backend.insert(CpuImage::filled(SIZE, SIZE, Vec4::new(0.5, 0.0, 0.0, 0.0)));
    let bloom: Bloom<CpuTextureId> = Bloom::new(settings());

    bloom
        .combine(&mut backend, &src, &dst, &bloom_result, None)
        .unwrap();

    let p = backend.image(dst).unwrap().get(10, 10);
    assert!((p.x - 0.75).abs() < 1e-6);
    assert!((p.y - 0.25).abs() < 1e-6);
}

// ============================================================================
// Skip Paths
// ============================================================================

#[test]
fn unavailable_program_records_nothing() {
    let (mut backend, src, dst, desc) = setup(bright_center());
    backend.set_ready(false);
    let mut bloom = Bloom::new(settings());

    let outcome = bloom.run_full_pipeline(&mut backend, &src, &dst, &desc).unwrap();

    assert_eq!(outcome, BloomOutcome::Skipped(SkipReason::ProgramUnavailable));
    assert!(backend.commands().is_empty());
    assert!(!bloom.pyramid().is_valid());
    assert_eq!(backend.image(dst).unwrap().max_rgb(), 0.0);
}

#[test]
fn unavailable_program_skips_apply() {
    let (mut backend, src, dst, _) = setup(bright_center());
    backend.set_ready(false);
    let dst_desc = backend.desc(dst).unwrap();
    let mut bloom = Bloom::new(settings());

    let outcome = bloom
        .apply(&mut backend, &src, &dst, UVec2::splat(SIZE), &dst_desc)
        .unwrap();

    assert_eq!(outcome, BloomOutcome::Skipped(SkipReason::ProgramUnavailable));
    assert_eq!(backend.created_temporaries(), 0);
}

#[test]
fn disabled_copies_source() {
    let (mut backend, src, dst, desc) = setup(bright_center());
    let mut s = settings();
    s.enabled = false;
    let mut bloom = Bloom::new(s);

    let outcome = bloom.run_full_pipeline(&mut backend, &src, &dst, &desc).unwrap();

    assert_eq!(outcome, BloomOutcome::Skipped(SkipReason::Disabled));
    assert_eq!(passes(&backend), vec![Some(FilterPass::Copy)]);
    assert_eq!(backend.image(dst).unwrap(), backend.image(src).unwrap());
}

#[test]
fn disabled_in_place_records_nothing() {
    let (mut backend, src, _, desc) = setup(bright_center());
    let mut s = settings();
    s.enabled = false;
    let mut bloom = Bloom::new(s);

    bloom.run_full_pipeline(&mut backend, &src, &src, &desc).unwrap();
    assert!(backend.commands().is_empty());
}

#[test]
fn empty_pyramid_clears_destination() {
    let (mut backend, src, dst, _) = setup(bright_center());
    backend.image_mut(dst).unwrap().fill(Vec4::ONE);
    let dst_desc = backend.desc(dst).unwrap();
    let mut bloom = Bloom::new(settings());

    let outcome = bloom
        .apply(&mut backend, &src, &dst, UVec2::new(3, 3), &dst_desc)
        .unwrap();

    assert_eq!(outcome, BloomOutcome::Skipped(SkipReason::NoPyramidLevels));
    assert_eq!(backend.commands(), &[CpuCommand::Clear { destination: dst }]);
    assert!(backend.image(dst).unwrap().pixels().iter().all(|p| *p == Vec4::ZERO));
}

// ============================================================================
// Allocation Failure
// ============================================================================

fn assert_fallback_copy(budget: usize) {
    let (mut backend, src, dst, desc) = setup(bright_center());
    backend.set_allocation_budget(Some(budget));
    let mut bloom = Bloom::new(settings());

    let err = bloom
        .run_full_pipeline(&mut backend, &src, &dst, &desc)
        .unwrap_err();

    assert!(matches!(err, BloomError::ScratchAllocation { .. }));
    assert!(err.is_allocation_failure());
    assert_eq!(backend.image(dst).unwrap(), backend.image(src).unwrap());
    assert_eq!(backend.outstanding_temporaries(), 0);
    assert!(!bloom.pyramid().is_valid());
}

#[test]
fn temp_allocation_failure_copies_source() {
    assert_fallback_copy(0);
}

#[test]
fn target_allocation_failure_copies_source() {
    assert_fallback_copy(1);
}

#[test]
fn pyramid_allocation_failure_copies_source() {
    assert_fallback_copy(4);
}

#[test]
fn frame_after_failure_recovers() {
    let (mut backend, src, dst, desc) = setup(bright_center());
    backend.set_allocation_budget(Some(3));
    let mut bloom = Bloom::new(settings());

    assert!(bloom.run_full_pipeline(&mut backend, &src, &dst, &desc).is_err());

    backend.set_allocation_budget(None);
    let outcome = bloom.run_full_pipeline(&mut backend, &src, &dst, &desc).unwrap();
    assert_eq!(outcome, BloomOutcome::Applied { levels: 5 });
}

// ============================================================================
// Aliasing and Lifecycle
// ============================================================================

#[test]
fn in_place_bloom_reads_the_original_frame() {
    let (mut backend, src, dst, desc) = setup(bright_center());
    let mut bloom = Bloom::new(settings());

    bloom.run_full_pipeline(&mut backend, &src, &dst, &desc).unwrap();
    let out_of_place = backend.image(dst).unwrap().clone();

    backend.take_commands();
    let mut bloom = Bloom::new(settings());
    bloom.run_full_pipeline(&mut backend, &src, &src, &desc).unwrap();

    match backend.commands().first() {
        Some(CpuCommand::Blit {
            pass: FilterPass::Copy,
            source,
            destination,
            ..
        }) => {
            assert_eq!(*source, src);
            assert_ne!(*destination, src);
        }
        other => panic!("expected leading copy, got {other:?}"),
    }
    assert_images_close(backend.image(src).unwrap(), &out_of_place, 1e-5);
}

#[test]
fn settings_change_takes_effect_next_frame() {
    let (mut backend, src, dst, desc) = setup(gray(0.15));
    let mut bloom = Bloom::new(settings());

    bloom.run_full_pipeline(&mut backend, &src, &dst, &desc).unwrap();
    assert_eq!(bloom.pyramid().len(), 5);

    let mut s = settings();
    s.set_iterations(2);
    bloom.set_parameters(s);
    let outcome = bloom.run_full_pipeline(&mut backend, &src, &dst, &desc).unwrap();

    assert_eq!(outcome, BloomOutcome::Applied { levels: 2 });
    assert_eq!(bloom.settings().iterations(), 2);
}

#[test]
fn dispose_returns_everything() {
    let (mut backend, src, dst, desc) = setup(gray(0.15));
    let mut bloom = Bloom::new(settings());
    let noise = backend.insert(CpuImage::filled(4, 4, Vec4::splat(0.5)));
    bloom.set_noise_texture(Some(NoiseTexture {
        texture: noise,
        size: UVec2::new(4, 4),
    }));

    bloom.run_full_pipeline(&mut backend, &src, &dst, &desc).unwrap();
    bloom.dispose(&mut backend);
    bloom.dispose(&mut backend);

    assert!(!bloom.pyramid().is_valid());
    assert!(bloom.noise_texture().is_none());
    assert_eq!(backend.outstanding_temporaries(), 0);
}
