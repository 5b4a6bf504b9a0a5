//! Offline Bloom Example
//!
//! Runs the CPU bloom pipeline over an image and writes the result as PNG.
//!
//! ```text
//! cargo run --example bloom_image -- [input] [output.png] [settings.json]
//! ```
//!
//! Without an input a synthetic frame with a few bright spots is used.
//! Set `RUST_LOG=debug` to see pyramid allocation and pool activity.

use anyhow::Context;
use fast_bloom::renderer::cpu::{CpuBackend, CpuImage};
use fast_bloom::{Bloom, BloomSettings, NoiseTexture};
use glam::{UVec2, Vec2, Vec4};

fn synthetic_frame(width: u32, height: u32) -> CpuImage {
    let lights = [
        (Vec2::new(0.25, 0.3), 5.0),
        (Vec2::new(0.7, 0.55), 3.0),
        (Vec2::new(0.5, 0.8), 8.0),
    ];
    CpuImage::from_fn(width, height, |x, y| {
        let uv = Vec2::new(x as f32 / width as f32, y as f32 / height as f32);
        let mut c = Vec4::new(0.05, 0.06, 0.09, 1.0);
        for (center, power) in lights {
            if uv.distance(center) < 0.02 {
                c += Vec4::new(power, power * 0.8, power * 0.5, 0.0);
            }
        }
        c
    })
}

fn load_frame(path: &str) -> anyhow::Result<CpuImage> {
    let img = image::open(path)
        .with_context(|| format!("failed to open {path}"))?
        .to_rgba32f();
    Ok(CpuImage::from_fn(img.width(), img.height(), |x, y| {
        Vec4::from_array(img.get_pixel(x, y).0)
    }))
}

/// Blue-ish noise stand-in: a small hashed pattern is enough for dithering.
fn noise_frame(size: u32) -> CpuImage {
    CpuImage::from_fn(size, size, |x, y| {
        let h = (x.wrapping_mul(73_856_093) ^ y.wrapping_mul(19_349_663)) % 255;
        Vec4::splat(h as f32 / 255.0)
    })
}

fn save_png(image: &CpuImage, path: &str) -> anyhow::Result<()> {
    let out = image::RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let c = image.get(x, y).clamp(Vec4::ZERO, Vec4::ONE) * 255.0;
        image::Rgba([c.x as u8, c.y as u8, c.z as u8, c.w as u8])
    });
    out.save(path).with_context(|| format!("failed to write {path}"))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let output = args.get(1).map_or("bloom.png", String::as_str);

    let frame = match args.first() {
        Some(path) => load_frame(path)?,
        None => synthetic_frame(640, 360),
    };

    let settings = match args.get(2) {
        Some(path) => {
            let json = std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
            BloomSettings::from_json_str(&json)?
        }
        None => BloomSettings::default(),
    };
    log::info!("Settings: {settings:?}");

    let mut backend = CpuBackend::new();
    let src = backend.insert(frame);
    let camera = backend.desc(src)?;

    let mut bloom = Bloom::new(settings);
    bloom.set_noise_texture(Some(NoiseTexture {
        texture: backend.insert(noise_frame(64)),
        size: UVec2::splat(64),
    }));

    let outcome = bloom.run_full_pipeline(&mut backend, &src, &src, &camera)?;
    log::info!("{outcome:?}, {} passes recorded", backend.commands().len());

    save_png(backend.image(src)?, output)?;
    bloom.dispose(&mut backend);
    println!("Wrote {output}");
    Ok(())
}
