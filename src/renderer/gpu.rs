//! wgpu Backend
//!
//! [`GpuBloomRenderer`] owns the long-lived GPU objects: the filter program,
//! its bind group layout, samplers, per-format pipelines and the scratch
//! texture pool. Each frame the host wraps its command encoder in a
//! [`GpuFrame`], which implements [`BloomBackend`] by recording one
//! fullscreen-triangle render pass per filter invocation.
//!
//! # Bind Group Layout
//!
//! | Binding | Resource |
//! |---------|----------|
//! | 0 | main texture (the blit source) |
//! | 1 | linear clamp-to-edge sampler |
//! | 2 | [`BloomUniforms`] |
//! | 3 | `SourceTex` (combine only, 1×1 black otherwise) |
//! | 4 | `NoiseTex` (combine only, 1×1 mid-gray otherwise) |
//! | 5 | linear repeat sampler |
//!
//! Upsample pipelines blend additively (`One`/`One`) onto a loaded target;
//! every other pass clears its target first.
//!
//! # Formats
//!
//! Every texture bound at 0, 3 or 4 must be filterable on the device, and
//! every target must be renderable (and blendable for upsample). Scratch
//! textures whose requested format fails that test are created as
//! `Rgba16Float` instead; host textures that fail it are rejected with
//! [`BloomError::InvalidTexture`] before anything is recorded.

use std::borrow::Cow;
use std::collections::hash_map::Entry;
use std::sync::atomic::{AtomicU64, Ordering};

use bytemuck::{Pod, Zeroable};
use glam::UVec2;
use rustc_hash::FxHashMap;
use wgpu::util::DeviceExt;

use super::transient_pool::TransientTexturePool;
use super::{BloomBackend, TextureDesc};
use crate::core::filter::{FilterParams, FilterPass, ParamKey};
use crate::errors::{BloomError, Result};

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Usage flags of every scratch texture.
pub const SCRATCH_USAGE: wgpu::TextureUsages = wgpu::TextureUsages::RENDER_ATTACHMENT
    .union(wgpu::TextureUsages::TEXTURE_BINDING)
    .union(wgpu::TextureUsages::COPY_SRC)
    .union(wgpu::TextureUsages::COPY_DST);

// ─── Textures ─────────────────────────────────────────────────────────────────

/// A texture plus its default view, with a process-unique identity.
///
/// Equality compares identity only, so two handles are equal exactly when
/// they wrap the same `wgpu::Texture` registration.
#[derive(Debug, Clone)]
pub struct GpuTexture {
    id: u64,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl GpuTexture {
    /// Wraps a host-owned texture. It must have been created with
    /// `TEXTURE_BINDING` to be read and `RENDER_ATTACHMENT` to be written.
    #[must_use]
    pub fn new(texture: wgpu::Texture) -> Self {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            id: NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed),
            texture,
            view,
        }
    }

    fn create(device: &wgpu::Device, desc: &TextureDesc, format: wgpu::TextureFormat) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: desc.mip_level_count,
            sample_count: desc.sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: SCRATCH_USAGE,
            view_formats: &[],
        });
        Self::new(texture)
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    #[must_use]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    #[must_use]
    pub fn size(&self) -> UVec2 {
        UVec2::new(self.texture.width(), self.texture.height())
    }

    /// Descriptor of the wrapped texture, suitable as a camera descriptor
    /// for [`Bloom::run_full_pipeline`](crate::core::Bloom::run_full_pipeline).
    #[must_use]
    pub fn desc(&self) -> TextureDesc {
        TextureDesc {
            width: self.texture.width(),
            height: self.texture.height(),
            format: self.texture.format(),
            depth_format: None,
            mip_level_count: self.texture.mip_level_count(),
            sample_count: self.texture.sample_count(),
            label: "Host Texture",
        }
    }
}

impl PartialEq for GpuTexture {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for GpuTexture {}

// ─── Uniforms ─────────────────────────────────────────────────────────────────

/// Per-invocation uniform block. Layout matches `BloomUniforms` in
/// `shaders/bloom.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct BloomUniforms {
    /// `xyz` = knee curve, `w` = threshold.
    pub curve: [f32; 4],
    pub texel_size: [f32; 2],
    pub noise_scale: [f32; 2],
    pub intensity: f32,
    pub _pad: [f32; 3],
}

impl BloomUniforms {
    /// Packs the named parameters of one invocation. Missing parameters
    /// default to zero, except `intensity` (1) and the noise scale (1, 1).
    #[must_use]
    pub fn from_params<T>(params: &FilterParams<'_, T>) -> Self {
        let curve = params.vec3(ParamKey::Curve).unwrap_or_default();
        let threshold = params.float(ParamKey::Threshold).unwrap_or(0.0);
        Self {
            curve: curve.extend(threshold).to_array(),
            texel_size: params.vec2(ParamKey::TexelSize).unwrap_or_default().to_array(),
            noise_scale: params
                .vec2(ParamKey::NoiseTexScale)
                .unwrap_or(glam::Vec2::ONE)
                .to_array(),
            intensity: params.float(ParamKey::Intensity).unwrap_or(1.0),
            _pad: [0.0; 3],
        }
    }
}

// ─── Format support ───────────────────────────────────────────────────────────

/// Format every scratch texture falls back to.
pub const FALLBACK_SCRATCH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Whether `format` can be bound as a filterable float texture.
#[must_use]
pub fn can_sample(format: wgpu::TextureFormat, features: wgpu::Features) -> bool {
    let support = format.guaranteed_format_features(features);
    support.allowed_usages.contains(wgpu::TextureUsages::TEXTURE_BINDING)
        && support.flags.contains(wgpu::TextureFormatFeatureFlags::FILTERABLE)
}

/// Whether `format` can be the color target of `pass`.
#[must_use]
pub fn can_render(format: wgpu::TextureFormat, features: wgpu::Features, pass: FilterPass) -> bool {
    let support = format.guaranteed_format_features(features);
    support.allowed_usages.contains(wgpu::TextureUsages::RENDER_ATTACHMENT)
        && (!pass.is_additive() || support.flags.contains(wgpu::TextureFormatFeatureFlags::BLENDABLE))
}

/// Format a scratch texture requested as `format` is actually created with.
///
/// Scratch textures are read and written by every pass, including the
/// additive upsample, so anything not usable in both roles is replaced by
/// [`FALLBACK_SCRATCH_FORMAT`].
#[must_use]
pub fn scratch_format(format: wgpu::TextureFormat, features: wgpu::Features) -> wgpu::TextureFormat {
    if can_sample(format, features) && can_render(format, features, FilterPass::Upsample) {
        format
    } else {
        FALLBACK_SCRATCH_FORMAT
    }
}

fn check_sampled(texture: &GpuTexture, features: wgpu::Features, pass: FilterPass) -> Result<()> {
    let format = texture.texture.format();
    if can_sample(format, features) {
        Ok(())
    } else {
        Err(BloomError::InvalidTexture(format!(
            "{}: {format:?} cannot be sampled with filtering on this device",
            pass.label()
        )))
    }
}

fn check_target(texture: &GpuTexture, features: wgpu::Features, pass: FilterPass) -> Result<()> {
    let format = texture.texture.format();
    if can_render(format, features, pass) {
        Ok(())
    } else {
        Err(BloomError::InvalidTexture(format!(
            "{}: {format:?} cannot be rendered to on this device",
            pass.label()
        )))
    }
}

// ─── Bind group cache ─────────────────────────────────────────────────────────

/// Identity of one cached bind group: the pass plus every texture it binds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BindGroupKey {
    pub pass: FilterPass,
    pub source: u64,
    pub destination: u64,
    pub source_tex: u64,
    pub noise_tex: u64,
}

impl BindGroupKey {
    /// Whether the bind group holds a view of texture `id`.
    #[must_use]
    pub fn references(&self, id: u64) -> bool {
        self.source == id || self.destination == id || self.source_tex == id || self.noise_tex == id
    }
}

/// A bind group with its own uniform buffer. The buffer is rewritten only
/// when the uniforms differ from the last upload.
struct CachedBindGroup {
    uniforms: BloomUniforms,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

// ─── Renderer ─────────────────────────────────────────────────────────────────

fn entry_point(pass: FilterPass) -> &'static str {
    match pass {
        FilterPass::Prefilter => "fs_prefilter",
        FilterPass::Downsample => "fs_downsample",
        FilterPass::Upsample => "fs_upsample",
        FilterPass::Final => "fs_final",
        FilterPass::Combine => "fs_combine",
        FilterPass::Copy => "fs_copy",
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

/// Creates a 1×1 `Rgba8Unorm` texture filled with `rgba`.
fn solid_texture(device: &wgpu::Device, queue: &wgpu::Queue, label: &str, rgba: [u8; 4]) -> GpuTexture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4),
            rows_per_image: Some(1),
        },
        wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
    );

    GpuTexture::new(texture)
}

/// Long-lived GPU state of the bloom effect.
pub struct GpuBloomRenderer {
    device: wgpu::Device,
    queue: wgpu::Queue,

    shader: wgpu::ShaderModule,
    layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: FxHashMap<(FilterPass, wgpu::TextureFormat), wgpu::RenderPipeline>,

    clamp_sampler: wgpu::Sampler,
    repeat_sampler: wgpu::Sampler,

    /// Bound as `SourceTex` by every pass except combine.
    black: GpuTexture,
    /// Bound as `NoiseTex` when no dither texture is supplied; `0.5` cancels
    /// the dither offset.
    mid_gray: GpuTexture,

    pool: TransientTexturePool<GpuTexture>,
    bind_groups: FxHashMap<BindGroupKey, CachedBindGroup>,
}

impl GpuBloomRenderer {
    #[must_use]
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Bloom Shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!("shaders/bloom.wgsl"))),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Bloom Layout"),
            entries: &[
                texture_entry(0),
                sampler_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                texture_entry(3),
                texture_entry(4),
                sampler_entry(5),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Bloom Pipeline Layout"),
            bind_group_layouts: &[Some(&layout)],
            immediate_size: 0,
        });

        let clamp_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Bloom Clamp Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            ..Default::default()
        });

        let repeat_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Bloom Noise Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            ..Default::default()
        });

        let black = solid_texture(device, queue, "Bloom Black Dummy", [0, 0, 0, 0]);
        let mid_gray = solid_texture(device, queue, "Bloom Noise Dummy", [128, 128, 128, 255]);

        log::info!("Bloom GPU renderer created");

        Self {
            device: device.clone(),
            queue: queue.clone(),
            shader,
            layout,
            pipeline_layout,
            pipelines: FxHashMap::default(),
            clamp_sampler,
            repeat_sampler,
            black,
            mid_gray,
            pool: TransientTexturePool::new(),
            bind_groups: FxHashMap::default(),
        }
    }

    /// Wraps `encoder` for recording one frame.
    pub fn frame<'a>(&'a mut self, encoder: &'a mut wgpu::CommandEncoder) -> GpuFrame<'a> {
        GpuFrame {
            renderer: self,
            encoder,
        }
    }

    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Scratch textures currently parked in the pool.
    #[must_use]
    pub fn pooled_textures(&self) -> usize {
        self.pool.free_count()
    }

    /// Bind groups currently cached.
    #[must_use]
    pub fn cached_bind_groups(&self) -> usize {
        self.bind_groups.len()
    }

    /// Drops every cached bind group that binds `texture`.
    ///
    /// Call this before dropping a host texture that was passed to the
    /// effect, otherwise the cache keeps its view alive.
    pub fn forget_texture(&mut self, texture: &GpuTexture) {
        self.forget_id(texture.id);
    }

    /// Drops every cached bind group.
    pub fn clear_bind_groups(&mut self) {
        self.bind_groups.clear();
    }

    fn forget_id(&mut self, id: u64) {
        self.bind_groups.retain(|key, _| !key.references(id));
    }

    /// Pre-warms every pass pipeline for `format`.
    pub fn ensure_pipelines(&mut self, format: wgpu::TextureFormat) {
        for pass in FilterPass::ALL {
            self.pipeline(pass, format);
        }
    }

    fn pipeline(&mut self, pass: FilterPass, format: wgpu::TextureFormat) -> wgpu::RenderPipeline {
        if let Some(pipeline) = self.pipelines.get(&(pass, format)) {
            return pipeline.clone();
        }

        log::debug!("Creating bloom pipeline {} for {format:?}", pass.label());
        let pipeline = self.create_pipeline(pass, format);
        self.pipelines.insert((pass, format), pipeline.clone());
        pipeline
    }

    fn create_pipeline(&self, pass: FilterPass, format: wgpu::TextureFormat) -> wgpu::RenderPipeline {
        let blend = pass.is_additive().then_some(wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent::OVER,
        });

        self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("{} Pipeline {format:?}", pass.label())),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &self.shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.shader,
                entry_point: Some(entry_point(pass)),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }

    fn create_scratch(device: &wgpu::Device, desc: &TextureDesc) -> Result<GpuTexture> {
        let max = device.limits().max_texture_dimension_2d;
        let reason = if desc.width == 0 || desc.height == 0 {
            Some("zero-sized texture".to_string())
        } else if desc.width > max || desc.height > max {
            Some(format!("exceeds device limit of {max}"))
        } else if desc.sample_count != 1 {
            Some("multisampled scratch textures are not supported".to_string())
        } else {
            None
        };

        if let Some(reason) = reason {
            return Err(BloomError::ScratchAllocation {
                width: desc.width,
                height: desc.height,
                format: desc.format,
                reason,
            });
        }

        let format = scratch_format(desc.format, device.features());
        if format != desc.format {
            log::debug!(
                "{}: {:?} unsupported for scratch use, using {format:?}",
                desc.label,
                desc.format
            );
        }

        Ok(GpuTexture::create(device, desc, format))
    }
}

// ─── Per-frame recording ──────────────────────────────────────────────────────

/// One frame's recording context.
pub struct GpuFrame<'a> {
    renderer: &'a mut GpuBloomRenderer,
    encoder: &'a mut wgpu::CommandEncoder,
}

impl GpuFrame<'_> {
    fn begin_pass<'p>(
        encoder: &'p mut wgpu::CommandEncoder,
        label: &str,
        target: &'p wgpu::TextureView,
        load: wgpu::LoadOp<wgpu::Color>,
    ) -> wgpu::RenderPass<'p> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        })
    }
}

impl BloomBackend for GpuFrame<'_> {
    type Texture = GpuTexture;

    fn texture_size(&self, texture: &GpuTexture) -> Result<UVec2> {
        Ok(texture.size())
    }

    fn acquire_temporary(&mut self, desc: &TextureDesc) -> Result<GpuTexture> {
        let device = &self.renderer.device;
        self.renderer
            .pool
            .acquire(desc, |d| GpuBloomRenderer::create_scratch(device, d))
    }

    fn release_temporary(&mut self, desc: &TextureDesc, texture: GpuTexture) {
        self.renderer.pool.release(desc, texture);
    }

    fn blit(
        &mut self,
        source: &GpuTexture,
        destination: &GpuTexture,
        pass: FilterPass,
        params: &FilterParams<'_, GpuTexture>,
    ) -> Result<()> {
        let features = self.renderer.device.features();
        let source_tex = params.texture(ParamKey::SourceTex).unwrap_or(&self.renderer.black);
        let noise_tex = params.texture(ParamKey::NoiseTex).unwrap_or(&self.renderer.mid_gray);
        check_sampled(source, features, pass)?;
        check_sampled(source_tex, features, pass)?;
        check_sampled(noise_tex, features, pass)?;
        check_target(destination, features, pass)?;

        let key = BindGroupKey {
            pass,
            source: source.id,
            destination: destination.id,
            source_tex: source_tex.id,
            noise_tex: noise_tex.id,
        };
        let uniforms = BloomUniforms::from_params(params);
        let source_tex = source_tex.clone();
        let noise_tex = noise_tex.clone();

        let pipeline = self.renderer.pipeline(pass, destination.texture.format());
        let renderer = &mut *self.renderer;

        let cached = match renderer.bind_groups.entry(key) {
            Entry::Occupied(entry) => {
                let cached = entry.into_mut();
                if cached.uniforms != uniforms {
                    renderer
                        .queue
                        .write_buffer(&cached.buffer, 0, bytemuck::bytes_of(&uniforms));
                    cached.uniforms = uniforms;
                }
                cached
            }
            Entry::Vacant(entry) => {
                log::trace!("Creating bloom bind group for {key:?}");
                let buffer = renderer
                    .device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Bloom Uniforms"),
                        contents: bytemuck::bytes_of(&uniforms),
                        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    });

                let bind_group = renderer.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Bloom BG"),
                    layout: &renderer.layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&source.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(&renderer.clamp_sampler),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 3,
                            resource: wgpu::BindingResource::TextureView(&source_tex.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 4,
                            resource: wgpu::BindingResource::TextureView(&noise_tex.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 5,
                            resource: wgpu::BindingResource::Sampler(&renderer.repeat_sampler),
                        },
                    ],
                });

                entry.insert(CachedBindGroup {
                    uniforms,
                    buffer,
                    bind_group,
                })
            }
        };
        let bind_group = cached.bind_group.clone();

        let load = if pass.is_additive() {
            wgpu::LoadOp::Load
        } else {
            wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT)
        };

        let mut rpass = Self::begin_pass(self.encoder, pass.label(), &destination.view, load);
        rpass.set_pipeline(&pipeline);
        rpass.set_bind_group(0, &bind_group, &[]);
        rpass.draw(0..3, 0..1);
        Ok(())
    }

    fn clear(&mut self, destination: &GpuTexture) -> Result<()> {
        drop(Self::begin_pass(
            self.encoder,
            "Bloom Clear",
            &destination.view,
            wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
        ));
        Ok(())
    }

    fn trim_temporaries(&mut self, max_idle_frames: u32) {
        for texture in self.renderer.pool.trim(max_idle_frames) {
            self.renderer.forget_id(texture.id);
            texture.texture.destroy();
        }
    }

    fn destroy_temporaries(&mut self) {
        for texture in self.renderer.pool.drain() {
            self.renderer.forget_id(texture.id);
            texture.texture.destroy();
        }
    }
}
