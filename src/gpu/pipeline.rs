/// Render-to-texture filter passes
///
/// A `FilterPipeline` holds the per-instance GPU state:
/// - one source texture and one render surface, both sized to the last
///   input and recreated only when the input dimensions change
/// - one compiled program per filter kind, built on first use and reused
/// - a staging buffer for reading the surface back
///
/// Each call uploads the input, writes the filter's uniforms, draws one
/// full-screen triangle into the surface and blocks until the surface has
/// been copied back into a `RasterBuffer`.
///
/// The instance is not meant to be shared between threads while in use;
/// create one per concurrent pipeline. All of them may share a `GpuContext`.

use std::collections::HashMap;
use std::sync::{mpsc, Arc};

// Use wgpu from iced to stay on the same wgpu version
use iced_wgpu::wgpu;

use super::context::GpuContext;
use super::shaders::{FilterKind, ShaderTable};
use crate::error::{FilterError, Result};
use crate::filters::tone::levels_exponent;
use crate::raster::{LevelParameters, RasterBuffer};

/// Taps in the fixed blur window (10 x 10)
pub(crate) const BLUR_TAPS: usize = 100;

/// Rows the posterize uniform block can hold
pub(crate) const MAX_POSTERIZE_ROWS: usize = 16;

/// Spacing of the halftone grid drawn by the pattern pass
pub(crate) const PATTERN_GRID: u32 = 5;

const SURFACE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

// Uniform blocks. Layouts must match the WGSL structs (16-byte aligned).

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct BlurUniforms {
    pub weights: [[f32; 4]; 25],
    pub weight_total: f32,
    padding: [f32; 3],
}

impl BlurUniforms {
    /// Tap (x, y), offsets -5..=4, is on when both `|x|` and `|y|` are
    /// strictly under `size / 2`. Sizes past 10 saturate the window.
    pub fn for_size(size: usize) -> Self {
        let half = size.max(1) as f32 / 2.0;
        let mut weights = [[0.0f32; 4]; 25];
        let mut weight_total = 0.0;

        for i in 0..BLUR_TAPS {
            let x = (i % 10) as i32 - 5;
            let y = (i / 10) as i32 - 5;
            if (x.abs() as f32) < half && (y.abs() as f32) < half {
                weights[i / 4][i % 4] = 1.0;
                weight_total += 1.0;
            }
        }

        Self {
            weights,
            weight_total,
            padding: [0.0; 3],
        }
    }

    pub fn weight(&self, i: usize) -> f32 {
        self.weights[i / 4][i % 4]
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct LevelsUniforms {
    pub low: f32,
    pub range: f32,
    pub exponent: f32,
    padding: f32,
}

impl From<LevelParameters> for LevelsUniforms {
    fn from(levels: LevelParameters) -> Self {
        Self {
            low: levels.low as f32 / 255.0,
            range: levels.range() as f32 / 255.0,
            exponent: levels_exponent(levels.mid) as f32,
            padding: 0.0,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct PosterizeUniforms {
    pub colours: [[f32; 4]; 16],
    /// Bucket width, `1 / (rows - 1)`
    pub level_count: f32,
    pub row_count: f32,
    padding: [f32; 2],
}

impl PosterizeUniforms {
    /// Pack a flat `r, g, b, ...` list (normalized) into the uniform block.
    pub fn from_flat(colours: &[f32]) -> Result<Self> {
        let rows = colours.len() / 3;
        if colours.len() % 3 != 0 || !(2..=MAX_POSTERIZE_ROWS).contains(&rows) {
            return Err(FilterError::InvalidColorTable { len: colours.len() });
        }

        let mut packed = [[0.0f32; 4]; 16];
        for (row, rgb) in packed.iter_mut().zip(colours.chunks_exact(3)) {
            *row = [rgb[0], rgb[1], rgb[2], 1.0];
        }

        Ok(Self {
            colours: packed,
            level_count: 1.0 / (rows - 1) as f32,
            row_count: rows as f32,
            padding: [0.0; 2],
        })
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct PatternUniforms {
    grid: f32,
    padding: [f32; 3],
}

/// Source texture, render surface and staging buffer for one input size
struct Targets {
    width: u32,
    height: u32,
    source: wgpu::Texture,
    source_view: wgpu::TextureView,
    surface: wgpu::Texture,
    surface_view: wgpu::TextureView,
    staging: wgpu::Buffer,
    padded_bytes_per_row: u32,
}

impl Targets {
    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let source = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Stencil Source Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SURFACE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let surface = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Stencil Render Surface"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SURFACE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        // Readback rows must be padded to 256 bytes
        let bytes_per_row = width * 4;
        let alignment = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = bytes_per_row.div_ceil(alignment) * alignment;

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Stencil Readback Buffer"),
            size: padded_bytes_per_row as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            width,
            height,
            source_view: source.create_view(&wgpu::TextureViewDescriptor::default()),
            source,
            surface_view: surface.create_view(&wgpu::TextureViewDescriptor::default()),
            surface,
            staging,
            padded_bytes_per_row,
        }
    }

    fn destroy(&self) {
        self.source.destroy();
        self.surface.destroy();
        self.staging.destroy();
    }
}

/// Compiled pass for one filter kind
struct FilterProgram {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
}

impl FilterProgram {
    fn compile(
        device: &wgpu::Device,
        shaders: &ShaderTable,
        kind: FilterKind,
        uniform_size: u64,
    ) -> Result<Self> {
        let source = shaders.module_source(kind)?;

        // Catch WGSL errors as values instead of the default panic
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(kind.label()),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(kind.label()),
            entries: &[
                // Source texture, read with textureLoad
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                // Filter uniforms
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(kind.label()),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(kind.label()),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: SURFACE_FORMAT,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None, // Full-screen triangle
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(FilterError::ShaderCompilation {
                kind,
                message: error.to_string(),
            });
        }

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(kind.label()),
            size: uniform_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        tracing::debug!(filter = ?kind, "compiled filter program");

        Ok(Self {
            pipeline,
            bind_group_layout,
            uniform_buffer,
        })
    }
}

#[derive(Default)]
struct Resources {
    targets: Option<Targets>,
    programs: HashMap<FilterKind, FilterProgram>,
}

impl Resources {
    fn destroy(&mut self) {
        if let Some(targets) = self.targets.take() {
            targets.destroy();
        }
        for (_, program) in self.programs.drain() {
            program.uniform_buffer.destroy();
        }
    }
}

/// GPU state for one chain of filter calls.
///
/// Resources are created lazily and live until `release()` or drop. After
/// `release()` every filter call returns `UseAfterDispose`.
pub struct FilterPipeline {
    context: Arc<GpuContext>,
    shaders: ShaderTable,
    resources: Option<Resources>,
}

// Manual Debug implementation (wgpu types don't implement Debug)
impl std::fmt::Debug for FilterPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterPipeline")
            .field("surface_size", &self.surface_size())
            .field("released", &self.is_released())
            .finish_non_exhaustive()
    }
}

impl FilterPipeline {
    pub fn new(context: Arc<GpuContext>, shaders: ShaderTable) -> Self {
        Self {
            context,
            shaders,
            resources: Some(Resources::default()),
        }
    }

    /// Box blur over the fixed 10x10 window. Output alpha is opaque.
    pub fn box_blur(&mut self, image: &RasterBuffer, size: usize) -> Result<RasterBuffer> {
        let uniforms = BlurUniforms::for_size(size);
        self.run(FilterKind::Blur, image, bytemuck::bytes_of(&uniforms))
    }

    /// Levels with the rescaled value clamped to [0, 1] before the power
    /// step. `high == low` fails with `DegenerateRange` before any upload.
    pub fn levels(&mut self, image: &RasterBuffer, levels: LevelParameters) -> Result<RasterBuffer> {
        self.ensure_live()?;
        levels.validate()?;
        let uniforms = LevelsUniforms::from(levels);
        self.run(FilterKind::Levels, image, bytemuck::bytes_of(&uniforms))
    }

    /// Posterize by average brightness through a flat, normalized
    /// `r, g, b, ...` list of 2 to 16 rows.
    pub fn posterize(&mut self, image: &RasterBuffer, colours: &[f32]) -> Result<RasterBuffer> {
        self.ensure_live()?;
        let uniforms = PosterizeUniforms::from_flat(colours)?;
        self.run(FilterKind::Posterize, image, bytemuck::bytes_of(&uniforms))
    }

    /// Keep edges, replace interiors with a fixed-grid halftone.
    pub fn replace_pattern(&mut self, image: &RasterBuffer) -> Result<RasterBuffer> {
        let uniforms = PatternUniforms {
            grid: PATTERN_GRID as f32,
            padding: [0.0; 3],
        };
        self.run(FilterKind::Pattern, image, bytemuck::bytes_of(&uniforms))
    }

    /// Destroy the surface, texture and programs. Calling again is a no-op.
    pub fn release(&mut self) {
        if let Some(mut resources) = self.resources.take() {
            resources.destroy();
            tracing::debug!("released filter pipeline resources");
        }
    }

    pub fn is_released(&self) -> bool {
        self.resources.is_none()
    }

    /// Size of the current source texture and surface, if any
    pub fn surface_size(&self) -> Option<(u32, u32)> {
        let targets = self.resources.as_ref()?.targets.as_ref()?;
        Some((targets.width, targets.height))
    }

    pub fn is_compiled(&self, kind: FilterKind) -> bool {
        self.resources
            .as_ref()
            .is_some_and(|resources| resources.programs.contains_key(&kind))
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_released() {
            return Err(FilterError::UseAfterDispose);
        }
        Ok(())
    }

    fn run(&mut self, kind: FilterKind, image: &RasterBuffer, uniforms: &[u8]) -> Result<RasterBuffer> {
        let resources = self.resources.as_mut().ok_or(FilterError::UseAfterDispose)?;
        let device = self.context.device();
        let queue = self.context.queue();
        let (width, height) = image.dimensions();

        // Zero-sized textures are invalid
        if width == 0 || height == 0 {
            return Ok(RasterBuffer::new(width, height));
        }

        let max = device.limits().max_texture_dimension_2d;
        if width > max || height > max {
            return Err(FilterError::TextureTooLarge { width, height, max });
        }

        if !resources.programs.contains_key(&kind) {
            let program = FilterProgram::compile(device, &self.shaders, kind, uniforms.len() as u64)?;
            resources.programs.insert(kind, program);
        }
        let program = resources
            .programs
            .get(&kind)
            .ok_or(FilterError::MissingShader(kind))?;

        let resize = resources
            .targets
            .as_ref()
            .map_or(true, |targets| (targets.width, targets.height) != (width, height));
        if resize {
            tracing::debug!(width, height, "resizing filter surface");
            if let Some(old) = resources.targets.take() {
                old.destroy();
            }
            resources.targets = Some(Targets::new(device, width, height));
        }
        let targets = resources
            .targets
            .as_ref()
            .ok_or(FilterError::UseAfterDispose)?;

        let extent = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &targets.source,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.pixels(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            extent,
        );
        queue.write_buffer(&program.uniform_buffer, 0, uniforms);

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(kind.label()),
            layout: &program.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&targets.source_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: program.uniform_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(kind.label()),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(kind.label()),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &targets.surface_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&program.pipeline);
            render_pass.set_bind_group(0, &bind_group, &[]);
            render_pass.draw(0..3, 0..1); // Full-screen triangle
        }

        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &targets.surface,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &targets.staging,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(targets.padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            extent,
        );

        queue.submit(Some(encoder.finish()));

        read_back(device, targets)
    }
}

/// Block until the staging buffer is mapped and strip the row padding.
fn read_back(device: &wgpu::Device, targets: &Targets) -> Result<RasterBuffer> {
    let slice = targets.staging.slice(..);
    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(wgpu::Maintain::Wait);

    rx.recv()
        .map_err(|e| FilterError::Readback(e.to_string()))?
        .map_err(|e| FilterError::Readback(e.to_string()))?;

    let row_bytes = targets.width as usize * 4;
    let mut pixels = Vec::with_capacity(row_bytes * targets.height as usize);
    {
        let data = slice.get_mapped_range();
        for row in data.chunks(targets.padded_bytes_per_row as usize).take(targets.height as usize) {
            pixels.extend_from_slice(&row[..row_bytes]);
        }
    }
    targets.staging.unmap();

    RasterBuffer::from_pixels(targets.width, targets.height, pixels)
}
