//! GPU objects behind the bars: device, pipeline, buffers and the canvas.
//!
//! Everything is created once per `GpuResources`. Per tick only the uniform
//! buffer and the four instance buffers are rewritten; the canvas texture is
//! recreated when the container size changes.

use std::sync::mpsc;

use log::{debug, info, warn};
use wgpu::util::DeviceExt;

use crate::error::{Error, Result};
use crate::renderer::{InstanceArrays, Renderer, Uniforms, MAX_INSTANCES};

/// Pixel format of the canvas and of [`Snapshot`] data.
pub const CANVAS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Two triangles covering the unit square.
const UNIT_QUAD: [f32; 12] = [
    0.0, 0.0, 1.0, 0.0, 0.0, 1.0, //
    0.0, 1.0, 1.0, 0.0, 1.0, 1.0,
];
const QUAD_VERTICES: u32 = 6;

const QUAD_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
const INDEX_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32];
const HEIGHT_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Float32];
const COLOR_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![3 => Float32x3];
const OPACITY_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![4 => Float32];

const F32_SIZE: wgpu::BufferAddress = std::mem::size_of::<f32>() as wgpu::BufferAddress;
const VEC3_SIZE: wgpu::BufferAddress = std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress;

/// Adapter, device and queue.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Acquires the default adapter and a device on it, blocking until both
    /// are ready.
    pub fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or(Error::NoAdapter)?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("audio bars device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::default(),
            },
            None,
        ))?;

        let adapter_info = adapter.get_info();
        info!(
            "GPU acquired: {} ({:?})",
            adapter_info.name, adapter_info.backend
        );

        Ok(Self {
            device,
            queue,
            adapter_info,
        })
    }
}

/// The offscreen texture the bars are drawn into. Its full extent is the
/// viewport.
pub struct Canvas {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

/// Tightly packed RGBA8 copy of the canvas, rows top to bottom.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Snapshot {
    /// RGBA at `(x, y)`, or `None` outside the canvas.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = ((y * self.width + x) * 4) as usize;
        let rgba = self.pixels.get(offset..offset + 4)?;
        Some([rgba[0], rgba[1], rgba[2], rgba[3]])
    }
}

/// Canvas size for a container of `width` x `height`, each side clamped to
/// `max_dimension`; `None` inside means no canvas.
///
/// Returns `None` when that equals `current`, so nothing has to be rebuilt.
fn resize_target(
    current: Option<(u32, u32)>,
    width: u32,
    height: u32,
    max_dimension: u32,
) -> Option<Option<(u32, u32)>> {
    let target = (width > 0 && height > 0)
        .then(|| (width.min(max_dimension), height.min(max_dimension)));
    (target != current).then_some(target)
}

impl Canvas {
    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("audio bars canvas"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: CANVAS_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            width,
            height,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Copies the canvas back to the CPU.
    pub fn read_rgba(&self, context: &GpuContext) -> Result<Snapshot> {
        let unpadded_row = self.width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_row = unpadded_row.div_ceil(align) * align;

        let staging = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("audio bars readback"),
            size: padded_row as wgpu::BufferAddress * self.height as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("audio bars readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        context.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        context.device.poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|e| Error::Readback(e.to_string()))?
            .map_err(|e| Error::Readback(e.to_string()))?;

        let mut pixels = Vec::with_capacity((unpadded_row * self.height) as usize);
        {
            let data = slice.get_mapped_range();
            for row in data.chunks(padded_row as usize) {
                pixels.extend_from_slice(&row[..unpadded_row as usize]);
            }
        }
        staging.unmap();
        staging.destroy();

        Ok(Snapshot {
            width: self.width,
            height: self.height,
            pixels,
        })
    }
}

/// One vertex buffer per instance attribute, each sized for the largest
/// quantity and overwritten in full every pass.
struct InstanceBuffers {
    indices: wgpu::Buffer,
    heights: wgpu::Buffer,
    colors: wgpu::Buffer,
    opacities: wgpu::Buffer,
}

impl InstanceBuffers {
    fn new(device: &wgpu::Device) -> Self {
        let create = |label: &str, stride: wgpu::BufferAddress| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: stride * MAX_INSTANCES as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        Self {
            indices: create("bar index instances", F32_SIZE),
            heights: create("bar height instances", F32_SIZE),
            colors: create("color instances", VEC3_SIZE),
            opacities: create("opacity instances", F32_SIZE),
        }
    }

    fn upload(&self, queue: &wgpu::Queue, instances: &InstanceArrays) {
        let count = instances.len().min(MAX_INSTANCES);
        if count == 0 {
            return;
        }
        queue.write_buffer(
            &self.indices,
            0,
            bytemuck::cast_slice(&instances.indices[..count]),
        );
        queue.write_buffer(
            &self.heights,
            0,
            bytemuck::cast_slice(&instances.heights[..count]),
        );
        queue.write_buffer(
            &self.colors,
            0,
            bytemuck::cast_slice(&instances.colors[..count]),
        );
        queue.write_buffer(
            &self.opacities,
            0,
            bytemuck::cast_slice(&instances.opacities[..count]),
        );
    }

    fn destroy(&self) {
        self.indices.destroy();
        self.heights.destroy();
        self.colors.destroy();
        self.opacities.destroy();
    }
}

/// Pipeline, buffers and canvas for one bars component.
pub struct GpuResources {
    context: GpuContext,
    pipeline: wgpu::RenderPipeline,
    quad_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    instances: InstanceBuffers,
    canvas: Option<Canvas>,
    destroyed: bool,
}

impl GpuResources {
    /// Builds the pipeline and every static buffer. The canvas is created on
    /// the first non-empty resize.
    pub fn new(context: GpuContext) -> Result<Self> {
        let device = &context.device;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = device.create_shader_module(wgpu::include_wgsl!("shader.wgsl"));

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("audio bars uniforms layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("audio bars pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let blend = wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("audio bars pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: 2 * F32_SIZE,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &QUAD_ATTRIBUTES,
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: F32_SIZE,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &INDEX_ATTRIBUTES,
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: F32_SIZE,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &HEIGHT_ATTRIBUTES,
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: VEC3_SIZE,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &COLOR_ATTRIBUTES,
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: F32_SIZE,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &OPACITY_ATTRIBUTES,
                    },
                ],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: CANVAS_FORMAT,
                    blend: Some(wgpu::BlendState {
                        color: blend,
                        alpha: blend,
                    }),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(Error::Shader(error.to_string()));
        }

        let quad_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("unit quad"),
            contents: bytemuck::cast_slice(&UNIT_QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("audio bars uniforms"),
            contents: bytemuck::bytes_of(&Uniforms::default()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("audio bars uniforms"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let instances = InstanceBuffers::new(device);

        Ok(Self {
            context,
            pipeline,
            quad_buffer,
            uniform_buffer,
            bind_group,
            instances,
            canvas: None,
            destroyed: false,
        })
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    /// Overwrites the instance buffers with `instances`, in full.
    pub fn upload_instances(&self, instances: &InstanceArrays) {
        self.instances.upload(&self.context.queue, instances);
    }

    /// Reads the current canvas back to the CPU.
    pub fn snapshot(&self) -> Result<Snapshot> {
        let canvas = self.canvas.as_ref().ok_or(Error::NoCanvas)?;
        canvas.read_rgba(&self.context)
    }
}

impl Renderer for GpuResources {
    fn resize(&mut self, width: u32, height: u32) -> bool {
        if self.destroyed {
            return false;
        }
        let max_dimension = self.context.device.limits().max_texture_dimension_2d;
        let Some(target) = resize_target(self.canvas_size(), width, height, max_dimension) else {
            return false;
        };

        if let Some(old) = self.canvas.take() {
            old.texture.destroy();
        }
        if let Some((w, h)) = target {
            if (w, h) != (width, height) {
                warn!(
                    "container {}x{} exceeds the texture limit, canvas clamped to {}x{}",
                    width, height, w, h
                );
            }
            self.canvas = Some(Canvas::new(&self.context.device, w, h));
        }
        debug!("canvas resized to {:?}", target);
        true
    }

    fn canvas_size(&self) -> Option<(u32, u32)> {
        self.canvas.as_ref().map(Canvas::size)
    }

    fn draw_pass(&mut self, uniforms: &Uniforms, instances: &InstanceArrays, clear: bool) {
        if self.destroyed {
            return;
        }
        let Some(canvas) = self.canvas.as_ref() else {
            return;
        };

        let queue = &self.context.queue;
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
        self.upload_instances(instances);

        let load = if clear {
            wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT)
        } else {
            wgpu::LoadOp::Load
        };

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("audio bars pass encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("audio bars pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &canvas.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let count = instances.len().min(MAX_INSTANCES) as u32;
            if count > 0 {
                pass.set_pipeline(&self.pipeline);
                pass.set_bind_group(0, &self.bind_group, &[]);
                pass.set_vertex_buffer(0, self.quad_buffer.slice(..));
                pass.set_vertex_buffer(1, self.instances.indices.slice(..));
                pass.set_vertex_buffer(2, self.instances.heights.slice(..));
                pass.set_vertex_buffer(3, self.instances.colors.slice(..));
                pass.set_vertex_buffer(4, self.instances.opacities.slice(..));
                pass.draw(0..QUAD_VERTICES, 0..count);
            }
        }
        queue.submit(std::iter::once(encoder.finish()));
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        if let Some(canvas) = self.canvas.take() {
            canvas.texture.destroy();
        }
        self.quad_buffer.destroy();
        self.uniform_buffer.destroy();
        self.instances.destroy();
        debug!("GPU resources released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: u32 = 8192;

    #[test]
    fn resize_target_skips_unchanged_sizes() {
        assert_eq!(resize_target(Some((400, 100)), 400, 100, LIMIT), None);
        assert_eq!(resize_target(None, 0, 100, LIMIT), None);
        assert_eq!(resize_target(None, 400, 0, LIMIT), None);
    }

    #[test]
    fn resize_target_builds_or_drops_the_canvas() {
        assert_eq!(resize_target(None, 400, 100, LIMIT), Some(Some((400, 100))));
        assert_eq!(resize_target(Some((400, 100)), 401, 100, LIMIT), Some(Some((401, 100))));
        assert_eq!(resize_target(Some((400, 100)), 0, 0, LIMIT), Some(None));
    }

    #[test]
    fn resize_target_clamps_to_the_texture_limit() {
        assert_eq!(resize_target(None, 40_000, 100, LIMIT), Some(Some((LIMIT, 100))));
        assert_eq!(resize_target(None, 100, 9000, LIMIT), Some(Some((100, LIMIT))));
        // A clamped canvas is not rebuilt for another oversized container.
        assert_eq!(resize_target(Some((LIMIT, 100)), 50_000, 100, LIMIT), None);
    }

    #[test]
    fn snapshot_pixel_lookup() {
        let snapshot = Snapshot {
            width: 2,
            height: 1,
            pixels: vec![1, 2, 3, 4, 5, 6, 7, 8],
        };
        assert_eq!(snapshot.pixel(1, 0), Some([5, 6, 7, 8]));
        assert_eq!(snapshot.pixel(2, 0), None);
        assert_eq!(snapshot.pixel(0, 1), None);
    }
}
