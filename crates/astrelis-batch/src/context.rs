//! wgpu-backed [`RenderContext`] used outside of tests.

use std::sync::Arc;

use astrelis_core::profiling::profile_function;
use astrelis_test_utils::{
    DrawCommand, GpuBindGroup, GpuBuffer, GpuError, GpuRenderPipeline, PipelineDescriptor,
    RenderContext,
};
use parking_lot::Mutex;

use crate::error::GraphicsError;

/// A shared wgpu device that implements [`RenderContext`] for the batch engine.
///
/// # Ownership Pattern
///
/// ```rust,no_run
/// use astrelis_batch::GraphicsContext;
///
/// let ctx = GraphicsContext::new_owned_sync().expect("no GPU"); // Arc<Self>
/// let ctx2 = ctx.clone(); // Cheap clone (Arc)
/// ```
///
/// Draws recorded through [`RenderContext::draw`] are kept until
/// [`RenderContext::submit`], which encodes them into a single render pass
/// over the view installed with [`GraphicsContext::set_target`].
pub struct GraphicsContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    target_format: wgpu::TextureFormat,
    globals_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    /// 1x1 white texture bound for textured draws without content.
    fallback_texture: wgpu::BindGroup,
    frame: Mutex<FrameTarget>,
}

/// A draw waiting for the next submit.
struct RecordedDraw {
    pipeline: wgpu::RenderPipeline,
    globals: wgpu::BindGroup,
    content: Option<wgpu::BindGroup>,
    instances: wgpu::Buffer,
    vertex_count: u32,
    instance_count: u32,
}

#[derive(Default)]
struct FrameTarget {
    view: Option<wgpu::TextureView>,
    clear: Option<wgpu::Color>,
    draws: Vec<RecordedDraw>,
}

impl GraphicsContext {
    /// Creates a new graphics context with default settings.
    pub async fn new_owned() -> Result<Arc<Self>, GraphicsError> {
        Self::new_owned_with_descriptor(GraphicsContextDescriptor::default()).await
    }

    /// Creates a new graphics context synchronously.
    ///
    /// This blocks the current thread until the context is created.
    pub fn new_owned_sync() -> Result<Arc<Self>, GraphicsError> {
        pollster::block_on(Self::new_owned())
    }

    /// Creates a new graphics context with a custom descriptor.
    pub async fn new_owned_with_descriptor(
        descriptor: GraphicsContextDescriptor,
    ) -> Result<Arc<Self>, GraphicsError> {
        let context = Self::create_context_internal(descriptor).await?;
        Ok(Arc::new(context))
    }

    async fn create_context_internal(
        descriptor: GraphicsContextDescriptor,
    ) -> Result<Self, GraphicsError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: descriptor.backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: descriptor.power_preference,
                compatible_surface: None,
                force_fallback_adapter: descriptor.force_fallback_adapter,
            })
            .await
            .map_err(|_| GraphicsError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_limits: descriptor.limits.clone(),
                label: descriptor.label,
                ..Default::default()
            })
            .await
            .map_err(|err| GraphicsError::DeviceCreation(err.to_string()))?;

        let globals_layout = create_globals_layout(&device);
        let texture_layout = create_texture_layout(&device);
        let fallback_texture = create_fallback_texture(&device, &queue, &texture_layout);

        tracing::info!(
            "Created graphics context on {} ({:?}), target format {:?}",
            adapter.get_info().name,
            adapter.get_info().backend,
            descriptor.target_format
        );

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            target_format: descriptor.target_format,
            globals_layout,
            texture_layout,
            fallback_texture,
            frame: Mutex::new(FrameTarget::default()),
        })
    }

    /// Get device info
    pub fn info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Color format pipelines are compiled for.
    pub fn target_format(&self) -> wgpu::TextureFormat {
        self.target_format
    }

    /// Layout expected for content bind groups (texture at 0, sampler at 1).
    pub fn texture_layout(&self) -> &wgpu::BindGroupLayout {
        &self.texture_layout
    }

    /// Build a content binding for a texture view and sampler.
    pub fn create_texture_binding(
        &self,
        view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
    ) -> GpuBindGroup {
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("batched_content_bind_group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });
        GpuBindGroup::from_wgpu(bind_group)
    }

    /// Set the view the next submit renders into.
    ///
    /// With `clear` set the view is cleared first, otherwise its contents are
    /// kept and drawn over.
    pub fn set_target(&self, view: wgpu::TextureView, clear: Option<wgpu::Color>) {
        let mut frame = self.frame.lock();
        frame.view = Some(view);
        frame.clear = clear;
    }

    /// Run `f` inside out-of-memory and validation error scopes.
    fn scoped<T>(&self, f: impl FnOnce(&wgpu::Device) -> T) -> Result<T, GpuError> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());

        match (out_of_memory, validation) {
            (Some(_), _) => Err(GpuError::OutOfMemory),
            (None, Some(err)) => Err(GpuError::Validation(err.to_string())),
            (None, None) => Ok(value),
        }
    }
}

impl RenderContext for GraphicsContext {
    fn create_buffer(&self, desc: &wgpu::BufferDescriptor) -> Result<GpuBuffer, GpuError> {
        let buffer = self.scoped(|device| device.create_buffer(desc))?;
        Ok(GpuBuffer::from_wgpu(buffer))
    }

    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) {
        self.queue.write_buffer(buffer.as_wgpu(), offset, data);
    }

    fn create_render_pipeline(
        &self,
        desc: &PipelineDescriptor,
    ) -> Result<GpuRenderPipeline, GpuError> {
        profile_function!();
        let pipeline = self.scoped(|device| {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(desc.label),
                source: wgpu::ShaderSource::Wgsl(desc.shader_source.into()),
            });

            let all_layouts = [&self.globals_layout, &self.texture_layout];
            let bind_group_layouts = if desc.textured {
                &all_layouts[..]
            } else {
                &all_layouts[..1]
            };
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(desc.label),
                bind_group_layouts,
                push_constant_ranges: &[],
            });

            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(desc.label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: desc.instance_stride,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: desc.attributes,
                    }],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.target_format,
                        blend: desc.blend,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })?;
        Ok(GpuRenderPipeline::from_wgpu(pipeline))
    }

    fn create_uniform_binding(&self, buffer: &GpuBuffer) -> Result<GpuBindGroup, GpuError> {
        let bind_group = self.scoped(|device| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("batched_globals_bind_group"),
                layout: &self.globals_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_wgpu().as_entire_binding(),
                }],
            })
        })?;
        Ok(GpuBindGroup::from_wgpu(bind_group))
    }

    fn draw(&self, command: &DrawCommand<'_>) {
        let content = if command.textured {
            Some(
                command
                    .content
                    .map(|content| content.as_wgpu())
                    .unwrap_or(&self.fallback_texture)
                    .clone(),
            )
        } else {
            None
        };

        self.frame.lock().draws.push(RecordedDraw {
            pipeline: command.pipeline.as_wgpu().clone(),
            globals: command.globals.as_wgpu().clone(),
            content,
            instances: command.instances.as_wgpu().clone(),
            vertex_count: command.vertex_count,
            instance_count: command.instance_count,
        });
    }

    fn submit(&self) {
        profile_function!();
        let mut frame = self.frame.lock();
        let Some(view) = frame.view.clone() else {
            if !frame.draws.is_empty() {
                tracing::warn!(
                    "No render target set, dropping {} draws",
                    frame.draws.len()
                );
                frame.draws.clear();
            }
            return;
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("batched_frame_encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("batched_frame_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: match frame.clear {
                            Some(color) => wgpu::LoadOp::Clear(color),
                            None => wgpu::LoadOp::Load,
                        },
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for draw in &frame.draws {
                pass.set_pipeline(&draw.pipeline);
                pass.set_bind_group(0, &draw.globals, &[]);
                if let Some(content) = &draw.content {
                    pass.set_bind_group(1, content, &[]);
                }
                pass.set_vertex_buffer(0, draw.instances.slice(..));
                pass.draw(0..draw.vertex_count, 0..draw.instance_count);
            }
        }

        frame.draws.clear();
        self.queue.submit(std::iter::once(encoder.finish()));
    }
}

/// Descriptor for configuring graphics context creation.
pub struct GraphicsContextDescriptor {
    /// GPU backends to use
    pub backends: wgpu::Backends,
    /// Power preference for adapter selection
    pub power_preference: wgpu::PowerPreference,
    /// Whether to force fallback adapter
    pub force_fallback_adapter: bool,
    /// Color format of the views passed to `set_target`
    pub target_format: wgpu::TextureFormat,
    /// Required device limits
    pub limits: wgpu::Limits,
    /// Optional label for debugging
    pub label: Option<&'static str>,
}

impl Default for GraphicsContextDescriptor {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            target_format: wgpu::TextureFormat::Rgba8UnormSrgb,
            limits: wgpu::Limits::default(),
            label: None,
        }
    }
}

impl GraphicsContextDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn power_preference(mut self, preference: wgpu::PowerPreference) -> Self {
        self.power_preference = preference;
        self
    }

    pub fn backends(mut self, backends: wgpu::Backends) -> Self {
        self.backends = backends;
        self
    }

    pub fn force_fallback_adapter(mut self, force: bool) -> Self {
        self.force_fallback_adapter = force;
        self
    }

    pub fn target_format(mut self, format: wgpu::TextureFormat) -> Self {
        self.target_format = format;
        self
    }

    pub fn limits(mut self, limits: wgpu::Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn label(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }
}

fn create_globals_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("batched_globals_layout"),
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
    })
}

fn create_texture_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("batched_texture_layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

fn create_fallback_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> wgpu::BindGroup {
    let size = wgpu::Extent3d {
        width: 1,
        height: 1,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("batched_fallback_texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
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
        &[255, 255, 255, 255],
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4),
            rows_per_image: Some(1),
        },
        size,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("batched_fallback_sampler"),
        ..Default::default()
    });

    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("batched_fallback_bind_group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
        ],
    })
}
