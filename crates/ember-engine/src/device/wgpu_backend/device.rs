use std::collections::HashMap;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use parking_lot::Mutex;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::coords::{Color, Viewport};
use crate::device::{
    BufferDesc, BufferUsage, ContextFormat, Device, DeviceError, DrawCall, HandleKind,
    IndexFormat, ProgramDesc, RawHandle, RenderTarget, ShaderDesc, ShaderStage, TextureDesc,
    VertexFormat,
};

use super::surface;
use super::WgpuInit;

/// Fallback color format for surfaceless contexts and sampled textures.
const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

struct SurfaceState {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
}

enum Object {
    Buffer {
        buffer: wgpu::Buffer,
        len: usize,
    },
    Texture {
        texture: wgpu::Texture,
        view: wgpu::TextureView,
        sampler: wgpu::Sampler,
        render_target: bool,
    },
    Shader {
        module: wgpu::ShaderModule,
        stage: ShaderStage,
    },
    Program {
        pipeline: wgpu::RenderPipeline,
        bind_group_layout: Option<wgpu::BindGroupLayout>,
        uniforms: bool,
        textured: bool,
    },
}

impl Object {
    fn kind(&self) -> HandleKind {
        match self {
            Object::Buffer { .. } => HandleKind::Buffer,
            Object::Texture { .. } => HandleKind::Texture,
            Object::Shader { .. } => HandleKind::Shader,
            Object::Program { .. } => HandleKind::Program,
        }
    }
}

struct RecordedDraw {
    pipeline: wgpu::RenderPipeline,
    bind_group: Option<wgpu::BindGroup>,
    vertex: wgpu::Buffer,
    index: Option<(wgpu::Buffer, wgpu::IndexFormat)>,
    elements: Range<u32>,
}

struct ActiveFrame {
    surface_texture: Option<wgpu::SurfaceTexture>,
    view: wgpu::TextureView,
    target_size: (u32, u32),
    viewport: Viewport,
    clear: Option<Color>,
    draws: Vec<RecordedDraw>,
}

/// wgpu-backed device.
///
/// Owns the wgpu core objects, the optional surface configuration and a table
/// of device objects addressed by `RawHandle`.
pub struct WgpuDevice {
    /// Kept alive for the surface.
    _instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,

    surface: Mutex<Option<SurfaceState>>,
    color_format: wgpu::TextureFormat,

    next_raw: AtomicU64,
    objects: Mutex<HashMap<RawHandle, Object>>,
    frame: Mutex<Option<ActiveFrame>>,
}

fn rejected(kind: HandleKind, label: &str, reason: impl Into<String>) -> DeviceError {
    DeviceError::Rejected {
        kind,
        label: label.to_string(),
        reason: reason.into(),
    }
}

fn missing(kind: HandleKind, raw: RawHandle) -> DeviceError {
    rejected(kind, &format!("#{}", raw.0), "no such live object")
}

impl WgpuDevice {
    /// Creates a device, bound to `window`'s surface when one is given.
    ///
    /// Honours `format.debug` (instance validation) and `format.double_buffer`
    /// (present mode). Multisampling is not applied; the request is logged.
    pub async fn new(
        window: Option<Arc<Window>>,
        init: WgpuInit,
        format: &ContextFormat,
    ) -> Result<Self> {
        let WgpuInit {
            prefer_srgb,
            alpha_mode,
            required_features,
            required_limits,
            desired_maximum_frame_latency,
            power_preference,
        } = init;

        let mut flags = wgpu::InstanceFlags::default();
        if format.debug {
            flags |= wgpu::InstanceFlags::debugging();
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags,
            ..Default::default()
        });

        let size = window.as_ref().map(|w| w.inner_size());
        let surface = match &window {
            Some(w) => Some(
                instance
                    .create_surface(w.clone())
                    .context("failed to create wgpu surface")?,
            ),
            None => None,
        };

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: surface.as_ref(),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("ember device"),
                required_features,
                required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        // Descriptor failures are caught by error scopes; anything that still
        // escapes is logged rather than aborting the process.
        device.on_uncaptured_error(Arc::new(|err: wgpu::Error| {
            log::error!("wgpu: uncaptured device error: {err}");
        }));

        let (surface, color_format) = match (surface, size) {
            (Some(surface), Some(size)) => {
                let caps = surface.get_capabilities(&adapter);
                let color_format = surface::choose_surface_format(&caps, prefer_srgb)
                    .context("no supported surface formats")?;

                let config = wgpu::SurfaceConfiguration {
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    format: color_format,
                    width: size.width,
                    height: size.height,
                    present_mode: surface::choose_present_mode(&caps, format.double_buffer),
                    alpha_mode: surface::choose_alpha_mode(&caps, alpha_mode),
                    view_formats: vec![],
                    desired_maximum_frame_latency,
                };
                if size.width > 0 && size.height > 0 {
                    surface.configure(&device, &config);
                }

                (Some(SurfaceState { surface, config }), color_format)
            }
            _ => (None, OFFSCREEN_FORMAT),
        };

        let info = adapter.get_info();
        log::info!(
            "wgpu device on {} ({:?}), color format {color_format:?}",
            info.name,
            info.backend
        );
        if format.is_multisampled() {
            log::debug!(
                "{}x multisampling requested; not applied by wgpu backend",
                format.samples
            );
        }

        Ok(Self {
            _instance: instance,
            adapter,
            device,
            queue,
            surface: Mutex::new(surface),
            color_format,
            next_raw: AtomicU64::new(1),
            objects: Mutex::new(HashMap::new()),
            frame: Mutex::new(None),
        })
    }

    /// Color format pipelines and render-target textures are created with.
    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.color_format
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Runs `build` inside a validation error scope. A captured error becomes
    /// a rejection of `label`.
    fn scoped<T>(
        &self,
        kind: HandleKind,
        label: &str,
        build: impl FnOnce() -> T,
    ) -> Result<T, DeviceError> {
        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = build();
        match pollster::block_on(scope.pop()) {
            Some(err) => Err(rejected(kind, label, err.to_string())),
            None => Ok(value),
        }
    }

    fn insert(&self, object: Object) -> RawHandle {
        let raw = RawHandle(self.next_raw.fetch_add(1, Ordering::Relaxed));
        self.objects.lock().insert(raw, object);
        raw
    }

    fn shader_module(
        &self,
        raw: RawHandle,
        stage: ShaderStage,
    ) -> Result<wgpu::ShaderModule, DeviceError> {
        match self.objects.lock().get(&raw) {
            Some(Object::Shader { module, stage: s }) if *s == stage => Ok(module.clone()),
            Some(_) => Err(rejected(
                HandleKind::Shader,
                &format!("#{}", raw.0),
                format!("not a {stage:?} shader"),
            )),
            None => Err(missing(HandleKind::Shader, raw)),
        }
    }

    /// Resolves a draw's handles to wgpu objects while the frame is open.
    fn record(
        &self,
        call: &DrawCall,
        objects: &HashMap<RawHandle, Object>,
    ) -> Result<RecordedDraw, DeviceError> {
        let Some(Object::Program {
            pipeline,
            bind_group_layout,
            uniforms,
            textured,
        }) = objects.get(&call.program.raw())
        else {
            return Err(missing(HandleKind::Program, call.program.raw()));
        };

        let buffer = |raw: RawHandle| match objects.get(&raw) {
            Some(Object::Buffer { buffer, .. }) => Ok(buffer.clone()),
            _ => Err(missing(HandleKind::Buffer, raw)),
        };

        let vertex = buffer(call.vertex_buffer.raw())?;
        let index = match call.index_buffer {
            Some((handle, format)) => {
                let format = match format {
                    IndexFormat::U16 => wgpu::IndexFormat::Uint16,
                    IndexFormat::U32 => wgpu::IndexFormat::Uint32,
                };
                Some((buffer(handle.raw())?, format))
            }
            None => None,
        };

        let bind_group = match bind_group_layout {
            Some(layout) => {
                let mut entries = Vec::with_capacity(3);

                let uniform_buffer = if *uniforms {
                    let handle = call.uniforms.ok_or_else(|| {
                        rejected(HandleKind::Program, "draw", "program expects a uniform buffer")
                    })?;
                    Some(buffer(handle.raw())?)
                } else {
                    None
                };
                if let Some(ubo) = uniform_buffer.as_ref() {
                    entries.push(wgpu::BindGroupEntry {
                        binding: 0,
                        resource: ubo.as_entire_binding(),
                    });
                }

                if *textured {
                    let handle = call.texture.ok_or_else(|| {
                        rejected(HandleKind::Program, "draw", "program expects a texture")
                    })?;
                    let Some(Object::Texture { view, sampler, .. }) = objects.get(&handle.raw())
                    else {
                        return Err(missing(HandleKind::Texture, handle.raw()));
                    };
                    entries.push(wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(view),
                    });
                    entries.push(wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    });
                }

                let bind_group = self.scoped(HandleKind::Program, "draw bind group", || {
                    self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                        label: Some("ember draw bind group"),
                        layout,
                        entries: &entries,
                    })
                })?;
                Some(bind_group)
            }
            None => None,
        };

        Ok(RecordedDraw {
            pipeline: pipeline.clone(),
            bind_group,
            vertex,
            index,
            elements: call.elements.clone(),
        })
    }
}

impl Device for WgpuDevice {
    fn backend_name(&self) -> &'static str {
        "wgpu"
    }

    fn create_buffer(&self, desc: &BufferDesc<'_>) -> Result<RawHandle, DeviceError> {
        if desc.contents.is_empty() {
            return Err(rejected(HandleKind::Buffer, desc.label, "empty contents"));
        }

        let usage = match desc.usage {
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
            BufferUsage::Index => wgpu::BufferUsages::INDEX,
            BufferUsage::Uniform => wgpu::BufferUsages::UNIFORM,
        } | wgpu::BufferUsages::COPY_DST;

        let buffer = self.scoped(HandleKind::Buffer, desc.label, || {
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(desc.label),
                contents: desc.contents,
                usage,
            })
        })?;

        Ok(self.insert(Object::Buffer {
            buffer,
            len: desc.contents.len(),
        }))
    }

    fn update_buffer(&self, raw: RawHandle, contents: &[u8]) -> Result<(), DeviceError> {
        let objects = self.objects.lock();
        let Some(Object::Buffer { buffer, len }) = objects.get(&raw) else {
            return Err(missing(HandleKind::Buffer, raw));
        };
        // write_buffer needs a 4-byte multiple; otherwise let the caller recreate.
        if *len != contents.len() || contents.len() % 4 != 0 {
            return Err(rejected(
                HandleKind::Buffer,
                &format!("#{}", raw.0),
                "size change requires recreation",
            ));
        }
        self.scoped(HandleKind::Buffer, &format!("#{}", raw.0), || {
            self.queue.write_buffer(buffer, 0, contents)
        })
    }

    fn create_texture(&self, desc: &TextureDesc<'_>) -> Result<RawHandle, DeviceError> {
        let expected = desc.width as usize * desc.height as usize * 4;
        if desc.width == 0 || desc.height == 0 || desc.pixels.len() != expected {
            return Err(rejected(
                HandleKind::Texture,
                desc.label,
                format!(
                    "{}x{} needs {expected} bytes, got {}",
                    desc.width,
                    desc.height,
                    desc.pixels.len()
                ),
            ));
        }

        let (format, usage) = if desc.render_target {
            (
                self.color_format,
                wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_DST,
            )
        } else {
            (
                OFFSCREEN_FORMAT,
                wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            )
        };

        let size = wgpu::Extent3d {
            width: desc.width,
            height: desc.height,
            depth_or_array_layers: 1,
        };

        let (texture, view, sampler) = self.scoped(HandleKind::Texture, desc.label, || {
            let texture = self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some(desc.label),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage,
                view_formats: &[],
            });

            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                desc.pixels,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(desc.width * 4),
                    rows_per_image: Some(desc.height),
                },
                size,
            );

            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some(desc.label),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                mipmap_filter: wgpu::MipmapFilterMode::Nearest,
                ..Default::default()
            });
            (texture, view, sampler)
        })?;

        Ok(self.insert(Object::Texture {
            texture,
            view,
            sampler,
            render_target: desc.render_target,
        }))
    }

    fn create_shader(&self, desc: &ShaderDesc<'_>) -> Result<RawHandle, DeviceError> {
        // Parse up front for a readable diagnostic; the error scope around
        // module creation catches what naga accepts but the device does not.
        let module = naga::front::wgsl::parse_str(desc.source)
            .map_err(|e| rejected(HandleKind::Shader, desc.label, e.emit_to_string(desc.source)))?;

        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .map_err(|e| rejected(HandleKind::Shader, desc.label, e.to_string()))?;

        let entry = desc.stage.entry_point();
        if !module.entry_points.iter().any(|ep| ep.name == entry) {
            return Err(rejected(
                HandleKind::Shader,
                desc.label,
                format!("missing entry point `{entry}`"),
            ));
        }

        let module = self.scoped(HandleKind::Shader, desc.label, || {
            self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(desc.label),
                source: wgpu::ShaderSource::Wgsl(desc.source.into()),
            })
        })?;

        Ok(self.insert(Object::Shader {
            module,
            stage: desc.stage,
        }))
    }

    fn create_program(&self, desc: &ProgramDesc<'_>) -> Result<RawHandle, DeviceError> {
        let vs = self.shader_module(desc.vertex.raw(), ShaderStage::Vertex)?;
        let fs = self.shader_module(desc.fragment.raw(), ShaderStage::Fragment)?;

        let mut layout_entries = Vec::with_capacity(3);
        if desc.uniforms {
            layout_entries.push(wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            });
        }
        if desc.textured {
            layout_entries.push(wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
            layout_entries.push(wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            });
        }

        let (pipeline, bind_group_layout) = self.scoped(HandleKind::Program, desc.label, || {
            let bind_group_layout = (!layout_entries.is_empty()).then(|| {
                self.device
                    .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                        label: Some(desc.label),
                        entries: &layout_entries,
                    })
            });

            let layouts: Vec<&wgpu::BindGroupLayout> = bind_group_layout.iter().collect();
            let pipeline_layout = self
                .device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some(desc.label),
                    bind_group_layouts: &layouts,
                    immediate_size: 0,
                });

            let attributes: Vec<wgpu::VertexAttribute> = desc
                .layout
                .attributes
                .iter()
                .map(|a| wgpu::VertexAttribute {
                    format: match a.format {
                        VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
                        VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
                        VertexFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
                        VertexFormat::Unorm8x4 => wgpu::VertexFormat::Unorm8x4,
                    },
                    offset: a.offset,
                    shader_location: a.location,
                })
                .collect();

            let vertex_buffers = [wgpu::VertexBufferLayout {
                array_stride: desc.layout.stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &attributes,
            }];
            let buffers: &[wgpu::VertexBufferLayout<'_>] = if attributes.is_empty() {
                &[]
            } else {
                &vertex_buffers
            };

            let pipeline = self
                .device
                .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(desc.label),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &vs,
                        entry_point: Some(ShaderStage::Vertex.entry_point()),
                        compilation_options: Default::default(),
                        buffers,
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &fs,
                        entry_point: Some(ShaderStage::Fragment.entry_point()),
                        compilation_options: Default::default(),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: self.color_format,
                            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
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
                    multiview_mask: None,
                    cache: None,
                });
            (pipeline, bind_group_layout)
        })?;

        Ok(self.insert(Object::Program {
            pipeline,
            bind_group_layout,
            uniforms: desc.uniforms,
            textured: desc.textured,
        }))
    }

    fn destroy(&self, kind: HandleKind, raw: RawHandle) {
        let Some(object) = self.objects.lock().remove(&raw) else {
            return;
        };
        debug_assert_eq!(object.kind(), kind);
        match object {
            Object::Buffer { buffer, .. } => buffer.destroy(),
            Object::Texture { texture, .. } => texture.destroy(),
            Object::Shader { .. } | Object::Program { .. } => {}
        }
    }

    fn begin_frame(
        &self,
        target: RenderTarget,
        viewport: Viewport,
        clear: Option<Color>,
    ) -> Result<(), DeviceError> {
        let mut frame = self.frame.lock();
        if frame.is_some() {
            return Err(DeviceError::FrameInProgress);
        }

        let (surface_texture, view, target_size) = match target {
            RenderTarget::Surface => {
                let surface = self.surface.lock();
                let Some(state) = surface.as_ref() else {
                    return Err(DeviceError::Surface("context has no surface".to_string()));
                };
                let surface_texture = match state.surface.get_current_texture() {
                    Ok(t) => t,
                    Err(err) => {
                        let action = surface::map_surface_error(
                            &state.surface,
                            &self.device,
                            &state.config,
                            &err,
                        );
                        return Err(action.into_error(&err));
                    }
                };
                let view = surface_texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                let size = (surface_texture.texture.width(), surface_texture.texture.height());
                (Some(surface_texture), view, size)
            }
            RenderTarget::Texture(handle) => match self.objects.lock().get(&handle.raw()) {
                Some(Object::Texture {
                    texture,
                    view,
                    render_target: true,
                    ..
                }) => (None, view.clone(), (texture.width(), texture.height())),
                _ => return Err(missing(HandleKind::Texture, handle.raw())),
            },
        };

        *frame = Some(ActiveFrame {
            surface_texture,
            view,
            target_size,
            viewport,
            clear,
            draws: Vec::new(),
        });
        Ok(())
    }

    fn draw(&self, call: &DrawCall) -> Result<(), DeviceError> {
        let mut frame = self.frame.lock();
        let Some(active) = frame.as_mut() else {
            return Err(DeviceError::NoActiveFrame);
        };
        let recorded = self.record(call, &self.objects.lock())?;
        active.draws.push(recorded);
        Ok(())
    }

    fn end_frame(&self) -> Result<(), DeviceError> {
        let Some(frame) = self.frame.lock().take() else {
            return Err(DeviceError::NoActiveFrame);
        };

        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("ember frame encoder"),
            });

        let load = match frame.clear {
            Some(c) => wgpu::LoadOp::Clear(wgpu::Color {
                r: c.r as f64,
                g: c.g as f64,
                b: c.b as f64,
                a: c.a as f64,
            }),
            None => wgpu::LoadOp::Load,
        };

        // Viewport must lie inside the attachment.
        let (tw, th) = frame.target_size;
        let vx = frame.viewport.x.min(tw);
        let vy = frame.viewport.y.min(th);
        let vw = frame.viewport.width.min(tw - vx);
        let vh = frame.viewport.height.min(th - vy);

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("ember frame pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
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
            });

            if vw > 0 && vh > 0 {
                rpass.set_viewport(vx as f32, vy as f32, vw as f32, vh as f32, 0.0, 1.0);

                for draw in &frame.draws {
                    rpass.set_pipeline(&draw.pipeline);
                    if let Some(bind_group) = draw.bind_group.as_ref() {
                        rpass.set_bind_group(0, bind_group, &[]);
                    }
                    rpass.set_vertex_buffer(0, draw.vertex.slice(..));
                    match draw.index.as_ref() {
                        Some((index, format)) => {
                            rpass.set_index_buffer(index.slice(..), *format);
                            rpass.draw_indexed(draw.elements.clone(), 0, 0..1);
                        }
                        None => rpass.draw(draw.elements.clone(), 0..1),
                    }
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        let failure = pollster::block_on(scope.pop());

        if let Some(surface_texture) = frame.surface_texture {
            surface_texture.present();
        }
        match failure {
            Some(err) => Err(DeviceError::FrameRejected(err.to_string())),
            None => Ok(()),
        }
    }

    fn resize(&self, width: u32, height: u32) {
        if let Some(state) = self.surface.lock().as_mut() {
            surface::apply_resize(&state.surface, &self.device, &mut state.config, width, height);
        }
    }
}
