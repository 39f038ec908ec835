use std::sync::Arc;

use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use parking_lot::Mutex;

use ember_engine::container::Container;
use ember_engine::coords::Viewport;
use ember_engine::device::{ContextFormat, Frame};
use ember_engine::logging::{LoggingConfig, init_logging};
use ember_engine::render::{Renderer, RendererState};
use ember_engine::resource::{GpuResource, ResourceCore};
use ember_engine::resources::{
    Buffer, BufferUsage, Geometry, Program, Shader, Texture, VertexFormat, VertexLayout,
};
use ember_engine::window::{Runtime, RuntimeConfig};

const QUAD_WGSL: &str = include_str!("quad.wgsl");

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Vertex {
    position: [f32; 2],
    uv: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Default, Pod, Zeroable)]
struct Globals {
    time: f32,
    aspect: f32,
    _pad: [f32; 2],
}

/// Spinning, textured quad.
struct SpinningQuad {
    container: Container,
    state: RendererState,
    program: Arc<Program>,
    quad: Arc<Geometry>,
    checker: Arc<Texture>,
    uniforms: Arc<Buffer>,
    globals: Mutex<Globals>,
}

impl SpinningQuad {
    fn new() -> Arc<Self> {
        let container = Container::new("spinning-quad");

        let program = Arc::new(
            Program::new(
                "quad",
                Arc::new(Shader::vertex("quad.vs", QUAD_WGSL)),
                Arc::new(Shader::fragment("quad.fs", QUAD_WGSL)),
                VertexLayout::packed(&[VertexFormat::Float32x2, VertexFormat::Float32x2]),
            )
            .with_uniforms()
            .with_texture(),
        );

        let vertices = [
            Vertex {
                position: [-0.5, -0.5],
                uv: [0.0, 1.0],
            },
            Vertex {
                position: [0.5, -0.5],
                uv: [1.0, 1.0],
            },
            Vertex {
                position: [0.5, 0.5],
                uv: [1.0, 0.0],
            },
            Vertex {
                position: [-0.5, 0.5],
                uv: [0.0, 0.0],
            },
        ];
        let quad =
            Arc::new(Geometry::new("quad", &vertices).with_indices_u16(&[0, 1, 2, 2, 3, 0]));

        let checker = Arc::new(Texture::from_rgba("checker", 8, 8, checkerboard(8)));
        let globals = Globals {
            aspect: 1.0,
            ..Globals::default()
        };
        let uniforms = Arc::new(Buffer::from_slice("globals", BufferUsage::Uniform, &[globals]));

        container.register_object(&program);
        container.register_object(&quad);
        container.register_object(&checker);
        container.register_object(&uniforms);

        let renderer = Arc::new(Self {
            container,
            state: RendererState::new(),
            program,
            quad,
            checker,
            uniforms,
            globals: Mutex::new(globals),
        });
        renderer.schedule_update();
        renderer
    }

    fn upload(&self, globals: Globals) {
        self.uniforms.set_typed(&[globals]);
        self.schedule_redraw();
    }
}

fn checkerboard(size: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let v = if (x + y) % 2 == 0 { 235 } else { 40 };
            pixels.extend_from_slice(&[v, v / 2 + 60, 255 - v, 255]);
        }
    }
    pixels
}

impl GpuResource for SpinningQuad {
    fn core(&self) -> &ResourceCore {
        self.container.core()
    }

    fn as_container(&self) -> Option<&Container> {
        Some(&self.container)
    }
}

impl Renderer for SpinningQuad {
    fn renderer_state(&self) -> &RendererState {
        &self.state
    }

    fn on_update(&self, dt: f32) {
        let globals = {
            let mut globals = self.globals.lock();
            globals.time += dt;
            *globals
        };
        self.upload(globals);
        self.schedule_update();
    }

    fn on_viewport(&self, viewport: Viewport) {
        let globals = {
            let mut globals = self.globals.lock();
            globals.aspect = viewport.aspect();
            *globals
        };
        self.upload(globals);
    }

    fn on_render(&self, frame: &mut Frame<'_>) {
        self.quad
            .draw_with(frame, &self.program, Some(&self.uniforms), Some(&self.checker));
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "ember studio".to_string(),
        continuous: false,
        ..RuntimeConfig::default()
    };
    log::info!("starting {}", config.title);

    Runtime::run(config, ContextFormat::default(), SpinningQuad::new())
}
