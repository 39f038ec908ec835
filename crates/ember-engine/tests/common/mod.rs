#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;

use ember_engine::container::{Container, ContainerConfig};
use ember_engine::coords::Viewport;
use ember_engine::device::{Context, Frame};
use ember_engine::logging::{LoggingConfig, init_logging};
use ember_engine::render::{Renderer, RendererState};
use ember_engine::resource::{GpuResource, ResourceCore};
use ember_engine::resources::{Geometry, Program, Shader, VertexFormat, VertexLayout};

pub const VS: &str = "@vertex fn vs_main(@location(0) p: vec2<f32>) -> @builtin(position) vec4<f32> { return vec4<f32>(p, 0.0, 1.0); }";
pub const FS: &str = "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }";

pub fn setup() {
    init_logging(LoggingConfig::for_tests());
}

/// Shared, ordered record of lifecycle events.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.0.lock().iter().filter(|e| *e == event).count()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

// ── Tracer ────────────────────────────────────────────────────────────────

/// Container that logs `init:<label>` / `deinit:<label>` from its own hooks.
pub struct Tracer {
    container: Container,
    log: EventLog,
}

impl Tracer {
    pub fn new(label: &str, log: &EventLog) -> Arc<Self> {
        Arc::new(Self {
            container: Container::new(label),
            log: log.clone(),
        })
    }

    pub fn container(&self) -> &Container {
        &self.container
    }
}

impl GpuResource for Tracer {
    fn core(&self) -> &ResourceCore {
        self.container.core()
    }

    fn as_container(&self) -> Option<&Container> {
        Some(&self.container)
    }

    fn on_context_init(&self, _ctx: &Context) {
        self.log.push(format!("init:{}", self.label()));
    }

    fn on_context_deinit(&self, _ctx: &Context) {
        self.log.push(format!("deinit:{}", self.label()));
    }
}

// ── Spawner ──────────────────────────────────────────────────────────────

/// On attach, registers a fresh sibling into its parent container until
/// `remaining` reaches zero.
pub struct Spawner {
    core: ResourceCore,
    remaining: usize,
    children: Mutex<Vec<Arc<Spawner>>>,
    log: EventLog,
}

impl Spawner {
    pub fn new(remaining: usize, log: &EventLog) -> Arc<Self> {
        Arc::new(Self {
            core: ResourceCore::new(format!("spawner{remaining}")),
            remaining,
            children: Mutex::new(Vec::new()),
            log: log.clone(),
        })
    }
}

impl GpuResource for Spawner {
    fn core(&self) -> &ResourceCore {
        &self.core
    }

    fn on_context_init(&self, _ctx: &Context) {
        self.log.push(format!("init:{}", self.label()));
        if self.remaining == 0 {
            return;
        }
        let Some(parent) = self.core.parent() else {
            return;
        };
        let child = Spawner::new(self.remaining - 1, &self.log);
        parent.register_object(&child);
        self.children.lock().push(child);
    }
}

pub fn bounded_container(label: &str, max_init_passes: usize) -> Container {
    Container::with_config(label, ContainerConfig { max_init_passes })
}

// ── QuadRenderer ─────────────────────────────────────────────────────────

/// Renderer drawing one triangle pair, logging every hook.
pub struct QuadRenderer {
    container: Container,
    state: RendererState,
    program: Arc<Program>,
    quad: Arc<Geometry>,
    log: EventLog,
}

impl QuadRenderer {
    pub fn new(label: &str, log: &EventLog) -> Arc<Self> {
        let container = Container::new(label);
        let program = Arc::new(Program::new(
            format!("{label}.program"),
            Arc::new(Shader::vertex(format!("{label}.vs"), VS)),
            Arc::new(Shader::fragment(format!("{label}.fs"), FS)),
            VertexLayout::packed(&[VertexFormat::Float32x2]),
        ));
        let quad = Arc::new(
            Geometry::new(
                format!("{label}.quad"),
                &[[-1.0f32, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]],
            )
            .with_indices_u16(&[0, 1, 2, 2, 3, 0]),
        );
        container.register_object(&program);
        container.register_object(&quad);

        Arc::new(Self {
            container,
            state: RendererState::new(),
            program,
            quad,
            log: log.clone(),
        })
    }

    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    pub fn quad(&self) -> &Arc<Geometry> {
        &self.quad
    }

    pub fn container(&self) -> &Container {
        &self.container
    }
}

impl GpuResource for QuadRenderer {
    fn core(&self) -> &ResourceCore {
        self.container.core()
    }

    fn as_container(&self) -> Option<&Container> {
        Some(&self.container)
    }

    fn on_context_init(&self, _ctx: &Context) {
        self.log.push(format!("init:{}", self.label()));
    }

    fn on_context_deinit(&self, _ctx: &Context) {
        self.log.push(format!("deinit:{}", self.label()));
    }
}

impl Renderer for QuadRenderer {
    fn renderer_state(&self) -> &RendererState {
        &self.state
    }

    fn on_update(&self, _dt: f32) {
        self.log.push(format!("update:{}", self.label()));
    }

    fn on_render(&self, frame: &mut Frame<'_>) {
        self.quad.draw_with(frame, &self.program, None, None);
        self.log.push(format!("render:{}", self.label()));
    }

    fn on_viewport(&self, viewport: Viewport) {
        self.log.push(format!(
            "viewport:{}:{}x{}",
            self.label(),
            viewport.width,
            viewport.height
        ));
    }
}
