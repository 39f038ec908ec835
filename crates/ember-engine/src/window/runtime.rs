use std::sync::Arc;

use anyhow::{Context as _, Result};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::coords::Viewport;
use crate::device::wgpu_backend::{WgpuFactory, WgpuInit};
use crate::device::{Context, ContextFactory, ContextFormat, RenderTarget};
use crate::render::{Canvas, Renderer};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,

    /// Redraw every frame. When `false`, frames are drawn only when the
    /// renderer asks for an update or a redraw.
    pub continuous: bool,

    pub wgpu: WgpuInit,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "ember".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            continuous: true,
            wgpu: WgpuInit::default(),
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens one window and renders `renderer` into it until the window is
    /// closed.
    pub fn run(
        config: RuntimeConfig,
        format: ContextFormat,
        renderer: Arc<dyn Renderer>,
    ) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, format, renderer);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

struct WindowEntry {
    window: Arc<Window>,
    context: Context,
}

struct AppState {
    config: RuntimeConfig,
    format: ContextFormat,
    canvas: Canvas,
    entry: Option<WindowEntry>,
    failure: Option<anyhow::Error>,
}

impl AppState {
    fn new(config: RuntimeConfig, format: ContextFormat, renderer: Arc<dyn Renderer>) -> Self {
        let canvas = Canvas::new();
        canvas.set_renderer(Some(renderer));
        Self {
            config,
            format,
            canvas,
            entry: None,
            failure: None,
        }
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        let context = WgpuFactory::new(self.config.wgpu.clone())
            .with_window(window.clone())
            .create(&self.format)
            .context("failed to create a rendering context for the window")?;

        log::info!(
            "window {:?} bound to {context} ({})",
            window.id(),
            context.backend_name()
        );

        self.canvas.set_context(Some(context.clone()));
        self.entry = Some(WindowEntry { window, context });
        self.resize(None);
        Ok(())
    }

    /// Detaches the context so every device handle is released while the
    /// device is still alive, then drops the window.
    fn destroy_window_entry(&mut self) {
        if self.entry.take().is_some() {
            self.canvas.set_context(None);
        }
    }

    fn resize(&mut self, size: Option<PhysicalSize<u32>>) {
        let Some(entry) = &self.entry else {
            return;
        };
        let size = size.unwrap_or_else(|| entry.window.inner_size());
        entry.context.resize(size.width, size.height);
        self.canvas
            .set_viewport(Viewport::from_size(size.width, size.height));
        entry.window.request_redraw();
    }

    fn redraw(&mut self) {
        let Some(entry) = &self.entry else {
            return;
        };

        self.canvas.update_time();
        if self.canvas.needs_update() {
            self.canvas.update();
        }

        entry.window.pre_present_notify();
        self.canvas.render(RenderTarget::Surface);

        if self.wants_frame() {
            entry.window.request_redraw();
        }
    }

    fn wants_frame(&self) -> bool {
        self.config.continuous || self.canvas.needs_update() || self.canvas.needs_redraw()
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.failure = Some(err);
        self.destroy_window_entry();
        event_loop.exit();
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() {
            return;
        }
        if let Err(err) = self.create_window_entry(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        log::debug!("suspended; releasing the rendering context");
        self.destroy_window_entry();
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);

        if self.wants_frame() {
            if let Some(entry) = &self.entry {
                entry.window.request_redraw();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self
            .entry
            .as_ref()
            .is_none_or(|entry| entry.window.id() != window_id)
        {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.destroy_window_entry();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => self.resize(Some(size)),
            WindowEvent::ScaleFactorChanged { .. } => self.resize(None),
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.destroy_window_entry();
    }
}
