use std::sync::Arc;

use anyhow::Context as _;
use winit::window::Window;

use crate::device::{Context, ContextFactory, ContextFormat};

use super::WgpuDevice;

/// Backend parameters that are not part of the portable `ContextFormat`.
///
/// Keep this structure stable and minimal. Add configuration flags only when a
/// concrete platform or backend requirement exists.
#[derive(Debug, Clone)]
pub struct WgpuInit {
    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    /// Optional alpha mode preference for the surface.
    ///
    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Required wgpu features.
    ///
    /// Favor an empty set for portability unless a feature is strictly necessary.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Desired maximum frame latency for the surface. A hint only.
    pub desired_maximum_frame_latency: u32,

    pub power_preference: wgpu::PowerPreference,
}

impl Default for WgpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
            power_preference: wgpu::PowerPreference::HighPerformance,
        }
    }
}

/// Platform factory producing wgpu-backed contexts.
///
/// With a window the context renders to that window's surface; without one it
/// is offscreen-only (`RenderTarget::Texture`).
#[derive(Debug, Clone, Default)]
pub struct WgpuFactory {
    init: WgpuInit,
    window: Option<Arc<Window>>,
}

impl WgpuFactory {
    pub fn new(init: WgpuInit) -> Self {
        Self { init, window: None }
    }

    pub fn with_window(mut self, window: Arc<Window>) -> Self {
        self.window = Some(window);
        self
    }
}

impl ContextFactory for WgpuFactory {
    fn create(&self, format: &ContextFormat) -> anyhow::Result<Context> {
        // Adapter/device acquisition is asynchronous under wgpu.
        let device = pollster::block_on(WgpuDevice::new(
            self.window.clone(),
            self.init.clone(),
            format,
        ))
        .context("failed to create wgpu context")?;

        Ok(Context::new(format.clone(), Arc::new(device)))
    }
}
