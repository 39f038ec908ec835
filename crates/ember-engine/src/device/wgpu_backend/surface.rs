use crate::device::DeviceError;

/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// The device is unusable; the context must be replaced.
    Fatal,
}

impl SurfaceErrorAction {
    pub(crate) fn into_error(self, err: &wgpu::SurfaceError) -> DeviceError {
        match self {
            SurfaceErrorAction::Fatal => DeviceError::Lost,
            SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => {
                DeviceError::Surface(err.to_string())
            }
        }
    }
}

pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    if caps.formats.is_empty() {
        return None;
    }

    if prefer_srgb {
        let preferred = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ];
        for f in preferred {
            if caps.formats.contains(&f) {
                return Some(f);
            }
        }
    }

    Some(caps.formats[0])
}

pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// Maps the format's buffering request onto a supported present mode.
///
/// Double buffering wants vsync (Fifo, always supported). Single buffering
/// prefers Immediate, then Mailbox, and falls back to Fifo.
pub(crate) fn choose_present_mode(
    caps: &wgpu::SurfaceCapabilities,
    double_buffer: bool,
) -> wgpu::PresentMode {
    if double_buffer {
        return wgpu::PresentMode::Fifo;
    }
    [wgpu::PresentMode::Immediate, wgpu::PresentMode::Mailbox]
        .into_iter()
        .find(|m| caps.present_modes.contains(m))
        .unwrap_or(wgpu::PresentMode::Fifo)
}

/// Applies a new drawable size. wgpu cannot configure a 0x0 surface, so a
/// zero size only updates `config` and defers configuration.
pub(crate) fn apply_resize(
    surface: &wgpu::Surface<'_>,
    device: &wgpu::Device,
    config: &mut wgpu::SurfaceConfiguration,
    width: u32,
    height: u32,
) {
    config.width = width;
    config.height = height;
    if width == 0 || height == 0 {
        return;
    }
    surface.configure(device, config);
}

pub(crate) fn map_surface_error(
    surface: &wgpu::Surface<'_>,
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    err: &wgpu::SurfaceError,
) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
            if config.width > 0 && config.height > 0 {
                surface.configure(device, config);
            }
            SurfaceErrorAction::Reconfigured
        }
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        wgpu::SurfaceError::Timeout => SurfaceErrorAction::SkipFrame,
        wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    }
}
