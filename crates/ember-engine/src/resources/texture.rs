use parking_lot::Mutex;

use crate::device::{Context, DeviceError, DeviceHandle, HandleKind, TextureDesc};
use crate::resource::{DeviceSlot, GpuResource, ResourceCore, ResourceError};

/// CPU-side image data.
#[derive(Clone, PartialEq, Eq)]
pub enum TextureSource {
    /// Encoded image file contents (PNG, JPEG, BMP), decoded on first upload.
    Encoded(Vec<u8>),
    /// Tightly packed RGBA8 pixels.
    Rgba {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    },
}

impl TextureSource {
    pub fn size(&self) -> Option<(u32, u32)> {
        match self {
            Self::Encoded(_) => None,
            Self::Rgba { width, height, .. } => Some((*width, *height)),
        }
    }
}

impl std::fmt::Debug for TextureSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encoded(bytes) => write!(f, "Encoded({} bytes)", bytes.len()),
            Self::Rgba { width, height, .. } => write!(f, "Rgba({width}x{height})"),
        }
    }
}

/// 2D RGBA8 texture.
pub struct Texture {
    core: ResourceCore,
    source: Mutex<TextureSource>,
    render_target: bool,
    slot: DeviceSlot,
}

impl Texture {
    pub fn new(label: impl Into<String>, source: TextureSource) -> Self {
        Self {
            core: ResourceCore::new(label),
            source: Mutex::new(source),
            render_target: false,
            slot: DeviceSlot::new(),
        }
    }

    pub fn from_encoded(label: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(label, TextureSource::Encoded(bytes))
    }

    pub fn from_rgba(label: impl Into<String>, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self::new(
            label,
            TextureSource::Rgba {
                width,
                height,
                pixels,
            },
        )
    }

    /// Cleared texture usable as a [`RenderTarget::Texture`](crate::device::RenderTarget).
    pub fn render_target(label: impl Into<String>, width: u32, height: u32) -> Self {
        let pixels = vec![0; width as usize * height as usize * 4];
        let mut texture = Self::from_rgba(label, width, height, pixels);
        texture.render_target = true;
        texture
    }

    #[inline]
    pub fn is_render_target(&self) -> bool {
        self.render_target
    }

    /// Pixel size, known once the source is raw or has been decoded.
    pub fn size(&self) -> Option<(u32, u32)> {
        self.source.lock().size()
    }

    pub fn set_image(&self, width: u32, height: u32, pixels: Vec<u8>) {
        self.set_source(TextureSource::Rgba {
            width,
            height,
            pixels,
        });
    }

    pub fn set_encoded(&self, bytes: Vec<u8>) {
        self.set_source(TextureSource::Encoded(bytes));
    }

    pub fn set_source(&self, source: TextureSource) {
        *self.source.lock() = source;
        self.core.invalidate();
    }

    /// Device texture for the attached context. Encoded sources are decoded
    /// here once and kept as RGBA.
    pub fn handle(&self) -> Result<DeviceHandle, ResourceError> {
        self.slot.ensure(&self.core, |ctx, _| {
            let mut source = self.source.lock();
            let (width, height, pixels) = rgba(self.core.label(), &mut source)?;
            ctx.create_texture(&TextureDesc {
                label: self.core.label(),
                width,
                height,
                pixels,
                render_target: self.render_target,
            })
        })
    }
}

/// Decodes an encoded source in place and returns its RGBA view.
fn rgba<'a>(
    label: &str,
    source: &'a mut TextureSource,
) -> Result<(u32, u32, &'a [u8]), DeviceError> {
    if let TextureSource::Encoded(bytes) = &*source {
        *source = decode(label, bytes)?;
    }
    match source {
        TextureSource::Rgba {
            width,
            height,
            pixels,
        } => Ok((*width, *height, pixels.as_slice())),
        TextureSource::Encoded(_) => Err(DeviceError::Rejected {
            kind: HandleKind::Texture,
            label: label.to_string(),
            reason: "image not decoded".to_string(),
        }),
    }
}

fn decode(label: &str, bytes: &[u8]) -> Result<TextureSource, DeviceError> {
    let image = image::load_from_memory(bytes)
        .map_err(|err| DeviceError::Rejected {
            kind: HandleKind::Texture,
            label: label.to_string(),
            reason: format!("decode failed: {err}"),
        })?
        .to_rgba8();
    let (width, height) = image.dimensions();
    log::debug!("decoded `{label}` ({width}x{height})");
    Ok(TextureSource::Rgba {
        width,
        height,
        pixels: image.into_raw(),
    })
}

impl GpuResource for Texture {
    fn core(&self) -> &ResourceCore {
        &self.core
    }

    fn on_context_deinit(&self, _ctx: &Context) {
        self.slot.release();
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("core", &self.core)
            .field("source", &*self.source.lock())
            .field("render_target", &self.render_target)
            .field("slot", &self.slot)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use super::*;
    use crate::device::headless::headless_context;

    fn png_2x1() -> Vec<u8> {
        let image = image::RgbaImage::from_raw(2, 1, vec![255, 0, 0, 255, 0, 0, 255, 255]).unwrap();
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn encoded_source_is_decoded_on_first_upload() {
        let (ctx, device) = headless_context();
        let texture = Arc::new(Texture::from_encoded("logo", png_2x1()));
        assert_eq!(texture.size(), None);

        texture.init_context(&ctx);
        texture.handle().unwrap();

        assert_eq!(texture.size(), Some((2, 1)));
        assert_eq!(device.live_count_of(HandleKind::Texture), 1);
    }

    #[test]
    fn undecodable_bytes_are_a_build_error() {
        let (ctx, device) = headless_context();
        let texture = Arc::new(Texture::from_encoded("junk", vec![1, 2, 3]));
        texture.init_context(&ctx);

        let err = texture.handle().unwrap_err();
        assert!(matches!(
            err,
            ResourceError::Build {
                source: DeviceError::Rejected { kind: HandleKind::Texture, .. },
                ..
            }
        ));
        assert!(!texture.valid());
        assert_eq!(device.live_count(), 0);

        texture.set_image(1, 1, vec![0; 4]);
        assert!(texture.handle().is_ok());
    }
}
