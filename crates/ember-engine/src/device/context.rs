use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::coords::{Color, Viewport};

use super::{
    BufferDesc, ContextFormat, DeviceError, DeviceHandle, DrawCall, HandleKind, ProgramDesc,
    RawHandle, RenderTarget, ShaderDesc, TextureDesc,
};

/// Identity of one context. Never reused within a process.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ContextId(u64);

impl ContextId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx{}", self.0)
    }
}

/// Backend capability behind a context.
///
/// Devices only ever see raw ids; the owning [`Context`] stamps and checks
/// context identity, so a device never has to reason about foreign handles.
pub trait Device: Send + Sync {
    fn backend_name(&self) -> &'static str;

    fn create_buffer(&self, desc: &BufferDesc<'_>) -> Result<RawHandle, DeviceError>;

    /// Overwrites a buffer in place. Devices may refuse (e.g. on a size change),
    /// in which case the caller recreates the buffer.
    fn update_buffer(&self, raw: RawHandle, contents: &[u8]) -> Result<(), DeviceError>;

    fn create_texture(&self, desc: &TextureDesc<'_>) -> Result<RawHandle, DeviceError>;

    fn create_shader(&self, desc: &ShaderDesc<'_>) -> Result<RawHandle, DeviceError>;

    /// `desc` handles are already checked to belong to this device's context.
    fn create_program(&self, desc: &ProgramDesc<'_>) -> Result<RawHandle, DeviceError>;

    /// Releases an object. Unknown ids are ignored.
    fn destroy(&self, kind: HandleKind, raw: RawHandle);

    fn begin_frame(
        &self,
        target: RenderTarget,
        viewport: Viewport,
        clear: Option<Color>,
    ) -> Result<(), DeviceError>;

    fn draw(&self, call: &DrawCall) -> Result<(), DeviceError>;

    fn end_frame(&self) -> Result<(), DeviceError>;

    /// Drawable size changed. Surfaceless devices ignore this.
    fn resize(&self, width: u32, height: u32) {
        let _ = (width, height);
    }
}

struct ContextInner {
    id: ContextId,
    format: ContextFormat,
    device: Arc<dyn Device>,
}

/// One active binding to a graphics device.
///
/// Cloning is cheap and yields the same context; equality is identity. Every
/// device-touching call in the engine goes through a `Context` passed
/// explicitly, there is no ambient "current context".
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    pub fn new(format: ContextFormat, device: Arc<dyn Device>) -> Self {
        let id = ContextId::next();
        log::debug!("context {id} created on {} backend", device.backend_name());
        Self {
            inner: Arc::new(ContextInner { id, format, device }),
        }
    }

    #[inline]
    pub fn id(&self) -> ContextId {
        self.inner.id
    }

    #[inline]
    pub fn format(&self) -> &ContextFormat {
        &self.inner.format
    }

    pub fn backend_name(&self) -> &'static str {
        self.inner.device.backend_name()
    }

    /// Checks that `handle` was issued under this context and is of `kind`.
    pub fn check(&self, handle: DeviceHandle, kind: HandleKind) -> Result<(), DeviceError> {
        if handle.context() != self.id() {
            return Err(DeviceError::ForeignHandle {
                handle,
                context: self.id(),
            });
        }
        if handle.kind() != kind {
            return Err(DeviceError::WrongKind {
                handle,
                expected: kind,
                actual: handle.kind(),
            });
        }
        Ok(())
    }

    /// Returns `true` when `handle` was issued under this context.
    #[inline]
    pub fn owns(&self, handle: DeviceHandle) -> bool {
        handle.context() == self.id()
    }

    fn stamp(&self, kind: HandleKind, raw: RawHandle) -> DeviceHandle {
        DeviceHandle::new(self.id(), kind, raw)
    }

    pub fn create_buffer(&self, desc: &BufferDesc<'_>) -> Result<DeviceHandle, DeviceError> {
        let raw = self.inner.device.create_buffer(desc)?;
        Ok(self.stamp(HandleKind::Buffer, raw))
    }

    pub fn update_buffer(&self, handle: DeviceHandle, contents: &[u8]) -> Result<(), DeviceError> {
        self.check(handle, HandleKind::Buffer)?;
        self.inner.device.update_buffer(handle.raw(), contents)
    }

    pub fn create_texture(&self, desc: &TextureDesc<'_>) -> Result<DeviceHandle, DeviceError> {
        let raw = self.inner.device.create_texture(desc)?;
        Ok(self.stamp(HandleKind::Texture, raw))
    }

    pub fn create_shader(&self, desc: &ShaderDesc<'_>) -> Result<DeviceHandle, DeviceError> {
        let raw = self.inner.device.create_shader(desc)?;
        Ok(self.stamp(HandleKind::Shader, raw))
    }

    pub fn create_program(&self, desc: &ProgramDesc<'_>) -> Result<DeviceHandle, DeviceError> {
        self.check(desc.vertex, HandleKind::Shader)?;
        self.check(desc.fragment, HandleKind::Shader)?;
        let raw = self.inner.device.create_program(desc)?;
        Ok(self.stamp(HandleKind::Program, raw))
    }

    /// Releases `handle`. Handles from other contexts are refused with a warning:
    /// their device may already be gone.
    pub fn destroy(&self, handle: DeviceHandle) {
        if !self.owns(handle) {
            log::warn!("context {} asked to destroy foreign handle {handle}", self.id());
            return;
        }
        self.inner.device.destroy(handle.kind(), handle.raw());
    }

    pub fn resize(&self, width: u32, height: u32) {
        self.inner.device.resize(width, height);
    }

    pub(crate) fn begin_frame(
        &self,
        target: RenderTarget,
        viewport: Viewport,
        clear: Option<Color>,
    ) -> Result<(), DeviceError> {
        if let RenderTarget::Texture(handle) = target {
            self.check(handle, HandleKind::Texture)?;
        }
        self.inner.device.begin_frame(target, viewport, clear)
    }

    pub(crate) fn draw(&self, call: &DrawCall) -> Result<(), DeviceError> {
        for handle in call.handles() {
            if !self.owns(handle) {
                return Err(DeviceError::ForeignHandle {
                    handle,
                    context: self.id(),
                });
            }
        }
        self.check(call.program, HandleKind::Program)?;
        self.check(call.vertex_buffer, HandleKind::Buffer)?;
        self.inner.device.draw(call)
    }

    pub(crate) fn end_frame(&self) -> Result<(), DeviceError> {
        self.inner.device.end_frame()
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Context {}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner.id, f)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.inner.id)
            .field("backend", &self.backend_name())
            .field("format", &self.inner.format)
            .finish()
    }
}

/// Platform boundary producing contexts from a requested format.
pub trait ContextFactory {
    fn create(&self, format: &ContextFormat) -> anyhow::Result<Context>;
}
