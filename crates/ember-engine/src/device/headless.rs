//! Headless device for tests and tooling.
//!
//! Performs no GPU work: objects are entries in a table and every call is
//! recorded as a [`DeviceOp`], so lifecycle behaviour can be asserted without
//! hardware.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::coords::{Color, Viewport};

use super::{
    BufferDesc, Context, ContextFactory, ContextFormat, Device, DeviceError, DrawCall, HandleKind,
    ProgramDesc, RawHandle, RenderTarget, ShaderDesc, TextureDesc,
};

/// Operation recorded by a [`HeadlessDevice`].
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceOp {
    Create {
        kind: HandleKind,
        raw: RawHandle,
        label: String,
    },
    Update {
        raw: RawHandle,
        len: usize,
    },
    Destroy {
        kind: HandleKind,
        raw: RawHandle,
    },
    BeginFrame {
        target: RenderTarget,
        viewport: Viewport,
        clear: Option<Color>,
    },
    Draw {
        program: RawHandle,
        elements: std::ops::Range<u32>,
    },
    EndFrame,
    Resize {
        width: u32,
        height: u32,
    },
}

#[derive(Debug, Clone)]
struct LiveObject {
    kind: HandleKind,
    len: usize,
    render_target: bool,
}

#[derive(Debug, Default)]
struct State {
    next_raw: u64,
    live: HashMap<RawHandle, LiveObject>,
    ops: Vec<DeviceOp>,
    rejected: HashSet<HandleKind>,
    in_frame: bool,
    frames: u64,
}

impl State {
    fn allocate(
        &mut self,
        kind: HandleKind,
        label: &str,
        len: usize,
        render_target: bool,
    ) -> Result<RawHandle, DeviceError> {
        if self.rejected.contains(&kind) {
            return Err(DeviceError::Rejected {
                kind,
                label: label.to_string(),
                reason: "rejected by headless device".to_string(),
            });
        }

        self.next_raw += 1;
        let raw = RawHandle(self.next_raw);
        self.live.insert(
            raw,
            LiveObject {
                kind,
                len,
                render_target,
            },
        );
        self.ops.push(DeviceOp::Create {
            kind,
            raw,
            label: label.to_string(),
        });
        log::trace!("headless: created {kind} #{} `{label}`", raw.0);
        Ok(raw)
    }

    fn require(&self, raw: RawHandle, kind: HandleKind) -> Result<&LiveObject, DeviceError> {
        self.live
            .get(&raw)
            .filter(|obj| obj.kind == kind)
            .ok_or_else(|| DeviceError::Rejected {
                kind,
                label: format!("#{}", raw.0),
                reason: "no such live object".to_string(),
            })
    }
}

/// Device that records instead of rendering.
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    state: Mutex<State>,
}

impl HeadlessDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes every subsequent creation of `kind` fail, simulating a device that
    /// rejects malformed descriptors.
    pub fn reject(&self, kind: HandleKind, reject: bool) {
        let mut state = self.state.lock();
        if reject {
            state.rejected.insert(kind);
        } else {
            state.rejected.remove(&kind);
        }
    }

    /// Number of objects currently alive.
    pub fn live_count(&self) -> usize {
        self.state.lock().live.len()
    }

    pub fn live_count_of(&self, kind: HandleKind) -> usize {
        self.state.lock().live.values().filter(|o| o.kind == kind).count()
    }

    pub fn is_live(&self, raw: RawHandle) -> bool {
        self.state.lock().live.contains_key(&raw)
    }

    pub fn ops(&self) -> Vec<DeviceOp> {
        self.state.lock().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.state.lock().ops.clear();
    }

    /// Count of recorded operations matching `pred`.
    pub fn count_ops(&self, pred: impl Fn(&DeviceOp) -> bool) -> usize {
        self.state.lock().ops.iter().filter(|op| pred(op)).count()
    }

    pub fn draw_count(&self) -> usize {
        self.count_ops(|op| matches!(op, DeviceOp::Draw { .. }))
    }

    pub fn frames_completed(&self) -> u64 {
        self.state.lock().frames
    }
}

impl Device for HeadlessDevice {
    fn backend_name(&self) -> &'static str {
        "headless"
    }

    fn create_buffer(&self, desc: &BufferDesc<'_>) -> Result<RawHandle, DeviceError> {
        self.state
            .lock()
            .allocate(HandleKind::Buffer, desc.label, desc.contents.len(), false)
    }

    fn update_buffer(&self, raw: RawHandle, contents: &[u8]) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        let obj = state.require(raw, HandleKind::Buffer)?;
        if obj.len != contents.len() {
            return Err(DeviceError::Rejected {
                kind: HandleKind::Buffer,
                label: format!("#{}", raw.0),
                reason: format!("size change {} -> {}", obj.len, contents.len()),
            });
        }
        state.ops.push(DeviceOp::Update {
            raw,
            len: contents.len(),
        });
        Ok(())
    }

    fn create_texture(&self, desc: &TextureDesc<'_>) -> Result<RawHandle, DeviceError> {
        let expected = desc.width as usize * desc.height as usize * 4;
        if desc.width == 0 || desc.height == 0 || desc.pixels.len() != expected {
            return Err(DeviceError::Rejected {
                kind: HandleKind::Texture,
                label: desc.label.to_string(),
                reason: format!(
                    "{}x{} needs {expected} bytes, got {}",
                    desc.width,
                    desc.height,
                    desc.pixels.len()
                ),
            });
        }
        self.state
            .lock()
            .allocate(HandleKind::Texture, desc.label, desc.pixels.len(), desc.render_target)
    }

    fn create_shader(&self, desc: &ShaderDesc<'_>) -> Result<RawHandle, DeviceError> {
        if desc.source.trim().is_empty() {
            return Err(DeviceError::Rejected {
                kind: HandleKind::Shader,
                label: desc.label.to_string(),
                reason: "empty source".to_string(),
            });
        }
        self.state
            .lock()
            .allocate(HandleKind::Shader, desc.label, desc.source.len(), false)
    }

    fn create_program(&self, desc: &ProgramDesc<'_>) -> Result<RawHandle, DeviceError> {
        let mut state = self.state.lock();
        state.require(desc.vertex.raw(), HandleKind::Shader)?;
        state.require(desc.fragment.raw(), HandleKind::Shader)?;
        state.allocate(HandleKind::Program, desc.label, 0, false)
    }

    fn destroy(&self, kind: HandleKind, raw: RawHandle) {
        let mut state = self.state.lock();
        if state.live.remove(&raw).is_some() {
            state.ops.push(DeviceOp::Destroy { kind, raw });
            log::trace!("headless: destroyed {kind} #{}", raw.0);
        }
    }

    fn begin_frame(
        &self,
        target: RenderTarget,
        viewport: Viewport,
        clear: Option<Color>,
    ) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        if state.in_frame {
            return Err(DeviceError::FrameInProgress);
        }
        if let RenderTarget::Texture(handle) = target {
            let obj = state.require(handle.raw(), HandleKind::Texture)?;
            if !obj.render_target {
                return Err(DeviceError::Rejected {
                    kind: HandleKind::Texture,
                    label: format!("#{}", handle.raw().0),
                    reason: "not created as a render target".to_string(),
                });
            }
        }
        state.in_frame = true;
        state.ops.push(DeviceOp::BeginFrame {
            target,
            viewport,
            clear,
        });
        Ok(())
    }

    fn draw(&self, call: &DrawCall) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        if !state.in_frame {
            return Err(DeviceError::NoActiveFrame);
        }
        state.require(call.program.raw(), HandleKind::Program)?;
        state.require(call.vertex_buffer.raw(), HandleKind::Buffer)?;
        if let Some((index, _)) = call.index_buffer {
            state.require(index.raw(), HandleKind::Buffer)?;
        }
        if let Some(uniforms) = call.uniforms {
            state.require(uniforms.raw(), HandleKind::Buffer)?;
        }
        if let Some(texture) = call.texture {
            state.require(texture.raw(), HandleKind::Texture)?;
        }
        state.ops.push(DeviceOp::Draw {
            program: call.program.raw(),
            elements: call.elements.clone(),
        });
        Ok(())
    }

    fn end_frame(&self) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        if !state.in_frame {
            return Err(DeviceError::NoActiveFrame);
        }
        state.in_frame = false;
        state.frames += 1;
        state.ops.push(DeviceOp::EndFrame);
        Ok(())
    }

    fn resize(&self, width: u32, height: u32) {
        self.state.lock().ops.push(DeviceOp::Resize { width, height });
    }
}

/// Produces contexts backed by fresh [`HeadlessDevice`]s and keeps them for
/// inspection.
#[derive(Debug, Default)]
pub struct HeadlessFactory {
    devices: Mutex<Vec<Arc<HeadlessDevice>>>,
}

impl HeadlessFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Device behind the most recently created context.
    pub fn last_device(&self) -> Option<Arc<HeadlessDevice>> {
        self.devices.lock().last().cloned()
    }

    pub fn devices(&self) -> Vec<Arc<HeadlessDevice>> {
        self.devices.lock().clone()
    }
}

impl ContextFactory for HeadlessFactory {
    fn create(&self, format: &ContextFormat) -> anyhow::Result<Context> {
        let device = HeadlessDevice::new();
        self.devices.lock().push(device.clone());
        Ok(Context::new(format.clone(), device))
    }
}

/// Convenience for tests: a fresh headless context and its device.
pub fn headless_context() -> (Context, Arc<HeadlessDevice>) {
    let device = HeadlessDevice::new();
    let context = Context::new(ContextFormat::default(), device.clone());
    (context, device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{BufferUsage, DeviceHandle, ShaderStage, VertexLayout};

    fn buffer(ctx: &Context, bytes: &[u8]) -> DeviceHandle {
        ctx.create_buffer(&BufferDesc {
            label: "test",
            usage: BufferUsage::Vertex,
            contents: bytes,
        })
        .unwrap()
    }

    #[test]
    fn handles_are_stamped_with_their_context() {
        let (ctx, device) = headless_context();
        let handle = buffer(&ctx, &[0; 16]);

        assert_eq!(handle.context(), ctx.id());
        assert_eq!(handle.kind(), HandleKind::Buffer);
        assert_eq!(device.live_count(), 1);

        ctx.destroy(handle);
        assert_eq!(device.live_count(), 0);
    }

    #[test]
    fn foreign_handles_are_refused() {
        let (a, device_a) = headless_context();
        let (b, _device_b) = headless_context();
        let handle = buffer(&a, &[1, 2, 3]);

        b.destroy(handle);
        assert_eq!(device_a.live_count(), 1);

        let err = b.update_buffer(handle, &[4, 5, 6]).unwrap_err();
        assert!(matches!(err, DeviceError::ForeignHandle { .. }));
    }

    #[test]
    fn update_refuses_size_change() {
        let (ctx, _device) = headless_context();
        let handle = buffer(&ctx, &[0; 8]);

        assert!(ctx.update_buffer(handle, &[1; 8]).is_ok());
        assert!(ctx.update_buffer(handle, &[1; 4]).is_err());
    }

    #[test]
    fn rejected_kinds_fail_creation() {
        let (ctx, device) = headless_context();
        device.reject(HandleKind::Shader, true);

        let result = ctx.create_shader(&ShaderDesc {
            label: "vs",
            stage: ShaderStage::Vertex,
            source: "fn vs_main() {}",
        });
        assert!(matches!(result, Err(DeviceError::Rejected { .. })));
        assert_eq!(device.live_count(), 0);
    }

    #[test]
    fn program_requires_shader_handles() {
        let (ctx, _device) = headless_context();
        let not_a_shader = buffer(&ctx, &[0; 4]);
        let layout = VertexLayout::default();

        let err = ctx
            .create_program(&ProgramDesc {
                label: "p",
                vertex: not_a_shader,
                fragment: not_a_shader,
                layout: &layout,
                uniforms: false,
                textured: false,
            })
            .unwrap_err();
        assert!(matches!(err, DeviceError::WrongKind { .. }));
    }

    #[test]
    fn draw_outside_frame_is_an_error() {
        let (ctx, device) = headless_context();
        let vbo = buffer(&ctx, &[0; 12]);
        let vs = ctx
            .create_shader(&ShaderDesc {
                label: "vs",
                stage: ShaderStage::Vertex,
                source: "v",
            })
            .unwrap();
        let fs = ctx
            .create_shader(&ShaderDesc {
                label: "fs",
                stage: ShaderStage::Fragment,
                source: "f",
            })
            .unwrap();
        let layout = VertexLayout::default();
        let program = ctx
            .create_program(&ProgramDesc {
                label: "p",
                vertex: vs,
                fragment: fs,
                layout: &layout,
                uniforms: false,
                textured: false,
            })
            .unwrap();

        let call = DrawCall::new(program, vbo, 0..3);
        assert_eq!(ctx.draw(&call), Err(DeviceError::NoActiveFrame));

        ctx.begin_frame(RenderTarget::Surface, Viewport::from_size(4, 4), None)
            .unwrap();
        assert!(ctx.draw(&call).is_ok());
        ctx.end_frame().unwrap();

        assert_eq!(device.draw_count(), 1);
        assert_eq!(device.frames_completed(), 1);
    }
}
