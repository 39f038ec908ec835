use std::cell::RefCell;
use std::sync::Arc;

use parking_lot::ReentrantMutex;

use crate::coords::{Color, Viewport};
use crate::device::{Context, DeviceError, Frame, RenderTarget};
use crate::time::{DeltaAccumulator, FrameClock, FrameTime};

use super::Renderer;

/// Readiness of a canvas for drawing.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CanvasState {
    /// No context attached.
    Unbound,
    /// Context attached, no viewport received yet.
    BoundUninitialized,
    /// Context attached and a viewport received; frames may be drawn.
    Ready,
}

struct CanvasInner {
    context: Option<Context>,
    renderer: Option<Arc<dyn Renderer>>,
    // `Some(None)` is a pending removal of the active renderer.
    pending: Option<Option<Arc<dyn Renderer>>>,
    viewport: Option<Viewport>,
    clear: Option<Color>,
    clock: FrameClock,
    accumulator: DeltaAccumulator,
    frames: u64,
}

impl CanvasInner {
    fn state(&self) -> CanvasState {
        match (&self.context, &self.viewport) {
            (None, _) => CanvasState::Unbound,
            (Some(_), None) => CanvasState::BoundUninitialized,
            (Some(_), Some(_)) => CanvasState::Ready,
        }
    }
}

/// Binds a drawable surface, a device context and the active renderer.
///
/// Every entry point takes the same re-entrant lock, so a renderer hook may
/// call back into the canvas (for example to replace itself) without
/// deadlocking. Interior borrows are released before any renderer call.
pub struct Canvas {
    inner: ReentrantMutex<RefCell<CanvasInner>>,
}

impl Canvas {
    pub fn new() -> Self {
        Self {
            inner: ReentrantMutex::new(RefCell::new(CanvasInner {
                context: None,
                renderer: None,
                pending: None,
                viewport: None,
                clear: Some(Color::black()),
                clock: FrameClock::new(),
                accumulator: DeltaAccumulator::new(),
                frames: 0,
            })),
        }
    }

    pub fn state(&self) -> CanvasState {
        let guard = self.inner.lock();
        let state = guard.borrow().state();
        state
    }

    pub fn context(&self) -> Option<Context> {
        let guard = self.inner.lock();
        let context = guard.borrow().context.clone();
        context
    }

    pub fn viewport(&self) -> Option<Viewport> {
        let guard = self.inner.lock();
        let viewport = guard.borrow().viewport;
        viewport
    }

    /// The active renderer. A renderer passed to `set_renderer` becomes active
    /// at the next `render`.
    pub fn renderer(&self) -> Option<Arc<dyn Renderer>> {
        let guard = self.inner.lock();
        let renderer = guard.borrow().renderer.clone();
        renderer
    }

    /// Frames successfully finished since construction.
    pub fn frames_rendered(&self) -> u64 {
        let guard = self.inner.lock();
        let frames = guard.borrow().frames;
        frames
    }

    /// Attaches `ctx` and propagates it to the active renderer. Refused with
    /// a warning when a context is already attached.
    pub fn init_context(&self, ctx: &Context) -> bool {
        let guard = self.inner.lock();
        let (renderer, viewport) = {
            let mut inner = guard.borrow_mut();
            if let Some(bound) = &inner.context {
                log::warn!("canvas: init_context({ctx}) while bound to {bound}; ignored");
                return false;
            }
            inner.context = Some(ctx.clone());
            inner.clock.reset();
            (inner.renderer.clone(), inner.viewport)
        };

        log::debug!("canvas: attached {ctx} ({})", ctx.backend_name());
        if let Some(renderer) = renderer {
            renderer.init_context(ctx);
            if let Some(viewport) = viewport {
                renderer.set_viewport(viewport);
            }
            renderer.schedule_redraw();
        }
        true
    }

    /// Detaches `ctx`. The renderer and its resources are torn down before the
    /// canvas forgets the context, so every device handle is released while
    /// the context is still usable. The cached viewport is cleared.
    pub fn deinit_context(&self, ctx: &Context) -> bool {
        let guard = self.inner.lock();
        let renderer = {
            let inner = guard.borrow();
            match &inner.context {
                Some(bound) if bound == ctx => {}
                Some(bound) => {
                    log::warn!("canvas: deinit_context({ctx}) while bound to {bound}; ignored");
                    return false;
                }
                None => {
                    log::warn!("canvas: deinit_context({ctx}) while unbound; ignored");
                    return false;
                }
            }
            inner.renderer.clone()
        };

        if let Some(renderer) = renderer {
            if renderer.initialized() {
                renderer.deinit_context(ctx);
            }
        }

        let mut inner = guard.borrow_mut();
        inner.context = None;
        inner.viewport = None;
        log::debug!("canvas: detached {ctx}");
        true
    }

    /// Windowing entry point. `None` detaches; a different context detaches
    /// the current one first.
    pub fn set_context(&self, ctx: Option<Context>) {
        let _guard = self.inner.lock();
        let current = self.context();
        match (current, ctx) {
            (Some(current), Some(next)) if current == next => {}
            (Some(current), next) => {
                self.deinit_context(&current);
                if let Some(next) = next {
                    self.init_context(&next);
                }
            }
            (None, Some(next)) => {
                self.init_context(&next);
            }
            (None, None) => {}
        }
    }

    /// Caches `viewport` and, when bound, pushes it to the active renderer.
    pub fn set_viewport(&self, viewport: Viewport) {
        let guard = self.inner.lock();
        let renderer = {
            let mut inner = guard.borrow_mut();
            inner.viewport = Some(viewport);
            match inner.context {
                Some(_) => inner.renderer.clone(),
                None => None,
            }
        };
        if let Some(renderer) = renderer {
            renderer.set_viewport(viewport);
        }
    }

    /// Schedules `renderer` to replace the active one at the start of the
    /// next `render`. Calling this again before that replaces the pending
    /// entry.
    pub fn set_renderer(&self, renderer: Option<Arc<dyn Renderer>>) {
        let guard = self.inner.lock();
        guard.borrow_mut().pending = Some(renderer);
    }

    pub fn set_clear_color(&self, color: Color) {
        let guard = self.inner.lock();
        guard.borrow_mut().clear = Some(color);
    }

    /// Disables clearing; frames draw over the previous target contents.
    pub fn disable_clear(&self) {
        let guard = self.inner.lock();
        guard.borrow_mut().clear = None;
    }

    /// Ticks the frame clock and adds the delta to the pending update time.
    pub fn update_time(&self) -> FrameTime {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        let time = inner.clock.tick();
        inner.accumulator.add(time.dt);
        time
    }

    /// Seconds accumulated by `update_time` since the last `update`.
    pub fn accumulated_time(&self) -> f32 {
        let guard = self.inner.lock();
        let pending = guard.borrow().accumulator.pending();
        pending
    }

    /// Hands the accumulated delta to the active renderer and resets it.
    /// Returns `false` when there is no active renderer; the delta is kept.
    pub fn update(&self) -> bool {
        let guard = self.inner.lock();
        let (renderer, dt) = {
            let mut inner = guard.borrow_mut();
            let Some(renderer) = inner.renderer.clone() else {
                return false;
            };
            (renderer, inner.accumulator.take())
        };
        renderer.update(dt);
        true
    }

    pub fn needs_update(&self) -> bool {
        self.renderer().is_some_and(|renderer| renderer.needs_update())
    }

    /// A pending renderer swap counts as a redraw request.
    pub fn needs_redraw(&self) -> bool {
        let guard = self.inner.lock();
        let (pending, renderer) = {
            let inner = guard.borrow();
            (inner.pending.is_some(), inner.renderer.clone())
        };
        pending || renderer.is_some_and(|renderer| renderer.needs_redraw())
    }

    /// Promotes a pending renderer, then draws one frame into `target` if the
    /// canvas is ready. Returns whether a frame was finished.
    pub fn render(&self, target: RenderTarget) -> bool {
        let guard = self.inner.lock();
        self.promote_pending();

        let (ctx, renderer, viewport, clear) = {
            let inner = guard.borrow();
            match (&inner.context, &inner.renderer, inner.viewport) {
                (Some(ctx), Some(renderer), Some(viewport)) => {
                    (ctx.clone(), renderer.clone(), viewport, inner.clear)
                }
                _ => return false,
            }
        };
        if !viewport.is_valid() {
            log::trace!("canvas: zero-sized viewport; frame skipped");
            return false;
        }

        if let Some(container) = renderer.as_container() {
            container.sync_objects(&ctx);
        }

        let mut frame = match Frame::begin(&ctx, target, viewport, clear) {
            Ok(frame) => frame,
            Err(DeviceError::Surface(reason)) => {
                log::debug!("canvas: no drawable this frame: {reason}");
                return false;
            }
            Err(err) => {
                log::error!("canvas: could not begin frame on {ctx}: {err}");
                return false;
            }
        };
        renderer.render(&mut frame);

        match frame.finish() {
            Ok(stats) => {
                let mut inner = guard.borrow_mut();
                inner.frames += 1;
                log::trace!(
                    "canvas: frame {} finished ({} draws, {} skipped)",
                    inner.frames,
                    stats.draws,
                    stats.skipped
                );
                true
            }
            Err(err) => {
                log::error!("canvas: could not finish frame on {ctx}: {err}");
                false
            }
        }
    }

    /// Hot-swap protocol: the old renderer is detached from the current
    /// context before the new one is attached and receives the viewport.
    fn promote_pending(&self) {
        let guard = self.inner.lock();
        let (next, previous, ctx, viewport) = {
            let mut inner = guard.borrow_mut();
            let Some(next) = inner.pending.take() else {
                return;
            };
            let same = match (&next, &inner.renderer) {
                (Some(next), Some(current)) => next.id() == current.id(),
                (None, None) => true,
                _ => false,
            };
            if same {
                return;
            }
            (
                next,
                inner.renderer.take(),
                inner.context.clone(),
                inner.viewport,
            )
        };

        if let (Some(previous), Some(ctx)) = (&previous, &ctx) {
            if previous.initialized() {
                previous.deinit_context(ctx);
            }
        }

        guard.borrow_mut().renderer = next.clone();
        log::debug!(
            "canvas: renderer {} -> {}",
            previous.as_ref().map_or("none", |r| r.label()),
            next.as_ref().map_or("none", |r| r.label()),
        );

        if let (Some(next), Some(ctx)) = (&next, &ctx) {
            next.init_context(ctx);
            if let Some(viewport) = viewport {
                next.set_viewport(viewport);
            }
            next.schedule_redraw();
        }
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Canvas {
    fn drop(&mut self) {
        self.set_context(None);
    }
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = self.inner.lock();
        let inner = guard.borrow();
        f.debug_struct("Canvas")
            .field("state", &inner.state())
            .field("context", &inner.context)
            .field("renderer", &inner.renderer.as_ref().map(|r| r.id()))
            .field("swap_pending", &inner.pending.is_some())
            .field("viewport", &inner.viewport)
            .finish()
    }
}
