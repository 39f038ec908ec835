use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::coords::Viewport;
use crate::device::Frame;
use crate::resource::GpuResource;

/// Per-renderer scheduling flags and the last viewport received.
#[derive(Debug, Default)]
pub struct RendererState {
    needs_update: AtomicBool,
    needs_redraw: AtomicBool,
    viewport: Mutex<Option<Viewport>>,
}

impl RendererState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// High-level per-frame contract.
///
/// A renderer is a container specialization: it embeds a
/// [`Container`](crate::container::Container), registers its resources there,
/// and returns it from `as_container` so context changes reach them.
///
/// - `on_update` runs the simulation and must not touch device handles; no
///   context is guaranteed during a pure update.
/// - `on_render` runs only with a context and a viewport, guaranteed by the
///   calling canvas.
pub trait Renderer: GpuResource {
    fn renderer_state(&self) -> &RendererState;

    fn on_update(&self, dt: f32) {
        let _ = dt;
    }

    fn on_render(&self, frame: &mut Frame<'_>);

    fn on_viewport(&self, viewport: Viewport) {
        let _ = viewport;
    }

    /// Requests another `update` from the driving loop.
    fn schedule_update(&self) {
        self.renderer_state().needs_update.store(true, Ordering::Release);
    }

    fn needs_update(&self) -> bool {
        self.renderer_state().needs_update.load(Ordering::Acquire)
    }

    fn schedule_redraw(&self) {
        self.renderer_state().needs_redraw.store(true, Ordering::Release);
    }

    fn needs_redraw(&self) -> bool {
        self.renderer_state().needs_redraw.load(Ordering::Acquire)
    }

    /// Clears the update request, then runs `on_update`, which may raise it
    /// again to keep ticking.
    fn update(&self, dt: f32) {
        self.renderer_state().needs_update.store(false, Ordering::Release);
        self.on_update(dt);
    }

    /// Clears the redraw request, then runs `on_render`.
    fn render(&self, frame: &mut Frame<'_>) {
        self.renderer_state().needs_redraw.store(false, Ordering::Release);
        self.on_render(frame);
    }

    fn set_viewport(&self, viewport: Viewport) {
        *self.renderer_state().viewport.lock() = Some(viewport);
        self.on_viewport(viewport);
        self.schedule_redraw();
    }

    fn viewport(&self) -> Option<Viewport> {
        *self.renderer_state().viewport.lock()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use super::*;
    use crate::resource::ResourceCore;

    /// Asks for another update from inside its own update, a fixed number of
    /// times.
    struct Ticker {
        core: ResourceCore,
        state: RendererState,
        left: AtomicU32,
    }

    impl GpuResource for Ticker {
        fn core(&self) -> &ResourceCore {
            &self.core
        }
    }

    impl Renderer for Ticker {
        fn renderer_state(&self) -> &RendererState {
            &self.state
        }

        fn on_update(&self, _dt: f32) {
            if self.left.fetch_sub(1, Ordering::AcqRel) > 1 {
                self.schedule_update();
            }
        }

        fn on_render(&self, _frame: &mut Frame<'_>) {}
    }

    #[test]
    fn update_flag_is_cleared_before_the_hook_runs() {
        let ticker = Ticker {
            core: ResourceCore::new("ticker"),
            state: RendererState::new(),
            left: AtomicU32::new(2),
        };
        ticker.schedule_update();

        ticker.update(0.016);
        assert!(ticker.needs_update());
        ticker.update(0.016);
        assert!(!ticker.needs_update());
    }

    #[test]
    fn viewport_push_requests_a_redraw() {
        let ticker = Ticker {
            core: ResourceCore::new("ticker"),
            state: RendererState::new(),
            left: AtomicU32::new(0),
        };
        assert!(!ticker.needs_redraw());

        ticker.set_viewport(Viewport::from_size(10, 10));
        assert!(ticker.needs_redraw());
        assert_eq!(ticker.viewport(), Some(Viewport::from_size(10, 10)));
    }
}
