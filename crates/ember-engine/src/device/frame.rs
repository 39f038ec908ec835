use crate::coords::{Color, Viewport};

use super::{Context, DeviceError, DrawCall, RenderTarget};

/// Draw statistics returned when a frame is finished.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FrameStats {
    pub draws: u32,
    pub skipped: u32,
}

/// One in-flight frame.
///
/// The canvas opens a frame only when it has both a context and a viewport;
/// renderers receive it in `on_render`. Failed draws are logged and counted,
/// never propagated, so one bad resource cannot stop the frame.
pub struct Frame<'a> {
    context: &'a Context,
    target: RenderTarget,
    viewport: Viewport,
    clear: Option<Color>,
    stats: FrameStats,
}

impl<'a> Frame<'a> {
    pub(crate) fn begin(
        context: &'a Context,
        target: RenderTarget,
        viewport: Viewport,
        clear: Option<Color>,
    ) -> Result<Self, DeviceError> {
        context.begin_frame(target, viewport, clear)?;
        Ok(Self {
            context,
            target,
            viewport,
            clear,
            stats: FrameStats::default(),
        })
    }

    #[inline]
    pub fn context(&self) -> &'a Context {
        self.context
    }

    #[inline]
    pub fn target(&self) -> RenderTarget {
        self.target
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Color the target was cleared to, if it was cleared.
    #[inline]
    pub fn clear(&self) -> Option<Color> {
        self.clear
    }

    /// Issues a draw. Returns `false` if the device refused it.
    pub fn draw(&mut self, call: &DrawCall) -> bool {
        match self.context.draw(call) {
            Ok(()) => {
                self.stats.draws += 1;
                true
            }
            Err(err) => {
                log::warn!("draw skipped: {err}");
                self.stats.skipped += 1;
                false
            }
        }
    }

    /// Records a draw that was skipped before reaching the device
    /// (e.g. a resource handle was unavailable).
    pub fn skip(&mut self) {
        self.stats.skipped += 1;
    }

    #[inline]
    pub fn draw_count(&self) -> u32 {
        self.stats.draws
    }

    #[inline]
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub(crate) fn finish(self) -> Result<FrameStats, DeviceError> {
        self.context.end_frame()?;
        Ok(self.stats)
    }
}
