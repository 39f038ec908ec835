use parking_lot::Mutex;

use crate::device::{Context, ContextId, DeviceError, DeviceHandle};

use super::{ResourceCore, ResourceError};

#[derive(Default)]
struct SlotState {
    bound: Option<(Context, DeviceHandle)>,
    /// Revision and context of the last failed build; not retried until either changes.
    failure: Option<(u64, ContextId, DeviceError)>,
}

/// Owner of one device handle and the context it was built under.
///
/// The handle is a derived artifact: it is rebuilt from CPU data on demand and
/// released on detach. Dropping the slot releases it too, so a handle can
/// never outlive its resource.
#[derive(Default)]
pub struct DeviceSlot {
    state: Mutex<SlotState>,
}

impl DeviceSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current handle, if one has been built.
    pub fn handle(&self) -> Option<DeviceHandle> {
        self.state.lock().bound.as_ref().map(|(_, h)| *h)
    }

    /// Returns a handle for `core`'s context, building it when missing or stale.
    ///
    /// `build` receives the context and the handle built previously under the
    /// same context (if any), which it may refresh in place and return. A
    /// handle from a different context is never passed to `build` and is
    /// released first.
    ///
    /// A failed build leaves the slot empty and the resource invalid; the
    /// failure is returned again without retrying until the resource is
    /// invalidated or re-attached.
    pub fn ensure<F>(&self, core: &ResourceCore, build: F) -> Result<DeviceHandle, ResourceError>
    where
        F: FnOnce(&Context, Option<DeviceHandle>) -> Result<DeviceHandle, DeviceError>,
    {
        let Some(ctx) = core.context() else {
            return Err(ResourceError::Detached {
                label: core.label().to_string(),
            });
        };

        let mut state = self.state.lock();

        if state
            .bound
            .as_ref()
            .is_some_and(|(bound, _)| bound != &ctx)
        {
            Self::release_locked(&mut state);
        }

        if core.valid() {
            if let Some((_, handle)) = state.bound.as_ref() {
                return Ok(*handle);
            }
        }

        let revision = core.revision();
        if let Some((failed_rev, failed_ctx, err)) = state.failure.as_ref() {
            if *failed_rev == revision && *failed_ctx == ctx.id() {
                return Err(ResourceError::Build {
                    label: core.label().to_string(),
                    source: err.clone(),
                });
            }
        }

        let previous = state.bound.as_ref().map(|(_, h)| *h);
        match build(&ctx, previous) {
            Ok(handle) => {
                if let Some(old) = previous.filter(|old| *old != handle) {
                    ctx.destroy(old);
                }
                state.bound = Some((ctx, handle));
                state.failure = None;
                drop(state);

                core.set_valid(true);
                log::trace!("built `{}` as {handle}", core.label());
                Ok(handle)
            }
            Err(err) => {
                log::error!("failed to build `{}`: {err}", core.label());
                Self::release_locked(&mut state);
                state.failure = Some((revision, ctx.id(), err.clone()));
                drop(state);

                core.clear_valid();
                Err(ResourceError::Build {
                    label: core.label().to_string(),
                    source: err,
                })
            }
        }
    }

    /// Destroys the handle, if any. Returns `true` when one was released.
    pub fn release(&self) -> bool {
        let mut state = self.state.lock();
        state.failure = None;
        Self::release_locked(&mut state)
    }

    fn release_locked(state: &mut SlotState) -> bool {
        match state.bound.take() {
            Some((ctx, handle)) => {
                ctx.destroy(handle);
                true
            }
            None => false,
        }
    }
}

impl Drop for DeviceSlot {
    fn drop(&mut self) {
        Self::release_locked(self.state.get_mut());
    }
}

impl std::fmt::Debug for DeviceSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSlot")
            .field("handle", &self.handle())
            .finish()
    }
}
