use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::container::{Container, ContainerHandle, Registry};
use crate::device::Context;

/// Process-unique identity of a resource, used for container membership.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ResourceId(u64);

impl ResourceId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "res{}", self.0)
    }
}

#[derive(Default)]
struct Binding {
    context: Option<Context>,
    initialized: bool,
    // Set while members are being torn down; a re-entrant detach is refused.
    detaching: bool,
}

/// Lifecycle bookkeeping embedded in every resource.
///
/// Holds the bound context, the initialized and validity flags, a revision
/// counter bumped by every invalidation, and a weak back-reference to the
/// registry of the container the resource was first registered with.
pub struct ResourceCore {
    id: ResourceId,
    label: String,
    binding: Mutex<Binding>,
    valid: AtomicBool,
    revision: AtomicU64,
    parent: Mutex<Option<Weak<Registry>>>,
}

impl ResourceCore {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: ResourceId::next(),
            label: label.into(),
            binding: Mutex::new(Binding::default()),
            valid: AtomicBool::new(false),
            revision: AtomicU64::new(0),
            parent: Mutex::new(None),
        }
    }

    #[inline]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn context(&self) -> Option<Context> {
        self.binding.lock().context.clone()
    }

    pub fn initialized(&self) -> bool {
        self.binding.lock().initialized
    }

    #[inline]
    pub fn valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// Number of invalidations so far.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    /// Sets the validity flag.
    ///
    /// Clearing always succeeds and bumps the revision. Setting is refused
    /// while detached, since a valid device representation needs a context.
    pub fn set_valid(&self, valid: bool) -> bool {
        if !valid {
            self.invalidate();
            return true;
        }
        let binding = self.binding.lock();
        if binding.context.is_none() {
            log::warn!("`{}`: refusing to mark valid without a context", self.label);
            return false;
        }
        self.valid.store(true, Ordering::Release);
        true
    }

    /// Marks the device representation stale; called by every CPU-side mutation.
    pub fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
        self.revision.fetch_add(1, Ordering::AcqRel);
    }

    /// Clears validity without bumping the revision.
    pub(crate) fn clear_valid(&self) {
        self.valid.store(false, Ordering::Release);
    }

    /// Container the resource is registered with, if it is still alive.
    pub fn parent(&self) -> Option<ContainerHandle> {
        self.parent
            .lock()
            .as_ref()
            .and_then(Weak::upgrade)
            .map(ContainerHandle::from_registry)
    }

    /// Records `registry` as parent unless a live parent is already set.
    pub(crate) fn adopt(&self, registry: &Arc<Registry>) {
        let mut parent = self.parent.lock();
        if parent.as_ref().is_some_and(|p| p.strong_count() > 0) {
            return;
        }
        *parent = Some(Arc::downgrade(registry));
    }

    /// Clears the parent link if it points at `registry`.
    pub(crate) fn orphan(&self, registry: &Arc<Registry>) {
        let mut parent = self.parent.lock();
        if parent
            .as_ref()
            .is_some_and(|p| std::ptr::eq(p.as_ptr(), Arc::as_ptr(registry)))
        {
            *parent = None;
        }
    }

    /// Binds `ctx`. Returns `false` when already initialized.
    fn attach(&self, ctx: &Context) -> bool {
        let mut binding = self.binding.lock();
        if binding.initialized {
            if let Some(bound) = binding.context.as_ref().filter(|c| *c != ctx) {
                log::warn!(
                    "`{}`: already attached to {}, ignoring attach to {}",
                    self.label,
                    bound.id(),
                    ctx.id()
                );
            }
            return false;
        }
        binding.context = Some(ctx.clone());
        binding.initialized = true;
        true
    }

    /// Checks that `ctx` is the bound context and marks the detach as in
    /// progress, reporting violations.
    fn begin_detach(&self, ctx: &Context) -> bool {
        let mut guard = self.binding.lock();
        let binding = &mut *guard;
        if binding.detaching {
            log::warn!(
                "`{}`: detach from {} re-entered through a registration cycle; ignored",
                self.label,
                ctx.id()
            );
            return false;
        }
        match binding.context.as_ref() {
            Some(bound) if binding.initialized && bound == ctx => {
                binding.detaching = true;
                true
            }
            Some(bound) => {
                log::warn!(
                    "`{}`: detach from {} refused, bound to {}",
                    self.label,
                    ctx.id(),
                    bound.id()
                );
                false
            }
            None => {
                log::warn!("`{}`: detach from {} refused, not attached", self.label, ctx.id());
                false
            }
        }
    }

    fn detach(&self) {
        let mut binding = self.binding.lock();
        binding.context = None;
        binding.initialized = false;
        binding.detaching = false;
        self.valid.store(false, Ordering::Release);
    }
}

impl Drop for ResourceCore {
    fn drop(&mut self) {
        let binding = self.binding.get_mut();
        if let Some(ctx) = binding.context.as_ref() {
            log::warn!("`{}` dropped while attached to {}", self.label, ctx.id());
        }
        if let Some(registry) = self.parent.get_mut().take().and_then(|p| p.upgrade()) {
            registry.forget(self.id);
        }
    }
}

impl fmt::Debug for ResourceCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let binding = self.binding.lock();
        f.debug_struct("ResourceCore")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("context", &binding.context.as_ref().map(Context::id))
            .field("initialized", &binding.initialized)
            .field("valid", &self.valid())
            .finish()
    }
}

/// A hardware-backed object with a context lifecycle.
///
/// Implementors embed a [`ResourceCore`] and override the hooks they need.
/// Containers (including renderers) also return their [`Container`] from
/// [`as_container`](Self::as_container) so lifecycle calls fan out to members.
///
/// ```ignore
/// struct Overlay {
///     core: ResourceCore,
///     quad: Arc<Buffer>,
/// }
///
/// impl GpuResource for Overlay {
///     fn core(&self) -> &ResourceCore { &self.core }
///
///     fn on_context_deinit(&self, _ctx: &Context) {
///         // release anything built under the context
///     }
/// }
/// ```
pub trait GpuResource: Send + Sync {
    fn core(&self) -> &ResourceCore;

    /// Container-level setup. Runs before members are initialized.
    ///
    /// May defer device work to first access instead of building here.
    fn on_context_init(&self, ctx: &Context) {
        let _ = ctx;
    }

    /// Container-level teardown. Runs after members are deinitialized and must
    /// release every device handle built under `ctx`.
    fn on_context_deinit(&self, ctx: &Context) {
        let _ = ctx;
    }

    fn as_container(&self) -> Option<&Container> {
        None
    }

    fn id(&self) -> ResourceId {
        self.core().id()
    }

    fn label(&self) -> &str {
        self.core().label()
    }

    fn initialized(&self) -> bool {
        self.core().initialized()
    }

    fn context(&self) -> Option<Context> {
        self.core().context()
    }

    fn valid(&self) -> bool {
        self.core().valid()
    }

    fn set_valid(&self, valid: bool) -> bool {
        self.core().set_valid(valid)
    }

    /// Attaches to `ctx`.
    ///
    /// A no-op returning `false` when already initialized. Otherwise records the
    /// context, runs `on_context_init`, then initializes container members.
    fn init_context(&self, ctx: &Context) -> bool {
        if !self.core().attach(ctx) {
            return false;
        }
        log::trace!("init `{}` on {}", self.label(), ctx.id());
        self.on_context_init(ctx);
        if let Some(container) = self.as_container() {
            container.init_objects(ctx);
        }
        true
    }

    /// Detaches from `ctx`.
    ///
    /// Refused (logged, returns `false`) when not attached or attached to a
    /// different context. Otherwise deinitializes container members, runs
    /// `on_context_deinit`, then clears the context and validity.
    fn deinit_context(&self, ctx: &Context) -> bool {
        if !self.core().begin_detach(ctx) {
            return false;
        }
        log::trace!("deinit `{}` from {}", self.label(), ctx.id());
        if let Some(container) = self.as_container() {
            container.deinit_objects(ctx);
        }
        self.on_context_deinit(ctx);
        self.core().detach();
        true
    }
}
