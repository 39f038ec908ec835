//! Recursive aggregation and lifecycle fan-out.
//!
//! A [`Container`] is a resource whose context attach/detach brackets its
//! members: container setup, then members on attach; members, then container
//! teardown on detach. Membership changes are staged and reconciled at
//! `update_lists` checkpoints, so members may register further members while
//! a lifecycle pass is running.

mod registry;

use std::sync::Arc;

use crate::device::Context;
use crate::resource::{GpuResource, ResourceCore, ResourceId};

pub(crate) use registry::Registry;

/// Container tuning.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ContainerConfig {
    /// Upper bound on fixed-point passes in `init_objects`. A resource graph
    /// that keeps registering new members beyond this is reported and the
    /// remaining staged members wait for the next attach.
    pub max_init_passes: usize,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            max_init_passes: 1024,
        }
    }
}

/// Resource that aggregates other resources.
///
/// Members are held weakly: registration is a lifecycle relationship, not
/// ownership. A dropped member leaves the container at the next checkpoint.
pub struct Container {
    core: ResourceCore,
    registry: Arc<Registry>,
    config: ContainerConfig,
}

impl Container {
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_config(label, ContainerConfig::default())
    }

    pub fn with_config(label: impl Into<String>, config: ContainerConfig) -> Self {
        let core = ResourceCore::new(label);
        let registry = Arc::new(Registry::new(core.id(), core.label()));
        Self {
            core,
            registry,
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> ContainerConfig {
        self.config
    }

    /// Handle members can use to register siblings.
    pub fn handle(&self) -> ContainerHandle {
        ContainerHandle::from_registry(self.registry.clone())
    }

    /// Stages `obj` for membership. Idempotent; returns `false` when `obj` is
    /// already a member or staged.
    pub fn register_object<R: GpuResource + 'static>(&self, obj: &Arc<R>) -> bool {
        let obj: Arc<dyn GpuResource> = obj.clone();
        self.registry.register(&obj)
    }

    pub fn register_shared(&self, obj: &Arc<dyn GpuResource>) -> bool {
        self.registry.register(obj)
    }

    /// Stages `obj` for removal. Returns `false` (a no-op) when it is not
    /// tracked.
    ///
    /// Unregistering does not detach `obj`; a caller removing a live member
    /// deinitializes it itself.
    pub fn unregister_object(&self, obj: &dyn GpuResource) -> bool {
        self.registry.unregister(obj)
    }

    /// Reconciles the staging lists with the member list.
    pub fn update_lists(&self) {
        self.registry.update_lists();
    }

    /// Initializes every member, repeating until a pass introduces no new
    /// registrations.
    pub fn init_objects(&self, ctx: &Context) {
        let mut passes = 0;
        loop {
            self.registry.update_lists();

            let mut index = 0;
            while let Some(entry) = self.registry.member_at(index) {
                if let Some(member) = entry.upgrade() {
                    member.init_context(ctx);
                }
                index += 1;
            }

            passes += 1;
            let pending = self.registry.pending_add_count();
            if pending == 0 {
                break;
            }
            if passes >= self.config.max_init_passes {
                log::error!(
                    "`{}`: members still registering after {passes} init passes; \
                     {pending} left uninitialized",
                    self.core.label()
                );
                break;
            }
        }

        if passes > 1 {
            log::debug!("`{}`: init converged in {passes} passes", self.core.label());
        }
    }

    /// Initializes members staged since the last pass, descending into member
    /// containers. The canvas runs this at the start of every frame so
    /// resources registered while attached become usable without a re-attach.
    pub fn sync_objects(&self, ctx: &Context) {
        if self.registry.pending_add_count() > 0 || self.registry.pending_remove_count() > 0 {
            self.init_objects(ctx);
        }

        let mut index = 0;
        while let Some(entry) = self.registry.member_at(index) {
            if let Some(member) = entry.upgrade() {
                if let Some(container) = member.as_container() {
                    if member.context().as_ref() == Some(ctx) {
                        container.sync_objects(ctx);
                    }
                }
            }
            index += 1;
        }
    }

    /// Deinitializes every member, including ones registered but not yet
    /// merged. Members are visited in registration order.
    pub fn deinit_objects(&self, ctx: &Context) {
        self.registry.update_lists();

        let mut index = 0;
        while let Some(entry) = self.registry.member_at(index) {
            if let Some(member) = entry.upgrade() {
                // Staged members may never have been initialized.
                if member.initialized() {
                    member.deinit_context(ctx);
                }
            }
            index += 1;
        }
    }

    /// Live members in registration order.
    pub fn members(&self) -> Vec<Arc<dyn GpuResource>> {
        self.registry.members()
    }

    pub fn member_count(&self) -> usize {
        self.registry.member_count()
    }

    /// Whether `id` is a member or staged for membership (and not staged for
    /// removal).
    pub fn contains(&self, id: ResourceId) -> bool {
        self.registry.contains(id)
    }

    pub fn pending_add_count(&self) -> usize {
        self.registry.pending_add_count()
    }

    pub fn pending_remove_count(&self) -> usize {
        self.registry.pending_remove_count()
    }
}

impl GpuResource for Container {
    fn core(&self) -> &ResourceCore {
        &self.core
    }

    fn as_container(&self) -> Option<&Container> {
        Some(self)
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("core", &self.core)
            .field("members", &self.registry.member_count())
            .field("pending_adds", &self.registry.pending_add_count())
            .field("pending_removes", &self.registry.pending_remove_count())
            .finish()
    }
}

/// Shared reference to a container's member registry.
///
/// Obtained from [`Container::handle`] or a member's
/// [`ResourceCore::parent`]; lets code register into a container without
/// borrowing it.
#[derive(Clone)]
pub struct ContainerHandle {
    registry: Arc<Registry>,
}

impl ContainerHandle {
    pub(crate) fn from_registry(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Id of the container this handle registers into.
    pub fn owner(&self) -> ResourceId {
        self.registry.owner()
    }

    pub fn register_object<R: GpuResource + 'static>(&self, obj: &Arc<R>) -> bool {
        let obj: Arc<dyn GpuResource> = obj.clone();
        self.registry.register(&obj)
    }

    pub fn unregister_object(&self, obj: &dyn GpuResource) -> bool {
        self.registry.unregister(obj)
    }

    pub fn contains(&self, id: ResourceId) -> bool {
        self.registry.contains(id)
    }
}

impl std::fmt::Debug for ContainerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerHandle")
            .field("owner", &self.registry.owner())
            .finish()
    }
}
