use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::resource::{GpuResource, ResourceId};

#[derive(Clone)]
pub(crate) struct Entry {
    id: ResourceId,
    object: Weak<dyn GpuResource>,
}

impl Entry {
    pub(crate) fn upgrade(&self) -> Option<Arc<dyn GpuResource>> {
        self.object.upgrade()
    }

    fn alive(&self) -> bool {
        self.object.strong_count() > 0
    }
}

#[derive(Default)]
struct Lists {
    members: Vec<Entry>,
    pending_adds: Vec<Entry>,
    pending_removes: Vec<ResourceId>,
}

/// Member list plus double-buffered staging lists of one container.
///
/// The member list only changes in `update_lists`; everything else stages.
/// The lock is never held while calling into a resource.
pub(crate) struct Registry {
    owner: ResourceId,
    label: String,
    lists: Mutex<Lists>,
}

impl Registry {
    pub(crate) fn new(owner: ResourceId, label: &str) -> Self {
        Self {
            owner,
            label: label.to_string(),
            lists: Mutex::new(Lists::default()),
        }
    }

    pub(crate) fn owner(&self) -> ResourceId {
        self.owner
    }

    pub(crate) fn register(self: &Arc<Self>, obj: &Arc<dyn GpuResource>) -> bool {
        let id = obj.id();
        if id == self.owner {
            log::warn!("`{}`: refusing to register a container into itself", self.label);
            return false;
        }

        {
            let mut lists = self.lists.lock();

            // Re-registering something staged for removal cancels the removal.
            let before = lists.pending_removes.len();
            lists.pending_removes.retain(|r| *r != id);
            let cancelled = lists.pending_removes.len() != before;

            let tracked = lists.members.iter().any(|e| e.id == id)
                || lists.pending_adds.iter().any(|e| e.id == id);
            if tracked {
                if !cancelled {
                    return false;
                }
            } else {
                lists.pending_adds.push(Entry {
                    id,
                    object: Arc::downgrade(obj),
                });
            }
        }

        obj.core().adopt(self);
        log::trace!("`{}`: staged `{}`", self.label, obj.label());
        true
    }

    pub(crate) fn unregister(self: &Arc<Self>, obj: &dyn GpuResource) -> bool {
        let staged = self.stage_removal(obj.id());
        if staged {
            obj.core().orphan(self);
            log::trace!("`{}`: staged removal of `{}`", self.label, obj.label());
        }
        staged
    }

    /// Stages removal of a member that is being dropped.
    pub(crate) fn forget(&self, id: ResourceId) {
        self.stage_removal(id);
    }

    fn stage_removal(&self, id: ResourceId) -> bool {
        let mut lists = self.lists.lock();
        let tracked = lists.members.iter().any(|e| e.id == id)
            || lists.pending_adds.iter().any(|e| e.id == id);
        if !tracked || lists.pending_removes.contains(&id) {
            return false;
        }
        lists.pending_removes.push(id);
        true
    }

    /// Appends staged adds, removes staged removals and dead entries, clears
    /// both staging lists.
    pub(crate) fn update_lists(&self) {
        let mut lists = self.lists.lock();
        let Lists {
            members,
            pending_adds,
            pending_removes,
        } = &mut *lists;

        members.append(pending_adds);
        if !pending_removes.is_empty() {
            members.retain(|e| !pending_removes.contains(&e.id));
            pending_removes.clear();
        }
        members.retain(Entry::alive);
    }

    pub(crate) fn member_at(&self, index: usize) -> Option<Entry> {
        self.lists.lock().members.get(index).cloned()
    }

    pub(crate) fn members(&self) -> Vec<Arc<dyn GpuResource>> {
        self.lists
            .lock()
            .members
            .iter()
            .filter_map(Entry::upgrade)
            .collect()
    }

    pub(crate) fn member_count(&self) -> usize {
        self.lists.lock().members.len()
    }

    pub(crate) fn contains(&self, id: ResourceId) -> bool {
        let lists = self.lists.lock();
        if lists.pending_removes.contains(&id) {
            return false;
        }
        lists.members.iter().any(|e| e.id == id) || lists.pending_adds.iter().any(|e| e.id == id)
    }

    pub(crate) fn pending_add_count(&self) -> usize {
        self.lists.lock().pending_adds.len()
    }

    pub(crate) fn pending_remove_count(&self) -> usize {
        self.lists.lock().pending_removes.len()
    }
}
