//! Checklist use-case service.
//!
//! # Responsibility
//! - Provide the entry points the inspector calls: assign/clear links,
//!   resolve for display, destroy registries, synchronize templates.
//! - Own the session-scoped resolution cache.
//!
//! # Invariants
//! - Resolution results never outlive the registry entries they came from.
//! - Item indices are preconditions; out of range panics.

use crate::config::ReferenceConfig;
use crate::host::DocumentHost;
use crate::model::descriptor::ReferenceDescriptor;
use crate::model::handle::{DocumentId, ObjectHandle, ReferenceId};
use crate::model::task_list::{ChecklistItem, TaskList};
use crate::reference::cache::ResolutionCache;
use crate::reference::policy::{LinkError, LinkOutcome, ReferencePolicy, Resolution};
use crate::reference::template_sync::{SyncOutcome, TemplateSync};
use log::{info, warn};

/// Use-case facade over a `DocumentHost`.
pub struct ChecklistService<H: DocumentHost> {
    host: H,
    policy: ReferencePolicy,
    cache: ResolutionCache,
    sync: TemplateSync,
}

impl<H: DocumentHost> ChecklistService<H> {
    pub fn new(host: H, config: ReferenceConfig) -> Self {
        Self {
            host,
            policy: ReferencePolicy::new(config),
            cache: ResolutionCache::new(),
            sync: TemplateSync::new(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    /// Links `candidate` to item `index`, choosing direct or indirect storage.
    ///
    /// Assigning the null object clears the link.
    pub fn assign_object(
        &mut self,
        list: &mut TaskList,
        list_document: Option<&DocumentId>,
        index: usize,
        candidate: ObjectHandle,
    ) -> Result<LinkOutcome, LinkError> {
        let item = item_mut(list, index);
        self.policy
            .link(&mut self.host, list_document, item, candidate)
    }

    /// Removes the link of item `index`.
    pub fn clear_object(&mut self, list: &mut TaskList, index: usize) -> Option<ReferenceDescriptor> {
        self.policy.unlink(item_mut(list, index))
    }

    /// Display state of item `index`; `None` when it links nothing.
    pub fn resolve_item(&mut self, list: &TaskList, index: usize) -> Option<Resolution> {
        let item = list.get(index).unwrap_or_else(|| {
            panic!(
                "item index {index} out of range for list of {} items",
                list.len()
            )
        });
        self.resolve(item)
    }

    /// Display state of every item, in list order.
    pub fn resolve_all(&mut self, list: &TaskList) -> Vec<Option<Resolution>> {
        list.iter().map(|item| self.resolve(item)).collect()
    }

    fn resolve(&mut self, item: &ChecklistItem) -> Option<Resolution> {
        let descriptor = item.reference.as_ref()?;
        Some(self.policy.resolve(&self.host, &mut self.cache, descriptor))
    }

    /// Destroys the registry anchored in `document`.
    ///
    /// Every indirect link into `document` resolves as lost afterwards.
    pub fn destroy_registry(&mut self, document: &DocumentId) -> bool {
        let removed = self.host.remove_registry(document);
        let evicted = self.cache.evict_document(document);
        if removed {
            warn!(
                "event=registry_destroy module=service status=ok document={} evicted={}",
                document, evicted
            );
        } else {
            info!(
                "event=registry_destroy module=service status=skip document={} reason=absent",
                document
            );
        }
        removed
    }

    /// Drops the registry entry of a deleted host object.
    pub fn forget_object(
        &mut self,
        document: &DocumentId,
        object: ObjectHandle,
    ) -> Option<ReferenceId> {
        let id = self.host.registry(document)?.find_identifier(object)?;
        self.host.registry_or_create(document).ok()?.unregister(&id);
        self.host.mark_dirty(document);
        self.cache.evict(document, &id);
        Some(id)
    }

    /// Rewrites foreign links and commits `list` to its template.
    pub fn synchronize_template<F, E>(
        &mut self,
        list: &mut TaskList,
        list_document: Option<&DocumentId>,
        template_root: ObjectHandle,
        commit: F,
    ) -> Result<SyncOutcome, E>
    where
        F: FnOnce(&TaskList) -> Result<(), E>,
    {
        self.sync.synchronize(
            &self.policy,
            &mut self.host,
            list,
            list_document,
            template_root,
            commit,
        )
    }

    /// Removes completed items and returns how many were dropped.
    pub fn remove_completed(&mut self, list: &mut TaskList) -> usize {
        let removed = list.remove_completed();
        info!(
            "event=tasks_remove_completed module=service status=ok removed={} remaining={}",
            removed,
            list.len()
        );
        removed
    }
}

fn item_mut(list: &mut TaskList, index: usize) -> &mut ChecklistItem {
    let len = list.len();
    list.get_mut(index)
        .unwrap_or_else(|| panic!("item index {index} out of range for list of {len} items"))
}
