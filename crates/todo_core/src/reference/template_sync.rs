//! Template instance -> template definition synchronization.
//!
//! # Responsibility
//! - Rewrite direct links that would dangle once a scene-resident list is
//!   copied into its shared template definition.
//! - Run the caller's commit step exactly once per synchronization.
//!
//! # Invariants
//! - Links to assets and to members of the instance being synchronized stay
//!   direct.
//! - Links to any other scene-resident object become indirect, item by item.
//! - A synchronization started from inside a commit step is a no-op.
//! - Only single-level instances are considered; nested templates are
//!   resolved through `DocumentHost::instance_root` alone.

use crate::host::DocumentHost;
use crate::model::descriptor::ReferenceDescriptor;
use crate::model::handle::{DocumentId, ObjectHandle};
use crate::model::task_list::TaskList;
use crate::reference::policy::ReferencePolicy;
use log::{info, warn};
use std::cell::Cell;

/// Per-run counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Direct links rewritten to indirect ones.
    pub converted: usize,
    /// Direct links kept because they point into the instance itself.
    pub kept_in_instance: usize,
    /// Direct links that could not be rewritten and were left as they were.
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Committed(SyncReport),
    /// The list lives in the template asset itself; nothing to do.
    NotSceneResident,
    /// Called while another synchronization was committing.
    Reentrant,
}

/// Guards template synchronization against reentry.
#[derive(Debug, Default)]
pub struct TemplateSync {
    in_progress: Cell<bool>,
}

struct InProgress<'a>(&'a Cell<bool>);

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl TemplateSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_progress.get()
    }

    /// Prepares `list` for the template rooted at `template_root` and then
    /// runs `commit` with the rewritten list.
    ///
    /// # Errors
    /// Returns whatever `commit` returns; link rewrites never fail the run.
    pub fn synchronize<H, F, E>(
        &self,
        policy: &ReferencePolicy,
        host: &mut H,
        list: &mut TaskList,
        list_document: Option<&DocumentId>,
        template_root: ObjectHandle,
        commit: F,
    ) -> Result<SyncOutcome, E>
    where
        H: DocumentHost + ?Sized,
        F: FnOnce(&TaskList) -> Result<(), E>,
    {
        if self.in_progress.get() {
            return Ok(SyncOutcome::Reentrant);
        }
        if list_document.is_none() {
            return Ok(SyncOutcome::NotSceneResident);
        }

        self.in_progress.set(true);
        let _guard = InProgress(&self.in_progress);

        let mut report = SyncReport::default();
        for item in list.items.iter_mut() {
            let Some(ReferenceDescriptor::Direct { object }) = item.reference else {
                continue;
            };
            let Some(document) = host.owning_document(object) else {
                continue;
            };
            if host.instance_root(object) == Some(template_root) {
                report.kept_in_instance += 1;
                continue;
            }

            match policy.register_in(host, &document, object) {
                Ok((descriptor, _)) => {
                    item.reference = Some(descriptor);
                    report.converted += 1;
                }
                Err(err) => {
                    warn!(
                        "event=template_sync_convert module=reference status=error document={} error={}",
                        document, err
                    );
                    report.failed += 1;
                }
            }
        }

        commit(&*list)?;
        info!(
            "event=template_sync module=reference status=ok converted={} kept={} failed={}",
            report.converted, report.kept_in_instance, report.failed
        );
        Ok(SyncOutcome::Committed(report))
    }
}

#[cfg(test)]
mod tests {
    use super::{SyncOutcome, SyncReport, TemplateSync};
    use crate::config::ReferenceConfig;
    use crate::host::{DocumentHost, InMemoryHost};
    use crate::model::descriptor::ReferenceDescriptor;
    use crate::model::handle::DocumentId;
    use crate::model::task_list::{ChecklistItem, TaskList};
    use crate::reference::policy::ReferencePolicy;
    use std::convert::Infallible;

    fn scene(name: &str) -> DocumentId {
        DocumentId::new(format!("Assets/Scenes/{name}.scene")).unwrap()
    }

    fn linked(object: crate::model::handle::ObjectHandle) -> ChecklistItem {
        ChecklistItem {
            reference: Some(ReferenceDescriptor::direct(object)),
            ..ChecklistItem::new("linked")
        }
    }

    #[test]
    fn converts_only_foreign_scene_links() {
        let mut host = InMemoryHost::new();
        let level = scene("Level1");
        let root = host.spawn_instance_root(&level);
        let member = host.spawn_in_instance(root).unwrap();
        let loose = host.spawn_in(&level);
        let asset = host.spawn_asset();

        let mut list = TaskList::default();
        list.push(linked(root));
        list.push(linked(member));
        list.push(linked(loose));
        list.push(linked(asset));
        list.push(ChecklistItem::new("plain"));

        let mut committed = None;
        let outcome = TemplateSync::new()
            .synchronize(
                &ReferencePolicy::default(),
                &mut host,
                &mut list,
                Some(&level),
                root,
                |list| {
                    committed = Some(list.clone());
                    Ok::<(), Infallible>(())
                },
            )
            .unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::Committed(SyncReport {
                converted: 1,
                kept_in_instance: 2,
                failed: 0,
            })
        );
        assert_eq!(list.items[0].reference, Some(ReferenceDescriptor::direct(root)));
        assert_eq!(list.items[1].reference, Some(ReferenceDescriptor::direct(member)));
        assert_eq!(list.items[3].reference, Some(ReferenceDescriptor::direct(asset)));

        let registry = host.registry(&level).expect("registry created for conversion");
        let id = registry.find_identifier(loose).expect("loose object registered");
        assert_eq!(
            list.items[2].reference,
            Some(ReferenceDescriptor::indirect(level.clone(), id))
        );
        assert_eq!(committed, Some(list));
    }

    #[test]
    fn template_asset_lists_are_ignored() {
        let mut host = InMemoryHost::new();
        let level = scene("Level1");
        let loose = host.spawn_in(&level);
        let root = host.spawn_instance_root(&level);
        let mut list = TaskList::default();
        list.push(linked(loose));
        let mut commits = 0;

        let outcome = TemplateSync::new()
            .synchronize(
                &ReferencePolicy::default(),
                &mut host,
                &mut list,
                None,
                root,
                |_| {
                    commits += 1;
                    Ok::<(), Infallible>(())
                },
            )
            .unwrap();

        assert_eq!(outcome, SyncOutcome::NotSceneResident);
        assert_eq!(commits, 0);
        assert!(list.items[0].reference.as_ref().unwrap().is_direct());
    }

    #[test]
    fn nested_synchronize_from_commit_is_skipped() {
        let mut host = InMemoryHost::new();
        let mut nested_host = InMemoryHost::new();
        let level = scene("Level1");
        let root = host.spawn_instance_root(&level);
        let nested_root = nested_host.spawn_instance_root(&level);
        let sync = TemplateSync::new();
        let policy = ReferencePolicy::default();
        let mut list = TaskList::default();
        let mut nested_list = TaskList::default();
        let mut nested_outcome = None;

        sync.synchronize(&policy, &mut host, &mut list, Some(&level), root, |_| {
            assert!(sync.is_in_progress());
            nested_outcome = Some(sync.synchronize(
                &policy,
                &mut nested_host,
                &mut nested_list,
                Some(&level),
                nested_root,
                |_| Ok::<(), Infallible>(()),
            ));
            Ok::<(), Infallible>(())
        })
        .unwrap();

        assert_eq!(nested_outcome, Some(Ok(SyncOutcome::Reentrant)));
        assert!(!sync.is_in_progress());
    }

    #[test]
    fn guard_resets_after_commit_error() {
        let mut host = InMemoryHost::new();
        let level = scene("Level1");
        let root = host.spawn_instance_root(&level);
        let sync = TemplateSync::new();
        let mut list = TaskList::default();

        let err = sync
            .synchronize(
                &ReferencePolicy::default(),
                &mut host,
                &mut list,
                Some(&level),
                root,
                |_| Err("template is read-only"),
            )
            .unwrap_err();
        assert_eq!(err, "template is read-only");
        assert!(!sync.is_in_progress());
    }

    #[test]
    fn disabled_references_leave_links_direct_and_count_failures() {
        let mut host = InMemoryHost::new();
        let level = scene("Level1");
        let root = host.spawn_instance_root(&level);
        let loose = host.spawn_in(&level);
        let mut list = TaskList::default();
        list.push(linked(loose));
        let policy = ReferencePolicy::new(ReferenceConfig {
            cross_document_references: false,
        });

        let outcome = TemplateSync::new()
            .synchronize(&policy, &mut host, &mut list, Some(&level), root, |_| {
                Ok::<(), Infallible>(())
            })
            .unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::Committed(SyncReport {
                converted: 0,
                kept_in_instance: 0,
                failed: 1,
            })
        );
        assert_eq!(list.items[0].reference, Some(ReferenceDescriptor::direct(loose)));
    }
}
