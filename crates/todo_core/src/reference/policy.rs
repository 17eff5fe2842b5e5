//! Direct/indirect link decision and lazy resolution.
//!
//! # Responsibility
//! - Decide how an object assigned to a checklist item is stored.
//! - Resolve stored descriptors into a display state.
//!
//! # Invariants
//! - Same document (or no document on both sides) stores `Direct` and
//!   never touches a registry.
//! - Any other pairing stores `Indirect` in the candidate's document.
//! - A failed link leaves the item untouched.
//! - Resolution never fails; missing targets degrade to `Lost` or
//!   `DocumentUnavailable`.

use crate::config::ReferenceConfig;
use crate::host::{DocumentHost, HostError};
use crate::model::descriptor::ReferenceDescriptor;
use crate::model::handle::{DocumentId, ObjectHandle};
use crate::model::task_list::ChecklistItem;
use crate::reference::cache::ResolutionCache;
use crate::registry::reference_registry::RegistryError;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Where a candidate object's link has to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Direct,
    Indirect(DocumentId),
}

/// What `ReferencePolicy::link` did to the item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The null object was assigned; the item no longer links anything.
    Cleared,
    Direct,
    Indirect {
        document: DocumentId,
        /// `true` when a new registry entry was written.
        registered: bool,
    },
}

/// Display state of one item's link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Linked {
        object: ObjectHandle,
        indirect: bool,
    },
    /// Registry or identifier is gone.
    Lost { document: DocumentId },
    /// Target document is not loaded.
    DocumentUnavailable { document: DocumentId },
}

impl Resolution {
    pub fn object(&self) -> Option<ObjectHandle> {
        match self {
            Self::Linked { object, .. } => Some(*object),
            _ => None,
        }
    }

    /// Inspector caption for this state.
    pub fn label(&self) -> String {
        match self {
            Self::Linked {
                indirect: false, ..
            } => "Linked Object : ".to_string(),
            Self::Linked { indirect: true, .. } => "Linked Object : *".to_string(),
            Self::Lost { .. } => "Linked Object : * (Cross-scene reference lost?)".to_string(),
            Self::DocumentUnavailable { document } => {
                format!("Linked Object : * (Object in scene '{document}')")
            }
        }
    }
}

/// Errors raised while storing a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// Cross-document links are switched off in `ReferenceConfig`.
    CrossDocumentDisabled { document: DocumentId },
    Registry(RegistryError),
    Host(HostError),
}

impl Display for LinkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CrossDocumentDisabled { document } => write!(
                f,
                "cross-document references are disabled; cannot link into {document}"
            ),
            Self::Registry(err) => write!(f, "{err}"),
            Self::Host(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LinkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CrossDocumentDisabled { .. } => None,
            Self::Registry(err) => Some(err),
            Self::Host(err) => Some(err),
        }
    }
}

impl From<RegistryError> for LinkError {
    fn from(value: RegistryError) -> Self {
        Self::Registry(value)
    }
}

impl From<HostError> for LinkError {
    fn from(value: HostError) -> Self {
        Self::Host(value)
    }
}

/// Link policy parameterized by `ReferenceConfig`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferencePolicy {
    config: ReferenceConfig,
}

impl ReferencePolicy {
    pub fn new(config: ReferenceConfig) -> Self {
        Self { config }
    }

    /// Decides how `candidate` must be stored for a list in `list_document`.
    ///
    /// `list_document` is `None` when the list lives in an asset or template
    /// rather than a scene.
    pub fn placement<H: DocumentHost + ?Sized>(
        &self,
        host: &H,
        list_document: Option<&DocumentId>,
        candidate: ObjectHandle,
    ) -> Placement {
        match host.owning_document(candidate) {
            None => Placement::Direct,
            Some(document) if Some(&document) == list_document => Placement::Direct,
            Some(document) => Placement::Indirect(document),
        }
    }

    /// Stores `candidate` on `item`.
    ///
    /// # Errors
    /// - `CrossDocumentDisabled` when an indirect link is needed but disabled.
    /// - `Host(DocumentUnavailable)` when the candidate's document is gone.
    pub fn link<H: DocumentHost + ?Sized>(
        &self,
        host: &mut H,
        list_document: Option<&DocumentId>,
        item: &mut ChecklistItem,
        candidate: ObjectHandle,
    ) -> Result<LinkOutcome, LinkError> {
        if candidate.is_nil() {
            item.reference = None;
            return Ok(LinkOutcome::Cleared);
        }

        match self.placement(&*host, list_document, candidate) {
            Placement::Direct => {
                item.reference = Some(ReferenceDescriptor::direct(candidate));
                debug!("event=reference_link module=reference status=ok kind=direct");
                Ok(LinkOutcome::Direct)
            }
            Placement::Indirect(document) => {
                let (descriptor, registered) = self.register_in(host, &document, candidate)?;
                item.reference = Some(descriptor);
                Ok(LinkOutcome::Indirect {
                    document,
                    registered,
                })
            }
        }
    }

    /// Registers `object` in `document`'s registry and returns the
    /// indirect descriptor plus whether a new entry was written.
    pub fn register_in<H: DocumentHost + ?Sized>(
        &self,
        host: &mut H,
        document: &DocumentId,
        object: ObjectHandle,
    ) -> Result<(ReferenceDescriptor, bool), LinkError> {
        if !self.config.cross_document_references {
            warn!(
                "event=reference_link module=reference status=error kind=indirect document={} error_code=cross_document_disabled",
                document
            );
            return Err(LinkError::CrossDocumentDisabled {
                document: document.clone(),
            });
        }

        let registration = match host.registry_or_create(document) {
            Ok(registry) => registry.register(object)?,
            Err(err) => {
                warn!(
                    "event=reference_link module=reference status=error kind=indirect document={} error_code=document_unavailable",
                    document
                );
                return Err(err.into());
            }
        };
        if registration.changed {
            host.mark_dirty(document);
        }
        info!(
            "event=reference_link module=reference status=ok kind=indirect document={} registered={}",
            document, registration.changed
        );
        Ok((
            ReferenceDescriptor::indirect(document.clone(), registration.id),
            registration.changed,
        ))
    }

    /// Removes any link from `item`, returning the old descriptor.
    pub fn unlink(&self, item: &mut ChecklistItem) -> Option<ReferenceDescriptor> {
        item.reference.take()
    }

    /// Resolves a stored descriptor into its display state.
    pub fn resolve<H: DocumentHost + ?Sized>(
        &self,
        host: &H,
        cache: &mut ResolutionCache,
        descriptor: &ReferenceDescriptor,
    ) -> Resolution {
        let (document, id) = match descriptor {
            ReferenceDescriptor::Direct { object } => {
                return Resolution::Linked {
                    object: *object,
                    indirect: false,
                };
            }
            ReferenceDescriptor::Indirect { document, id } => (document, id),
        };

        if !host.is_loaded(document) {
            return Resolution::DocumentUnavailable {
                document: document.clone(),
            };
        }
        if !self.config.cross_document_references {
            return Resolution::Lost {
                document: document.clone(),
            };
        }
        let Some(registry) = host.registry(document) else {
            let evicted = cache.evict_document(document);
            debug!(
                "event=reference_resolve module=reference status=lost document={} reason=no_registry evicted={}",
                document, evicted
            );
            return Resolution::Lost {
                document: document.clone(),
            };
        };
        if let Some(object) = cache.get(document, id) {
            return Resolution::Linked {
                object,
                indirect: true,
            };
        }

        match registry.resolve(id) {
            Some(object) => {
                cache.insert(document.clone(), id.clone(), object);
                Resolution::Linked {
                    object,
                    indirect: true,
                }
            }
            None => {
                debug!(
                    "event=reference_resolve module=reference status=lost document={} reason=unknown_id",
                    document
                );
                Resolution::Lost {
                    document: document.clone(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LinkError, LinkOutcome, Placement, ReferencePolicy, Resolution};
    use crate::config::ReferenceConfig;
    use crate::host::{DocumentHost, HostError, InMemoryHost};
    use crate::model::descriptor::ReferenceDescriptor;
    use crate::model::handle::{DocumentId, ObjectHandle, ReferenceId};
    use crate::model::task_list::ChecklistItem;
    use crate::reference::cache::ResolutionCache;

    fn scene(name: &str) -> DocumentId {
        DocumentId::new(format!("Assets/Scenes/{name}.scene")).unwrap()
    }

    fn disabled() -> ReferencePolicy {
        ReferencePolicy::new(ReferenceConfig {
            cross_document_references: false,
        })
    }

    #[test]
    fn placement_follows_document_membership() {
        let mut host = InMemoryHost::new();
        let level1 = scene("Level1");
        let level2 = scene("Level2");
        let same = host.spawn_in(&level1);
        let other = host.spawn_in(&level2);
        let asset = host.spawn_asset();
        let policy = ReferencePolicy::default();

        assert_eq!(policy.placement(&host, Some(&level1), same), Placement::Direct);
        assert_eq!(policy.placement(&host, Some(&level1), asset), Placement::Direct);
        assert_eq!(policy.placement(&host, None, asset), Placement::Direct);
        assert_eq!(
            policy.placement(&host, Some(&level1), other),
            Placement::Indirect(level2.clone())
        );
        assert_eq!(
            policy.placement(&host, None, same),
            Placement::Indirect(level1)
        );
    }

    #[test]
    fn same_document_link_never_creates_registry() {
        let mut host = InMemoryHost::new();
        let level1 = scene("Level1");
        let object = host.spawn_in(&level1);
        let mut item = ChecklistItem::new("Fix lighting");

        let outcome = ReferencePolicy::default()
            .link(&mut host, Some(&level1), &mut item, object)
            .expect("direct link");

        assert_eq!(outcome, LinkOutcome::Direct);
        assert_eq!(item.reference, Some(ReferenceDescriptor::direct(object)));
        assert!(host.registry(&level1).is_none());
        assert!(!host.is_dirty(&level1));
    }

    #[test]
    fn cross_document_link_registers_once_and_reuses_entry() {
        let mut host = InMemoryHost::new();
        let level1 = scene("Level1");
        let level2 = scene("Level2");
        host.open_document(&level1);
        let target = host.spawn_in(&level2);
        let policy = ReferencePolicy::default();
        let mut first = ChecklistItem::new("first");
        let mut second = ChecklistItem::new("second");

        let outcome = policy
            .link(&mut host, Some(&level1), &mut first, target)
            .unwrap();
        assert_eq!(
            outcome,
            LinkOutcome::Indirect {
                document: level2.clone(),
                registered: true,
            }
        );
        assert_eq!(host.registry(&level2).map(|r| r.len()), Some(1));
        assert!(host.is_dirty(&level2));

        let outcome = policy
            .link(&mut host, Some(&level1), &mut second, target)
            .unwrap();
        assert_eq!(
            outcome,
            LinkOutcome::Indirect {
                document: level2.clone(),
                registered: false,
            }
        );
        assert_eq!(host.registry(&level2).map(|r| r.len()), Some(1));
        assert_eq!(first.reference, second.reference);
        assert!(host.registry(&level1).is_none());
    }

    #[test]
    fn null_candidate_clears_link() {
        let mut host = InMemoryHost::new();
        let mut item = ChecklistItem::new("x");
        item.reference = Some(ReferenceDescriptor::direct(ObjectHandle::new()));

        let outcome = ReferencePolicy::default()
            .link(&mut host, None, &mut item, ObjectHandle::nil())
            .unwrap();
        assert_eq!(outcome, LinkOutcome::Cleared);
        assert!(item.reference.is_none());
    }

    #[test]
    fn failed_indirect_link_leaves_item_untouched() {
        let mut host = InMemoryHost::new();
        let level2 = scene("Level2");
        let target = host.spawn_in(&level2);
        host.unload_document(&level2);
        let previous = ReferenceDescriptor::direct(ObjectHandle::new());
        let mut item = ChecklistItem::new("x");
        item.reference = Some(previous.clone());

        let err = ReferencePolicy::default()
            .link(&mut host, None, &mut item, target)
            .unwrap_err();
        assert_eq!(
            err,
            LinkError::Host(HostError::DocumentUnavailable(level2.clone()))
        );
        assert_eq!(item.reference, Some(previous.clone()));

        host.load_document(&level2);
        let err = disabled()
            .link(&mut host, None, &mut item, target)
            .unwrap_err();
        assert_eq!(err, LinkError::CrossDocumentDisabled { document: level2.clone() });
        assert_eq!(item.reference, Some(previous));
        assert!(host.registry(&level2).is_none());
    }

    #[test]
    fn resolve_indirect_link_and_cache_it() {
        let mut host = InMemoryHost::new();
        let level2 = scene("Level2");
        let target = host.spawn_in(&level2);
        let policy = ReferencePolicy::default();
        let mut item = ChecklistItem::new("x");
        policy.link(&mut host, None, &mut item, target).unwrap();
        let descriptor = item.reference.clone().unwrap();
        let mut cache = ResolutionCache::new();

        let resolution = policy.resolve(&host, &mut cache, &descriptor);
        assert_eq!(
            resolution,
            Resolution::Linked {
                object: target,
                indirect: true
            }
        );
        assert_eq!(resolution.label(), "Linked Object : *");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn resolve_degrades_when_target_is_missing() {
        let mut host = InMemoryHost::new();
        let level2 = scene("Level2");
        host.open_document(&level2);
        let policy = ReferencePolicy::default();
        let mut cache = ResolutionCache::new();
        let descriptor = ReferenceDescriptor::indirect(level2.clone(), ReferenceId::generate());

        let lost = policy.resolve(&host, &mut cache, &descriptor);
        assert_eq!(lost, Resolution::Lost { document: level2.clone() });
        assert_eq!(lost.label(), "Linked Object : * (Cross-scene reference lost?)");

        host.unload_document(&level2);
        let unavailable = policy.resolve(&host, &mut cache, &descriptor);
        assert_eq!(
            unavailable.label(),
            "Linked Object : * (Object in scene 'Assets/Scenes/Level2.scene')"
        );
        assert!(cache.is_empty());
    }

    #[test]
    fn cached_link_is_lost_once_host_drops_the_registry() {
        let mut host = InMemoryHost::new();
        let level2 = scene("Level2");
        let target = host.spawn_in(&level2);
        let policy = ReferencePolicy::default();
        let mut cache = ResolutionCache::new();
        let mut item = ChecklistItem::new("x");
        policy.link(&mut host, None, &mut item, target).unwrap();
        let descriptor = item.reference.clone().unwrap();
        assert_eq!(
            policy.resolve(&host, &mut cache, &descriptor).object(),
            Some(target)
        );
        assert_eq!(cache.len(), 1);

        assert!(host.remove_registry(&level2));
        let resolution = policy.resolve(&host, &mut cache, &descriptor);

        assert_eq!(resolution, Resolution::Lost { document: level2 });
        assert!(cache.is_empty());
    }

    #[test]
    fn disabled_policy_reports_existing_links_as_lost() {
        let mut host = InMemoryHost::new();
        let level2 = scene("Level2");
        let target = host.spawn_in(&level2);
        let mut item = ChecklistItem::new("x");
        ReferencePolicy::default()
            .link(&mut host, None, &mut item, target)
            .unwrap();
        let descriptor = item.reference.clone().unwrap();

        let resolution = disabled().resolve(&host, &mut ResolutionCache::new(), &descriptor);
        assert_eq!(resolution, Resolution::Lost { document: level2.clone() });
        assert_eq!(host.registry(&level2).map(|r| r.len()), Some(1));
    }

    #[test]
    fn direct_descriptor_resolves_as_is() {
        let host = InMemoryHost::new();
        let object = ObjectHandle::new();
        let resolution = ReferencePolicy::default().resolve(
            &host,
            &mut ResolutionCache::new(),
            &ReferenceDescriptor::direct(object),
        );
        assert_eq!(resolution.object(), Some(object));
        assert_eq!(resolution.label(), "Linked Object : ");
    }
}
