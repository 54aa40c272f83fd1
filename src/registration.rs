//! Service registration types.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::diagnostics::{DiagnosticKind, Suppressions};
use crate::error::DiResult;
use crate::internal::DisposalHooks;
use crate::key::{friendly_name, Key};
use crate::lifestyle::Lifestyle;
use crate::scoping::ScopedLifestyle;

pub(crate) use crate::provider::ResolverContext;

// Type-erased Arc for storage
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

pub(crate) type Ctor = Arc<dyn for<'a> Fn(&ResolverContext<'a>) -> DiResult<Instance> + Send + Sync>;

/// What a constructor produced.
///
/// `service` is what resolution hands out (for trait registrations an
/// `Arc<Arc<dyn Trait>>`), `component` is the implementation itself, which is
/// what disposal hooks downcast.
pub(crate) struct Instance {
    pub(crate) service: AnyArc,
    pub(crate) component: AnyArc,
}

impl Instance {
    pub(crate) fn of<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self { service: value.clone(), component: value }
    }

    pub(crate) fn bound<T, I>(component: Arc<I>, service: Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        I: Send + Sync + 'static,
    {
        Self { service: Arc::new(service), component }
    }
}

/// Which disposal contracts an implementation type exposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisposalCapabilities {
    pub synchronous: bool,
    pub asynchronous: bool,
}

impl DisposalCapabilities {
    pub const NONE: Self = Self { synchronous: false, asynchronous: false };

    pub fn is_disposable(self) -> bool {
        self.synchronous || self.asynchronous
    }

    /// Name of the contract to report; the synchronous one wins when both are present.
    pub fn contract_name(self) -> Option<&'static str> {
        if self.synchronous {
            Some("Dispose")
        } else if self.asynchronous {
            Some("AsyncDispose")
        } else {
            None
        }
    }
}

/// Describes the type that actually gets constructed for a registration.
#[derive(Debug, Clone, Copy)]
pub struct ImplementationType {
    pub type_id: TypeId,
    pub name: &'static str,
    pub capabilities: DisposalCapabilities,
}

impl ImplementationType {
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            capabilities: DisposalCapabilities::NONE,
        }
    }

    /// Type name without module paths.
    pub fn friendly_name(&self) -> String {
        friendly_name(self.name)
    }
}

/// One producer of instances for an abstraction.
///
/// Immutable once the owning [`ServiceCollection`](crate::ServiceCollection) is built.
pub struct Registration {
    pub(crate) service: Key,
    pub(crate) lifestyle: Lifestyle,
    pub(crate) implementation: ImplementationType,
    pub(crate) ctor: Ctor,
    pub(crate) hooks: DisposalHooks,
    pub(crate) externally_owned: bool,
    pub(crate) suppressions: Suppressions,
    pub(crate) scoped_by: Option<Arc<dyn ScopedLifestyle>>,
    // Index into the singleton or scoped slot table, assigned by Registry::finalize
    pub(crate) slot: usize,
}

impl Registration {
    pub(crate) fn new(service: Key, lifestyle: Lifestyle, implementation: ImplementationType, ctor: Ctor) -> Self {
        Self {
            service,
            lifestyle,
            implementation,
            ctor,
            hooks: DisposalHooks::default(),
            externally_owned: false,
            suppressions: Suppressions::default(),
            scoped_by: None,
            slot: 0,
        }
    }

    pub fn service_key(&self) -> &Key {
        &self.service
    }

    pub fn lifestyle(&self) -> Lifestyle {
        self.lifestyle
    }

    pub fn implementation(&self) -> &ImplementationType {
        &self.implementation
    }

    pub fn suppressions(&self) -> &Suppressions {
        &self.suppressions
    }

    pub fn is_suppressed(&self, kind: DiagnosticKind) -> bool {
        self.suppressions.contains(kind)
    }

    pub fn is_externally_owned(&self) -> bool {
        self.externally_owned
    }

    /// True when the implementation is resolved as itself rather than through an abstraction.
    pub fn is_self_bound(&self) -> bool {
        self.service.type_id() == Some(self.implementation.type_id)
    }

    /// Whether a created instance must be handed to a disposal owner.
    pub(crate) fn tracks_disposal(&self) -> bool {
        self.lifestyle.is_tracked_for_disposal() && !self.externally_owned && !self.hooks.is_empty()
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("service", &self.service.display_name())
            .field("lifestyle", &self.lifestyle)
            .field("implementation", &self.implementation.name)
            .field("capabilities", &self.implementation.capabilities)
            .field("externally_owned", &self.externally_owned)
            .field("suppressions", &self.suppressions)
            .finish()
    }
}

/// Finalized, read-only registration table of a built container.
pub(crate) struct Registry {
    entries: Box<[Arc<Registration>]>,
    index: HashMap<Key, usize>,
    pub(crate) singleton_count: usize,
    pub(crate) scoped_count: usize,
}

impl Registry {
    /// Assigns cache slots per lifestyle and freezes the registrations.
    pub(crate) fn finalize(registrations: Vec<Registration>) -> Self {
        let mut singleton_count = 0;
        let mut scoped_count = 0;
        let mut index = HashMap::with_capacity(registrations.len());
        let mut entries = Vec::with_capacity(registrations.len());

        for (position, mut reg) in registrations.into_iter().enumerate() {
            match reg.lifestyle {
                Lifestyle::Singleton => {
                    reg.slot = singleton_count;
                    singleton_count += 1;
                }
                Lifestyle::Scoped => {
                    reg.slot = scoped_count;
                    scoped_count += 1;
                }
                Lifestyle::Transient => {}
            }
            index.insert(reg.service.clone(), position);
            entries.push(Arc::new(reg));
        }

        Self {
            entries: entries.into_boxed_slice(),
            index,
            singleton_count,
            scoped_count,
        }
    }

    #[inline(always)]
    pub(crate) fn get(&self, key: &Key) -> Option<&Arc<Registration>> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Arc<Registration>> {
        self.entries.iter()
    }

    pub(crate) fn as_slice(&self) -> &[Arc<Registration>] {
        &self.entries
    }
}
